use super::StripedHashMap;
use crate::{
    common::{builder_utils, concurrent::constants::DEFAULT_LOAD_FACTOR},
    BuildError,
};

use std::{
    collections::hash_map::RandomState,
    hash::{BuildHasher, Hash},
    marker::PhantomData,
};

/// Builds a [`StripedHashMap`][map-struct] with various configuration knobs.
///
/// [map-struct]: ./struct.StripedHashMap.html
///
/// # Examples
///
/// ```rust
/// use stripemap::sync::MapBuilder;
///
/// let map = MapBuilder::default()
///     // Start with at least 1,000 buckets. (Rounded up to 1,024)
///     .initial_capacity(1_000)
///     // Double the table when it holds more than 2 entries per bucket.
///     .load_factor(2.0)
///     // A name shows up in the log messages of the map.
///     .name("sessions")
///     // Create the map.
///     .build();
///
/// map.insert(0, "zero");
/// assert_eq!(map.capacity(), 1_024);
/// assert_eq!(map.get(&0), Some("zero"));
/// ```
///
/// Invalid settings are reported by the `try_build*` methods:
///
/// ```rust
/// use stripemap::{sync::{MapBuilder, StripedHashMap}, BuildError};
///
/// let result: Result<StripedHashMap<u32, u32>, _> =
///     MapBuilder::default().load_factor(0.0).try_build();
/// assert_eq!(result.err(), Some(BuildError::InvalidLoadFactor(0.0)));
/// ```
///
#[must_use]
pub struct MapBuilder<K, V, C> {
    name: Option<String>,
    initial_capacity: Option<usize>,
    load_factor: f32,
    map_type: PhantomData<(K, V, C)>,
}

impl<K, V> Default for MapBuilder<K, V, StripedHashMap<K, V, RandomState>>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            name: None,
            initial_capacity: None,
            load_factor: DEFAULT_LOAD_FACTOR,
            map_type: PhantomData,
        }
    }
}

impl<K, V> MapBuilder<K, V, StripedHashMap<K, V, RandomState>>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Builds a `StripedHashMap<K, V>`.
    ///
    /// # Panics
    ///
    /// Panics if the configured load factor is not a finite number greater than
    /// zero, or if the initial capacity cannot be rounded up to a power of two. Use
    /// [`try_build`](#method.try_build) to get an error instead.
    pub fn build(self) -> StripedHashMap<K, V, RandomState> {
        self.build_with_hasher(RandomState::default())
    }

    /// Builds a `StripedHashMap<K, V>`, or returns the reason the configuration is
    /// invalid.
    pub fn try_build(self) -> Result<StripedHashMap<K, V, RandomState>, BuildError> {
        self.try_build_with_hasher(RandomState::default())
    }

    /// Builds a `StripedHashMap<K, V, S>` with the given `hasher` of type `S`.
    ///
    /// # Examples
    ///
    /// This example uses AHash hasher from [AHash][ahash-crate] crate.
    ///
    /// [ahash-crate]: https://crates.io/crates/ahash
    ///
    /// ```rust
    /// // Cargo.toml
    /// // [dependencies]
    /// // ahash = "0.8"
    /// // stripemap = "0.1"
    /// use stripemap::sync::StripedHashMap;
    ///
    /// // The type of this map is: StripedHashMap<i32, String, ahash::RandomState>
    /// let map = StripedHashMap::builder().build_with_hasher(ahash::RandomState::default());
    /// map.insert(1, "one".to_string());
    /// ```
    ///
    /// # Panics
    ///
    /// Panics on the same invalid settings as [`build`](#method.build).
    pub fn build_with_hasher<S>(self, hasher: S) -> StripedHashMap<K, V, S>
    where
        S: BuildHasher + Send + Sync + 'static,
    {
        match self.try_build_with_hasher(hasher) {
            Ok(map) => map,
            Err(e) => panic!("{}", e),
        }
    }

    /// Builds a `StripedHashMap<K, V, S>` with the given `hasher`, or returns the
    /// reason the configuration is invalid.
    pub fn try_build_with_hasher<S>(
        self,
        hasher: S,
    ) -> Result<StripedHashMap<K, V, S>, BuildError>
    where
        S: BuildHasher + Send + Sync + 'static,
    {
        let table_length = builder_utils::initial_table_length(self.initial_capacity)?;
        let load_factor = builder_utils::ensure_load_factor(self.load_factor)?;
        Ok(StripedHashMap::with_everything(
            self.name,
            table_length,
            load_factor,
            hasher,
        ))
    }
}

impl<K, V, C> MapBuilder<K, V, C> {
    /// Sets the name of the map. The name is included in the log messages emitted
    /// when the `logging` feature is enabled.
    pub fn name(self, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..self
        }
    }

    /// Sets the minimum number of buckets of the first table.
    ///
    /// The value is rounded up to a power of two, and values below 16 are raised
    /// to 16.
    pub fn initial_capacity(self, capacity: usize) -> Self {
        Self {
            initial_capacity: Some(capacity),
            ..self
        }
    }

    /// Sets the load factor of the map. Defaults to `0.75`.
    ///
    /// The table doubles once the number of entries exceeds
    /// `capacity * load_factor`. Values greater than `1.0` are allowed and let the
    /// chains grow longer before a resize.
    pub fn load_factor(self, load_factor: f32) -> Self {
        Self {
            load_factor,
            ..self
        }
    }
}
