use super::{base_map::BaseMap, MapBuilder};
use crate::Policy;

use std::{
    borrow::Borrow,
    collections::hash_map::RandomState,
    fmt,
    hash::{BuildHasher, Hash},
};

/// A thread-safe concurrent hash map with per-bucket locks.
///
/// `StripedHashMap` keeps its entries in a table of separately chained buckets.
/// Every bucket has its own lock, so reads and writes of keys that land in
/// different buckets run in parallel; there is no map-wide lock on the common
/// path.
///
/// The table starts with 16 buckets (or the capacity given to the
/// [`MapBuilder`][builder-struct]) and doubles when the number of entries
/// exceeds `capacity * load_factor`. The resize runs on a background thread.
/// While it runs, keyed operations wait for it to publish the new table; the
/// insert that triggered it does not wait.
///
/// Besides the keyed entries, the map has one _unkeyed_ slot: a single entry
/// stored outside the table under its own lock, addressed by the `*_unkeyed`
/// methods. It plays the role of a null key. Operations on it never wait for a
/// resize.
///
/// # Examples
///
/// Here's an example of reading and updating a map by using multiple threads:
///
/// ```rust
/// use stripemap::sync::StripedHashMap;
///
/// use std::thread;
///
/// fn value(n: usize) -> String {
///     format!("value {}", n)
/// }
///
/// const NUM_THREADS: usize = 16;
/// const NUM_KEYS_PER_THREAD: usize = 64;
///
/// // Create a map that can store any number of entries.
/// let map = StripedHashMap::new();
///
/// // Spawn threads and read and update the map simultaneously.
/// let threads: Vec<_> = (0..NUM_THREADS)
///     .map(|i| {
///         // To share the same map across the threads, clone it.
///         // This is a cheap operation.
///         let my_map = map.clone();
///         let start = i * NUM_KEYS_PER_THREAD;
///         let end = (i + 1) * NUM_KEYS_PER_THREAD;
///
///         thread::spawn(move || {
///             // Insert 64 entries. (NUM_KEYS_PER_THREAD = 64)
///             for key in start..end {
///                 my_map.insert(key, value(key));
///                 // get() returns Option<String>, a clone of the stored value.
///                 assert_eq!(my_map.get(&key), Some(value(key)));
///             }
///
///             // Remove every 4 element of the inserted entries.
///             for key in (start..end).step_by(4) {
///                 assert_eq!(my_map.remove(&key), Some(value(key)));
///             }
///         })
///     })
///     .collect();
///
/// // Wait for all threads to complete.
/// threads.into_iter().for_each(|t| t.join().expect("Failed"));
///
/// // Verify the result.
/// for key in 0..(NUM_THREADS * NUM_KEYS_PER_THREAD) {
///     if key % 4 == 0 {
///         assert_eq!(map.get(&key), None);
///     } else {
///         assert_eq!(map.get(&key), Some(value(key)));
///     }
/// }
/// assert_eq!(map.len(), NUM_THREADS * NUM_KEYS_PER_THREAD * 3 / 4);
/// ```
///
/// # Avoiding to clone the value at `get`
///
/// The return type of `get` method is `Option<V>` instead of `Option<&V>`. Every
/// time `get` is called for an existing key, it creates a clone of the stored
/// value `V` and returns it. This is because the `StripedHashMap` allows
/// concurrent updates from threads so a value stored in the map can be dropped
/// or replaced at any time by any other thread. `get` cannot return a reference
/// `&V` as it is impossible to guarantee the value outlives the reference.
///
/// If you want to store values that will be expensive to clone, wrap them by
/// `std::sync::Arc` before storing in a map. [`Arc`][rustdoc-std-arc] is a
/// thread-safe reference-counted pointer and its `clone()` method is cheap.
///
/// # Null values
///
/// Use an `Option<T>` value type to store "null" values. Then
/// `contains_value(&None)` reports whether any entry, keyed or unkeyed, holds
/// one.
///
/// ```rust
/// use stripemap::sync::StripedHashMap;
///
/// let map: StripedHashMap<&str, Option<u32>> = StripedHashMap::new();
/// map.insert("a", Some(1));
/// assert!(!map.contains_value(&None));
///
/// map.insert_unkeyed(None);
/// assert!(map.contains_value(&None));
/// assert_eq!(map.get_unkeyed(), Some(None));
/// assert_eq!(map.len(), 2);
/// ```
///
/// # Consistency of bulk operations
///
/// [`len`](#method.len) and [`is_empty`](#method.is_empty) read one atomic
/// counter and never block. Under concurrent writes they may briefly disagree
/// with the buckets; in a quiescent state they are exact.
///
/// [`contains_value`](#method.contains_value), [`keys`](#method.keys),
/// [`values`](#method.values) and [`entries`](#method.entries) visit the
/// unkeyed slot and then lock one bucket at a time. They never miss or repeat an
/// entry because of a concurrent resize, but they are not an atomic snapshot of
/// the whole map: writes to buckets that have already been visited are not
/// reflected. The returned collections are copies and are not linked back to
/// the map.
///
/// # Hashing Algorithm
///
/// By default, `StripedHashMap` uses a hashing algorithm selected to provide
/// resistance against HashDoS attacks. It will be the same one used by
/// `std::collections::HashMap`, which is currently SipHash 1-3.
///
/// While SipHash's performance is very competitive for medium sized keys, other
/// hashing algorithms will outperform it for small keys such as integers as well
/// as large keys such as long strings. However those algorithms will typically
/// not protect against attacks such as HashDoS.
///
/// The hashing algorithm can be replaced on a per-`StripedHashMap` basis using
/// the [`build_with_hasher`][build-with-hasher-method] method of the
/// `MapBuilder`. Many alternative algorithms are available on crates.io, such as
/// the [aHash][ahash-crate] crate.
///
/// It is a logic error for a key to be modified in such a way that the key's
/// hash, as determined by the [`Hash`] trait, or its equality, as determined by
/// the [`Eq`] trait, changes while it is in the map.
///
/// [builder-struct]: ./struct.MapBuilder.html
/// [build-with-hasher-method]: ./struct.MapBuilder.html#method.build_with_hasher
/// [ahash-crate]: https://crates.io/crates/ahash
/// [rustdoc-std-arc]: https://doc.rust-lang.org/stable/std/sync/struct.Arc.html
///
pub struct StripedHashMap<K, V, S = RandomState> {
    base: BaseMap<K, V, S>,
}

impl<K, V, S> Clone for StripedHashMap<K, V, S> {
    /// Makes a clone of this shared map.
    ///
    /// This operation is cheap as it only creates thread-safe reference counted
    /// pointers to the shared internal data structures.
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
        }
    }
}

impl<K, V, S> fmt::Debug for StripedHashMap<K, V, S>
where
    K: fmt::Debug + Clone,
    V: fmt::Debug + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d_map = f.debug_map();

        for (k, v) in self.entries() {
            d_map.entry(&k, &v);
        }

        d_map.finish()
    }
}

impl<K, V> StripedHashMap<K, V, RandomState>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Constructs a new, empty `StripedHashMap<K, V>` with 16 buckets and the
    /// default load factor of `0.75`.
    ///
    /// To adjust various configuration knobs such as `initial_capacity` or
    /// `load_factor`, use the [`MapBuilder`][builder-struct].
    ///
    /// [builder-struct]: ./struct.MapBuilder.html
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Constructs a new, empty `StripedHashMap<K, V>` whose first table has at
    /// least `capacity` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` cannot be rounded up to a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::builder().initial_capacity(capacity).build()
    }

    /// Returns a [`MapBuilder`][builder-struct], which can build a
    /// `StripedHashMap` with various configuration knobs.
    ///
    /// [builder-struct]: ./struct.MapBuilder.html
    pub fn builder() -> MapBuilder<K, V, StripedHashMap<K, V, RandomState>> {
        MapBuilder::default()
    }
}

impl<K, V> Default for StripedHashMap<K, V, RandomState>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> StripedHashMap<K, V, S>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: BuildHasher + Send + Sync + 'static,
{
    /// Constructs a new, empty `StripedHashMap<K, V, S>` that uses
    /// `build_hasher` to hash the keys.
    pub fn with_hasher(build_hasher: S) -> Self {
        MapBuilder::default().build_with_hasher(build_hasher)
    }

    pub(crate) fn with_everything(
        name: Option<String>,
        table_length: usize,
        load_factor: f32,
        build_hasher: S,
    ) -> Self {
        Self {
            base: BaseMap::new(name, table_length, load_factor, build_hasher),
        }
    }

    /// Returns a _clone_ of the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash` and `Eq`
    /// on the borrowed form _must_ match those for the key type.
    ///
    /// Waits if a resize is in flight.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.base.inner.get(key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash` and `Eq`
    /// on the borrowed form _must_ match those for the key type.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.base.inner.contains_key(key)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, [`None`] is returned. If the
    /// map did have this key present, the value is replaced in place and the old
    /// value is returned. The key itself is not updated.
    ///
    /// Inserting a new key may push the number of entries over the resize
    /// threshold. In that case a background resize is started (unless one is
    /// already running) and this method returns without waiting for it.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.base.insert(key, value)
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash` and `Eq`
    /// on the borrowed form _must_ match those for the key type.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.base.inner.remove(key)
    }

    /// Inserts every pair of `entries`, one at a time. A `None` key addresses
    /// the unkeyed slot.
    ///
    /// This is equivalent to calling [`insert`](#method.insert) and
    /// [`insert_unkeyed`](#method.insert_unkeyed) repeatedly. Other threads may
    /// observe the map with only part of the batch applied.
    pub fn insert_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (Option<K>, V)>,
    {
        for (key, value) in entries {
            match key {
                Some(key) => self.insert(key, value),
                None => self.insert_unkeyed(value),
            };
        }
    }
}

impl<K, V, S> StripedHashMap<K, V, S> {
    /// Returns a _clone_ of the value of the unkeyed slot.
    pub fn get_unkeyed(&self) -> Option<V>
    where
        V: Clone,
    {
        self.base.inner.get_unkeyed()
    }

    /// Returns `true` if the unkeyed slot holds a value.
    pub fn contains_unkeyed(&self) -> bool {
        self.base.inner.contains_unkeyed()
    }

    /// Stores `value` in the unkeyed slot, returning the value it replaced.
    pub fn insert_unkeyed(&self, value: V) -> Option<V> {
        self.base.inner.insert_unkeyed(value)
    }

    /// Empties the unkeyed slot, returning the value it held.
    pub fn remove_unkeyed(&self) -> Option<V> {
        self.base.inner.remove_unkeyed()
    }

    /// Returns `true` if any entry, keyed or unkeyed, holds a value equal to
    /// `value`.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.base.inner.contains_value(value)
    }

    /// Returns a snapshot of the keys. The unkeyed slot, if occupied, appears as
    /// `None`. Each key appears once.
    pub fn keys(&self) -> Vec<Option<K>>
    where
        K: Clone,
    {
        self.base.inner.keys()
    }

    /// Returns a snapshot of the values, starting with the one of the unkeyed
    /// slot if it is occupied.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.base.inner.values()
    }

    /// Returns a snapshot of the key-value pairs. The unkeyed slot, if occupied,
    /// appears first with a `None` key.
    pub fn entries(&self) -> Vec<(Option<K>, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.base.inner.entries()
    }

    /// Removes all entries, including the unkeyed one.
    ///
    /// Keyed operations started by other threads while this method runs wait
    /// until it returns. The table keeps its current number of buckets.
    pub fn clear(&self) {
        self.base.inner.clear();
    }

    /// Returns the number of entries in the map, including the unkeyed one.
    pub fn len(&self) -> usize {
        self.base.inner.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of buckets of the current table.
    ///
    /// Waits for an in-flight resize to publish its table first, so the result is
    /// always a power of two that only changes by doubling (or stays the same
    /// across `clear`).
    pub fn capacity(&self) -> usize {
        self.base.inner.capacity()
    }

    /// Returns the map's name, if one was given to the builder.
    pub fn name(&self) -> Option<&str> {
        self.base.inner.name()
    }

    /// Returns the configuration this map was built with.
    pub fn policy(&self) -> Policy {
        let inner = &self.base.inner;
        Policy::new(inner.initial_capacity(), inner.load_factor())
    }

    /// Returns a reference to the map's `BuildHasher`.
    pub fn hasher(&self) -> &S {
        self.base.inner.hasher()
    }
}

impl<K, V, S> Extend<(K, V)> for StripedHashMap<K, V, S>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: BuildHasher + Send + Sync + 'static,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for StripedHashMap<K, V, RandomState>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}
