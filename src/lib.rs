#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

//! Stripemap is a concurrent hash map for Rust that locks one bucket at a time.
//!
//! The map is a table of separately chained buckets, each guarded by its own
//! mutex. Threads working on keys in different buckets never contend with each
//! other. When the number of entries exceeds `capacity * load_factor`, the table
//! is doubled by a background thread; keyed operations wait for the new table to
//! be published, so no operation ever observes a half-moved entry.
//!
//! Besides its keyed entries, a map has one _unkeyed_ slot that stands in for a
//! null key. It lives outside the table and is never blocked by a resize.
//!
//! # Example
//!
//! ```rust
//! use stripemap::sync::StripedHashMap;
//!
//! use std::thread;
//!
//! let map = StripedHashMap::new();
//!
//! let handles = (0..4u32)
//!     .map(|t| {
//!         // Cloning the map is cheap. Every clone shares the same entries.
//!         let map = map.clone();
//!         thread::spawn(move || {
//!             for i in 0..1_000 {
//!                 map.insert(t * 1_000 + i, i);
//!             }
//!         })
//!     })
//!     .collect::<Vec<_>>();
//!
//! handles.into_iter().for_each(|h| h.join().expect("Failed"));
//!
//! assert_eq!(map.len(), 4_000);
//! assert_eq!(map.get(&3_999), Some(999));
//!
//! map.insert_unkeyed(42);
//! assert_eq!(map.len(), 4_001);
//!
//! map.clear();
//! assert!(map.is_empty());
//! ```
//!
//! # Crate Features
//!
//! - `logging` (disabled by default) emits `trace` and `debug` messages about
//!   resizes and clears through the [log][log-crate] crate.
//!
//! [log-crate]: https://crates.io/crates/log
//!
//! # Minimum Supported Rust Versions
//!
//! This crate's minimum supported Rust version (MSRV) is 1.65.

pub(crate) mod common;
pub(crate) mod table;

pub mod sync;

mod policy;

pub use common::error::BuildError;
pub use policy::Policy;
