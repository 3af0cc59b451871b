//! Provides a thread-safe, concurrent hash map with per-bucket locks.

mod base_map;
mod builder;
mod map;

pub use {builder::MapBuilder, map::StripedHashMap};
