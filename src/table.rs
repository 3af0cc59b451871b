//! Lock-striped chaining hash tables.
//!
//! A table is an array of buckets whose length is always a power of two. Every
//! bucket owns one singly-linked chain of nodes and sits behind its own
//! [`Mutex`][parking-lot-mutex], so operations on keys that land in different
//! buckets never contend with each other.
//!
//! Tables are never resized in place. Growing a map allocates a new
//! [`BucketArray`] of twice the length and moves every node into it by
//! relinking: the `Box`ed node is detached from the old chain and pushed onto a
//! new chain, so values are never cloned or reallocated. Each old bucket is
//! drained under its own lock and then left _forwarded_, which tells any thread
//! that still holds a reference to the old array that it must retry against the
//! newly published one.
//!
//! [parking-lot-mutex]: https://docs.rs/parking_lot/latest/parking_lot/type.Mutex.html

pub(crate) mod bucket;
pub(crate) mod bucket_array;

pub(crate) use bucket_array::BucketArray;

use std::hash::{BuildHasher, Hash, Hasher};

pub(crate) fn hash<K, H>(build_hasher: &H, key: &K) -> u64
where
    K: ?Sized + Hash,
    H: BuildHasher,
{
    let mut hasher = build_hasher.build_hasher();
    key.hash(&mut hasher);

    hasher.finish()
}
