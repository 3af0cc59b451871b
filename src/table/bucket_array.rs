use super::bucket::{Bucket, Node};
use crate::common::concurrent::constants::HASH_INDEX_MASK;

use parking_lot::{Mutex, MutexGuard};

pub(crate) struct BucketArray<K, V> {
    buckets: Box<[Mutex<Bucket<K, V>>]>,
}

impl<K, V> BucketArray<K, V> {
    /// Allocates `length` empty buckets. `length` must be a power of two.
    pub(crate) fn with_length(length: usize) -> Self {
        assert!(length.is_power_of_two());

        let buckets = std::iter::repeat_with(|| Mutex::new(Bucket::default()))
            .take(length)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self { buckets }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn buckets(&self) -> &[Mutex<Bucket<K, V>>] {
        &self.buckets
    }

    /// Folds `hash` to a non-negative value and reduces it modulo the number of
    /// buckets.
    #[inline]
    pub(crate) fn index(&self, hash: u64) -> usize {
        ((hash & HASH_INDEX_MASK) % self.buckets.len() as u64) as usize
    }

    #[inline]
    pub(crate) fn lock_bucket(&self, hash: u64) -> MutexGuard<'_, Bucket<K, V>> {
        self.buckets[self.index(hash)].lock()
    }

    /// Relinks a node detached from another table onto the head of the chain its
    /// cached hash maps to in this table.
    pub(crate) fn splice(&self, node: Box<Node<K, V>>) {
        self.lock_bucket(node.hash()).push_front(node);
    }
}

/// The number of entries a table of `length` buckets may hold before it must
/// grow.
pub(crate) fn threshold(length: usize, load_factor: f32) -> usize {
    ((length as f64 * load_factor as f64) as usize).max(1)
}
