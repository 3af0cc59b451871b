use crate::{
    common::concurrent::resizer::Resizer,
    table::{self, bucket::Bucket, bucket_array, BucketArray},
};

use crossbeam_utils::CachePadded;
use parking_lot::{Mutex, RwLock};
use std::{
    borrow::Borrow,
    hash::{BuildHasher, Hash},
    ops::ControlFlow,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

pub(crate) struct BaseMap<K, V, S> {
    pub(crate) inner: Arc<Inner<K, V, S>>,
}

impl<K, V, S> Clone for BaseMap<K, V, S> {
    /// Makes a clone of this shared map.
    ///
    /// This operation is cheap as it only creates thread-safe reference counted
    /// pointers to the shared internal data structures.
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, S> BaseMap<K, V, S>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: BuildHasher + Send + Sync + 'static,
{
    pub(crate) fn new(
        name: Option<String>,
        table_length: usize,
        load_factor: f32,
        build_hasher: S,
    ) -> Self {
        Self {
            inner: Arc::new(Inner::new(name, table_length, load_factor, build_hasher)),
        }
    }

    pub(crate) fn insert(&self, key: K, value: V) -> Option<V> {
        let (previous, needs_resize) = self.inner.insert(key, value);
        if needs_resize {
            Inner::try_schedule_resize(&self.inner);
        }
        previous
    }
}

pub(crate) struct Inner<K, V, S> {
    name: Option<String>,
    table: RwLock<Arc<BucketArray<K, V>>>,
    unkeyed: Mutex<Option<V>>,
    len: CachePadded<AtomicUsize>,
    threshold: AtomicUsize,
    initial_length: usize,
    load_factor: f32,
    build_hasher: S,
    resizer: Resizer,
}

impl<K, V, S> Inner<K, V, S> {
    fn new(name: Option<String>, table_length: usize, load_factor: f32, build_hasher: S) -> Self {
        Self {
            name,
            table: RwLock::new(Arc::new(BucketArray::with_length(table_length))),
            unkeyed: Mutex::new(None),
            len: CachePadded::new(AtomicUsize::new(0)),
            threshold: AtomicUsize::new(bucket_array::threshold(table_length, load_factor)),
            initial_length: table_length,
            load_factor,
            build_hasher,
            resizer: Resizer::default(),
        }
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn initial_capacity(&self) -> usize {
        self.initial_length
    }

    pub(crate) fn load_factor(&self) -> f32 {
        self.load_factor
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.build_hasher
    }

    /// The number of entries, including the unkeyed one. Advisory: it does not
    /// wait for operations in flight on other buckets.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    /// The bucket count of the published table, after any in-flight resize.
    pub(crate) fn capacity(&self) -> usize {
        self.resizer.wait_until_stable();
        self.current_table().len()
    }

    #[inline]
    fn current_table(&self) -> Arc<BucketArray<K, V>> {
        Arc::clone(&self.table.read())
    }

    /// Runs `op` on the bucket `hash` maps to, holding only that bucket's lock.
    ///
    /// The table is read after waiting out any resize or clear. If the bucket
    /// turns out to be forwarded, the table was replaced between the read and the
    /// lock, so the lookup starts over.
    fn with_bucket<T>(&self, hash: u64, op: impl FnOnce(&mut Bucket<K, V>) -> T) -> T {
        loop {
            self.resizer.wait_until_stable();
            let table = self.current_table();
            let mut bucket = table.lock_bucket(hash);
            if !bucket.is_forwarded() {
                return op(&mut *bucket);
            }
        }
    }

    /// Visits every entry of the table, taking one bucket lock at a time.
    ///
    /// Meeting a forwarded bucket means the table is being replaced under the
    /// scan. The partial result is discarded and the scan restarts on the next
    /// published table, so no entry is missed or seen twice.
    fn scan_table<T>(
        &self,
        mut init: impl FnMut() -> T,
        mut visit: impl FnMut(&mut T, &K, &V) -> ControlFlow<()>,
    ) -> T {
        'restart: loop {
            self.resizer.wait_until_stable();
            let table = self.current_table();
            let mut acc = init();

            for slot in table.buckets() {
                let bucket = slot.lock();
                if bucket.is_forwarded() {
                    continue 'restart;
                }
                for (k, v) in bucket.iter() {
                    if visit(&mut acc, k, v).is_break() {
                        return acc;
                    }
                }
            }

            return acc;
        }
    }

    #[cfg(feature = "logging")]
    fn log_prefix(&self) -> String {
        self.name
            .as_deref()
            .map(|name| format!("[{name}] "))
            .unwrap_or_default()
    }
}

//
// The unkeyed slot. None of these touch the table or the resizer.
//
impl<K, V, S> Inner<K, V, S> {
    pub(crate) fn get_unkeyed(&self) -> Option<V>
    where
        V: Clone,
    {
        self.unkeyed.lock().clone()
    }

    pub(crate) fn contains_unkeyed(&self) -> bool {
        self.unkeyed.lock().is_some()
    }

    pub(crate) fn insert_unkeyed(&self, value: V) -> Option<V> {
        let mut slot = self.unkeyed.lock();
        let previous = slot.replace(value);
        if previous.is_none() {
            self.len.fetch_add(1, Ordering::SeqCst);
        }
        previous
    }

    pub(crate) fn remove_unkeyed(&self) -> Option<V> {
        let mut slot = self.unkeyed.lock();
        let previous = slot.take();
        if previous.is_some() {
            self.len.fetch_sub(1, Ordering::SeqCst);
        }
        previous
    }
}

impl<K, V, S> Inner<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    pub(crate) fn hash<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        table::hash(&self.build_hasher, key)
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let hash = self.hash(key);
        self.with_bucket(hash, |bucket| bucket.get(hash, key).cloned())
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(key);
        self.with_bucket(hash, |bucket| bucket.get(hash, key).is_some())
    }

    /// Returns the previous value and whether the map has outgrown its
    /// threshold. The size check happens after the bucket lock is released.
    fn insert(&self, key: K, value: V) -> (Option<V>, bool) {
        let hash = self.hash(&key);
        let previous = self.with_bucket(hash, |bucket| {
            let previous = bucket.insert(hash, key, value);
            if previous.is_none() {
                self.len.fetch_add(1, Ordering::SeqCst);
            }
            previous
        });

        let needs_resize =
            previous.is_none() && self.len() > self.threshold.load(Ordering::Acquire);
        (previous, needs_resize)
    }

    pub(crate) fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(key);
        self.with_bucket(hash, |bucket| {
            let previous = bucket.remove(hash, key);
            if previous.is_some() {
                self.len.fetch_sub(1, Ordering::SeqCst);
            }
            previous
        })
    }
}

impl<K, V, S> Inner<K, V, S> {
    /// Checks the unkeyed slot, then every bucket. Not an atomic snapshot: an
    /// entry inserted into an already scanned bucket during the scan is not seen.
    pub(crate) fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        if self.unkeyed.lock().as_ref() == Some(value) {
            return true;
        }

        self.scan_table(
            || false,
            |found, _, v| {
                if v == value {
                    *found = true;
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )
    }

    pub(crate) fn keys(&self) -> Vec<Option<K>>
    where
        K: Clone,
    {
        let mut keys = Vec::with_capacity(self.len());
        if self.contains_unkeyed() {
            keys.push(None);
        }
        keys.extend(self.collect_table(|k, _| Some(k.clone())));
        keys
    }

    pub(crate) fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let mut values = Vec::with_capacity(self.len());
        values.extend(self.get_unkeyed());
        values.extend(self.collect_table(|_, v| v.clone()));
        values
    }

    pub(crate) fn entries(&self) -> Vec<(Option<K>, V)>
    where
        K: Clone,
        V: Clone,
    {
        let mut entries = Vec::with_capacity(self.len());
        entries.extend(self.get_unkeyed().map(|v| (None, v)));
        entries.extend(self.collect_table(|k, v| (Some(k.clone()), v.clone())));
        entries
    }

    fn collect_table<T>(&self, mut f: impl FnMut(&K, &V) -> T) -> Vec<T> {
        self.scan_table(Vec::new, |acc, k, v| {
            acc.push(f(k, v));
            ControlFlow::Continue(())
        })
    }

    /// Replaces the table with an empty one of the same length and empties the
    /// unkeyed slot.
    ///
    /// Every old bucket is forwarded under its own lock, so operations that were
    /// already inside a bucket finish first, and operations that read the old
    /// table late retry against the new one. The size counter drops by exactly
    /// the number of discarded entries.
    pub(crate) fn clear(&self) {
        let section = self.resizer.clearing_section();

        let old = self.current_table();
        let mut discarded = 0;
        let chains = old
            .buckets()
            .iter()
            .map(|slot| {
                let chain = slot.lock().forward();
                discarded += chain.len();
                chain
            })
            .collect::<Vec<_>>();

        *self.table.write() = Arc::new(BucketArray::with_length(old.len()));
        self.len.fetch_sub(discarded, Ordering::SeqCst);

        let unkeyed = self.remove_unkeyed();

        drop(section);

        #[cfg(feature = "logging")]
        log::trace!(
            "{}Cleared {} entries",
            self.log_prefix(),
            discarded + usize::from(unkeyed.is_some())
        );

        // Run the destructors of keys and values outside the exclusive section.
        drop(chains);
        drop(unkeyed);
    }

    /// Doubles the table. Runs on the resizer thread pool, after
    /// `try_schedule_resize` has moved the resizer to `Resizing`.
    ///
    /// Each old bucket is drained under its own lock and left forwarded; each
    /// drained node is relinked into the new table under the destination
    /// bucket's lock. The new table becomes visible with a single swap of the
    /// table reference, and waiters are released after that.
    fn resize(&self) {
        let section = self.resizer.resizing_section();

        #[cfg(feature = "logging")]
        let started = std::time::Instant::now();

        let old = self.current_table();
        let new_length = old.len() << 1;
        let new = BucketArray::with_length(new_length);
        self.threshold.store(
            bucket_array::threshold(new_length, self.load_factor),
            Ordering::Release,
        );

        for slot in old.buckets() {
            let chain = slot.lock().forward();
            for node in chain {
                new.splice(node);
            }
        }

        *self.table.write() = Arc::new(new);
        drop(section);

        #[cfg(feature = "logging")]
        log::debug!(
            "{}Resized the table from {} to {} buckets ({} entries) in {:?}",
            self.log_prefix(),
            old.len(),
            new_length,
            self.len(),
            started.elapsed()
        );
    }
}

impl<K, V, S> Inner<K, V, S>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    /// Starts a background resize unless one is already in flight. The job only
    /// holds a weak reference, so it does nothing if the map is gone by the
    /// time it runs.
    fn try_schedule_resize(this: &Arc<Self>) {
        if !this.resizer.try_begin_resize() {
            #[cfg(feature = "logging")]
            log::trace!(
                "{}Threshold exceeded while a resize is already in flight",
                this.log_prefix()
            );
            return;
        }

        #[cfg(feature = "logging")]
        log::debug!(
            "{}Scheduled a resize: {} entries exceed the threshold of {}",
            this.log_prefix(),
            this.len(),
            this.threshold.load(Ordering::Acquire)
        );

        let weak = Arc::downgrade(this);
        this.resizer.execute(move || {
            if let Some(inner) = weak.upgrade() {
                inner.resize();
            }
        });
    }
}
