use once_cell::sync::Lazy;
use parking_lot::Mutex;
use scheduled_thread_pool::ScheduledThreadPool;
use std::sync::{Arc, Weak};

const RESIZER_THREAD_NAME: &str = "stripemap-resizer-{}";

// Every live map holds a strong reference; the last one to go shuts the pool
// down, and the next map to be built starts a fresh one.
static RESIZER_POOL: Lazy<Mutex<Weak<ScheduledThreadPool>>> =
    Lazy::new(|| Mutex::new(Weak::new()));

/// Returns the pool that runs background resizes, starting it if no map is
/// currently holding it.
pub(crate) fn resizer_pool() -> Arc<ScheduledThreadPool> {
    let mut shared = RESIZER_POOL.lock();
    if let Some(pool) = shared.upgrade() {
        return pool;
    }

    // NOTE: On some platforms, `num_cpus::get` may return 0. In that case, use 1.
    let num_threads = num_cpus::get().max(1);
    let pool = Arc::new(
        ScheduledThreadPool::builder()
            .num_threads(num_threads)
            .thread_name_pattern(RESIZER_THREAD_NAME)
            .build(),
    );
    *shared = Arc::downgrade(&pool);
    pool
}
