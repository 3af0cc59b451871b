pub(crate) mod constants;
pub(crate) mod resizer;
pub(crate) mod thread_pool;
