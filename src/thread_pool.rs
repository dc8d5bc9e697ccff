//! Shared thread pool for parallel replica generation.

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
static THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// Get or initialize the pool used by all resamplers.
///
/// One thread per logical CPU, named `bootstats-<n>`. Returns `None` if
/// the pool could not be spawned, in which case rayon's global pool is used.
#[cfg(feature = "parallel")]
fn thread_pool() -> Option<&'static ThreadPool> {
    THREAD_POOL
        .get_or_init(|| {
            match rayon::ThreadPoolBuilder::new()
                .thread_name(|i| format!("bootstats-{i}"))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(err) => {
                    tracing::warn!(%err, "failed to build thread pool, using rayon global pool");
                    None
                }
            }
        })
        .as_ref()
}

/// Run `op` inside the shared pool.
#[cfg(feature = "parallel")]
pub(crate) fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match thread_pool() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R,
{
    op()
}
