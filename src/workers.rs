//! Worker pool sizing for the parallel stages

/// Run `op` on a dedicated rayon pool of `workers` threads, or on the global
/// pool when no size is configured.
pub fn run_with_workers<R, F>(workers: Option<usize>, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match workers.filter(|&n| n > 0) {
        Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
            Ok(pool) => pool.install(op),
            Err(e) => {
                tracing::warn!("Could not build a {}-thread pool ({}), using the global pool", n, e);
                op()
            }
        },
        None => op(),
    }
}
