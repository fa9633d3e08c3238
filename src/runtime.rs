//! Process-wide compute setup, performed once at startup.

use std::sync::OnceLock;

static COMPUTE_THREADS: OnceLock<usize> = OnceLock::new();

/// Configure the global rayon pool and return its thread count.
///
/// Only the first call has any effect. Later calls, and calls made after
/// rayon has already started its default pool, report the existing size.
pub fn init_compute(threads: Option<usize>) -> usize {
    *COMPUTE_THREADS.get_or_init(|| {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("xview-compute-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        match builder.build_global() {
            Ok(()) => {
                tracing::info!(threads = rayon::current_num_threads(), "compute pool ready")
            }
            Err(err) => tracing::warn!(
                error = %err,
                threads = rayon::current_num_threads(),
                "compute pool already initialized"
            ),
        }
        rayon::current_num_threads()
    })
}
