//! Thread-marshaling seams the engine dispatches through.
//!
//! The engine never blocks the calling thread and never assumes a specific
//! executor; it only requires something that can run a boxed closure on the
//! device's designated core thread, and something that can run a boxed
//! closure back on the caller's origin thread. `mngt-engine` supplies the
//! concrete implementations (a dedicated OS thread running a single-threaded
//! Tokio runtime, and a handle back to the caller's own runtime).

/// A unit of work posted to the core thread's single-consumer FIFO queue.
pub type CoreJob = Box<dyn FnOnce() + Send>;

/// Marshals jobs onto the device's single core thread. Implementations must
/// be lossless and preserve FIFO order relative to other jobs posted from the
/// same thread.
pub trait CoreDispatch: Send + Sync + 'static {
    fn post_to_core(&self, job: CoreJob);

    /// Debug-only thread-affinity check: a `CoreDispatch` backed by a real
    /// dedicated thread should `debug_assert_eq!` the calling thread against
    /// its own. The default no-op keeps test dispatchers (which run jobs
    /// inline on whatever thread calls them) honest without forcing them to
    /// track an identity they don't have.
    fn assert_on_core_thread(&self) {}
}

/// Marshals the caller-completion callback back onto the thread that invoked
/// the original entry point.
pub trait OriginDispatch: Send + Sync + 'static {
    fn post_to_origin(&self, job: CoreJob);
}
