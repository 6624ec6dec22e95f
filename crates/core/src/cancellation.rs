use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation handle shared between a long-running loop and
/// whoever drives it.
///
/// Loops check the flag once per outer iteration; in-flight numeric work is
/// never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    stop: Arc<AtomicBool>,
}

impl CancellationFlag {
    /// Creates a flag in the "running" state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Every clone observes the request.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Returns the underlying shared boolean, for signal handlers.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }
}
