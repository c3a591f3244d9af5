//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag.
///
/// Cloning yields a handle to the same flag: one side calls [`cancel`](Self::cancel),
/// the transfer polls [`is_cancelled`](Self::is_cancelled) before each
/// directory, before each file and on every progress tick. Once set the flag
/// stays set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag nobody else holds, so it can never be signaled.
    pub fn never() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
