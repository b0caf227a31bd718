//! Per-call cancellation.
//!
//! An RPC framework hands each call a cancellable context. [`CancellationToken`] is the
//! bridge's view of it: the transport cancels it, and the subprocess runner as well as
//! the stream adapters observe it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A thread-safe cancellation flag shared by all parties of a single call.
///
/// Clones observe the same state. The token starts out not cancelled and, once cancelled,
/// stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a new token in the non-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Return `true` if [`cancel()`](Self::cancel()) was called on this token or any of its clones.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Trait for types that can check for cancellation and return an error if cancelled.
pub trait CancellationPoint {
    /// Check for cancellation and return [`Error::Cancelled`](crate::Error::Cancelled) if it was requested.
    fn check(&self) -> Result<(), crate::Error>;
}

impl CancellationPoint for CancellationToken {
    fn check(&self) -> Result<(), crate::Error> {
        if self.is_cancelled() {
            Err(crate::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancelling_a_clone_cancels_all_of_them() {
        let token = CancellationToken::new();
        let observer = token.clone();
        token.cancel();
        assert!(observer.is_cancelled());
        assert!(matches!(observer.check(), Err(crate::Error::Cancelled)));
    }

    #[test]
    fn cancellation_is_visible_across_threads() {
        let token = CancellationToken::new();
        let remote = token.clone();
        std::thread::spawn(move || remote.cancel()).join().unwrap();
        assert!(token.is_cancelled());
    }
}
