//! Caller-driven cancellation and deadlines
//!
//! Store round-trips are the only suspension points of an operation, so the
//! engine checks the token right before each one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::{EngineError, EngineResult};

/// Cloneable cancellation handle with an optional deadline
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<(Instant, Duration)>,
}

impl CancelToken {
    /// A token that only ends when [`cancel`](Self::cancel) is called
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().timeout_after(timeout)
    }

    /// Adds (or replaces) a deadline, keeping the shared cancel flag
    pub fn timeout_after(mut self, timeout: Duration) -> Self {
        self.deadline = Some((Instant::now() + timeout, timeout));
        self
    }

    pub(crate) fn from_timeout(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(timeout) => Self::with_timeout(timeout),
            None => Self::new(),
        }
    }

    /// Cancels this token and every clone of it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|(deadline, _)| Instant::now() >= deadline)
    }

    /// Fails if the token was cancelled or its deadline passed
    pub fn check(&self) -> EngineResult<()> {
        if self.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        match self.deadline {
            Some((deadline, timeout)) if Instant::now() >= deadline => {
                Err(EngineError::TimedOut(timeout))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes() {
        assert!(CancelToken::new().check().is_ok());
        assert!(CancelToken::with_timeout(Duration::from_secs(60)).check().is_ok());
    }

    #[test]
    fn cancel_reaches_clones() {
        let token = CancelToken::new();
        let clone = token.clone();

        token.cancel();

        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(EngineError::Cancelled)));
    }

    #[test]
    fn expired_deadline_times_out() {
        let token = CancelToken::with_timeout(Duration::ZERO);

        assert!(token.is_expired());
        assert!(matches!(token.check(), Err(EngineError::TimedOut(d)) if d == Duration::ZERO));
    }

    #[test]
    fn no_timeout_means_no_deadline() {
        let token = CancelToken::from_timeout(None);
        assert!(!token.is_expired());
    }
}
