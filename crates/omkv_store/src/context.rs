//! Deadline and cancellation propagation for store calls.

use crate::error::{StoreError, StoreResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cooperative cancellation flag shared between a caller and its
/// in-flight store calls.
///
/// Cloning the token shares the underlying flag; tripping any clone
/// cancels all calls carrying it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a new, untripped token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the token. Calls observing it fail with [`StoreError::Cancelled`].
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true if the token has been tripped.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Per-call context carried through every store operation.
///
/// A context bounds a call with an optional deadline and an optional
/// cancellation token. Backends must check the context before applying
/// any mutation, so a call that fails with [`StoreError::DeadlineExceeded`]
/// or [`StoreError::Cancelled`] has not been partially applied by that
/// backend call.
///
/// # Example
///
/// ```rust
/// use omkv_store::Context;
/// use std::time::Duration;
///
/// let ctx = Context::with_timeout(Duration::from_secs(5));
/// assert!(ctx.check().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl Context {
    /// Creates a context with no deadline and no cancellation.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Creates a context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// Creates a context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Attaches a cancellation token to this context.
    #[must_use]
    pub fn cancelled_by(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails if the context has been cancelled or its deadline has passed.
    ///
    /// Cancellation is checked before the deadline.
    pub fn check(&self) -> StoreResult<()> {
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(StoreError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}
