//! Cancellation for fleet runs
//!
//! The same token type serves as the caller's external cancel handle and as
//! the orchestrator's internal stop signal shared by every runner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::Notify;

/// Why a run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Cancelled by the caller
    Cancelled,
    /// The run deadline elapsed
    DeadlineExceeded,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    reason: OnceLock<StopReason>,
    notify: Notify,
}

/// Token for cancelling a run
///
/// Clones share state. Once cancelled a token stays cancelled, and the first
/// recorded [`StopReason`] wins.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a new cancellation token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels with [`StopReason::Cancelled`]
    pub fn cancel(&self) {
        self.cancel_with(StopReason::Cancelled);
    }

    /// Cancels with the given reason unless already cancelled
    pub fn cancel_with(&self, reason: StopReason) {
        let _ = self.inner.reason.set(reason);
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Checks if the token has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// The first reason recorded, if cancelled
    #[must_use]
    pub fn reason(&self) -> Option<StopReason> {
        self.inner.reason.get().copied()
    }

    /// Completes once the token is cancelled
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
