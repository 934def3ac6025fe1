//! The sweep cancellation token.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::info;

/// Raised once to stop a sweep; shared as `Arc<CancellationToken>`.
///
/// The engine polls [`is_cancelled`](Self::is_cancelled) between batches and
/// races its sleeps and permit waits against [`cancelled`](Self::cancelled).
/// Only the first reason is kept.
#[derive(Default)]
pub struct CancellationToken {
    raised: AtomicBool,
    reason: RwLock<Option<String>>,
    notify: Notify,
}

impl CancellationToken {
    /// Creates a token that has not been raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the token. Later calls are no-ops.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .raised
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let reason = reason.into();
        info!(reason = %reason, "Sweep cancellation requested");
        *self.reason.write() = Some(reason);
        self.notify.notify_waiters();
    }

    /// Whether the token has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// The reason given to the first [`cancel`](Self::cancel).
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Completes once the token is raised.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed.
            let notified = self.notify.notified();
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_fresh_token_is_not_raised() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel("ctrl-c");
        token.cancel("deadline");

        assert!(token.is_cancelled());
        assert_eq!(token.reason().as_deref(), Some("ctrl-c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_waiter_wakes() {
        let token = Arc::new(CancellationToken::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let token = Arc::clone(&token);
                tokio::spawn(async move { token.cancelled().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel("stop");

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter woke")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_raised() {
        let token = CancellationToken::new();
        token.cancel("done");
        token.cancelled().await;
    }
}
