use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::sync::Notify;

/// Shutdown signaling for the daemon's worker tasks.
///
/// Combines `Notify` with an `AtomicBool`: `notify_waiters()` only wakes
/// tasks already parked in `notified()`, so the flag is checked first to
/// close the window where a shutdown issued between polls would be missed.
pub(super) struct ShutdownSignal {
    notify: Notify,
    shutdown: AtomicBool,
}

impl ShutdownSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            notify: Notify::new(),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Wait for the timeout or a shutdown signal, whichever comes first.
    /// Returns `true` when shutdown was requested.
    pub async fn wait_timeout_or_shutdown(&self, timeout: Duration) -> bool {
        if self.shutdown.load(Ordering::Relaxed) {
            return true;
        }

        tokio::select! {
            _ = self.notify.notified() => true,
            _ = tokio::time::sleep(timeout) => {
                self.shutdown.load(Ordering::Relaxed)
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Set the shutdown flag and wake all waiting tasks.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_false_on_plain_timeout() {
        let signal = ShutdownSignal::new();
        assert!(
            !signal
                .wait_timeout_or_shutdown(Duration::from_millis(1))
                .await
        );
    }

    #[tokio::test]
    async fn shutdown_before_wait_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.shutdown();
        assert!(
            signal
                .wait_timeout_or_shutdown(Duration::from_secs(60))
                .await
        );
        assert!(signal.is_shutdown());
    }

    #[tokio::test]
    async fn shutdown_wakes_a_parked_waiter() {
        let signal = ShutdownSignal::new();
        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait_timeout_or_shutdown(Duration::from_secs(60)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.shutdown();
        assert!(waiter.await.unwrap());
    }
}
