use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::sync::Notify;

/// A one-shot completion signal shared across every bridge a fan-out command
/// was sent to (§4.3: "Register a pending-control entry on each bridge
/// sharing a single `ack_event`"). The first bridge to observe a matching
/// ACK wins; the rest are left to their own cleanup loops to time out or
/// deduplicate.
#[derive(Debug, Default)]
pub struct AckEvent {
    result: Mutex<Option<bool>>,
    notify: Notify,
}

impl AckEvent {
    pub fn new() -> Arc<Self> {
        Arc::new(AckEvent::default())
    }

    /// Record the outcome, if none has been recorded yet, and wake waiters.
    pub async fn set(&self, success: bool) {
        let mut result = self.result.lock().await;
        if result.is_none() {
            *result = Some(success);
        }
        self.notify.notify_waiters();
    }

    /// Wait up to `timeout` for an outcome. Returns `None` on timeout.
    pub async fn wait(&self, timeout: Duration) -> Option<bool> {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if let Some(result) = *self.result.lock().await {
            return Some(result);
        }
        tokio::select! {
            _ = notified => *self.result.lock().await,
            _ = tokio::time::sleep(timeout) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_once_set() {
        let event = AckEvent::new();
        event.set(true).await;
        assert_eq!(event.wait(Duration::from_millis(10)).await, Some(true));
    }

    #[tokio::test]
    async fn wait_times_out_when_never_set() {
        let event = AckEvent::new();
        assert_eq!(event.wait(Duration::from_millis(10)).await, None);
    }

    #[tokio::test]
    async fn concurrent_waiter_is_woken_by_set() {
        let event = AckEvent::new();
        let waiter_event = Arc::clone(&event);
        let waiter = tokio::spawn(async move { waiter_event.wait(Duration::from_secs(1)).await });

        tokio::time::sleep(Duration::from_millis(5)).await;
        event.set(false).await;

        assert_eq!(waiter.await.unwrap(), Some(false));
    }
}
