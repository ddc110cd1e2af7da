use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use cync_model::DeviceId;

use crate::AckEvent;

/// A single outbound control packet awaiting acknowledgement (§3 "Control
/// message (pending)", §4.2 "callback-cleanup loop").
#[derive(Debug, Clone)]
pub struct PendingControl {
    pub msg_id: u8,
    pub device_id: Option<DeviceId>,
    pub payload: Vec<u8>,
    pub sent_at: Instant,
    pub retries: u32,
    pub ack: Arc<AckEvent>,
}

impl PendingControl {
    pub fn new(msg_id: u8, device_id: Option<DeviceId>, payload: Vec<u8>, ack: Arc<AckEvent>) -> Self {
        PendingControl {
            msg_id,
            device_id,
            payload,
            sent_at: Instant::now(),
            retries: 0,
            ack,
        }
    }
}

/// Retry every 500 ms (§4.2).
pub const RETRY_INTERVAL: Duration = Duration::from_millis(500);
/// Drop anything older than 30 s (§4.2).
pub const MAX_AGE: Duration = Duration::from_secs(30);

/// A bridge session's table of outstanding control acks, keyed by `msg_id`
/// (the inner struct's `ctrl_id`).
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<u8, PendingControl>,
}

/// What the callback-cleanup loop should do with one entry on a tick.
pub enum CleanupAction {
    /// Resend the payload unchanged, bumping the retry counter.
    Resend(Vec<u8>),
    /// The entry aged out past [`MAX_AGE`]; it has been removed and its
    /// `ack` left unset (callers may choose to fire it with `false`).
    Expired(PendingControl),
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: PendingControl) {
        self.entries.insert(entry.msg_id, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Complete a pending entry identified by the ACK's `msg_id`, firing its
    /// `ack` event and removing it from the table.
    pub async fn complete(&mut self, msg_id: u8, success: bool) -> Option<PendingControl> {
        let entry = self.entries.remove(&msg_id)?;
        entry.ack.set(success).await;
        Some(entry)
    }

    /// Run one callback-cleanup tick (§4.2): entries older than [`MAX_AGE`]
    /// are dropped; entries whose last send was more than [`RETRY_INTERVAL`]
    /// ago, and that have not exceeded `max_retries`, are due for a resend.
    pub fn tick(&mut self, max_retries: u32, now: Instant) -> Vec<CleanupAction> {
        let mut actions = Vec::new();
        let mut expired_ids = Vec::new();

        for (msg_id, entry) in self.entries.iter_mut() {
            if now.duration_since(entry.sent_at) > MAX_AGE {
                expired_ids.push(*msg_id);
                continue;
            }
            if now.duration_since(entry.sent_at) > RETRY_INTERVAL && entry.retries < max_retries {
                entry.retries += 1;
                entry.sent_at = now;
                actions.push(CleanupAction::Resend(entry.payload.clone()));
            }
        }

        for msg_id in expired_ids {
            if let Some(entry) = self.entries.remove(&msg_id) {
                actions.push(CleanupAction::Expired(entry));
            }
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(msg_id: u8) -> PendingControl {
        PendingControl::new(msg_id, Some(7), vec![0x01], AckEvent::new())
    }

    #[tokio::test]
    async fn complete_fires_ack_and_removes_entry() {
        let mut table = PendingTable::new();
        let pending = entry(1);
        let ack = Arc::clone(&pending.ack);
        table.insert(pending);

        let completed = table.complete(1, true).await.unwrap();
        assert_eq!(completed.msg_id, 1);
        assert!(table.is_empty());
        assert_eq!(ack.wait(Duration::from_millis(10)).await, Some(true));
    }

    #[test]
    fn tick_resends_after_retry_interval() {
        let mut table = PendingTable::new();
        let mut pending = entry(2);
        pending.sent_at = Instant::now() - Duration::from_millis(600);
        table.insert(pending);

        let actions = table.tick(3, Instant::now());
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], CleanupAction::Resend(_)));
    }

    #[test]
    fn tick_expires_after_max_age() {
        let mut table = PendingTable::new();
        let mut pending = entry(3);
        pending.sent_at = Instant::now() - Duration::from_secs(31);
        table.insert(pending);

        let actions = table.tick(3, Instant::now());
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], CleanupAction::Expired(_)));
        assert!(table.is_empty());
    }

    #[test]
    fn tick_does_not_resend_beyond_max_retries() {
        let mut table = PendingTable::new();
        let mut pending = entry(4);
        pending.retries = 3;
        pending.sent_at = Instant::now() - Duration::from_millis(600);
        table.insert(pending);

        let actions = table.tick(3, Instant::now());
        assert!(actions.is_empty());
    }
}
