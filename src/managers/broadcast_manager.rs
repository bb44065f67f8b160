// BroadcastChannelManager: Centralized tokio broadcast channel management
// Single Responsibility: Broadcast channel lifecycle and subscription

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::playback::{PlaybackSnapshot, PlaybackStatus};

/// Status change published to the UI shell
///
/// `error` carries the single user-facing message when a session start
/// fails and the manager falls back to idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: PlaybackStatus,
    pub error: Option<String>,
}

/// Manages the session's tokio broadcast channels
///
/// # Channel Types
/// - Position: playback snapshots published by the polling task and after
///   every timeline operation
/// - Status: status transitions, including the start-failure message
///
/// Senders are created up front, so publishing never fails; a send with no
/// subscribers is simply dropped.
pub struct BroadcastChannelManager {
    position: broadcast::Sender<PlaybackSnapshot>,
    status: broadcast::Sender<StatusUpdate>,
}

impl BroadcastChannelManager {
    /// Create both channels with `capacity` buffered messages each
    ///
    /// Subscribers that fall more than `capacity` messages behind observe a
    /// lag and skip ahead.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (position, _) = broadcast::channel(capacity);
        let (status, _) = broadcast::channel(capacity);
        Self { position, status }
    }

    // ========================================================================
    // POSITION CHANNEL
    // ========================================================================

    pub fn publish_position(&self, snapshot: PlaybackSnapshot) {
        let _ = self.position.send(snapshot);
    }

    pub fn subscribe_position(&self) -> broadcast::Receiver<PlaybackSnapshot> {
        self.position.subscribe()
    }

    // ========================================================================
    // STATUS CHANNEL
    // ========================================================================

    pub fn publish_status(&self, status: PlaybackStatus, error: Option<String>) {
        let _ = self.status.send(StatusUpdate { status, error });
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusUpdate> {
        self.status.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(position: f64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: PlaybackStatus::Playing,
            position,
            paused_offset: 0.0,
            duration: 10.0,
            replay_count: 1,
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let manager = BroadcastChannelManager::new(4);
        manager.publish_position(snapshot(1.0));
        manager.publish_status(PlaybackStatus::Ready, None);
    }

    #[test]
    fn test_each_subscriber_receives_every_message() {
        let manager = BroadcastChannelManager::new(4);
        let mut first = manager.subscribe_position();
        let mut second = manager.subscribe_position();

        manager.publish_position(snapshot(2.0));
        assert_eq!(first.try_recv().unwrap().position, 2.0);
        assert_eq!(second.try_recv().unwrap().position, 2.0);
    }

    #[test]
    fn test_status_update_carries_error() {
        let manager = BroadcastChannelManager::new(4);
        let mut rx = manager.subscribe_status();
        manager.publish_status(PlaybackStatus::Idle, Some("failed".to_string()));

        let update = rx.try_recv().unwrap();
        assert_eq!(update.status, PlaybackStatus::Idle);
        assert_eq!(update.error.as_deref(), Some("failed"));
    }
}
