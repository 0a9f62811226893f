//! Per-session realtime fan-out
//!
//! Each session gets a tokio broadcast channel; the orchestration layer
//! publishes activity tags and turn events, the SSE endpoint subscribes.
//! Channels are created lazily and dropped with the hub; there is no
//! server-side session registry beyond the live senders.

use crate::stage_machine::StageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Events pushed to subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEvent {
    /// Sent once on subscribe.
    Init { session_id: String },
    /// A sidebar-activity tag changed (analysis triggered/complete,
    /// summary progress, `_error` variants).
    Activity { tag: String },
    /// A turn completed: the reply text is available.
    Reply { stage: StageId, text: String },
    /// The per-session message cap was hit.
    Limit { show_booking: bool },
}

/// Session-keyed broadcast channels.
///
/// Lock ordering is trivial: the map lock is never held across an await.
pub struct BroadcastHub {
    channels: RwLock<HashMap<String, broadcast::Sender<ActivityEvent>>>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to a session's event stream, creating the channel if this is
    /// the first subscriber.
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<ActivityEvent> {
        if let Ok(channels) = self.channels.read() {
            if let Some(tx) = channels.get(session_id) {
                return tx.subscribe();
            }
        }

        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to a session's subscribers. A session with no
    /// subscribers is a no-op, not an error.
    pub fn publish(&self, session_id: &str, event: ActivityEvent) {
        let Ok(channels) = self.channels.read() else {
            return;
        };
        if let Some(tx) = channels.get(session_id) {
            // send only fails when every receiver is gone
            let _ = tx.send(event);
        }
    }

    /// Publish a sidebar-activity tag change. Empty tags are not broadcast.
    pub fn publish_activity(&self, session_id: &str, tag: &str) {
        if tag.is_empty() {
            return;
        }
        self.publish(
            session_id,
            ActivityEvent::Activity {
                tag: tag.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let hub = BroadcastHub::new();
        let mut rx = hub.subscribe("s-1");

        hub.publish_activity("s-1", "company_analysis_triggered");

        let event = rx.recv().await.unwrap();
        match event {
            ActivityEvent::Activity { tag } => assert_eq!(tag, "company_analysis_triggered"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_activity_tags_are_suppressed() {
        let hub = BroadcastHub::new();
        let mut rx = hub.subscribe("s-1");

        hub.publish_activity("s-1", "");
        hub.publish_activity("s-1", "summary_generation_started");

        let event = rx.recv().await.unwrap();
        match event {
            ActivityEvent::Activity { tag } => assert_eq!(tag, "summary_generation_started"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let hub = BroadcastHub::new();
        // No subscribe call; must not panic or error.
        hub.publish_activity("nobody-here", "company_analysis_complete");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let hub = BroadcastHub::new();
        let mut rx_a = hub.subscribe("a");
        let _rx_b = hub.subscribe("b");

        hub.publish_activity("b", "company_analysis_triggered");
        hub.publish_activity("a", "summary_generation_complete");

        let event = rx_a.recv().await.unwrap();
        match event {
            ActivityEvent::Activity { tag } => assert_eq!(tag, "summary_generation_complete"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn event_serialization_uses_snake_case_tags() {
        let event = ActivityEvent::Limit { show_booking: true };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "limit");
        assert_eq!(value["show_booking"], true);
    }
}
