//! Realtime push delivery.
//!
//! A channel is any stream of [`ChannelEvent`]s; [`ws_channel::connect`]
//! provides the WebSocket one. The listener forwards valid notification
//! envelopes to the coordinator and ignores everything else.

pub mod ws_channel;

use std::sync::{Arc, Mutex};

use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::Notification;
use crate::sync::coordinator::SyncCoordinator;

/// Event name carrying notification envelopes.
pub const NOTIFICATION_EVENT: &str = "notification";

const NEW_NOTIFICATION: &str = "new_notification";

/// One named event as delivered by the realtime channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: Notification,
}

/// Extract the notification from a `new_notification` envelope.
pub fn parse_event(event: &ChannelEvent) -> Option<Notification> {
    if event.event != NOTIFICATION_EVENT {
        return None;
    }

    let envelope = Envelope::deserialize(&event.data).ok()?;
    if envelope.kind != NEW_NOTIFICATION {
        return None;
    }
    Some(envelope.data)
}

pub struct PushListener {
    coordinator: Arc<SyncCoordinator>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PushListener {
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        Self {
            coordinator,
            task: Mutex::new(None),
        }
    }

    /// Start consuming `channel`, replacing any current subscription.
    ///
    /// The subscription ends on its own when the channel does.
    pub fn attach<S>(&self, mut channel: S)
    where
        S: Stream<Item = ChannelEvent> + Send + Unpin + 'static,
    {
        let coordinator = self.coordinator.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = channel.next().await {
                match parse_event(&event) {
                    Some(notification) => {
                        coordinator.merge_pushed(notification);
                    }
                    None => debug!("Ignoring push event '{}'", event.event),
                }
            }
            info!("Push channel ended, relying on polling");
        });

        if let Some(previous) = self.task().replace(handle) {
            previous.abort();
            debug!("Replaced existing push subscription");
        }
    }

    pub fn detach(&self) {
        if let Some(handle) = self.task().take() {
            handle.abort();
            info!("Push listener detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.task()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    fn task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for PushListener {
    fn drop(&mut self) {
        if let Some(handle) = self.task().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeClient;
    use crate::sync::backoff::BackoffPolicy;
    use futures::channel::mpsc;
    use serde_json::json;

    fn coordinator() -> Arc<SyncCoordinator> {
        Arc::new(SyncCoordinator::new(
            "s",
            Arc::new(FakeClient::new()),
            BackoffPolicy::default(),
            100,
        ))
    }

    fn envelope(id: &str, read: bool) -> ChannelEvent {
        ChannelEvent {
            event: NOTIFICATION_EVENT.to_string(),
            data: json!({
                "type": "new_notification",
                "data": {
                    "id": id,
                    "type": "post_reply",
                    "read": read,
                    "createdAt": "2024-03-01T12:00:00Z",
                    "payload": { "postId": "p1" }
                }
            }),
        }
    }

    async fn settle(listener: &PushListener) {
        for _ in 0..50 {
            if !listener.is_attached() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_parse_event_accepts_envelope() {
        let n = parse_event(&envelope("1", false)).unwrap();
        assert_eq!(n.id, "1");
        assert_eq!(n.payload.post_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_parse_event_ignores_other_events() {
        let mut other = envelope("1", false);
        other.event = "chat_message".to_string();
        assert!(parse_event(&other).is_none());

        let wrong_type = ChannelEvent {
            event: NOTIFICATION_EVENT.to_string(),
            data: json!({
                "type": "deleted",
                "data": { "id": "1", "type": "new_note", "createdAt": "2024-03-01T12:00:00Z" }
            }),
        };
        assert!(parse_event(&wrong_type).is_none());

        let malformed = ChannelEvent {
            event: NOTIFICATION_EVENT.to_string(),
            data: json!({ "type": "new_notification", "data": 42 }),
        };
        assert!(parse_event(&malformed).is_none());
    }

    #[tokio::test]
    async fn test_attach_merges_valid_events() {
        let c = coordinator();
        let listener = PushListener::new(c.clone());
        let events = vec![
            envelope("1", false),
            ChannelEvent {
                event: "typing".to_string(),
                data: serde_json::Value::Null,
            },
            envelope("1", false),
            envelope("2", true),
        ];

        listener.attach(futures::stream::iter(events));
        settle(&listener).await;

        let snap = c.snapshot();
        assert_eq!(snap.notifications.len(), 2);
        assert_eq!(snap.unread_count, 1);
        assert!(!listener.is_attached());
    }

    #[tokio::test]
    async fn test_reattach_replaces_subscription() {
        let c = coordinator();
        let listener = PushListener::new(c.clone());
        let (tx1, rx1) = mpsc::unbounded();
        let (tx2, rx2) = mpsc::unbounded();

        listener.attach(rx1);
        listener.attach(rx2);
        let _ = tx1.unbounded_send(envelope("old", false));
        tx2.unbounded_send(envelope("new", false)).unwrap();

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let ids: Vec<String> = c.snapshot().notifications.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["new"]);
        assert!(listener.is_attached());
    }

    #[tokio::test]
    async fn test_detach_stops_delivery() {
        let c = coordinator();
        let listener = PushListener::new(c.clone());
        let (tx, rx) = mpsc::unbounded();

        listener.attach(rx);
        listener.detach();
        assert!(!listener.is_attached());

        let _ = tx.unbounded_send(envelope("1", false));
        tokio::task::yield_now().await;
        assert!(c.snapshot().notifications.is_empty());
    }
}
