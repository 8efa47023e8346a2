use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of notification kinds the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewNote,
    NoteLiked,
    PostReply,
    PostUpvote,
    SemesterChat,
    NoteDownloaded,
    AdminMessage,
}

impl NotificationType {
    pub const ALL: [NotificationType; 7] = [
        NotificationType::NewNote,
        NotificationType::NoteLiked,
        NotificationType::PostReply,
        NotificationType::PostUpvote,
        NotificationType::SemesterChat,
        NotificationType::NoteDownloaded,
        NotificationType::AdminMessage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::NewNote => "new_note",
            NotificationType::NoteLiked => "note_liked",
            NotificationType::PostReply => "post_reply",
            NotificationType::PostUpvote => "post_upvote",
            NotificationType::SemesterChat => "semester_chat",
            NotificationType::NoteDownloaded => "note_downloaded",
            NotificationType::AdminMessage => "admin_message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Reference to the domain object a notification points at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPayload {
    pub note_id: Option<String>,
    pub post_id: Option<String>,
    pub semester: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sender: Option<SenderRef>,
    #[serde(default)]
    pub payload: NotificationPayload,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Notification {
    pub fn new(id: impl Into<String>, kind: NotificationType) -> Self {
        Self {
            id: id.into(),
            kind,
            read: false,
            created_at: Utc::now(),
            sender: None,
            payload: NotificationPayload::default(),
            title: None,
            message: None,
        }
    }

    pub fn is_unread(&self) -> bool {
        !self.read
    }

    pub fn sender_name(&self) -> &str {
        self.sender
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or("Someone")
    }

    /// Fold a newer view of the same notification into this one.
    ///
    /// Incoming fields win, except `read` which never goes back to false.
    pub fn merge_from(&mut self, incoming: &Notification) {
        debug_assert_eq!(self.id, incoming.id);
        let read = self.read || incoming.read;
        *self = incoming.clone();
        self.read = read;
    }
}

/// Server-side counters returned by `GET /notifications/count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCount {
    pub unread: u64,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_serialization() {
        for kind in NotificationType::ALL {
            let serialized = serde_json::to_string(&kind).unwrap();
            assert_eq!(serialized, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_deserialize_wire_shape() {
        let json = r#"{
            "id": "n1",
            "type": "note_liked",
            "read": false,
            "createdAt": "2024-03-01T10:00:00Z",
            "sender": { "id": "u7", "name": "Ada" },
            "payload": { "noteId": "42" },
            "title": "Linear Algebra notes"
        }"#;

        let n: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(n.id, "n1");
        assert_eq!(n.kind, NotificationType::NoteLiked);
        assert!(n.is_unread());
        assert_eq!(n.sender_name(), "Ada");
        assert_eq!(n.payload.note_id.as_deref(), Some("42"));
        assert!(n.payload.post_id.is_none());
        assert!(n.message.is_none());
    }

    #[test]
    fn test_minimal_notification_defaults() {
        let json = r#"{"id":"n2","type":"admin_message","createdAt":"2024-03-01T10:00:00Z"}"#;
        let n: Notification = serde_json::from_str(json).unwrap();
        assert!(!n.read);
        assert_eq!(n.sender_name(), "Someone");
        assert_eq!(n.payload, NotificationPayload::default());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"id":"n3","type":"friend_request","createdAt":"2024-03-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<Notification>(json).is_err());
    }

    #[test]
    fn test_merge_keeps_read_flag() {
        let mut local = Notification::new("n1", NotificationType::PostReply);
        local.read = true;

        let mut incoming = local.clone();
        incoming.read = false;
        incoming.title = Some("Updated".into());

        local.merge_from(&incoming);
        assert!(local.read);
        assert_eq!(local.title.as_deref(), Some("Updated"));
    }

    #[test]
    fn test_merge_takes_incoming_read() {
        let mut local = Notification::new("n1", NotificationType::PostReply);
        let mut incoming = local.clone();
        incoming.read = true;

        local.merge_from(&incoming);
        assert!(local.read);
    }
}
