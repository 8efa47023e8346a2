//! Pure display helpers for notifications.
//!
//! Nothing here touches the store; the coordinator uses
//! [`url_for_notification`] to resolve click targets and the CLI uses the
//! rest for rendering.

use chrono::{DateTime, Utc};

use super::{Notification, NotificationType};

pub fn icon_for_type(kind: NotificationType) -> &'static str {
    match kind {
        NotificationType::NewNote => "📝",
        NotificationType::NoteLiked => "❤️",
        NotificationType::PostReply => "💬",
        NotificationType::PostUpvote => "👍",
        NotificationType::SemesterChat => "👥",
        NotificationType::NoteDownloaded => "📥",
        NotificationType::AdminMessage => "📢",
    }
}

/// Format `at` relative to `now`, e.g. "just now", "5m ago", "3d ago".
///
/// Anything older than a week falls back to a calendar date. Timestamps in
/// the future (clock skew) are treated as "just now".
pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = now.signed_duration_since(at).num_seconds();

    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86400 {
        format!("{}h ago", secs / 3600)
    } else if secs < 7 * 86400 {
        format!("{}d ago", secs / 86400)
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}

pub fn message_for(notification: &Notification) -> String {
    if let Some(message) = &notification.message {
        return message.clone();
    }

    let sender = notification.sender_name();
    let title = notification.title.as_deref();

    match notification.kind {
        NotificationType::NewNote => match title {
            Some(t) => format!("{} uploaded a new note: \"{}\"", sender, t),
            None => format!("{} uploaded a new note", sender),
        },
        NotificationType::NoteLiked => match title {
            Some(t) => format!("{} liked your note \"{}\"", sender, t),
            None => format!("{} liked your note", sender),
        },
        NotificationType::PostReply => match title {
            Some(t) => format!("{} replied to your post \"{}\"", sender, t),
            None => format!("{} replied to your post", sender),
        },
        NotificationType::PostUpvote => match title {
            Some(t) => format!("{} upvoted your post \"{}\"", sender, t),
            None => format!("{} upvoted your post", sender),
        },
        NotificationType::SemesterChat => match &notification.payload.semester {
            Some(s) => format!("{} sent a message in the semester {} chat", sender, s),
            None => format!("{} sent a message in your semester chat", sender),
        },
        NotificationType::NoteDownloaded => match title {
            Some(t) => format!("{} downloaded your note \"{}\"", sender, t),
            None => format!("{} downloaded your note", sender),
        },
        NotificationType::AdminMessage => title
            .map(|t| format!("Announcement: {}", t))
            .unwrap_or_else(|| "New announcement from the admins".to_string()),
    }
}

/// Navigation target for a notification, derived only from its type and
/// payload. Missing payload ids fall back to the notification list.
pub fn url_for_notification(notification: &Notification) -> String {
    let payload = &notification.payload;

    match notification.kind {
        NotificationType::NewNote
        | NotificationType::NoteLiked
        | NotificationType::NoteDownloaded => match &payload.note_id {
            Some(id) => format!("/notes/{}", id),
            None => "/notes".to_string(),
        },
        NotificationType::PostReply | NotificationType::PostUpvote => match &payload.post_id {
            Some(id) => format!("/community/posts/{}", id),
            None => "/community".to_string(),
        },
        NotificationType::SemesterChat => match &payload.semester {
            Some(s) => format!("/chat/semester/{}", s),
            None => "/chat".to_string(),
        },
        NotificationType::AdminMessage => "/notifications".to_string(),
    }
}
