use chrono::{DateTime, Utc};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::app::{AppContext, NoticeboardError, Result};
use crate::client::{FetchParams, NotificationFilter};
use crate::domain::presentation::{format_relative_time, icon_for_type, message_for};
use crate::domain::Notification;
use crate::sync::{SyncEvent, SyncSession};

fn session_id() -> String {
    format!("cli-{}", std::process::id())
}

pub(crate) fn format_line(notification: &Notification, now: DateTime<Utc>) -> String {
    let marker = if notification.is_unread() { "●" } else { " " };
    format!(
        "{} {} {}  ({}, {})",
        marker,
        icon_for_type(notification.kind),
        message_for(notification),
        format_relative_time(notification.created_at, now),
        notification.id
    )
}

pub async fn list(ctx: &AppContext, unread: bool, page: u32, limit: u32) -> Result<()> {
    let session = ctx.session(session_id());
    let coordinator = session.coordinator();

    let params = FetchParams {
        page: page.max(1),
        limit,
        filter: if unread {
            NotificationFilter::Unread
        } else {
            NotificationFilter::All
        },
    };
    coordinator.fetch_notifications(params).await?;

    let snapshot = coordinator.snapshot();
    if snapshot.notifications.is_empty() {
        println!("No notifications");
        return Ok(());
    }

    let now = Utc::now();
    for notification in &snapshot.notifications {
        println!("{}", format_line(notification, now));
    }
    println!(
        "\n{} unread, {} total",
        snapshot.unread_count, snapshot.total_count
    );
    Ok(())
}

pub async fn count(ctx: &AppContext) -> Result<()> {
    let session = ctx.session(session_id());
    let count = session.coordinator().fetch_notification_count().await?;
    println!("{} unread, {} total", count.unread, count.total);
    Ok(())
}

pub async fn mark_read(ctx: &AppContext, id: &str) -> Result<()> {
    let session = ctx.session(session_id());
    session.coordinator().mark_as_read(id).await?;
    println!("Marked {} as read", id);
    Ok(())
}

pub async fn mark_all_read(ctx: &AppContext) -> Result<()> {
    let session = ctx.session(session_id());
    session.coordinator().mark_all_as_read().await?;
    println!("Marked all notifications as read");
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: &str) -> Result<()> {
    let session = ctx.session(session_id());
    session.coordinator().delete_notification(id).await?;
    println!("Deleted {}", id);
    Ok(())
}

/// Click handling from the terminal: mark read, then open the web target.
pub async fn open(ctx: &AppContext, id: &str) -> Result<()> {
    let session = ctx.session(session_id());
    let coordinator = session.coordinator();
    coordinator.fetch_notifications(FetchParams::default()).await?;

    let notification = coordinator
        .read(|store| store.get(id).cloned())
        .ok_or_else(|| NoticeboardError::NotificationNotFound(id.to_string()))?;

    let mut opened = Ok(());
    let path = coordinator
        .handle_notification_click(&notification, |path| {
            opened = open::that(ctx.web_url(path));
        })
        .await;

    let url = ctx.web_url(&path);
    opened?;
    println!("Opened {}", url);
    Ok(())
}

/// Run a full session (polling, push and event output) until Ctrl-C.
pub async fn watch(ctx: &AppContext, no_push: bool) -> Result<()> {
    let session = ctx.session(session_id());
    let mut events = session.coordinator().subscribe();

    if let Err(e) = session
        .coordinator()
        .fetch_notifications(FetchParams::default())
        .await
    {
        eprintln!("Initial load failed: {}", e.user_message());
    } else {
        print_recent(&session);
    }

    if ctx.config.push.enabled && !no_push {
        match ctx.connect_push().await {
            Ok(channel) => session.attach_push(channel),
            Err(e) => warn!("Push channel unavailable, polling only: {}", e),
        }
    }

    session.start().await;
    info!("Watching for notifications, press Ctrl-C to stop");

    let mut last_unread = session.coordinator().unread_count();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(SyncEvent::NotificationReceived(n)) => {
                    println!("{}", format_line(&n, Utc::now()));
                }
                Ok(SyncEvent::CountChanged { unread, total }) if unread != last_unread => {
                    last_unread = unread;
                    println!("[{} unread, {} total]", unread, total);
                }
                Ok(SyncEvent::Error(message)) => eprintln!("! {}", message),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Dropped {} sync events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    }

    session.dispose();
    println!("Stopped");
    Ok(())
}

fn print_recent(session: &SyncSession) {
    let snapshot = session.coordinator().snapshot();
    let now = Utc::now();
    for notification in snapshot.notifications.iter().take(5) {
        println!("{}", format_line(notification, now));
    }
    println!(
        "[{} unread, {} total]",
        snapshot.unread_count, snapshot.total_count
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NotificationType, SenderRef};
    use chrono::Duration;

    #[test]
    fn test_format_line() {
        let now = Utc::now();
        let mut n = Notification::new("42", NotificationType::PostReply);
        n.created_at = now - Duration::minutes(5);
        n.sender = Some(SenderRef {
            id: "u1".into(),
            name: Some("Ana".into()),
        });

        let line = format_line(&n, now);
        assert!(line.starts_with("●"));
        assert!(line.contains("Ana replied to your post"));
        assert!(line.ends_with("(5m ago, 42)"));

        n.read = true;
        assert!(format_line(&n, now).starts_with(' '));
    }
}
