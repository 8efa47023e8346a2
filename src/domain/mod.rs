pub mod notification;
pub mod presentation;
pub mod state;

pub use notification::{
    Notification, NotificationCount, NotificationPayload, NotificationType, SenderRef,
};
pub use state::{CircuitState, SyncState};
