use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum NoticeboardError {
    /// No response at all: connect failure, timeout, dropped connection.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by server")]
    RateLimited,

    #[error("Authentication failed (HTTP {status})")]
    Auth { status: u16 },

    #[error("Server error (HTTP {status})")]
    Server { status: u16 },

    #[error("Request rejected (HTTP {status}): {message}")]
    Validation { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Returned without touching the network while the circuit is open.
    #[error("Notification service unavailable")]
    Unavailable,

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A newer list pull was issued before this one completed.
    #[error("Superseded by a newer request")]
    Superseded,

    #[error("Notification not found: {0}")]
    NotificationNotFound(String),

    #[error("{0}")]
    Other(String),
}

/// How the backoff controller should treat a failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    RateLimited,
    AuthFailure,
}

impl NoticeboardError {
    /// Map an HTTP status that is not a success to the error taxonomy.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => NoticeboardError::RateLimited,
            401 | 403 => NoticeboardError::Auth { status },
            500..=599 => NoticeboardError::Server { status },
            _ => NoticeboardError::Validation {
                status,
                message: body,
            },
        }
    }

    /// `None` means the error does not feed the backoff controller.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            NoticeboardError::Network(_)
            | NoticeboardError::Server { .. }
            | NoticeboardError::Decode(_)
            | NoticeboardError::WebSocket(_) => Some(FailureKind::Transient),
            NoticeboardError::RateLimited => Some(FailureKind::RateLimited),
            NoticeboardError::Auth { .. } => Some(FailureKind::AuthFailure),
            _ => None,
        }
    }

    /// Short, dismissible text for the UI layer.
    pub fn user_message(&self) -> String {
        match self {
            NoticeboardError::Network(_) => {
                "Could not reach the server. Retrying shortly.".to_string()
            }
            NoticeboardError::Server { .. } | NoticeboardError::Decode(_) => {
                "The server had a problem loading notifications. Retrying shortly.".to_string()
            }
            NoticeboardError::RateLimited => {
                "Notifications are temporarily unavailable. Please try again later.".to_string()
            }
            NoticeboardError::Auth { .. } => {
                "Your session has expired. Please sign in again.".to_string()
            }
            NoticeboardError::Validation { message, .. } if !message.is_empty() => message.clone(),
            NoticeboardError::Unavailable => {
                "Notification service unavailable. Retrying later.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for NoticeboardError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => NoticeboardError::from_status(status.as_u16(), err.to_string()),
            None => NoticeboardError::Network(err.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for NoticeboardError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        NoticeboardError::WebSocket(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NoticeboardError>;
