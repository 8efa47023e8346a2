pub mod http_client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::{Notification, NotificationCount};

pub use http_client::HttpNotificationClient;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationFilter {
    #[default]
    All,
    Unread,
    Read,
}

impl NotificationFilter {
    /// Query value; `All` is expressed by omitting the parameter.
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            NotificationFilter::All => None,
            NotificationFilter::Unread => Some("unread"),
            NotificationFilter::Read => Some("read"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchParams {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
    pub filter: NotificationFilter,
}

impl Default for FetchParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            filter: NotificationFilter::All,
        }
    }
}

/// One page of `GET /notifications`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
    pub total: u64,
    pub page: u32,
    pub has_more: bool,
}

/// The notification REST endpoints.
#[async_trait]
pub trait NotificationClient {
    async fn list(&self, params: &FetchParams) -> Result<NotificationPage>;
    async fn count(&self) -> Result<NotificationCount>;
    async fn mark_read(&self, id: &str) -> Result<()>;
    async fn mark_all_read(&self) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod fake;
