use std::sync::Arc;

use futures::stream::BoxStream;

use crate::app::error::Result;
use crate::client::{HttpNotificationClient, NotificationClient};
use crate::config::Config;
use crate::sync::push::{ws_channel, ChannelEvent};
use crate::sync::SyncSession;

pub struct AppContext {
    pub config: Config,
    pub client: Arc<dyn NotificationClient + Send + Sync>,
}

impl AppContext {
    /// Load the config file (creating it if missing) and build the client.
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        Self::new(config)
    }

    pub fn new(config: Config) -> Result<Self> {
        let client: Arc<dyn NotificationClient + Send + Sync> =
            Arc::new(HttpNotificationClient::new(&config.server)?);
        Ok(Self { config, client })
    }

    /// Start a fresh sync session sharing this context's client.
    pub fn session(&self, session_id: impl Into<String>) -> SyncSession {
        SyncSession::init(session_id, self.client.clone(), &self.config)
    }

    pub async fn connect_push(&self) -> Result<BoxStream<'static, ChannelEvent>> {
        ws_channel::connect(
            &self.config.server.ws_endpoint(),
            self.config.server.token.as_deref(),
        )
        .await
    }

    /// Absolute web URL for an in-app path such as `/notes/42`.
    pub fn web_url(&self, path: &str) -> String {
        format!("{}{}", self.config.server.web_url.trim_end_matches('/'), path)
    }
}
