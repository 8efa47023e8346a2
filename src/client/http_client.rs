use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::app::{NoticeboardError, Result};
use crate::client::{FetchParams, NotificationClient, NotificationPage};
use crate::config::ServerConfig;
use crate::domain::NotificationCount;

pub struct HttpNotificationClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpNotificationClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent("noticeboard/0.1.0")
            .build()
            .map_err(|e| NoticeboardError::Other(format!("Failed to build HTTP client: {}", e)))?;

        // A trailing slash keeps `join` from replacing the last path segment
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();

        tracing::debug!("Request failed with HTTP {}", status);
        Err(NoticeboardError::from_status(status.as_u16(), body))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(self.request(Method::GET, url)).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl NotificationClient for HttpNotificationClient {
    async fn list(&self, params: &FetchParams) -> Result<NotificationPage> {
        let mut url = self.endpoint("notifications")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &params.page.to_string());
            query.append_pair("limit", &params.limit.to_string());
            if let Some(filter) = params.filter.as_query() {
                query.append_pair("filter", filter);
            }
        }
        self.get_json(url).await
    }

    async fn count(&self) -> Result<NotificationCount> {
        let url = self.endpoint("notifications/count")?;
        self.get_json(url).await
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        let mut url = self.endpoint("notifications")?;
        url.path_segments_mut()
            .map_err(|_| NoticeboardError::Other("Base URL cannot hold a path".into()))?
            .push(id)
            .push("read");
        self.send(self.request(Method::PUT, url)).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<()> {
        let url = self.endpoint("notifications/mark-all-read")?;
        self.send(self.request(Method::PUT, url)).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut url = self.endpoint("notifications")?;
        url.path_segments_mut()
            .map_err(|_| NoticeboardError::Other("Base URL cannot hold a path".into()))?
            .push(id);
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
