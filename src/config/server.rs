use serde::Deserialize;

/// Where the notification API and the realtime channel live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the REST API (default: http://localhost:3000/api)
    pub base_url: String,

    /// Base URL of the web app, used to build click-through links
    pub web_url: String,

    /// WebSocket endpoint of the realtime channel (None = derived from base_url)
    pub ws_url: Option<String>,

    /// Bearer token; `NOTICEBOARD_TOKEN` overrides it
    pub token: Option<String>,

    /// Per-request timeout in seconds (default: 10)
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            web_url: "http://localhost:3000".to_string(),
            ws_url: None,
            token: None,
            timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Realtime endpoint, falling back to `<base_url with ws scheme>/ws`.
    pub fn ws_endpoint(&self) -> String {
        if let Some(ws) = &self.ws_url {
            return ws.clone();
        }

        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/ws", base)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum notifications kept in memory; older ones are truncated (default: 100)
    pub max_items: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_items: 100 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Subscribe to the realtime channel in `watch` mode (default: true)
    pub enabled: bool,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_endpoint_derivation() {
        let mut config = ServerConfig {
            base_url: "https://campus.example.com/api/".into(),
            ..Default::default()
        };
        assert_eq!(config.ws_endpoint(), "wss://campus.example.com/api/ws");

        config.base_url = "http://localhost:3000/api".into();
        assert_eq!(config.ws_endpoint(), "ws://localhost:3000/api/ws");

        config.ws_url = Some("wss://push.example.com/socket".into());
        assert_eq!(config.ws_endpoint(), "wss://push.example.com/socket");
    }
}
