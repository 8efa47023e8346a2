//! WebSocket realtime channel.
//!
//! Frames are JSON text of the form `{"event": "...", "data": ...}`. Anything
//! else is dropped. The stream ends when the server closes the connection or
//! the socket errors.

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::app::{NoticeboardError, Result};
use crate::sync::push::ChannelEvent;

/// Open the channel at `url`, authenticating the upgrade with `token`.
pub async fn connect(url: &str, token: Option<&str>) -> Result<BoxStream<'static, ChannelEvent>> {
    let mut request = url.into_client_request()?;
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| NoticeboardError::WebSocket(format!("invalid token: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    info!("Connecting to push channel: {}", url);
    let (socket, _) = connect_async(request).await?;
    info!("Connected to push channel");

    let events = stream::unfold(socket, |mut socket| async move {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = parse_frame(text.as_str()) {
                        return Some((event, socket));
                    }
                }
                // Pings are answered by tungstenite while we keep reading
                Some(Ok(Message::Close(_))) | None => {
                    info!("Push channel closed by server");
                    return None;
                }
                Some(Err(e)) => {
                    warn!("Push channel error: {}", e);
                    return None;
                }
                Some(Ok(_)) => {}
            }
        }
    });

    Ok(events.boxed())
}

pub(crate) fn parse_frame(text: &str) -> Option<ChannelEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!("Dropping unparsable push frame: {}", e);
            None
        }
    }
}
