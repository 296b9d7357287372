//! The push feed the watcher subscribes to.

use std::future::Future;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::error::WatchError;

/// A source of text messages that can be (re)connected.
///
/// Each successful [`Feed::connect`] yields a fresh stream for one connection.
/// The stream ending or yielding an error means the connection is gone.
/// Non-websocket transports report their io failures as [`WatchError::Io`].
pub trait Feed {
    type Stream: Stream<Item = Result<String, WatchError>> + Unpin;

    /// Where this feed connects, for status lines and logs.
    fn endpoint(&self) -> &str;

    fn connect(&mut self) -> impl Future<Output = Result<Self::Stream, WatchError>>;
}

/// Websocket subscription, e.g. `wss://<id>.requestcatcher.com/init-client`.
///
/// The client never sends application messages; ping/pong is left to
/// tungstenite.
#[derive(Debug, Clone)]
pub struct WebSocketFeed {
    url: String,
}

impl WebSocketFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Feed for WebSocketFeed {
    type Stream = BoxStream<'static, Result<String, WatchError>>;

    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&mut self) -> Result<Self::Stream, WatchError> {
        let (ws_stream, response) = connect_async(self.url.as_str()).await?;
        debug!(url = %self.url, status = %response.status(), "websocket handshake complete");

        let messages = ws_stream.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(data)) => Some(Ok(String::from_utf8_lossy(&data).into_owned())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "close frame received");
                    None
                }
                // Ping / Pong / raw frames
                Ok(_) => None,
                Err(e) => Some(Err(WatchError::from(e))),
            }
        });
        Ok(messages.boxed())
    }
}
