//! The socket handed to WebSocket handlers.

use futures_util::{SinkExt, StreamExt};
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, info};

use crate::error::Result;

pub(crate) type Stream = WebSocketStream<TokioIo<Upgraded>>;

/// Longest message excerpt written to the log.
const PREVIEW: usize = 120;

/// A WebSocket connection that logs its traffic.
///
/// Every outgoing message is logged under the connection id, and the close
/// of the connection is logged exactly once: on a close frame from the
/// peer, at the end of the stream, on [`close`](WebSocket::close), or when
/// the socket is dropped, whichever happens first.
pub struct WebSocket {
    id: u64,
    path: String,
    stream: Stream,
    closed: bool,
}

impl WebSocket {
    pub(crate) fn new(id: u64, path: String, stream: Stream) -> Self {
        Self { id, path, stream, closed: false }
    }

    /// Connection id, as it appears in the logs.
    pub fn id(&self) -> u64 { self.id }

    /// The path the connection was upgraded on.
    pub fn path(&self) -> &str { &self.path }

    pub async fn send(&mut self, message: Message) -> Result<()> {
        info!(target: "ws", conn = self.id, "sent {}", preview(&message));
        self.stream.send(message).await?;
        Ok(())
    }

    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.send(Message::text(text.into())).await
    }

    /// Serializes `value` and sends it as a text message.
    pub async fn send_json(&mut self, value: &impl Serialize) -> Result<()> {
        let text = serde_json::to_string(value).map_err(std::io::Error::from)?;
        self.send_text(text).await
    }

    /// Next message from the peer; `None` once the connection is gone.
    ///
    /// Close frames are still returned so the handler can see them; the
    /// underlying stream answers them on its own.
    pub async fn recv(&mut self) -> Option<Result<Message>> {
        match self.stream.next().await {
            Some(Ok(Message::Close(frame))) => {
                self.log_close(frame.as_ref());
                Some(Ok(Message::Close(frame)))
            }
            Some(Ok(message)) => {
                debug!(target: "ws", conn = self.id, "received {}", preview(&message));
                Some(Ok(message))
            }
            Some(Err(e)) => Some(Err(e.into())),
            None => {
                self.log_close(None);
                None
            }
        }
    }

    /// Sends a close frame and waits for the peer to acknowledge it.
    pub async fn close(mut self) -> Result<()> {
        let result = self.stream.close(None).await;
        self.log_close(None);
        result.map_err(Into::into)
    }

    fn log_close(&mut self, frame: Option<&CloseFrame>) {
        if self.closed {
            return;
        }
        self.closed = true;
        match frame {
            Some(frame) => info!(
                target: "ws",
                conn = self.id,
                code = u16::from(frame.code),
                reason = frame.reason.as_str(),
                "closed"
            ),
            None => info!(target: "ws", conn = self.id, "closed"),
        }
    }
}

impl Drop for WebSocket {
    fn drop(&mut self) {
        self.log_close(None);
    }
}

fn preview(message: &Message) -> String {
    match message {
        Message::Text(text) => {
            let text = text.as_str();
            match text.char_indices().nth(PREVIEW) {
                Some((end, _)) => format!("{}…", &text[..end]),
                None => text.to_owned(),
            }
        }
        Message::Binary(data) => format!("<{} bytes>", data.len()),
        Message::Ping(_) => "<ping>".to_owned(),
        Message::Pong(_) => "<pong>".to_owned(),
        Message::Close(_) => "<close>".to_owned(),
        Message::Frame(_) => "<frame>".to_owned(),
    }
}
