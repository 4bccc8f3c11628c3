//! WebSocket upgrade multiplexing.
//!
//! All WebSocket endpoints share one upgrade path. An upgrade request is
//! matched against the handler table by its exact path (query ignored):
//!
//! ```text
//! GET /users  Upgrade: websocket
//!        ↓ lookup("/users")
//! 101 Switching Protocols          ← handshake answered by hyper
//!        ↓ hyper::upgrade::on
//! conn #N connected                ← counter bumped, connect logged
//!        ↓
//! handler(WebSocket, Request)      ← once per connection
//! ```
//!
//! Unknown paths and malformed handshakes get no response at all: the
//! dispatcher fails the request and hyper drops the transport.
//!
//! Paths with parameters (`/rooms/:id`) cannot carry WebSocket handlers.

mod socket;

pub use socket::WebSocket;
pub use tokio_tungstenite::tungstenite::Message;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use bytes::Bytes;
use http::header::{CONNECTION, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_VERSION, UPGRADE};
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::handler::BoxedWsHandler;
use crate::method::Method;
use crate::request::Request;

/// The WebSocket handler table and its connection counter.
#[derive(Default)]
pub struct Multiplexer {
    handlers: HashMap<String, BoxedWsHandler>,
    connections: Arc<AtomicU64>,
}

impl Multiplexer {
    /// Registers `handler` for `path`. The last registration for a path wins;
    /// returns `true` when an earlier handler was replaced.
    pub(crate) fn insert(&mut self, path: &str, handler: BoxedWsHandler) -> bool {
        self.handlers.insert(path.to_owned(), handler).is_some()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.handlers.contains_key(path)
    }

    /// Registered paths, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Number of connections upgraded so far.
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    /// Answers an upgrade request and schedules the handler on `sessions`.
    ///
    /// An `Err` means the transport must be torn down without a response.
    pub(crate) fn accept(
        &self,
        mut req: hyper::Request<Incoming>,
        remote_addr: SocketAddr,
        sessions: &TaskTracker,
    ) -> Result<http::Response<Full<Bytes>>> {
        let path = req.uri().path().to_owned();

        let Some(handler) = self.handlers.get(&path) else {
            error!(target: "ws", peer = %remote_addr, %path, "no websocket handler, dropping connection");
            return Err(Error::NoSocketHandler(path));
        };

        let accept_key = match handshake_key(req.headers()) {
            Ok(key) => derive_accept_key(key.as_bytes()),
            Err(e) => {
                error!(target: "ws", peer = %remote_addr, %path, "{e}");
                return Err(e);
            }
        };

        let on_upgrade = hyper::upgrade::on(&mut req);
        let (parts, _body) = req.into_parts();
        let request = Request::from_parts(parts, Method::Get, remote_addr, Instant::now());

        let handler = Arc::clone(handler);
        let connections = Arc::clone(&self.connections);
        sessions.spawn(async move {
            let upgraded = match on_upgrade.await {
                Ok(upgraded) => upgraded,
                Err(e) => {
                    warn!(target: "ws", peer = %remote_addr, %path, "upgrade failed: {e}");
                    return;
                }
            };
            let stream = WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None).await;

            let id = connections.fetch_add(1, Ordering::Relaxed) + 1;
            info!(target: "ws", conn = id, peer = %remote_addr, %path, "connected");

            let socket = WebSocket::new(id, path, stream);
            handler.call(socket, request).await;
        });

        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
        let headers = response.headers_mut();
        headers.insert(CONNECTION, HeaderValue::from_static("upgrade"));
        headers.insert(UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(
            SEC_WEBSOCKET_ACCEPT,
            HeaderValue::from_str(&accept_key).map_err(|_| Error::Handshake("unencodable accept key"))?,
        );
        Ok(response)
    }
}

/// True for an HTTP/1.1 `GET` asking to switch to the WebSocket protocol.
pub(crate) fn is_upgrade_request<B>(req: &hyper::Request<B>) -> bool {
    req.method() == http::Method::GET
        && header_has_token(req.headers(), CONNECTION, "upgrade")
        && header_has_token(req.headers(), UPGRADE, "websocket")
}

fn handshake_key(headers: &HeaderMap) -> Result<&HeaderValue> {
    if headers.get(SEC_WEBSOCKET_VERSION).map(HeaderValue::as_bytes) != Some(&b"13"[..]) {
        return Err(Error::Handshake("unsupported sec-websocket-version"));
    }
    headers
        .get(SEC_WEBSOCKET_KEY)
        .ok_or(Error::Handshake("missing sec-websocket-key"))
}

fn header_has_token(headers: &HeaderMap, name: http::header::HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case(token))
}
