//! HTTP server, port selection and graceful shutdown.
//!
//! # Lifecycle
//!
//! ```text
//! Starting ──(port taken: try port+1)──▶ Starting
//!    │
//!    ▼
//! Listening ──(SIGINT / SIGTERM)──▶ Draining ──▶ Exited
//! ```
//!
//! While draining the server stops accepting, asks every open HTTP
//! connection to finish its current request, and waits for connections and
//! WebSocket sessions to end. If that takes longer than the grace period
//! the shutdown is reported as [`Shutdown::Forced`] and whatever is still
//! running is dropped with the runtime.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use console::style;
use futures_util::FutureExt;
use http::StatusCode;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::method::Method;
use crate::middleware::{cors, envelope};
use crate::net;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::ws;

/// How a [`Server`] stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shutdown {
    /// Every connection finished within the grace period.
    Drained,
    /// The grace period ran out with connections still open.
    Forced,
}

impl Shutdown {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Drained => ExitCode::SUCCESS,
            Self::Forced => ExitCode::FAILURE,
        }
    }
}

/// A bound, not yet serving, HTTP server.
pub struct Server {
    listener: TcpListener,
    addr: SocketAddr,
    grace: Duration,
}

impl Server {
    /// Binds `config.host:config.port`, moving up one port at a time while
    /// the port is taken. Any other bind error is returned as is.
    pub async fn bind(config: &Config) -> Result<Self> {
        let mut port = config.port;
        loop {
            let addr = SocketAddr::new(config.host, port);
            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    let addr = listener.local_addr()?;
                    announce(addr);
                    return Ok(Self { listener, addr, grace: config.shutdown_grace });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                    port = port.checked_add(1).ok_or(Error::PortsExhausted { port })?;
                    warn!(target: "server", "port {} is in use, trying {port}", addr.port());
                }
                Err(source) => return Err(Error::Bind { addr, source }),
            }
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves `router` until SIGINT or SIGTERM, then drains.
    pub async fn serve(self, router: Router) -> Shutdown {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `signal` resolves, then drains.
    pub async fn serve_with_shutdown(self, router: Router, signal: impl Future<Output = ()>) -> Shutdown {
        let router = Arc::new(router);
        // Connection tasks and WebSocket sessions; shutdown waits on both.
        let tasks = TaskTracker::new();
        let draining = CancellationToken::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;

                () = &mut signal => {
                    info!(target: "server", "shutting down...");
                    break;
                }

                res = self.listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!(target: "server", "accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let sessions = tasks.clone();
                    let draining = draining.clone();

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            let sessions = sessions.clone();
                            async move { dispatch(&router, req, remote_addr, &sessions).await }
                        });

                        let builder = ConnBuilder::new(TokioExecutor::new());
                        let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), svc);
                        tokio::pin!(conn);

                        let mut closing = false;
                        let result = loop {
                            tokio::select! {
                                res = conn.as_mut() => break res,
                                () = draining.cancelled(), if !closing => {
                                    closing = true;
                                    conn.as_mut().graceful_shutdown();
                                }
                            }
                        };
                        if let Err(e) = result {
                            debug!(target: "server", peer = %remote_addr, "connection closed: {e}");
                        }
                    });
                }
            }
        }

        drop(self.listener);
        draining.cancel();
        tasks.close();

        match tokio::time::timeout(self.grace, tasks.wait()).await {
            Ok(()) => {
                info!(target: "server", "server stopped");
                Shutdown::Drained
            }
            Err(_) => {
                warn!(
                    target: "server",
                    open = tasks.len(),
                    "forced shutdown after {}",
                    humantime::format_duration(self.grace)
                );
                Shutdown::Forced
            }
        }
    }
}

fn announce(addr: SocketAddr) {
    let port = addr.port();
    let (local, network) = if addr.ip().is_unspecified() {
        (IpAddr::V4(Ipv4Addr::LOCALHOST), net::local_ipv4())
    } else {
        (addr.ip(), addr.ip())
    };
    info!(target: "server", "server ready");
    info!(target: "server", "  ➜ Local:   {}", style(net::http_url(local, port)).cyan());
    info!(target: "server", "  ➜ Network: {}", style(net::http_url(network, port)).cyan());
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response.
///
/// Returns `Err` only for upgrade requests that must not be answered: hyper
/// then drops the connection without writing anything.
async fn dispatch(
    router: &Router,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
    sessions: &TaskTracker,
) -> Result<http::Response<Full<Bytes>>> {
    if ws::is_upgrade_request(&req) {
        return router.sockets().accept(req, remote_addr, sessions);
    }

    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let response = match Method::try_from(&method) {
        Ok(known) => route(router, known, req, remote_addr, started).await,
        Err(()) => not_found(&method, &path),
    };

    let elapsed = started.elapsed();
    info!(
        target: "http",
        "{method} {path} {} {}",
        response.status_code().as_u16(),
        envelope::format_elapsed(elapsed)
    );
    Ok(response.into_inner(elapsed, method == http::Method::HEAD))
}

async fn route(
    router: &Router,
    method: Method,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
    started: Instant,
) -> Response {
    let path = req.uri().path().to_owned();

    let Some((handler, params)) = router.lookup(method, &path) else {
        if method == Method::Options {
            if let Some(preflight) = cors::preflight(req.headers()) {
                return preflight;
            }
        }
        return not_found(req.method(), &path);
    };

    let request = match Request::read(req, method, params, remote_addr, started).await {
        Ok(request) => request,
        Err(e) => {
            warn!(target: "http", peer = %remote_addr, %path, "failed to read request body: {e}");
            return Response::error(StatusCode::BAD_REQUEST, "BAD_REQUEST", "Failed to read request body");
        }
    };

    match AssertUnwindSafe(handler.call(request)).catch_unwind().await {
        Ok(response) => response,
        Err(_) => {
            error!(target: "http", %method, %path, "handler panicked");
            Response::error(StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR", "Internal server error")
        }
    }
}

fn not_found(method: &http::Method, path: &str) -> Response {
    Response::error(StatusCode::NOT_FOUND, "NOT_FOUND", format!("Cannot {method} {path}"))
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGINT (Ctrl-C) or SIGTERM the process receives.
///
/// A signal whose handler cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(target: "server", "failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(target: "server", "failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
