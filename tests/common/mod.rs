//! Shared utilities for the integration tests.

#![allow(dead_code)]

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use canopy::{Config, Router, Server, Shutdown, log::Console};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// A server on an ephemeral localhost port, stopped through [`TestServer::stop`].
pub struct TestServer {
    pub addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Shutdown>,
}

impl TestServer {
    pub async fn start(router: Router) -> Self {
        Self::start_with_grace(router, Duration::from_secs(5)).await
    }

    pub async fn start_with_grace(router: Router, grace: Duration) -> Self {
        let config = Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            shutdown_grace: grace,
            ..Config::default()
        };
        let server = Server::bind(&config).await.expect("bind test server");
        let addr = server.local_addr();
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(router, async {
            let _ = stopped.await;
        }));
        Self { addr, stop, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{path}", self.addr)
    }

    /// Triggers shutdown and waits for the server to finish draining.
    pub async fn stop(self) -> Shutdown {
        let _ = self.stop.send(());
        self.handle.await.expect("server task panicked")
    }
}

/// Log lines captured from the current thread's subscriber.
#[derive(Clone, Default)]
pub struct Logs(Arc<Mutex<Vec<u8>>>);

impl Logs {
    /// Routes this thread's `tracing` events into a buffer until the guard drops.
    ///
    /// Only reliable on a current-thread runtime, where every spawned task
    /// runs on the test's thread.
    pub fn capture() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(Console)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(logs.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect()
    }

    /// Index of the first line containing every one of `needles`.
    pub fn position(&self, needles: &[&str]) -> Option<usize> {
        self.lines()
            .iter()
            .position(|line| needles.iter().all(|n| line.contains(n)))
    }
}

impl io::Write for Logs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Logs {
    type Writer = Logs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
