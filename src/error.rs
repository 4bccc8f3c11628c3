//! Unified error type.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Boxed error returned by route module factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shorthand for `Result<T, canopy::Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type returned by canopy's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding, route loading, and WebSocket transport.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("no free port left after {port}")]
    PortsExhausted { port: u16 },

    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no route module named `{0}`")]
    UnknownModule(String),

    #[error("route module `{module}` failed to load: {source}")]
    ModuleLoad {
        module: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid route `{path}`: {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("no websocket handler for `{0}`")]
    NoSocketHandler(String),

    #[error("websocket handshake rejected: {0}")]
    Handshake(&'static str),

    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to install logger: {0}")]
    Logger(#[from] tracing_subscriber::util::TryInitError),
}
