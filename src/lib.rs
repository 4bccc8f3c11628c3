//! # canopy
//!
//! An HTTP and WebSocket server whose routes come from a directory tree.
//!
//! ## The contract
//!
//! - **Routes are directories.** `routes/users/[id]/route.toml` mounts a
//!   module on `/users/:id`. The manifest names a [`RouteModule`] from the
//!   [`Modules`] registry; the module exports method handlers and at most
//!   one WebSocket handler.
//! - **One upgrade path.** Every WebSocket endpoint shares the same upgrade
//!   handling; the exact request path picks the handler.
//! - **One response shape.** JSON bodies leave as
//!   `{ responseTime, error, message, data }`, see
//!   [`middleware::envelope`].
//! - **Boring startup and shutdown.** Taken ports are skipped, SIGINT and
//!   SIGTERM drain connections within a grace period.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use canopy::{Config, Modules, Request, Response, RouteLoader, RouteModule, Router, Server, WebSocket};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let config = Config::default();
//!     let modules = Modules::new()
//!         .module("users", RouteModule::new().get(list_users).ws(echo));
//!
//!     let mut router = Router::new();
//!     RouteLoader::new(modules).load(&config.routes, &mut router).await;
//!
//!     match Server::bind(&config).await {
//!         Ok(server) => server.serve(router).await.exit_code(),
//!         Err(_) => std::process::ExitCode::FAILURE,
//!     }
//! }
//!
//! async fn list_users(_req: Request) -> Response {
//!     Response::json(json!({ "message": "GET all users" }))
//! }
//!
//! async fn echo(mut ws: WebSocket, _req: Request) {
//!     while let Some(Ok(msg)) = ws.recv().await {
//!         if msg.is_text() && ws.send(msg).await.is_err() {
//!             break;
//!         }
//!     }
//! }
//! ```

mod error;
mod handler;
mod loader;
mod method;
mod module;
mod request;
mod response;
mod router;
mod server;

pub mod config;
pub mod log;
pub mod middleware;
pub mod net;
pub mod ws;

pub use config::Config;
pub use error::{BoxError, Error, Result};
pub use handler::{Handler, WsHandler};
pub use loader::{LoadReport, MANIFEST, RouteLoader};
pub use method::Method;
pub use module::{Modules, RouteModule};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::{Server, Shutdown};
pub use ws::{Message, WebSocket};
