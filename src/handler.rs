//! Handler traits and type erasure.
//!
//! # How async handlers are stored
//!
//! Route modules hold handlers of *different* types, and the router keeps
//! them in uniform maps, so every handler is hidden behind a trait object:
//!
//! ```text
//! async fn list(req: Request) -> Response { … }    ← user writes this
//!        ↓ RouteModule::new().get(list)
//! list.into_boxed_handler()                        ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(list))                        ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time               ← one vtable dispatch
//! ```
//!
//! WebSocket handlers follow the same chain through [`WsHandler`], except
//! they run once per connection and produce no response.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::ws::WebSocket;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future resolving to `T`.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface for HTTP handlers.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<Response>;
}

/// Internal dispatch interface for WebSocket handlers.
#[doc(hidden)]
pub trait ErasedWsHandler {
    fn call(&self, socket: WebSocket, req: Request) -> BoxFuture<()>;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

#[doc(hidden)]
pub type BoxedWsHandler = Arc<dyn ErasedWsHandler + Send + Sync + 'static>;

// ── Public traits ─────────────────────────────────────────────────────────────

/// Implemented for every valid HTTP route handler.
///
/// Automatically satisfied by any function with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// Implemented for every valid WebSocket handler:
///
/// ```text
/// async fn name(socket: WebSocket, req: Request)
/// ```
///
/// Called once per connection. Reading and writing messages, and deciding
/// when to stop, is the handler's business.
pub trait WsHandler: private::SealedWs + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_ws_handler(self) -> BoxedWsHandler;
}

mod private {
    pub trait Sealed {}
    pub trait SealedWs {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

impl<F, Fut> private::SealedWs for F
where
    F: Fn(WebSocket, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
}

impl<F, Fut> WsHandler for F
where
    F: Fn(WebSocket, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn into_boxed_ws_handler(self) -> BoxedWsHandler {
        Arc::new(FnWsHandler(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Response> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

struct FnWsHandler<F>(F);

impl<F, Fut> ErasedWsHandler for FnWsHandler<F>
where
    F: Fn(WebSocket, Request) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, socket: WebSocket, req: Request) -> BoxFuture<()> {
        Box::pin((self.0)(socket, req))
    }
}
