//! Radix-tree request router and WebSocket handler table.
//!
//! One tree per HTTP method. O(path-length) lookup. Paths use `:name`
//! segments for parameters; they are translated to matchit's `{name}` form
//! on insert, so a literal `{` or `}` in a path stays literal.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::error::{Error, Result};
use crate::handler::{BoxedHandler, BoxedWsHandler, Handler, WsHandler};
use crate::method::Method;
use crate::ws::Multiplexer;

/// The application router.
///
/// Usually filled by the [`RouteLoader`](crate::RouteLoader), but routes can
/// also be registered by hand. Build it once at startup; pass it to
/// [`Server::serve`](crate::Server::serve).
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    table: Vec<(Method, String)>,
    sockets: Multiplexer,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.insert(method, path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    /// Register a WebSocket handler for an exact path. Returns `self` for chaining.
    pub fn ws(mut self, path: &str, handler: impl WsHandler) -> Self {
        self.insert_ws(path, handler.into_boxed_ws_handler());
        self
    }

    pub(crate) fn insert(&mut self, method: Method, path: &str, handler: BoxedHandler) -> Result<()> {
        self.routes
            .entry(method)
            .or_default()
            .insert(to_matchit(path), handler)
            .map_err(|source| Error::InvalidRoute { path: path.to_owned(), source })?;
        self.table.push((method, path.to_owned()));
        Ok(())
    }

    /// Returns `true` when an earlier handler for `path` was replaced.
    pub(crate) fn insert_ws(&mut self, path: &str, handler: BoxedWsHandler) -> bool {
        self.sockets.insert(path, handler)
    }

    /// Registered `(method, path)` pairs, in registration order.
    pub fn routes(&self) -> &[(Method, String)] {
        &self.table
    }

    pub fn sockets(&self) -> &Multiplexer {
        &self.sockets
    }

    /// Finds the handler for `method` on `path`.
    ///
    /// `HEAD` falls back to the `GET` handler when no `HEAD` handler exists.
    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        self.find(method, path).or_else(|| match method {
            Method::Head => self.find(Method::Get, path),
            _ => None,
        })
    }

    fn find(&self, method: Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

/// `/users/:id` → `/users/{id}`, escaping literal braces.
fn to_matchit(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.replace('{', "{{").replace('}', "}}"),
        })
        .collect::<Vec<_>>()
        .join("/")
}
