//! Route modules: what a directory in the route tree exports.
//!
//! A directory's `route.toml` names a module; the module is built from the
//! [`Modules`] registry when the tree is loaded. Modules are registered as
//! factories, so building one can fail without taking the server down.
//!
//! ```rust
//! use canopy::{Modules, Request, Response, RouteModule, WebSocket};
//!
//! async fn list(_req: Request) -> Response { Response::text("all users") }
//! async fn echo(_ws: WebSocket, _req: Request) {}
//!
//! let modules = Modules::new()
//!     .module("users", RouteModule::new().get(list).ws(echo))
//!     .define("flaky", || Err("database unreachable".into()));
//! ```

use std::collections::HashMap;

use crate::error::{BoxError, Error, Result};
use crate::handler::{BoxedHandler, BoxedWsHandler, Handler, WsHandler};
use crate::method::Method;

/// The handlers one route directory exports.
#[derive(Clone, Default)]
pub struct RouteModule {
    handlers: Vec<(Method, BoxedHandler)>,
    socket: Option<BoxedWsHandler>,
}

impl RouteModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export `handler` for `method`, replacing an earlier export of it.
    pub fn handler(mut self, method: Method, handler: impl Handler) -> Self {
        self.handlers.retain(|(m, _)| *m != method);
        self.handlers.push((method, handler.into_boxed_handler()));
        self
    }

    pub fn get(self, handler: impl Handler) -> Self { self.handler(Method::Get, handler) }
    pub fn post(self, handler: impl Handler) -> Self { self.handler(Method::Post, handler) }
    pub fn put(self, handler: impl Handler) -> Self { self.handler(Method::Put, handler) }
    pub fn delete(self, handler: impl Handler) -> Self { self.handler(Method::Delete, handler) }
    pub fn patch(self, handler: impl Handler) -> Self { self.handler(Method::Patch, handler) }
    pub fn options(self, handler: impl Handler) -> Self { self.handler(Method::Options, handler) }
    pub fn head(self, handler: impl Handler) -> Self { self.handler(Method::Head, handler) }

    /// Export a WebSocket handler for the directory's path.
    pub fn ws(mut self, handler: impl WsHandler) -> Self {
        self.socket = Some(handler.into_boxed_ws_handler());
        self
    }

    /// Exported methods, in [`Method::ALL`] order.
    pub fn methods(&self) -> Vec<Method> {
        Method::ALL
            .into_iter()
            .filter(|m| self.handlers.iter().any(|(h, _)| h == m))
            .collect()
    }

    pub fn has_ws(&self) -> bool {
        self.socket.is_some()
    }

    pub(crate) fn into_parts(self) -> (Vec<(Method, BoxedHandler)>, Option<BoxedWsHandler>) {
        let mut handlers = self.handlers;
        handlers.sort_by_key(|(method, _)| *method);
        (handlers, self.socket)
    }
}

type Factory = Box<dyn Fn() -> Result<RouteModule, BoxError> + Send + Sync>;

/// Registry of route modules by name.
#[derive(Default)]
pub struct Modules {
    factories: HashMap<String, Factory>,
}

impl Modules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module built by `factory` each time a manifest names it.
    pub fn define<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Result<RouteModule, BoxError> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_owned(), Box::new(factory));
        self
    }

    /// Register a ready-made module.
    pub fn module(self, name: &str, module: RouteModule) -> Self {
        self.define(name, move || Ok(module.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub(crate) fn load(&self, name: &str) -> Result<RouteModule> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownModule(name.to_owned()))?;
        factory().map_err(|source| Error::ModuleLoad { module: name.to_owned(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, Response};

    async fn ok(_req: Request) -> Response { Response::text("ok") }

    #[test]
    fn later_export_replaces_earlier() {
        let module = RouteModule::new().post(ok).get(ok).get(ok);
        assert_eq!(module.methods(), [Method::Get, Method::Post]);
        assert!(!module.has_ws());
    }

    #[test]
    fn load_reports_unknown_and_failing_modules() {
        let modules = Modules::new()
            .module("users", RouteModule::new().get(ok))
            .define("broken", || Err("boom".into()));

        assert!(modules.contains("users") && modules.contains("broken"));
        assert!(!modules.contains("nope"));
        assert_eq!(modules.load("users").unwrap().methods(), [Method::Get]);
        assert!(matches!(modules.load("nope"), Err(Error::UnknownModule(_))));
        match modules.load("broken") {
            Err(Error::ModuleLoad { module, source }) => {
                assert_eq!(module, "broken");
                assert_eq!(source.to_string(), "boom");
            }
            _ => panic!("expected a module load error"),
        }
    }
}
