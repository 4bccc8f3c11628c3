//! Directory-driven route discovery.
//!
//! The route tree mirrors the URL space:
//!
//! ```text
//! routes/                 →  /
//! ├── route.toml             (module = "index")
//! └── users/              →  /users
//!     ├── route.toml         (module = "users")
//!     └── [id]/           →  /users/:id
//!         └── route.toml     (module = "user")
//! ```
//!
//! A directory becomes a route when it holds a `route.toml`. The manifest
//! names the [`RouteModule`](crate::RouteModule) to mount; without a
//! `module` key the directory's own path (`/users/:id`) is used as the name.
//! Every method the module exports is registered on that path, and so is its
//! WebSocket handler.
//!
//! Directories are visited depth-first, parents before children, children in
//! the order the filesystem lists them. A directory that fails to load is
//! logged and skipped; its siblings and children are still visited.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::module::Modules;
use crate::router::Router;

/// File that turns a directory into a route.
pub const MANIFEST: &str = "route.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    module: Option<String>,
}

/// What a [`RouteLoader::load`] run registered and what it skipped.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub routes: usize,
    pub sockets: usize,
    pub failures: Vec<(PathBuf, Error)>,
}

/// Walks a route tree and mounts the modules it names on a [`Router`].
pub struct RouteLoader {
    modules: Modules,
}

impl RouteLoader {
    pub fn new(modules: Modules) -> Self {
        Self { modules }
    }

    /// Scans `root` and registers every route found on `router`.
    ///
    /// Never fails: a missing root registers nothing, and per-directory
    /// failures end up in [`LoadReport::failures`].
    pub async fn load(&self, root: &Path, router: &mut Router) -> LoadReport {
        let mut report = LoadReport::default();

        match tokio::fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                warn!(target: "routes", root = %root.display(), "route directory not found, no routes loaded");
                return report;
            }
        }

        let mut pending = vec![(root.to_path_buf(), String::from("/"))];
        while let Some((dir, path)) = pending.pop() {
            if let Err(e) = self.mount(&dir, &path, router, &mut report).await {
                error!(target: "routes", dir = %dir.display(), %path, "failed to load route: {e}");
                report.failures.push((dir.clone(), e));
            }

            match subdirectories(&dir, &path).await {
                Ok(children) => pending.extend(children.into_iter().rev()),
                Err(e) => {
                    error!(target: "routes", dir = %dir.display(), "failed to read directory: {e}");
                    report.failures.push((dir, e.into()));
                }
            }
        }

        info!(
            target: "routes",
            routes = report.routes,
            sockets = report.sockets,
            failed = report.failures.len(),
            "route tree loaded"
        );
        report
    }

    /// Mounts the module named by `dir`'s manifest, if it has one.
    async fn mount(&self, dir: &Path, path: &str, router: &mut Router, report: &mut LoadReport) -> Result<()> {
        let manifest_path = dir.join(MANIFEST);
        let text = match tokio::fs::read_to_string(&manifest_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(Error::ManifestRead { path: manifest_path, source }),
        };
        let manifest: Manifest = toml::from_str(&text)
            .map_err(|source| Error::ManifestParse { path: manifest_path, source })?;

        let name = manifest.module.as_deref().unwrap_or(path);
        let (handlers, socket) = self.modules.load(name)?.into_parts();

        for (method, handler) in handlers {
            match router.insert(method, path, handler) {
                Ok(()) => {
                    info!(target: "routes", "{method:<7} {path}");
                    report.routes += 1;
                }
                Err(e) => {
                    error!(target: "routes", module = name, "{e}");
                    report.failures.push((dir.to_path_buf(), e));
                }
            }
        }

        if let Some(socket) = socket {
            if router.insert_ws(path, socket) {
                warn!(target: "routes", %path, "websocket handler replaced");
            }
            info!(target: "routes", "{:<7} {path}", "WS");
            report.sockets += 1;
        }
        Ok(())
    }
}

/// Child directories of `dir` paired with their URL paths, in listing order.
async fn subdirectories(dir: &Path, path: &str) -> std::io::Result<Vec<(PathBuf, String)>> {
    let mut children = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            warn!(target: "routes", dir = %entry.path().display(), "skipping non UTF-8 directory name");
            continue;
        };
        children.push((entry.path(), join(path, &segment(name))));
    }
    Ok(children)
}

/// `[id]` → `:id`; anything else is taken literally.
fn segment(name: &str) -> String {
    match name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
        Some(param) if !param.is_empty() => format!(":{param}"),
        _ => name.to_owned(),
    }
}

fn join(parent: &str, segment: &str) -> String {
    if parent == "/" {
        format!("/{segment}")
    } else {
        format!("{parent}/{segment}")
    }
}
