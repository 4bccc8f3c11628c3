//! Route modules served by the `canopy` binary.
//!
//! Names match the `module` keys of the manifests under `routes/`.

use canopy::{Modules, RouteModule};

mod index;
mod user;
mod users;

pub fn modules() -> Modules {
    Modules::new()
        .module("index", RouteModule::new().get(index::get))
        .module(
            "users",
            RouteModule::new().get(users::list).post(users::create).ws(users::echo),
        )
        .module("user", RouteModule::new().get(user::get))
}
