//! Route modules backing the files under `demos/routes`.

use fsroute::RouteRegistry;

#[path = "../demos/routes/index.rs"]
mod index;

#[path = "../demos/routes/search.rs"]
mod search;

#[path = "../demos/routes/session.rs"]
mod session;

#[path = "../demos/routes/users/[id].rs"]
mod user;

#[path = "../demos/routes/docs/[...slug].rs"]
mod docs;

#[path = "../demos/routes/archive/[year].[month].[day].rs"]
mod archive;

/// Registry keyed by each file's path relative to the routes directory.
pub fn registry() -> RouteRegistry {
    RouteRegistry::new()
        .with("index.rs", index::module())
        .with("search.rs", search::module())
        .with("session.rs", session::module())
        .with("users/[id].rs", user::module())
        .with("docs/[...slug].rs", docs::module())
        .with("archive/[year].[month].[day].rs", archive::module())
}
