//! Loaded route table.
//!
//! # Responsibilities
//! - Store route entries in load order
//! - Find the first entry whose pattern matches a path
//! - Resolve the handler for a request method
//!
//! # Design Decisions
//! - Immutable once built; reloads build a new table and swap it in
//! - Linear scan in table order, first match wins
//! - A duplicate pattern replaces the earlier entry in place

use std::collections::BTreeMap;
use std::fmt;

use axum::http::Method;

use crate::dispatch::handler::Handler;
use crate::routing::config::RouteConfig;
use crate::routing::matcher::{match_route, Params};
use crate::routing::method::RouteMethod;
use crate::routing::registry::RouteModule;

/// One route: a pattern and what the route file registered for it.
#[derive(Clone)]
pub struct RouteEntry {
    pattern: String,
    file: String,
    handlers: BTreeMap<RouteMethod, Handler>,
    config: Option<RouteConfig>,
}

impl RouteEntry {
    pub fn new(pattern: impl Into<String>, file: impl Into<String>, module: &RouteModule) -> Self {
        Self {
            pattern: pattern.into(),
            file: file.into(),
            handlers: module.handlers().clone(),
            config: module.route_config().cloned(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Key of the route file this entry came from.
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn config(&self) -> Option<&RouteConfig> {
        self.config.as_ref()
    }

    pub fn methods(&self) -> impl Iterator<Item = RouteMethod> + '_ {
        self.handlers.keys().copied()
    }

    /// Handler for `method`: the exact slot, else the default slot for GET only.
    pub fn handler_for(&self, method: &Method) -> Option<&Handler> {
        let slot = RouteMethod::from_http(method)?;
        if let Some(handler) = self.handlers.get(&slot) {
            return Some(handler);
        }
        if slot == RouteMethod::Get {
            return self.handlers.get(&RouteMethod::Default);
        }
        None
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern)
            .field("file", &self.file)
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Ordered route entries.
#[derive(Clone, Default, Debug)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry`, or replace the entry with the same pattern in place.
    /// Returns the replaced entry.
    pub fn insert(&mut self, entry: RouteEntry) -> Option<RouteEntry> {
        match self.entries.iter_mut().find(|e| e.pattern == entry.pattern) {
            Some(existing) => Some(std::mem::replace(existing, entry)),
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    /// First entry matching `path`, with its parameter bindings.
    pub fn find(&self, path: &str) -> Option<(&RouteEntry, Params)> {
        self.entries
            .iter()
            .find_map(|entry| match_route(path, &entry.pattern).map(|params| (entry, params)))
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Log every route and its methods.
    pub fn log_routes(&self) {
        tracing::info!(count = self.entries.len(), "Available routes");
        for entry in &self.entries {
            let methods: Vec<&str> = entry.methods().map(|m| m.as_str()).collect();
            tracing::info!(
                pattern = %entry.pattern,
                file = %entry.file,
                methods = %methods.join(", "),
                "Route"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::matcher::ParamValue;

    fn module() -> RouteModule {
        RouteModule::new()
            .get(|_req, res| Box::pin(async move { Ok(res.send("get")) }))
            .fallback(|_req, res| Box::pin(async move { Ok(res.send("default")) }))
    }

    fn post_only() -> RouteModule {
        RouteModule::new().post(|_req, res| Box::pin(async move { Ok(res.send("post")) }))
    }

    #[test]
    fn test_first_match_wins() {
        let mut table = RouteTable::new();
        table.insert(RouteEntry::new("/users/:id", "users/[id]", &module()));
        table.insert(RouteEntry::new("/users/profile", "users/profile", &module()));

        let (entry, params) = table.find("/users/profile").unwrap();
        assert_eq!(entry.pattern(), "/users/:id");
        assert_eq!(params.get("id"), Some(&ParamValue::Single("profile".into())));
        assert!(table.find("/posts").is_none());
    }

    #[test]
    fn test_duplicate_pattern_replaces_in_place() {
        let mut table = RouteTable::new();
        table.insert(RouteEntry::new("/a", "a", &module()));
        table.insert(RouteEntry::new("/b", "b", &module()));
        let replaced = table.insert(RouteEntry::new("/a", "a/index", &post_only()));
        assert_eq!(replaced.unwrap().file(), "a");
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0].file(), "a/index");
    }

    #[test]
    fn test_handler_resolution() {
        let entry = RouteEntry::new("/x", "x", &module());
        assert!(entry.handler_for(&Method::GET).is_some());
        assert!(entry.handler_for(&Method::POST).is_none());

        let fallback_only = RouteEntry::new(
            "/y",
            "y",
            &RouteModule::new().fallback(|_req, res| Box::pin(async move { Ok(res.send("d")) })),
        );
        assert!(fallback_only.handler_for(&Method::GET).is_some());
        assert!(fallback_only.handler_for(&Method::PUT).is_none());
        assert!(fallback_only.handler_for(&Method::HEAD).is_none());
    }
}
