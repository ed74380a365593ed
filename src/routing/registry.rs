//! Route module registration.
//!
//! Route files cannot be loaded at runtime, so each one is paired with a
//! [`RouteModule`] registered under the file's key: its path relative to the
//! routes directory, with forward slashes and without the extension
//! (`users/[id]`, `index`, `docs/[...slug]`).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::dispatch::handler::{handler, Handler, HandlerFuture};
use crate::http::request::RequestContext;
use crate::http::response::ResponseBuilder;
use crate::routing::config::RouteConfig;
use crate::routing::method::RouteMethod;
use crate::routing::pattern::route_stem;

/// Handlers and optional config exported by one route file.
#[derive(Clone, Default)]
pub struct RouteModule {
    handlers: BTreeMap<RouteMethod, Handler>,
    config: Option<RouteConfig>,
}

macro_rules! method_setter {
    ($($name:ident => $method:expr),* $(,)?) => {
        $(
            pub fn $name<F>(self, f: F) -> Self
            where
                F: for<'a> Fn(&'a RequestContext, &'a mut ResponseBuilder) -> HandlerFuture<'a>
                    + Send
                    + Sync
                    + 'static,
            {
                self.on($method, handler(f))
            }
        )*
    };
}

impl RouteModule {
    pub fn new() -> Self {
        Self::default()
    }

    method_setter! {
        get => RouteMethod::Get,
        post => RouteMethod::Post,
        put => RouteMethod::Put,
        delete => RouteMethod::Delete,
        patch => RouteMethod::Patch,
        options => RouteMethod::Options,
        head => RouteMethod::Head,
        fallback => RouteMethod::Default,
    }

    /// Attach a handler to `method`, replacing any previous one.
    pub fn on(mut self, method: RouteMethod, handler: Handler) -> Self {
        self.handlers.insert(method, handler);
        self
    }

    pub fn config(mut self, config: RouteConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn handlers(&self) -> &BTreeMap<RouteMethod, Handler> {
        &self.handlers
    }

    pub fn route_config(&self) -> Option<&RouteConfig> {
        self.config.as_ref()
    }
}

impl fmt::Debug for RouteModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteModule")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

/// Route modules keyed by route-file key.
#[derive(Clone, Default, Debug)]
pub struct RouteRegistry {
    modules: HashMap<String, RouteModule>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` for a route file. `key` may carry the file extension
    /// and leading or trailing slashes; they are normalized away.
    pub fn register(&mut self, key: &str, module: RouteModule) -> &mut Self {
        self.modules.insert(normalize_key(key), module);
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, key: &str, module: RouteModule) -> Self {
        self.register(key, module);
        self
    }

    pub fn get(&self, key: &str) -> Option<&RouteModule> {
        self.modules.get(&normalize_key(key))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Canonical route-file key.
pub fn normalize_key(key: &str) -> String {
    let key = key.replace('\\', "/");
    let key = key.trim_matches('/');
    let key = match key.rsplit_once('/') {
        Some((dir, file)) => match route_stem(file) {
            Some(stem) => format!("{}/{}", dir, stem),
            None => key.to_string(),
        },
        None => route_stem(key).unwrap_or(key).to_string(),
    };
    key.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/")
}
