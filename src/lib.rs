//! File-system based HTTP routing.
//!
//! Route paths come from a directory tree, are matched against incoming
//! request paths with parameter extraction, and are dispatched to handlers
//! with optional schema validation and middleware chains.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod validation;

pub use config::AppConfig;
pub use dispatch::{handler, middleware, Dispatcher, Next};
pub use http::{CookieOptions, HttpServer, RequestContext, ResponseBuilder};
pub use lifecycle::Shutdown;
pub use routing::{RouteConfig, RouteMethod, RouteModule, RouteOptions, RouteRegistry};
pub use validation::RouteSchema;
