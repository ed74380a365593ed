//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route loading (startup and reload):
//!     RouteSource (directory tree)
//!     → loader.rs (walk, warn on param conflicts)
//!     → pattern.rs (file name → pattern)
//!     → RouteRegistry (file key → RouteModule)
//!     → RouteTable (immutable, load order)
//!
//! Incoming request path:
//!     → table.rs (scan entries in order)
//!     → matcher.rs (pattern + path → params)
//!     → Return: first matching entry or NoMatch
//! ```
//!
//! # Design Decisions
//! - Tables are immutable once built; reload builds a new one
//! - Deterministic: directory entries are walked sorted by name
//! - First match wins, no specificity ranking

pub mod config;
pub mod loader;
pub mod matcher;
pub mod method;
pub mod pattern;
pub mod registry;
pub mod source;
pub mod table;

pub use config::{RouteConfig, RouteOptions};
pub use loader::{load_routes, LoadError, LoadReport, LoadWarning};
pub use matcher::{match_route, ParamValue, Params};
pub use method::RouteMethod;
pub use pattern::build_pattern;
pub use registry::{RouteModule, RouteRegistry};
pub use source::{FsSource, MemorySource, RouteSource, SourceEntry};
pub use table::{RouteEntry, RouteTable};
