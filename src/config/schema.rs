//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::dispatch::dispatcher::{DEFAULT_BODY_LIMIT, DEFAULT_COOKIE_SECRET};
use crate::http::query::QueryParserKind;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Routes directory and loading behavior.
    pub routes: RoutesConfig,

    /// Request parsing.
    pub request: RequestConfig,

    /// Cookie signing.
    pub cookies: CookieConfig,

    /// Response defaults.
    pub response: ResponseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Routes directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Directory walked for route files.
    pub dir: String,

    /// Log the loaded routes at startup.
    pub show_routes: bool,

    /// Reload routes when the directory changes.
    pub watch: bool,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            dir: "routes".to_string(),
            show_routes: false,
            watch: false,
        }
    }
}

/// Request parsing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Parse JSON bodies automatically.
    pub parse_json: bool,

    /// Query parser: none, simple or extended (alias qs).
    pub query_parser: QueryParserKind,

    /// Maximum request body size.
    pub body_limit_bytes: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            parse_json: true,
            query_parser: QueryParserKind::Simple,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// HMAC secret for signed cookies.
    pub secret: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_COOKIE_SECRET.to_string(),
        }
    }
}

/// Response configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Add `X-Powered-By` to responses.
    pub powered_by: bool,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self { powered_by: true }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
