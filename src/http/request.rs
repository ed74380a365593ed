//! Per-request context handed to middleware and handlers.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4), or adopt the client's `x-request-id`
//! - Hold the parsed path params, query, body, cookies, headers and client IP
//!
//! # Design Decisions
//! - One context per request, never shared; middleware may mutate it in place
//! - Values are `serde_json::Value` so validation output can replace them directly
//! - `extensions` lets middleware pass typed data to handlers

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use axum::body::Bytes;
use axum::http::{Extensions, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Request ID header name.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Unique identifier attached to each request's tracing span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reuse a well-formed incoming `x-request-id`, otherwise generate one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= 128)
            .map(|v| Self(v.to_string()))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a handler can know about the inbound request.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub path: String,
    /// Path parameters; catch-alls are arrays of segments.
    pub params: Map<String, Value>,
    /// Parsed (and, when a schema applies, coerced) query.
    pub query: Value,
    /// Parsed JSON body, if any.
    pub body: Option<Value>,
    pub raw_body: Bytes,
    pub ip: Option<IpAddr>,
    pub headers: HeaderMap,
    pub cookies: HashMap<String, Value>,
    pub request_id: RequestId,
    pub extensions: Extensions,
}

impl RequestContext {
    /// Path parameter as a string. Catch-all captures are joined with `/`.
    pub fn param(&self, name: &str) -> Option<String> {
        match self.params.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Array(parts) => Some(
                parts
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("/"),
            ),
            other => Some(other.to_string()),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn cookie(&self, name: &str) -> Option<&Value> {
        self.cookies.get(name)
    }

    pub fn query_value(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    /// Deserialize the parsed body into a typed value.
    pub fn body_as<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.body.clone().map(serde_json::from_value)
    }

    /// Deserialize the query into a typed value.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.query.clone())
    }

    /// Lower-cased header map as JSON, the shape the headers schema validates.
    pub fn headers_json(headers: &HeaderMap) -> Value {
        let mut map = Map::new();
        for (name, value) in headers {
            if let Ok(text) = value.to_str() {
                map.entry(name.as_str().to_string())
                    .or_insert_with(|| Value::String(text.to_string()));
            }
        }
        Value::Object(map)
    }
}
