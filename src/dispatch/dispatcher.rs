//! Request dispatcher.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → read body (limit) → parse JSON when declared        400 Invalid JSON / 413
//!     → parse cookies (CookieCodec)
//!     → RouteTable::find (first match in load order)        404 Not Found
//!     → resolve handler (exact method, GET → default)       405 Method Not Allowed
//!     → parse query (route parser, else dispatcher parser)
//!     → gates: body → params → query → headers              400 {errors, success:false}
//!     → middleware chain (stops unless next.run())
//!     → handler
//!     → failures and panics                                 500 Internal Server Error
//! ```
//!
//! # Design Decisions
//! - One dispatcher owns its table; instances are independent
//! - The table loads lazily on first request, once; concurrent first
//!   requests wait on the same load
//! - Reloads swap the table atomically; in-flight requests keep their snapshot
//! - All per-request state lives in the context/builder pair

use std::any::Any;
use std::fmt;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::{Extensions, HeaderMap, Request, StatusCode};
use axum::response::Response;
use futures_util::FutureExt;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::dispatch::handler::{BoxError, Handler};
use crate::dispatch::middleware::{run_chain, ChainOutcome, Middleware};
use crate::http::cookie::{CookieCodec, CookieError};
use crate::http::query::QueryParser;
use crate::http::request::{RequestContext, RequestId};
use crate::http::response::{empty_response, json_response, plain_response, ResponseBuilder};
use crate::routing::loader::{load_routes, LoadError, LoadReport};
use crate::routing::matcher::params_to_json;
use crate::routing::method::RouteMethod;
use crate::routing::registry::RouteRegistry;
use crate::routing::source::{FsSource, RouteSource};
use crate::routing::table::RouteTable;
use crate::validation::{gate, GateOutcome, JsonSchemaValidator, Phase, SchemaValidator};

/// Secret used when none is configured.
pub const DEFAULT_COOKIE_SECRET: &str = "fsroute-development-secret";

/// Default request body limit (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Route table lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Unloaded,
    Loading,
    Ready,
}

/// Per-dispatcher request handling options.
#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    pub parse_json: bool,
    pub query_parser: QueryParser,
    pub body_limit: usize,
    pub powered_by: bool,
    pub show_routes: bool,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            parse_json: true,
            query_parser: QueryParser::Simple,
            body_limit: DEFAULT_BODY_LIMIT,
            powered_by: true,
            show_routes: false,
        }
    }
}

struct Inner {
    options: DispatcherOptions,
    codec: Arc<CookieCodec>,
    validator: Arc<dyn SchemaValidator>,
    source: Arc<dyn RouteSource>,
    registry: Arc<RouteRegistry>,
    table: ArcSwapOption<RouteTable>,
    load_lock: Mutex<()>,
    loading: AtomicBool,
}

/// Resolves requests against a route table and runs the matched route.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("source", &self.inner.source.describe())
            .field("state", &self.state())
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    options: DispatcherOptions,
    secret: String,
    validator: Option<Arc<dyn SchemaValidator>>,
    source: Option<Arc<dyn RouteSource>>,
    registry: RouteRegistry,
}

impl DispatcherBuilder {
    pub fn source(mut self, source: impl RouteSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn routes_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.source(FsSource::new(dir))
    }

    pub fn registry(mut self, registry: RouteRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn cookie_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn options(mut self, options: DispatcherOptions) -> Self {
        self.options = options;
        self
    }

    pub fn parse_json(mut self, on: bool) -> Self {
        self.options.parse_json = on;
        self
    }

    pub fn query_parser(mut self, parser: QueryParser) -> Self {
        self.options.query_parser = parser;
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.options.body_limit = bytes;
        self
    }

    pub fn powered_by(mut self, on: bool) -> Self {
        self.options.powered_by = on;
        self
    }

    pub fn show_routes(mut self, on: bool) -> Self {
        self.options.show_routes = on;
        self
    }

    pub fn build(self) -> Result<Dispatcher, CookieError> {
        let codec = Arc::new(CookieCodec::new(&self.secret)?);
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(FsSource::new("routes")));
        let validator = self
            .validator
            .unwrap_or_else(|| Arc::new(JsonSchemaValidator::new()));

        Ok(Dispatcher {
            inner: Arc::new(Inner {
                options: self.options,
                codec,
                validator,
                source,
                registry: Arc::new(self.registry),
                table: ArcSwapOption::empty(),
                load_lock: Mutex::new(()),
                loading: AtomicBool::new(false),
            }),
        })
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder {
            options: DispatcherOptions::default(),
            secret: DEFAULT_COOKIE_SECRET.to_string(),
            validator: None,
            source: None,
            registry: RouteRegistry::new(),
        }
    }

    /// Dispatcher reading routes from `config.routes.dir`.
    pub fn from_config(config: &AppConfig, registry: RouteRegistry) -> Result<Self, CookieError> {
        if config.cookies.secret == DEFAULT_COOKIE_SECRET {
            tracing::warn!("Using the default cookie secret; set cookies.secret for signed cookies");
        }

        Self::builder()
            .routes_dir(&config.routes.dir)
            .registry(registry)
            .cookie_secret(config.cookies.secret.clone())
            .options(DispatcherOptions {
                parse_json: config.request.parse_json,
                query_parser: config.request.query_parser.into(),
                body_limit: config.request.body_limit_bytes,
                powered_by: config.response.powered_by,
                show_routes: config.routes.show_routes,
            })
            .build()
    }

    pub fn options(&self) -> &DispatcherOptions {
        &self.inner.options
    }

    pub fn codec(&self) -> &Arc<CookieCodec> {
        &self.inner.codec
    }

    pub fn state(&self) -> DispatcherState {
        if self.inner.loading.load(Ordering::SeqCst) {
            DispatcherState::Loading
        } else if self.inner.table.load().is_some() {
            DispatcherState::Ready
        } else {
            DispatcherState::Unloaded
        }
    }

    /// The current table, if loaded.
    pub fn table(&self) -> Option<Arc<RouteTable>> {
        self.inner.table.load_full()
    }

    /// Load the table if no load has happened yet, and return it.
    ///
    /// A failed first load installs an empty table so requests get 404s.
    pub async fn ensure_loaded(&self) -> Arc<RouteTable> {
        if let Some(table) = self.inner.table.load_full() {
            return table;
        }

        let _guard = self.inner.load_lock.lock().await;
        if let Some(table) = self.inner.table.load_full() {
            return table;
        }

        let table = match self.load().await {
            Ok((table, _)) => table,
            Err(e) => {
                tracing::error!(error = %e, "Error loading routes");
                RouteTable::new()
            }
        };
        let table = Arc::new(table);
        self.inner.table.store(Some(table.clone()));
        table
    }

    /// Rebuild the table from the source and swap it in. On failure the
    /// previous table stays active.
    pub async fn reload(&self) -> Result<LoadReport, LoadError> {
        let _guard = self.inner.load_lock.lock().await;
        let (table, report) = self.load().await?;
        self.inner.table.store(Some(Arc::new(table)));
        tracing::info!(routes = report.routes, "Routes reloaded");
        Ok(report)
    }

    async fn load(&self) -> Result<(RouteTable, LoadReport), LoadError> {
        self.inner.loading.store(true, Ordering::SeqCst);
        let source = self.inner.source.clone();
        let registry = self.inner.registry.clone();
        let loaded = tokio::task::spawn_blocking(move || load_routes(source.as_ref(), &registry)).await;
        self.inner.loading.store(false, Ordering::SeqCst);

        let (table, report) = loaded??;
        if self.inner.options.show_routes {
            table.log_routes();
        }
        Ok((table, report))
    }

    /// Handle one request. `remote` is the peer address, when known.
    pub async fn handle(&self, request: Request<Body>, remote: Option<SocketAddr>) -> Response {
        let request_id = RequestId::from_headers(request.headers());
        let span = tracing::debug_span!(
            "request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path()
        );
        self.dispatch(request, remote, request_id).instrument(span).await
    }

    async fn dispatch(&self, request: Request<Body>, remote: Option<SocketAddr>, request_id: RequestId) -> Response {
        let options = &self.inner.options;
        let powered_by = options.powered_by;
        let table = self.ensure_loaded().await;

        let (parts, body) = request.into_parts();
        let raw_body = match axum::body::to_bytes(body, options.body_limit).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, limit = options.body_limit, "Failed to read request body");
                return plain_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large", powered_by);
            }
        };

        let mut body = None;
        if options.parse_json && !raw_body.is_empty() && is_json(&parts.headers) {
            match serde_json::from_slice::<Value>(&raw_body) {
                Ok(value) => body = Some(value),
                Err(e) => {
                    tracing::debug!(error = %e, "Invalid JSON body");
                    return plain_response(StatusCode::BAD_REQUEST, "Invalid JSON", powered_by);
                }
            }
        }

        let cookies = self.inner.codec.parse(&cookie_header(&parts.headers));

        let path = parts.uri.path().to_string();
        let Some((entry, params)) = table.find(&path) else {
            tracing::debug!("No route matched");
            return plain_response(StatusCode::NOT_FOUND, "Not Found", powered_by);
        };

        let Some((slot, handler)) = RouteMethod::from_http(&parts.method).zip(entry.handler_for(&parts.method)) else {
            return plain_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed", powered_by);
        };

        let schema = entry.config().and_then(|c| c.schema_for(slot));
        let chain: &[Middleware] = entry.config().map(|c| c.middleware_for(slot)).unwrap_or(&[]);

        let parser = schema
            .and_then(|s| s.query_parser.as_ref())
            .unwrap_or(&options.query_parser);
        let mut query = parser.parse(parts.uri.query().unwrap_or(""));
        let mut params = Value::Object(params_to_json(params));
        let mut headers = RequestContext::headers_json(&parts.headers);

        if let Some(schema) = schema {
            for phase in Phase::ORDER {
                let Some(phase_schema) = schema.for_phase(phase) else {
                    continue;
                };
                let target = match phase {
                    Phase::Body => match body.as_mut() {
                        Some(value) if is_truthy(value) => value,
                        _ => continue,
                    },
                    Phase::Params => &mut params,
                    Phase::Query => &mut query,
                    Phase::Headers => &mut headers,
                };
                match gate(self.inner.validator.as_ref(), phase, phase_schema, target) {
                    Ok(GateOutcome::Passed) => {}
                    Ok(GateOutcome::Rejected(errors)) => {
                        return json_response(
                            StatusCode::BAD_REQUEST,
                            &json!({ "errors": errors, "success": false }),
                            powered_by,
                        );
                    }
                    Err(e) => {
                        tracing::error!(phase = phase.as_str(), pattern = %entry.pattern(), error = %e, "Invalid route schema");
                        return internal_error(powered_by);
                    }
                }
            }
        }

        let mut req = RequestContext {
            method: parts.method,
            uri: parts.uri,
            path,
            params: match params {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            query,
            body,
            raw_body,
            ip: remote.map(|addr| addr.ip()),
            headers: parts.headers,
            cookies,
            request_id,
            extensions: Extensions::new(),
        };
        let mut res = ResponseBuilder::new(self.inner.codec.clone());
        if !powered_by {
            res.disable_powered_by();
        }

        let outcome = AssertUnwindSafe(run_route(handler, chain, &mut req, &mut res))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(pattern = %entry.pattern(), error = %e, "Internal Server Error");
                internal_error(powered_by)
            }
            Err(panic) => {
                tracing::error!(pattern = %entry.pattern(), panic = panic_message(panic.as_ref()), "Handler panicked");
                internal_error(powered_by)
            }
        }
    }
}

async fn run_route(
    handler: &Handler,
    chain: &[Middleware],
    req: &mut RequestContext,
    res: &mut ResponseBuilder,
) -> Result<Response, BoxError> {
    if let ChainOutcome::Stopped { index } = run_chain(chain, req, res).await? {
        if let Some(response) = res.take_response() {
            return Ok(response);
        }
        tracing::warn!(middleware = index, "Middleware stopped execution. No `next()` was called.");
        return Ok(empty_response(res.powered_by_enabled()));
    }
    handler(&*req, &mut *res).await
}

fn internal_error(powered_by: bool) -> Response {
    plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", powered_by)
}

/// `null`, `false`, zero and `""` count as no body for validation.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("application/json") || ct.contains("+json")
        })
        .unwrap_or(false)
}

fn cookie_header(headers: &HeaderMap) -> String {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ")
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/problem+json"));
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }

    #[test]
    fn test_is_truthy() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_truthy(&falsy), "{falsy}");
        }
        for truthy in [json!(true), json!(1), json!("0"), json!([]), json!({})] {
            assert!(is_truthy(&truthy), "{truthy}");
        }
    }

    #[test]
    fn test_cookie_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("b=2"));
        assert_eq!(cookie_header(&headers), "a=1; b=2");
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_dispatcher_state_transitions() {
        let dispatcher = Dispatcher::builder()
            .source(crate::routing::source::MemorySource::default())
            .build()
            .unwrap();
        assert_eq!(dispatcher.state(), DispatcherState::Unloaded);
        let table = dispatcher.ensure_loaded().await;
        assert!(table.is_empty());
        assert_eq!(dispatcher.state(), DispatcherState::Ready);
    }
}
