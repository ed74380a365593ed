//! Route handler type.

use std::sync::Arc;

use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::http::request::RequestContext;
use crate::http::response::ResponseBuilder;

pub use tower::BoxError;

/// Future returned by a handler.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<Response, BoxError>>;

/// A route handler: reads the request context, builds the response.
///
/// Closures are written as `|req, res| Box::pin(async move { ... })`.
pub type Handler =
    Arc<dyn for<'a> Fn(&'a RequestContext, &'a mut ResponseBuilder) -> HandlerFuture<'a> + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: for<'a> Fn(&'a RequestContext, &'a mut ResponseBuilder) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}
