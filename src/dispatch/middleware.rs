//! Middleware chain execution.
//!
//! # Responsibilities
//! - Run a route's middleware strictly in list order
//! - Detect a middleware that did not call its continuation
//!
//! # Design Decisions
//! - The continuation is a flag, set only by [`Next::run`] and checked after
//!   each middleware returns; calling it more than once changes nothing
//! - Middleware may rewrite the request context for later steps and the handler

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::dispatch::handler::BoxError;
use crate::http::request::RequestContext;
use crate::http::response::ResponseBuilder;

/// Future returned by a middleware.
pub type MiddlewareFuture<'a> = BoxFuture<'a, Result<(), BoxError>>;

/// A middleware step. Call `next.run()` to let the request continue.
pub type Middleware =
    Arc<dyn for<'a> Fn(&'a mut RequestContext, &'a mut ResponseBuilder, Next) -> MiddlewareFuture<'a> + Send + Sync>;

/// Wrap a closure as a [`Middleware`].
pub fn middleware<F>(f: F) -> Middleware
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut ResponseBuilder, Next) -> MiddlewareFuture<'a>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Continuation handed to each middleware.
#[derive(Debug, Clone, Default)]
pub struct Next {
    called: Arc<AtomicBool>,
}

impl Next {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the chain as continuing.
    pub fn run(&self) {
        self.called.store(true, Ordering::SeqCst);
    }

    pub fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

/// How a chain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every middleware continued.
    Completed,
    /// The middleware at `index` did not continue.
    Stopped { index: usize },
}

/// Run `chain` in order, stopping at the first middleware that does not continue.
pub async fn run_chain(
    chain: &[Middleware],
    req: &mut RequestContext,
    res: &mut ResponseBuilder,
) -> Result<ChainOutcome, BoxError> {
    for (index, step) in chain.iter().enumerate() {
        let next = Next::new();
        step(&mut *req, &mut *res, next.clone()).await?;
        if !next.was_called() {
            return Ok(ChainOutcome::Stopped { index });
        }
    }
    Ok(ChainOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::body::Bytes;
    use axum::http::{Extensions, HeaderMap, Method, Uri};
    use serde_json::{json, Map};

    use crate::http::cookie::CookieCodec;
    use crate::http::request::RequestId;

    fn pair() -> (RequestContext, ResponseBuilder) {
        let req = RequestContext {
            method: Method::GET,
            uri: Uri::from_static("/"),
            path: "/".into(),
            params: Map::new(),
            query: json!({}),
            body: None,
            raw_body: Bytes::new(),
            ip: None,
            headers: HeaderMap::new(),
            cookies: HashMap::new(),
            request_id: RequestId::new(),
            extensions: Extensions::new(),
        };
        let res = ResponseBuilder::new(Arc::new(CookieCodec::new("secret").unwrap()));
        (req, res)
    }

    fn tagging(tag: &'static str, continue_chain: bool) -> Middleware {
        middleware(move |req, _res, next| {
            Box::pin(async move {
                let seen = req.extensions.get::<Vec<&'static str>>().cloned().unwrap_or_default();
                let mut seen = seen;
                seen.push(tag);
                req.extensions.insert(seen);
                if continue_chain {
                    next.run();
                    next.run();
                }
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let (mut req, mut res) = pair();
        let chain = vec![tagging("a", true), tagging("b", true), tagging("c", true)];
        let outcome = run_chain(&chain, &mut req, &mut res).await.unwrap();
        assert_eq!(outcome, ChainOutcome::Completed);
        assert_eq!(req.extensions.get::<Vec<&'static str>>().unwrap(), &vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_chain_stops_without_next() {
        let (mut req, mut res) = pair();
        let chain = vec![tagging("a", true), tagging("b", false), tagging("c", true)];
        let outcome = run_chain(&chain, &mut req, &mut res).await.unwrap();
        assert_eq!(outcome, ChainOutcome::Stopped { index: 1 });
        assert_eq!(req.extensions.get::<Vec<&'static str>>().unwrap(), &vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_chain_propagates_errors() {
        let (mut req, mut res) = pair();
        let failing = middleware(|_req, _res, _next| Box::pin(async move { Err("boom".into()) }));
        let chain = vec![failing, tagging("never", true)];
        let err = run_chain(&chain, &mut req, &mut res).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(req.extensions.get::<Vec<&'static str>>().is_none());
    }
}
