//! Response building.
//!
//! # Responsibilities
//! - Accumulate status, custom headers and outbound cookies for one request
//! - Produce the final `Response` on each terminal call (`send`, `json`, ...)
//! - Stamp the `X-Powered-By` marker unless disabled
//!
//! # Design Decisions
//! - Each terminal call renders a fresh response; accumulated headers and the
//!   cookie header are reapplied every time, nothing is merged
//! - The last produced body is kept so middleware can short-circuit without
//!   returning a value; `take_response` re-renders it with current headers
//! - Cookie mutations republish the full joined `Set-Cookie` value

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::http::cookie::{self, CookieCodec, CookieError, CookieJar, CookieOptions, CookieValue, WireOptions};

/// Marker header name.
pub const X_POWERED_BY: &str = "x-powered-by";

/// Marker header value.
pub const POWERED_BY: &str = "fsroute";

pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_SOAP: &str = "application/soap+xml";

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error(transparent)]
    Cookie(#[from] CookieError),

    #[error("failed to serialize response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid header {0:?}")]
    InvalidHeader(String),
}

#[derive(Debug, Clone)]
struct Produced {
    status: StatusCode,
    content_type: Option<HeaderValue>,
    body: Bytes,
}

/// Request-scoped response builder.
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
    jar: CookieJar,
    set_cookie: Option<HeaderValue>,
    powered_by: bool,
    codec: Arc<CookieCodec>,
    produced: Option<Produced>,
}

impl ResponseBuilder {
    pub fn new(codec: Arc<CookieCodec>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            jar: CookieJar::new(),
            set_cookie: None,
            powered_by: true,
            codec,
            produced: None,
        }
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn current_status(&self) -> StatusCode {
        self.status
    }

    /// Add or replace a custom header applied to every produced response.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, ResponseError> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| ResponseError::InvalidHeader(name.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|_| ResponseError::InvalidHeader(name.to_string()))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn disable_powered_by(&mut self) -> &mut Self {
        self.powered_by = false;
        self
    }

    pub fn powered_by_enabled(&self) -> bool {
        self.powered_by
    }

    /// Plain-text response with the current status.
    pub fn send(&mut self, text: impl Into<String>) -> Response {
        let body = Bytes::from(text.into());
        self.produce(self.status, Some(HeaderValue::from_static(TEXT_PLAIN)), body)
    }

    /// JSON response with the current status.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<Response, ResponseError> {
        let body = Bytes::from(serde_json::to_vec(value)?);
        Ok(self.produce(self.status, Some(HeaderValue::from_static(APPLICATION_JSON)), body))
    }

    /// SOAP/XML response with the current status.
    pub fn soap(&mut self, xml: impl Into<String>) -> Response {
        let body = Bytes::from(xml.into());
        self.produce(self.status, Some(HeaderValue::from_static(APPLICATION_SOAP)), body)
    }

    /// Raw bytes with an explicit content type.
    pub fn send_bytes(&mut self, content_type: HeaderValue, bytes: impl Into<Bytes>) -> Response {
        self.produce(self.status, Some(content_type), bytes.into())
    }

    /// Empty body with the given status.
    pub fn send_status(&mut self, status: StatusCode) -> Response {
        self.status = status;
        self.produce(status, None, Bytes::new())
    }

    /// Set a cookie. Structured values are stored as `j:` JSON; `signed`
    /// requires the codec's secret.
    pub fn cookie(
        &mut self,
        name: &str,
        value: impl Into<CookieValue>,
        options: CookieOptions,
    ) -> Result<&mut Self, ResponseError> {
        let stored = self.codec.encode_value(&value.into(), options.signed)?;
        let wire = WireOptions::normalize(&options);
        self.store_cookie(name, &stored, &wire)?;
        Ok(self)
    }

    /// Expire a cookie: empty value, `Expires` at the epoch, no `Max-Age`.
    pub fn clear_cookie(&mut self, name: &str, options: CookieOptions) -> Result<&mut Self, ResponseError> {
        let options = CookieOptions {
            max_age: None,
            expires: Some(DateTime::<Utc>::UNIX_EPOCH),
            signed: false,
            ..options
        };
        let wire = WireOptions::normalize(&options);
        self.store_cookie(name, "", &wire)?;
        Ok(self)
    }

    /// Current joined `Set-Cookie` value, if any cookie was set.
    pub fn set_cookie_header(&self) -> Option<&HeaderValue> {
        self.set_cookie.as_ref()
    }

    pub fn has_response(&self) -> bool {
        self.produced.is_some()
    }

    /// The last produced response, rendered with the headers and cookies
    /// accumulated so far.
    pub fn take_response(&mut self) -> Option<Response> {
        let produced = self.produced.take()?;
        Some(self.render(&produced))
    }

    fn store_cookie(&mut self, name: &str, stored: &str, wire: &WireOptions) -> Result<(), ResponseError> {
        let serialized = cookie::serialize(name, stored, wire)?;
        self.jar.insert(name, serialized);
        self.set_cookie = match self.jar.header_value() {
            Some(joined) => Some(
                HeaderValue::from_str(&joined).map_err(|_| ResponseError::InvalidHeader(SET_COOKIE.to_string()))?,
            ),
            None => None,
        };
        Ok(())
    }

    fn produce(&mut self, status: StatusCode, content_type: Option<HeaderValue>, body: Bytes) -> Response {
        let produced = Produced {
            status,
            content_type,
            body,
        };
        let response = self.render(&produced);
        self.produced = Some(produced);
        response
    }

    fn render(&self, produced: &Produced) -> Response {
        let mut response = Response::new(Body::from(produced.body.clone()));
        *response.status_mut() = produced.status;

        let headers = response.headers_mut();
        if let Some(content_type) = &produced.content_type {
            headers.insert(CONTENT_TYPE, content_type.clone());
        }
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        if let Some(cookies) = &self.set_cookie {
            headers.insert(SET_COOKIE, cookies.clone());
        }
        if self.powered_by {
            headers.insert(X_POWERED_BY, HeaderValue::from_static(POWERED_BY));
        }
        response
    }
}

/// Plain-text response produced by the router itself.
pub fn plain_response(status: StatusCode, text: &'static str, powered_by: bool) -> Response {
    let mut response = Response::new(Body::from(text));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    if powered_by {
        headers.insert(X_POWERED_BY, HeaderValue::from_static(POWERED_BY));
    }
    response
}

/// Empty 200 used when middleware stops the chain without responding.
pub fn empty_response(powered_by: bool) -> Response {
    let mut response = Response::new(Body::empty());
    if powered_by {
        response
            .headers_mut()
            .insert(X_POWERED_BY, HeaderValue::from_static(POWERED_BY));
    }
    response
}

/// JSON response produced by the router itself.
pub fn json_response(status: StatusCode, body: &serde_json::Value, powered_by: bool) -> Response {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    if powered_by {
        headers.insert(X_POWERED_BY, HeaderValue::from_static(POWERED_BY));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder() -> ResponseBuilder {
        ResponseBuilder::new(Arc::new(CookieCodec::new("foo bar baz").unwrap()))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_content_types() {
        let mut res = builder();
        let response = res.send("Hello World");
        assert_eq!(response.headers()[CONTENT_TYPE], TEXT_PLAIN);
        assert_eq!(response.headers()[X_POWERED_BY], POWERED_BY);
        assert_eq!(body_text(response).await, "Hello World");

        let response = res.json(&json!({"message": "test"})).unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], APPLICATION_JSON);
        assert_eq!(body_text(response).await, r#"{"message":"test"}"#);

        let response = res.soap("<soap>test</soap>");
        assert_eq!(response.headers()[CONTENT_TYPE], APPLICATION_SOAP);
    }

    #[tokio::test]
    async fn test_status_and_headers() {
        let mut res = builder();
        res.status(StatusCode::CREATED);
        res.set_header("X-Custom-Header", "test-value").unwrap();
        let response = res.json(&json!({"test": true})).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-custom-header"], "test-value");

        assert!(res.set_header("bad header", "x").is_err());
    }

    #[tokio::test]
    async fn test_send_status_and_powered_by() {
        let mut res = builder();
        let response = res.send_status(StatusCode::NO_CONTENT);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[X_POWERED_BY], POWERED_BY);
        assert!(body_text(response).await.is_empty());

        res.disable_powered_by();
        let response = res.json(&json!({"test": true})).unwrap();
        assert!(response.headers().get(X_POWERED_BY).is_none());
    }

    #[tokio::test]
    async fn test_cookies_are_reapplied() {
        let mut res = builder();
        res.cookie("name", "Peter Griffin", CookieOptions::new()).unwrap();
        res.cookie("user", json!({"name": "Peter Griffin"}), CookieOptions::new().signed(true))
            .unwrap();
        let response = res.send("ok");
        assert_eq!(
            response.headers()[SET_COOKIE],
            "name=Peter%20Griffin; Path=/,user=s%3Aj%3A%7B%22name%22%3A%22Peter%20Griffin%22%7D.XdjwahglLERZjWTsExhpchNg3xA8fFlc6CskkbRpltY; Path=/"
        );

        // A cookie set after the terminal call still reaches the taken response.
        res.cookie("late", "1", CookieOptions::new()).unwrap();
        let response = res.take_response().unwrap();
        let header = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
        assert!(header.ends_with("late=1; Path=/"), "{header}");
        assert_eq!(body_text(response).await, "ok");
        assert!(!res.has_response());
    }

    #[test]
    fn test_clear_cookie() {
        let mut res = builder();
        res.clear_cookie("sid", CookieOptions::new().max_age_ms(60_000)).unwrap();
        assert_eq!(
            res.set_cookie_header().unwrap(),
            "sid=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
        );
    }

    #[test]
    fn test_invalid_cookie_is_an_error() {
        let mut res = builder();
        let err = res
            .cookie("bad name", "v", CookieOptions::new())
            .unwrap_err();
        assert!(matches!(err, ResponseError::Cookie(CookieError::InvalidName(_))));
        assert!(res.set_cookie_header().is_none());
    }
}
