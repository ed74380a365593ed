//! Route method keys.

use std::fmt;

use axum::http::Method;

/// Handler slot of a route: one of the HTTP methods or the GET fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    /// Fallback handler, only consulted for GET requests.
    Default,
}

impl RouteMethod {
    pub const ALL: [RouteMethod; 8] = [
        RouteMethod::Get,
        RouteMethod::Post,
        RouteMethod::Put,
        RouteMethod::Delete,
        RouteMethod::Patch,
        RouteMethod::Options,
        RouteMethod::Head,
        RouteMethod::Default,
    ];

    /// Map an HTTP method onto its slot. Methods outside the supported set map to `None`.
    pub fn from_http(method: &Method) -> Option<Self> {
        let slot = match *method {
            Method::GET => RouteMethod::Get,
            Method::POST => RouteMethod::Post,
            Method::PUT => RouteMethod::Put,
            Method::DELETE => RouteMethod::Delete,
            Method::PATCH => RouteMethod::Patch,
            Method::OPTIONS => RouteMethod::Options,
            Method::HEAD => RouteMethod::Head,
            _ => return None,
        };
        Some(slot)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Delete => "DELETE",
            RouteMethod::Patch => "PATCH",
            RouteMethod::Options => "OPTIONS",
            RouteMethod::Head => "HEAD",
            RouteMethod::Default => "default",
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http() {
        assert_eq!(RouteMethod::from_http(&Method::GET), Some(RouteMethod::Get));
        assert_eq!(RouteMethod::from_http(&Method::HEAD), Some(RouteMethod::Head));
        assert_eq!(RouteMethod::from_http(&Method::TRACE), None);
    }
}
