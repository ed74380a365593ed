//! Per-route and per-method configuration.
//!
//! A route file may attach a schema and a middleware list to the whole route,
//! and override either of them for a single method. Lookups prefer the
//! method-specific value and fall back to the route-level one, field by field.

use std::collections::HashMap;
use std::fmt;

use crate::dispatch::middleware::Middleware;
use crate::routing::method::RouteMethod;
use crate::validation::RouteSchema;

/// Schema and middleware for a route or one of its methods.
#[derive(Clone, Default)]
pub struct RouteOptions {
    pub schema: Option<RouteSchema>,
    pub middleware: Option<Vec<Middleware>>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema: RouteSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn middleware(mut self, chain: Vec<Middleware>) -> Self {
        self.middleware = Some(chain);
        self
    }

    /// Append one middleware to the chain.
    pub fn with(mut self, step: Middleware) -> Self {
        self.middleware.get_or_insert_with(Vec::new).push(step);
        self
    }
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions")
            .field("schema", &self.schema)
            .field("middleware", &self.middleware.as_ref().map(Vec::len))
            .finish()
    }
}

/// Route-level options plus method overrides.
#[derive(Clone, Default, Debug)]
pub struct RouteConfig {
    pub route: RouteOptions,
    pub methods: HashMap<RouteMethod, RouteOptions>,
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema: RouteSchema) -> Self {
        self.route.schema = Some(schema);
        self
    }

    pub fn middleware(mut self, chain: Vec<Middleware>) -> Self {
        self.route.middleware = Some(chain);
        self
    }

    /// Options that apply only to `method`.
    pub fn method(mut self, method: RouteMethod, options: RouteOptions) -> Self {
        self.methods.insert(method, options);
        self
    }

    /// Effective schema for `method`.
    pub fn schema_for(&self, method: RouteMethod) -> Option<&RouteSchema> {
        self.methods
            .get(&method)
            .and_then(|o| o.schema.as_ref())
            .or(self.route.schema.as_ref())
    }

    /// Effective middleware chain for `method`; empty when none is configured.
    pub fn middleware_for(&self, method: RouteMethod) -> &[Middleware] {
        self.methods
            .get(&method)
            .and_then(|o| o.middleware.as_deref())
            .or(self.route.middleware.as_deref())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::middleware::middleware;
    use serde_json::json;

    fn noop() -> Middleware {
        middleware(|_req, _res, next| {
            Box::pin(async move {
                next.run();
                Ok(())
            })
        })
    }

    #[test]
    fn test_method_options_take_precedence() {
        let config = RouteConfig::new()
            .schema(RouteSchema::new().query(json!({"type": "object"})))
            .middleware(vec![noop()])
            .method(
                RouteMethod::Post,
                RouteOptions::new()
                    .schema(RouteSchema::new().body(json!({"type": "object"})))
                    .with(noop())
                    .with(noop()),
            );

        assert!(config.schema_for(RouteMethod::Post).unwrap().body.is_some());
        assert!(config.schema_for(RouteMethod::Get).unwrap().query.is_some());
        assert_eq!(config.middleware_for(RouteMethod::Post).len(), 2);
        assert_eq!(config.middleware_for(RouteMethod::Get).len(), 1);
    }

    #[test]
    fn test_fields_fall_back_independently() {
        let config = RouteConfig::new()
            .middleware(vec![noop()])
            .method(RouteMethod::Put, RouteOptions::new().schema(RouteSchema::new()));
        assert_eq!(config.middleware_for(RouteMethod::Put).len(), 1);
        assert!(RouteConfig::new().middleware_for(RouteMethod::Get).is_empty());
    }
}
