//! Schema validation for request phases.
//!
//! # Responsibilities
//! - Define the pluggable [`SchemaValidator`] capability
//! - Provide the default JSON Schema implementation with compiled-schema caching
//! - Run one gate per request phase (body, params, query, headers)
//!
//! # Design Decisions
//! - Validation works on a normalized clone; on success the clone replaces the input
//! - All errors are reported, each with a JSON pointer locator (`root` for the document)
//! - A schema that fails to compile is a server fault, not a client error

pub mod coerce;

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::http::query::QueryParser;

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Outcome of validating one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<FieldError>,
    /// Normalized value, present only when `valid`.
    pub data: Option<Value>,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema compilation failed: {0}")]
    Compile(String),
}

/// External validation capability.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, value: &Value, schema: &Value) -> Result<Validation, SchemaError>;
}

/// Default validator backed by the `jsonschema` crate.
#[derive(Default)]
pub struct JsonSchemaValidator {
    compiled: DashMap<String, Arc<jsonschema::Validator>>,
}

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(&self, schema: &Value) -> Result<Arc<jsonschema::Validator>, SchemaError> {
        let key = schema.to_string();
        if let Some(validator) = self.compiled.get(&key) {
            return Ok(validator.clone());
        }

        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(schema)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;
        let validator = Arc::new(validator);
        self.compiled.insert(key, validator.clone());
        tracing::debug!(cached = self.compiled.len(), "Compiled schema");
        Ok(validator)
    }

    pub fn cached(&self) -> usize {
        self.compiled.len()
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("cached", &self.compiled.len())
            .finish()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, value: &Value, schema: &Value) -> Result<Validation, SchemaError> {
        let validator = self.compile(schema)?;

        let mut data = value.clone();
        coerce::normalize(&mut data, schema);

        let errors: Vec<FieldError> = validator
            .iter_errors(&data)
            .map(|error| {
                let path = error.instance_path.to_string();
                FieldError {
                    field: if path.is_empty() { "root".to_string() } else { path },
                    message: error.to_string(),
                }
            })
            .collect();

        let valid = errors.is_empty();
        Ok(Validation {
            valid,
            errors,
            data: valid.then_some(data),
        })
    }
}

/// Request phase a schema applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Body,
    Params,
    Query,
    Headers,
}

impl Phase {
    /// Gate order.
    pub const ORDER: [Phase; 4] = [Phase::Body, Phase::Params, Phase::Query, Phase::Headers];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Body => "body",
            Phase::Params => "params",
            Phase::Query => "query",
            Phase::Headers => "headers",
        }
    }
}

/// Schemas attached to a route or method.
#[derive(Debug, Clone, Default)]
pub struct RouteSchema {
    pub body: Option<Value>,
    pub query: Option<Value>,
    pub params: Option<Value>,
    pub headers: Option<Value>,
    /// Overrides the dispatcher's query parser for this route.
    pub query_parser: Option<QueryParser>,
}

impl RouteSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, schema: Value) -> Self {
        self.body = Some(schema);
        self
    }

    pub fn query(mut self, schema: Value) -> Self {
        self.query = Some(schema);
        self
    }

    pub fn params(mut self, schema: Value) -> Self {
        self.params = Some(schema);
        self
    }

    pub fn headers(mut self, schema: Value) -> Self {
        self.headers = Some(schema);
        self
    }

    pub fn query_parser(mut self, parser: QueryParser) -> Self {
        self.query_parser = Some(parser);
        self
    }

    pub fn for_phase(&self, phase: Phase) -> Option<&Value> {
        match phase {
            Phase::Body => self.body.as_ref(),
            Phase::Params => self.params.as_ref(),
            Phase::Query => self.query.as_ref(),
            Phase::Headers => self.headers.as_ref(),
        }
    }
}

/// Result of one gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Passed,
    Rejected(Vec<FieldError>),
}

/// Validate `value` for `phase`. On success the normalized data replaces `value`.
pub fn gate(
    validator: &dyn SchemaValidator,
    phase: Phase,
    schema: &Value,
    value: &mut Value,
) -> Result<GateOutcome, SchemaError> {
    let result = validator.validate(value, schema)?;
    if !result.valid {
        tracing::debug!(phase = phase.as_str(), errors = result.errors.len(), "Validation rejected request");
        return Ok(GateOutcome::Rejected(result.errors));
    }
    if let Some(data) = result.data {
        *value = data;
    }
    Ok(GateOutcome::Passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn year_schema() -> Value {
        json!({
            "type": "object",
            "properties": {"year": {"type": "integer", "minimum": 1900, "maximum": 2100}},
            "required": ["year"]
        })
    }

    #[test]
    fn test_valid_value_is_coerced() {
        let validator = JsonSchemaValidator::new();
        let result = validator.validate(&json!({"year": "2024"}), &year_schema()).unwrap();
        assert!(result.valid);
        assert_eq!(result.data, Some(json!({"year": 2024})));
    }

    #[test]
    fn test_invalid_values_report_errors() {
        let validator = JsonSchemaValidator::new();
        for query in [json!({"year": "invalid"}), json!({"year": "2500"}), json!({})] {
            let result = validator.validate(&query, &year_schema()).unwrap();
            assert!(!result.valid, "{query}");
            assert!(!result.errors.is_empty());
            assert!(result.data.is_none());
        }

        let result = validator.validate(&json!({}), &year_schema()).unwrap();
        assert_eq!(result.errors[0].field, "root");

        let result = validator.validate(&json!({"year": "2500"}), &year_schema()).unwrap();
        assert_eq!(result.errors[0].field, "/year");
    }

    #[test]
    fn test_compiled_schemas_are_cached() {
        let validator = JsonSchemaValidator::new();
        validator.validate(&json!({"year": 2000}), &year_schema()).unwrap();
        validator.validate(&json!({"year": 2001}), &year_schema()).unwrap();
        assert_eq!(validator.cached(), 1);
    }

    #[test]
    fn test_bad_schema_is_an_error() {
        let validator = JsonSchemaValidator::new();
        let err = validator.validate(&json!({}), &json!({"type": 12})).unwrap_err();
        assert!(err.to_string().contains("schema compilation failed"));
    }

    #[test]
    fn test_gate_replaces_value() {
        let validator = JsonSchemaValidator::new();
        let mut query = json!({"year": "1999", "junk": "x"});
        let outcome = gate(&validator, Phase::Query, &year_schema(), &mut query).unwrap();
        assert_eq!(outcome, GateOutcome::Passed);
        assert_eq!(query, json!({"year": 1999}));

        let mut query = json!({"year": "x"});
        let outcome = gate(&validator, Phase::Query, &year_schema(), &mut query).unwrap();
        assert!(matches!(outcome, GateOutcome::Rejected(errors) if !errors.is_empty()));
        assert_eq!(query, json!({"year": "x"}));
    }
}
