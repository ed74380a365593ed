//! Route matching logic.
//!
//! # Responsibilities
//! - Compare a concrete request path with a route pattern segment by segment
//! - Extract named parameters, including compound (`-`/`.` joined) segments
//! - Capture trailing catch-all segments as an ordered list
//!
//! # Design Decisions
//! - Pure function, no allocation beyond the returned bindings
//! - `-` and `.` are interchangeable delimiters inside compound segments;
//!   only the sub-part count has to agree
//! - Catch-all base segments bind whole segments without compound splitting
//! - No specificity ranking: callers try patterns in table order

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// A single extracted parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Value of a `:name` placeholder.
    Single(String),
    /// Segments captured by a trailing `name*` placeholder.
    CatchAll(Vec<String>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::CatchAll(_) => None,
        }
    }
}

impl From<ParamValue> for Value {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Single(s) => Value::String(s),
            ParamValue::CatchAll(parts) => Value::Array(parts.into_iter().map(Value::String).collect()),
        }
    }
}

/// Parameter bindings of a successful match. Empty for static routes.
pub type Params = HashMap<String, ParamValue>;

/// Convert bindings into a JSON object for validation and handlers.
pub fn params_to_json(params: Params) -> Map<String, Value> {
    params.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

/// Match `path` against `pattern`.
///
/// Returns `None` when the path does not match, and the (possibly empty)
/// parameter bindings otherwise.
pub fn match_route(path: &str, pattern: &str) -> Option<Params> {
    let path_segments: Vec<&str> = path.split('/').collect();
    let pattern_segments: Vec<&str> = pattern.split('/').collect();

    match pattern_segments.split_last() {
        Some((last, base)) if last.ends_with('*') => match_catch_all(&path_segments, base, last),
        _ => match_exact(&path_segments, &pattern_segments),
    }
}

fn match_catch_all(path: &[&str], base: &[&str], last: &str) -> Option<Params> {
    if path.len() < base.len() {
        return None;
    }

    let mut params = Params::new();
    for (expected, actual) in base.iter().zip(path) {
        if let Some(name) = expected.strip_prefix(':') {
            params.insert(name.to_string(), ParamValue::Single(actual.to_string()));
        } else if expected != actual {
            return None;
        }
    }

    let remaining = &path[base.len()..];
    if remaining.is_empty() {
        return None;
    }

    let name = last.trim_end_matches('*');
    let name = name.strip_prefix(':').unwrap_or(name);
    params.insert(
        name.to_string(),
        ParamValue::CatchAll(remaining.iter().map(|s| s.to_string()).collect()),
    );
    Some(params)
}

fn match_exact(path: &[&str], pattern: &[&str]) -> Option<Params> {
    if path.len() != pattern.len() {
        return None;
    }

    let mut params = Params::new();
    for (expected, actual) in pattern.iter().zip(path) {
        if !expected.contains(':') {
            if expected != actual {
                return None;
            }
            continue;
        }

        let expected_parts: Vec<&str> = expected.split(is_compound_delimiter).collect();
        let actual_parts: Vec<&str> = actual.split(is_compound_delimiter).collect();
        if expected_parts.len() != actual_parts.len() {
            return None;
        }

        for (part, value) in expected_parts.iter().zip(&actual_parts) {
            if let Some(name) = part.strip_prefix(':') {
                params.insert(name.to_string(), ParamValue::Single(value.to_string()));
            } else if part != value {
                return None;
            }
        }
    }
    Some(params)
}

fn is_compound_delimiter(c: char) -> bool {
    c == '-' || c == '.'
}
