//! Query string parsing strategies.
//!
//! # Responsibilities
//! - Turn the raw query string into a JSON value for validation and handlers
//! - Offer flat, nested/array-aware, disabled and caller-supplied parsers
//!
//! # Design Decisions
//! - Output is always a `serde_json::Value` so schemas can coerce it
//! - Repeated keys collect into arrays in order of appearance
//! - Nested parsing caps bracket depth; deeper brackets stay in the key

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied parser. Receives the raw query string without the leading `?`.
pub type QueryParserFn = Arc<dyn Fn(&str) -> Value + Send + Sync>;

const MAX_DEPTH: usize = 5;

/// Configured parser kind (the serializable subset of [`QueryParser`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryParserKind {
    None,
    #[default]
    Simple,
    #[serde(alias = "qs")]
    Extended,
}

/// Query parsing strategy.
#[derive(Clone, Default)]
pub enum QueryParser {
    /// Ignore the query string entirely.
    Disabled,
    /// Flat `key=value` pairs.
    #[default]
    Simple,
    /// Bracket-aware nested objects and arrays.
    Extended,
    /// Caller-supplied function.
    Custom(QueryParserFn),
}

impl QueryParser {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        QueryParser::Custom(Arc::new(f))
    }

    pub fn parse(&self, raw: &str) -> Value {
        match self {
            QueryParser::Disabled => Value::Object(Map::new()),
            QueryParser::Simple => parse_simple(raw),
            QueryParser::Extended => parse_extended(raw),
            QueryParser::Custom(f) => f(raw),
        }
    }
}

impl From<QueryParserKind> for QueryParser {
    fn from(kind: QueryParserKind) -> Self {
        match kind {
            QueryParserKind::None => QueryParser::Disabled,
            QueryParserKind::Simple => QueryParser::Simple,
            QueryParserKind::Extended => QueryParser::Extended,
        }
    }
}

impl fmt::Debug for QueryParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryParser::Disabled => f.write_str("Disabled"),
            QueryParser::Simple => f.write_str("Simple"),
            QueryParser::Extended => f.write_str("Extended"),
            QueryParser::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn pairs(raw: &str) -> impl Iterator<Item = (String, String)> + '_ {
    url::form_urlencoded::parse(raw.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned()))
}

/// Insert a value, turning repeated keys into an array.
fn append(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

fn parse_simple(raw: &str) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs(raw) {
        append(&mut map, key, Value::String(value));
    }
    Value::Object(map)
}

fn parse_extended(raw: &str) -> Value {
    let mut root = Map::new();
    for (key, value) in pairs(raw) {
        let path = split_key(&key);
        insert_path(&mut root, &path, Value::String(value));
    }
    Value::Object(root)
}

/// Split `a[b][c]` into `["a", "b", "c"]`; `[]` becomes an empty segment.
fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if open == 0 {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while segments.len() <= MAX_DEPTH {
        let Some(inner) = rest.strip_prefix('[') else {
            break;
        };
        let Some(close) = inner.find(']') else {
            break;
        };
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }

    if !rest.is_empty() {
        if let Some(last) = segments.last_mut() {
            last.push_str(rest);
        }
    }
    segments
}

fn insert_path(map: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((head, tail)) = path.split_first() else {
        return;
    };
    let Some(next) = tail.first() else {
        append(map, head.clone(), value);
        return;
    };

    if next.is_empty() {
        let slot = map.entry(head.clone()).or_insert_with(|| Value::Array(Vec::new()));
        push_item(slot, &tail[1..], value);
        return;
    }

    let slot = map.entry(head.clone()).or_insert_with(|| Value::Object(Map::new()));
    if let Value::Array(items) = &mut *slot {
        // Named keys turn an array into an object keyed by index.
        let indexed = std::mem::take(items)
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect();
        *slot = Value::Object(indexed);
    }
    if !slot.is_object() {
        // A scalar and a nested key collided; the nested form wins.
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(child) = slot {
        insert_path(child, tail, value);
    }
}

/// Append `value`, nested under `rest`, to the `[]` collection in `slot`.
fn push_item(slot: &mut Value, rest: &[String], value: Value) {
    match slot {
        Value::Array(items) => {
            if rest.is_empty() {
                items.push(value);
            } else if let Some(Value::Object(first)) = items.first_mut() {
                // Repeated `a[][b]` pairs merge into the first element.
                insert_path(first, rest, value);
            } else {
                items.push(nested(rest, value));
            }
        }
        Value::Object(map) => {
            let key = (0usize..)
                .map(|i| i.to_string())
                .find(|k| !map.contains_key(k))
                .unwrap_or_default();
            let item = if rest.is_empty() { value } else { nested(rest, value) };
            map.insert(key, item);
        }
        other => {
            let first = other.take();
            *other = Value::Array(vec![first]);
            push_item(other, rest, value);
        }
    }
}

fn nested(path: &[String], value: Value) -> Value {
    let mut object = Map::new();
    insert_path(&mut object, path, value);
    Value::Object(object)
}
