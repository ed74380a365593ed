//! Pre-validation normalization.
//!
//! Query strings, path params and headers arrive as text, so before a value is
//! checked against its schema it is rewritten in place:
//! - missing properties with a `default` are filled in
//! - properties not declared in `properties` are removed
//! - scalars are coerced towards the declared `type`
//!
//! Values that cannot be coerced are left untouched for the validator to reject.

use serde_json::{Map, Number, Value};

/// Normalize `value` against `schema` in place.
pub fn normalize(value: &mut Value, schema: &Value) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    coerce_type(value, schema);

    match value {
        Value::Object(map) => normalize_object(map, schema),
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items.iter_mut() {
                    normalize(item, item_schema);
                }
            }
        }
        _ => {}
    }
}

fn normalize_object(map: &mut Map<String, Value>, schema: &Map<String, Value>) {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };

    map.retain(|key, _| properties.contains_key(key));

    for (name, property_schema) in properties {
        if !map.contains_key(name) {
            if let Some(default) = property_schema.get("default") {
                map.insert(name.clone(), default.clone());
            }
        }
        if let Some(child) = map.get_mut(name) {
            normalize(child, property_schema);
        }
    }
}

fn declared_types(schema: &Map<String, Value>) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn matches_type(value: &Value, ty: &str) -> bool {
    match ty {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn coerce_type(value: &mut Value, schema: &Map<String, Value>) {
    let types = declared_types(schema);
    if types.is_empty() || types.iter().any(|ty| matches_type(value, ty)) {
        return;
    }
    for ty in types {
        if let Some(coerced) = coerce_scalar(value, ty) {
            *value = coerced;
            return;
        }
    }
}

fn coerce_scalar(value: &Value, ty: &str) -> Option<Value> {
    match (ty, value) {
        ("string", Value::Number(n)) => Some(Value::String(n.to_string())),
        ("string", Value::Bool(b)) => Some(Value::String(b.to_string())),
        ("string", Value::Null) => Some(Value::String(String::new())),

        ("number", Value::String(s)) => parse_number(s),
        ("integer", Value::String(s)) => parse_number(s).filter(|n| matches_type(n, "integer")),
        ("number" | "integer", Value::Bool(b)) => Some(Value::from(u8::from(*b))),
        ("number" | "integer", Value::Null) => Some(Value::from(0)),

        ("boolean", Value::String(s)) if s == "true" => Some(Value::Bool(true)),
        ("boolean", Value::String(s)) if s == "false" => Some(Value::Bool(false)),
        ("boolean", Value::Number(n)) if n.as_f64() == Some(1.0) => Some(Value::Bool(true)),
        ("boolean", Value::Number(n)) if n.as_f64() == Some(0.0) => Some(Value::Bool(false)),
        ("boolean", Value::Null) => Some(Value::Bool(false)),

        ("null", Value::String(s)) if s.is_empty() => Some(Value::Null),
        ("null", Value::Number(n)) if n.as_f64() == Some(0.0) => Some(Value::Null),
        ("null", Value::Bool(false)) => Some(Value::Null),

        _ => None,
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if text.is_empty() || text.trim() != text {
        return None;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::from(i));
    }
    if let Ok(u) = text.parse::<u64>() {
        return Some(Value::from(u));
    }
    let f = text.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Number::from_f64(f).map(Value::Number)
}
