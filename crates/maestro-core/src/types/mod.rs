//! Value and context types

pub mod value;

pub use value::Value;

use std::collections::HashMap;

/// A flat per-call mapping from field name to value
///
/// Contexts are supplied by callers for every evaluation and are never
/// persisted by the rule engine.
pub type Context = HashMap<String, Value>;

/// Build a context from a JSON object
///
/// Non-object JSON yields an empty context.
pub fn context_from_json(json: serde_json::Value) -> Context {
    match json {
        serde_json::Value::Object(map) => map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        _ => Context::new(),
    }
}
