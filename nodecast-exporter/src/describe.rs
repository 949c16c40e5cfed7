//! Instance label resolution.

use crate::routing::{RoutingRule, FALLBACK_DESCRIPTION_FIELDS};
use serde_json::Value;
use std::collections::HashMap;

/// Picks a human-readable label for a measured instance: first the concept's
/// configured field order, then the global fallback order. An empty value
/// counts as absent; `"0"` and other falsy-looking values are kept. Returns
/// `""` when nothing matches, which callers treat as "no label, use index".
pub fn resolve(rule: &RoutingRule, attributes: &HashMap<String, Value>) -> String {
    let candidates = rule
        .description_fields
        .iter()
        .map(String::as_str)
        .chain(FALLBACK_DESCRIPTION_FIELDS.iter().copied());

    for field in candidates {
        if let Some(value) = attributes.get(field) {
            let text = scalar_text(value);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
