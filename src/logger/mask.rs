use serde::Serialize;
use serde_json::{Map, Value};

/// Placeholder written in place of masked values.
pub const MASKED: &str = "[Masked]";

/// Capability interface for values that opt in to masking. A type
/// names its own sensitive fields; `Attr::masked` applies them to the
/// serialized form.
///
/// Field names match at any nesting depth. A matched field whose value
/// is itself a map or list keeps its shape but has every leaf masked.
pub trait Sensitive: Serialize {
    fn sensitive_fields() -> &'static [&'static str];
}

/// Walks a JSON value and replaces sensitive leaves with [`MASKED`].
///
/// `hidden` marks the current subtree as sensitive because an ancestor
/// field matched; it propagates downward and masks every leaf below.
/// `null` is left untouched so absent data never masquerades as masked
/// data. The operation is idempotent: masking a masked tree is a no-op
/// shape-wise, since the placeholder is itself a plain string leaf.
pub fn mask_value(value: &Value, hidden: bool, sensitive: &[&str]) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                let child_hidden = hidden || sensitive.iter().any(|f| f == key);
                out.insert(key.clone(), mask_value(child, child_hidden, sensitive));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| mask_value(item, hidden, sensitive))
                .collect(),
        ),
        leaf => {
            if hidden {
                Value::String(MASKED.to_string())
            } else {
                leaf.clone()
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
