use serde_json::Value;

/// Field names probed, in priority order, when gathering text out of a keyed
/// payload.
const TEXT_FIELDS: [&str; 5] = ["text", "content", "value", "data", "messages"];

/// Script-style truthiness over a JSON value: null, false, zero, and the
/// empty string are falsy; arrays and objects are truthy even when empty.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a scalar-ish value as display text; non-strings fall back to their
/// JSON rendering.
pub(crate) fn display_text(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// Pull human-readable text out of an arbitrarily shaped message payload.
///
/// Strings pass through, numbers and booleans are stringified, sequences
/// concatenate element-wise with no separator, and keyed structures recurse
/// into the first present-and-truthy field among `text`, `content`, `value`,
/// `data`, `messages`. Anything else yields empty text.
pub fn gather_text(value: &Value) -> String {
    if !is_truthy(value) {
        return String::new();
    }
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items.iter().map(gather_text).collect(),
        Value::Object(map) => {
            for field in TEXT_FIELDS {
                if let Some(inner) = map.get(field) {
                    if is_truthy(inner) {
                        return gather_text(inner);
                    }
                }
            }
            String::new()
        }
        Value::Null => String::new(),
    }
}
