//! Best-effort value coercion used by condition operators.

use serde_json::Value;

/// Render a context or condition value as the string operators compare against.
///
/// Strings are used verbatim, numbers and booleans in their canonical JSON form,
/// `null` as the empty string. Arrays and objects fall back to compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Coerce a value to `f64`.
///
/// Integers, floats and numeric strings coerce; everything else (including
/// non-finite parses like `"NaN"`) does not.
pub fn to_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    number.is_finite().then_some(number)
}

/// Coerce a value to an integer threshold, truncating fractional parts.
pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| to_f64(value).map(|f| f.trunc() as i64)),
        _ => to_f64(value).map(|f| f.trunc() as i64),
    }
}

/// Interpret a value as a list of strings.
///
/// Arrays yield their stringified members; a string is split on commas with
/// surrounding whitespace trimmed. Other values are not lists.
pub fn to_string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().map(stringify).collect()),
        Value::String(s) => Some(s.split(',').map(|item| item.trim().to_string()).collect()),
        _ => None,
    }
}
