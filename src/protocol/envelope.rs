//! Request encoding and streaming response envelope decoding.

use serde_json::{json, Value};

/// Anti-JSON-hijacking guard the service prepends to every response body.
pub const HIJACK_PREFIX: &str = ")]}'";

/// Wrap a procedure payload in the nested-array call format (`f.req` form value).
///
/// The payload is serialised to a string and embedded as the second element of
/// the innermost call tuple, so the wire body is JSON containing JSON.
pub fn encode_request(procedure: &str, payload: &Value) -> String {
    json!([[[procedure, payload.to_string(), Value::Null, "generic"]]]).to_string()
}

/// Remove the hijack guard if present.
pub fn strip_hijack_prefix(raw: &str) -> &str {
    raw.strip_prefix(HIJACK_PREFIX).unwrap_or(raw)
}

/// Decode a multi-chunk envelope and return the payload addressed to `expected`.
///
/// Lines that are not JSON arrays (length markers, garbage, truncated chunks)
/// are skipped. Chunk arrays are flattened one level and the first entry whose
/// second field equals `expected` and whose third field is non-empty wins. The
/// third field is parsed as JSON, falling back to the raw string.
///
/// Returns an empty array when nothing matches; callers decide whether that is
/// an error.
pub fn decode_response(raw: &str, expected: &str) -> Value {
    let text = strip_hijack_prefix(raw);

    let entries = text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('['))
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|chunk| match chunk {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .flatten();

    for entry in entries {
        let Value::Array(fields) = &entry else {
            continue;
        };
        if fields.len() <= 2 || fields[1].as_str() != Some(expected) {
            continue;
        }
        let inner = &fields[2];
        if !is_truthy(inner) {
            continue;
        }
        return match inner {
            Value::String(body) => {
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone()))
            }
            other => other.clone(),
        };
    }

    Value::Array(Vec::new())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
