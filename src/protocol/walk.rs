//! Schema-tolerant searches over decoded payloads.
//!
//! Responses are positional nested arrays whose layout drifts between service
//! releases, so lookups walk the `serde_json::Value` tree (scalar / sequence /
//! mapping) depth-first and return the first value satisfying a predicate.

use serde_json::Value;

/// UUID shape used for notebook and source ids: 36 characters, exactly 4 hyphens.
pub fn is_identifier_like(candidate: &str) -> bool {
    candidate.chars().count() == 36 && candidate.matches('-').count() == 4
}

/// First string anywhere in `value` satisfying `predicate`, depth-first.
///
/// Strings that look like embedded JSON (`[` or `{` prefix) are parsed and
/// searched in place when they do not match themselves.
pub fn find_string<P>(value: &Value, predicate: &P) -> Option<String>
where
    P: Fn(&str) -> bool,
{
    match value {
        Value::String(s) => {
            if predicate(s) {
                return Some(s.clone());
            }
            if s.starts_with('[') || s.starts_with('{') {
                if let Ok(nested) = serde_json::from_str::<Value>(s) {
                    return find_string(&nested, predicate);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| find_string(item, predicate)),
        Value::Object(map) => map.values().find_map(|item| find_string(item, predicate)),
        _ => None,
    }
}

/// First UUID-shaped string in `value`, or `None`.
pub fn find_identifier_like(value: &Value) -> Option<String> {
    find_string(value, &is_identifier_like)
}

/// Every UUID-shaped string reachable through arrays, in document order.
///
/// Unlike [`find_identifier_like`] this does not descend into mappings or
/// embedded JSON strings; the source listing is a plain nested array.
pub fn collect_identifiers(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_into(value, &mut out);
    out
}

fn collect_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if is_identifier_like(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_into(item, out)),
        _ => {}
    }
}

/// Locate the download URL of a generated artifact of `type_tag`.
///
/// Artifact rows carry their type at index 2; the URL lives at
/// `row[14][2][0][1][0]` and must be absolute.
pub fn find_artifact_url(value: &Value, type_tag: u64) -> Option<String> {
    let Value::Array(row) = value else {
        return None;
    };
    if row.len() > 2 && row[2].as_u64() == Some(type_tag) {
        if let Some(url) = artifact_slot(row) {
            return Some(url);
        }
    }
    row.iter()
        .find_map(|child| find_artifact_url(child, type_tag))
}

fn artifact_slot(row: &[Value]) -> Option<String> {
    let url = row.get(14)?.get(2)?.get(0)?.get(1)?.get(0)?.as_str()?;
    url.starts_with("http").then(|| url.to_string())
}
