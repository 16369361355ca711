//! Decoder robustness and payload recovery

use infogen::protocol::{decode_response, find_identifier_like, is_identifier_like, HIJACK_PREFIX};
use proptest::prelude::*;
use serde_json::{json, Value};

fn wrap(rpcid: &str, inner: &Value) -> String {
    let chunk = json!([["wrb.fr", rpcid, inner.to_string(), null, null, null, "generic"]]);
    format!("{}\n\n{}\n{}\n", HIJACK_PREFIX, chunk.to_string().len(), chunk)
}

fn payload() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::vec(inner, 1..4).prop_map(Value::Array)
    })
    .prop_map(|value| json!([value]))
}

/// The decoder never panics, whatever the body looks like
#[test]
fn test_decode_total_on_arbitrary_text() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(&(any::<String>(), "[a-zA-Z]{6}"), |(body, rpcid)| {
            let _ = decode_response(&body, &rpcid);
            let _ = decode_response(&format!("{}\n{}", HIJACK_PREFIX, body), &rpcid);
            Ok(())
        })
        .unwrap();
}

/// A non-empty inner payload comes back as the parsed value
#[test]
fn test_decode_recovers_payload() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(&(payload(), "[a-zA-Z]{6}"), |(inner, rpcid)| {
            let decoded = decode_response(&wrap(&rpcid, &inner), &rpcid);
            prop_assert_eq!(decoded, inner);
            Ok(())
        })
        .unwrap();
}

/// Chunks for other procedures are never returned
#[test]
fn test_decode_ignores_other_procedures() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(&(payload(), "[a-z]{6}", "[A-Z]{6}"), |(inner, wanted, other)| {
            let decoded = decode_response(&wrap(&other, &inner), &wanted);
            prop_assert_eq!(decoded, json!([]));
            Ok(())
        })
        .unwrap();
}

/// Any hyphenated 8-4-4-4-12 string is found wherever it is nested
#[test]
fn test_identifier_found_at_any_depth() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(
            &("[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}", 0usize..6),
            |(id, depth)| {
                prop_assert!(is_identifier_like(&id));
                let mut value = json!(["noise", 42, id.clone()]);
                for _ in 0..depth {
                    value = json!([null, value]);
                }
                prop_assert_eq!(find_identifier_like(&value), Some(id));
                Ok(())
            },
        )
        .unwrap();
}
