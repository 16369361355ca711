//! Classification and unit identity properties

use infogen::classify::{classify, FailureKind, LIMIT_MESSAGE};
use infogen::state::UnitId;
use proptest::prelude::*;

/// Unrecognised text is passed through verbatim
#[test]
fn test_unknown_keeps_raw_text() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(&any::<String>(), |raw| {
            let classification = classify(&raw);
            if classification.kind == FailureKind::Unknown {
                prop_assert_eq!(classification.message, raw);
            }
            Ok(())
        })
        .unwrap();
}

/// A limit phrase is recognised regardless of surrounding text and case
#[test]
fn test_limit_phrase_detected_anywhere() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(&("[a-z ]{0,20}", "[a-z ]{0,20}"), |(prefix, suffix)| {
            // Keep the earlier rules out of the surrounding noise.
            prop_assume!(
                classify(&format!("{} {}", prefix, suffix)).kind == FailureKind::Unknown
            );
            let raw = format!("{}DAILY Limit{}", prefix, suffix);
            let classification = classify(&raw);
            prop_assert_eq!(classification.kind, FailureKind::Limit);
            prop_assert_eq!(classification.message, LIMIT_MESSAGE);
            Ok(())
        })
        .unwrap();
}

/// Short links and watch links for the same video map to one unit
#[test]
fn test_video_links_share_unit_id() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(&"[A-Za-z0-9_-]{11}", |video| {
            let short = UnitId::from_url(&format!("https://youtu.be/{}", video)).unwrap();
            let watch =
                UnitId::from_url(&format!("https://www.youtube.com/watch?v={}&t=42", video))
                    .unwrap();
            prop_assert_eq!(short.as_str(), video.as_str());
            prop_assert_eq!(short, watch);
            Ok(())
        })
        .unwrap();
}
