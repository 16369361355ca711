//! Session token scraping from the service landing page.

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_BUILD_LABEL: &str = "boq_labs-tailwind-frontend_20260101.17_p0";

static SESSION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""FdrFJe":"([-0-9]+)""#).expect("session id pattern"));
static SESSION_ID_ESCAPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"FdrFJe\\":\\"([-0-9]+)\\""#).expect("escaped session id pattern"));
static BUILD_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(boq_[^"]+)""#).expect("build label pattern"));
static AUTH_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""SNlM0e":"([^"]+)""#).expect("auth token pattern"));

/// Tokens found in a landing page. `session_id` is mandatory for a usable session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedTokens {
    pub session_id: Option<String>,
    pub build_label: String,
    pub auth_token: Option<String>,
}

pub fn scrape_tokens(page: &str) -> ScrapedTokens {
    let session_id = capture(&SESSION_ID, page).or_else(|| capture(&SESSION_ID_ESCAPED, page));
    let build_label =
        capture(&BUILD_LABEL, page).unwrap_or_else(|| DEFAULT_BUILD_LABEL.to_string());
    let auth_token = capture(&AUTH_TOKEN, page);
    ScrapedTokens {
        session_id,
        build_label,
        auth_token,
    }
}

fn capture(pattern: &Regex, page: &str) -> Option<String> {
    pattern
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
