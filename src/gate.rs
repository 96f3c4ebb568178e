// src/gate.rs
//
// Shared-secret gate in front of every route that can trigger upstream work.
// The caller secret is a static shared token, not a password, so a plain
// equality check is the contract; it is never forwarded upstream.

use std::collections::HashMap;

use axum::http::HeaderMap;
use metrics::counter;

/// Query parameter carrying the caller secret. Stripped before any upstream call.
pub const TOKEN_PARAM: &str = "token";
/// Header alternative for the same secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extract the caller-supplied secret: `X-Api-Key` header wins, `?token=` is the fallback.
pub fn caller_secret(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        let v = v.trim();
        if !v.is_empty() {
            return Some(v.to_string());
        }
    }
    query
        .get(TOKEN_PARAM)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Authorized iff both values are non-empty and exactly equal. Pure check.
pub fn authorize(provided: Option<&str>, expected: &str) -> bool {
    let ok = match provided {
        Some(p) => !p.is_empty() && !expected.is_empty() && p == expected,
        None => false,
    };
    if !ok {
        counter!("gate_rejected_total").increment(1);
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn exact_match_required() {
        assert!(authorize(Some("abc"), "abc"));
        assert!(!authorize(Some("abc "), "abc"));
        assert!(!authorize(Some("wrong"), "abc"));
        assert!(!authorize(None, "abc"));
    }

    #[test]
    fn empty_values_never_authorize() {
        assert!(!authorize(Some(""), "abc"));
        assert!(!authorize(Some(""), ""));
        // An unset gatekeeper must not open the gate.
        assert!(!authorize(Some("x"), ""));
    }

    #[test]
    fn header_takes_priority_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("from-header"));
        let mut query = HashMap::new();
        query.insert(TOKEN_PARAM.to_string(), "from-query".to_string());
        assert_eq!(caller_secret(&headers, &query).as_deref(), Some("from-header"));

        let headers = HeaderMap::new();
        assert_eq!(caller_secret(&headers, &query).as_deref(), Some("from-query"));
    }

    #[test]
    fn blank_header_falls_through_to_query() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("  "));
        let mut query = HashMap::new();
        query.insert(TOKEN_PARAM.to_string(), "q".to_string());
        assert_eq!(caller_secret(&headers, &query).as_deref(), Some("q"));
    }
}
