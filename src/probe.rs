// src/probe.rs
//
// Endpoint discovery against an upstream whose exact shape is unknown per
// tenant: a static, ordered candidate table is crossed with the configured
// base URLs and probed sequentially. First HTTP-200 + JSON-decodable
// response wins; everything else is recorded and the loop moves on.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{sign_client_token, AuthVariant, Secrets};
use crate::config::ProxyConfig;
use crate::gate::TOKEN_PARAM;

/// Proxy-local debug switch; never forwarded upstream.
pub const DEBUG_PARAM: &str = "debug";

/// One statically-enumerated (path, default params, auth scheme) combination.
/// Crossed with the configured base URLs at probe time. Order matters:
/// first success wins, no scoring.
pub struct Candidate {
    pub path: &'static str,
    pub params: &'static [(&'static str, &'static str)],
    pub auth: AuthVariant,
}

/// Default query mirroring the official UI's "open opportunities" kanban view.
const KANBAN_OPEN: &[(&str, &str)] = &[
    ("activityAreas", ""),
    ("expertiseAreas", ""),
    ("maxResults", "30"),
    ("opportunityStates", "6"), // 6 = "open" in the kanban board
    ("opportunityTypes", ""),
    ("order", "desc"),
    ("page", "1"),
    ("positioningStates", ""),
    ("returnMoreData", "previousAction,nextAction"),
    ("saveSearch", "true"),
    ("sort", "updateDate"),
    ("tools", ""),
    ("viewMode", "kanban"),
];

/// Reduced query for the secondary resource families.
const RECENT_FIRST: &[(&str, &str)] = &[
    ("maxResults", "30"),
    ("order", "desc"),
    ("page", "1"),
    ("sort", "updateDate"),
];

/// The probe order, most likely first. Read-only deployment data; tenants
/// needing a different base set it via BOOND_BASE_URLS.
pub static CANDIDATES: &[Candidate] = &[
    Candidate { path: "/api/opportunities", params: KANBAN_OPEN, auth: AuthVariant::JwtBoond },
    Candidate { path: "/api/opportunities", params: KANBAN_OPEN, auth: AuthVariant::JwtClient },
    Candidate { path: "/api/opportunities", params: KANBAN_OPEN, auth: AuthVariant::StaticHeaders },
    Candidate { path: "/api/opportunities", params: KANBAN_OPEN, auth: AuthVariant::BasicKey },
    Candidate { path: "/api/opportunities", params: KANBAN_OPEN, auth: AuthVariant::BasicToken },
    Candidate { path: "/api/opportunities", params: KANBAN_OPEN, auth: AuthVariant::BasicBare },
    Candidate { path: "/api/projects", params: RECENT_FIRST, auth: AuthVariant::JwtBoond },
    Candidate { path: "/api/projects", params: RECENT_FIRST, auth: AuthVariant::BasicKey },
];

/// Audit entry for one probe attempt; serialized verbatim in debug output.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub url: String,
    pub auth: &'static str,
    pub status: Option<u16>,
    pub ok: bool,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a full probing pass: the first decodable document (if any)
/// plus the complete attempt trace, success or not.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub data: Option<Value>,
    pub attempts: Vec<AttemptRecord>,
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("probe_attempts_total", "Upstream probe attempts, any outcome.");
        describe_counter!("probe_success_total", "Probing passes that found a working endpoint.");
        describe_counter!("probe_exhausted_total", "Probing passes where every candidate failed.");
    });
}

/// Run one sequential probing pass. `caller_params` are merged over each
/// candidate's defaults; the gatekeeper and debug params are never forwarded.
pub async fn probe(
    cfg: &ProxyConfig,
    http: &reqwest::Client,
    caller_params: &HashMap<String, String>,
) -> Result<ProbeOutcome> {
    ensure_metrics_described();

    let secrets = Secrets {
        user_token: &cfg.user_token,
        client_token: &cfg.client_token,
        client_key: &cfg.client_key,
    };
    // One fresh short-lived token per pass; enough headroom for the whole loop.
    let signed = sign_client_token(secrets).context("building upstream credential")?;

    let mut attempts = Vec::new();
    for base in &cfg.base_urls {
        for candidate in CANDIDATES {
            let Some(credential) = candidate.auth.build(secrets, Some(&signed)) else {
                continue;
            };

            let url = format!("{base}{}", candidate.path);
            let params = merged_params(candidate.params, caller_params);
            counter!("probe_attempts_total").increment(1);

            let req = credential.apply(
                http.get(&url)
                    .query(&params)
                    .timeout(Duration::from_secs(cfg.timeout_secs)),
            );

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let full_url = resp.url().to_string();
                    let body = resp.text().await.unwrap_or_default();
                    let decoded = if status == 200 {
                        serde_json::from_str::<Value>(&body).ok()
                    } else {
                        None
                    };
                    let ok = decoded.is_some();
                    attempts.push(AttemptRecord {
                        url: full_url,
                        auth: candidate.auth.label(),
                        status: Some(status),
                        ok,
                        bytes: body.len(),
                        error: (status == 200 && !ok)
                            .then(|| "response is not valid JSON".to_string()),
                    });
                    if let Some(doc) = decoded {
                        tracing::info!(url = %url, auth = candidate.auth.label(), "upstream endpoint matched");
                        counter!("probe_success_total").increment(1);
                        return Ok(ProbeOutcome { data: Some(doc), attempts });
                    }
                }
                Err(e) => {
                    // Network-level failure: record and keep probing.
                    tracing::debug!(url = %url, error = %e, "probe attempt failed");
                    attempts.push(AttemptRecord {
                        url,
                        auth: candidate.auth.label(),
                        status: e.status().map(|s| s.as_u16()),
                        ok: false,
                        bytes: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
    }

    tracing::warn!(attempts = attempts.len(), "no upstream endpoint matched");
    counter!("probe_exhausted_total").increment(1);
    Ok(ProbeOutcome { data: None, attempts })
}

/// Candidate defaults first, caller params layered over them. The shared
/// secret and the debug switch stay proxy-local.
fn merged_params(
    defaults: &[(&str, &str)],
    caller: &HashMap<String, String>,
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = defaults
        .iter()
        .filter(|(k, _)| !caller.contains_key(*k))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (k, v) in caller {
        if k == TOKEN_PARAM || k == DEBUG_PARAM {
            continue;
        }
        merged.push((k.clone(), v.clone()));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_params_override_defaults() {
        let mut caller = HashMap::new();
        caller.insert("maxResults".to_string(), "5".to_string());
        caller.insert("keywords".to_string(), "rust".to_string());
        let merged = merged_params(RECENT_FIRST, &caller);

        let get = |k: &str| {
            merged
                .iter()
                .filter(|(key, _)| key == k)
                .map(|(_, v)| v.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(get("maxResults"), vec!["5".to_string()]);
        assert_eq!(get("keywords"), vec!["rust".to_string()]);
        assert_eq!(get("sort"), vec!["updateDate".to_string()]);
    }

    #[test]
    fn secret_and_debug_are_never_forwarded() {
        let mut caller = HashMap::new();
        caller.insert(TOKEN_PARAM.to_string(), "hunter2".to_string());
        caller.insert(DEBUG_PARAM.to_string(), "1".to_string());
        let merged = merged_params(KANBAN_OPEN, &caller);
        assert!(merged.iter().all(|(k, _)| k != TOKEN_PARAM && k != DEBUG_PARAM));
    }

    #[test]
    fn candidate_order_is_opportunities_first() {
        assert_eq!(CANDIDATES[0].path, "/api/opportunities");
        assert_eq!(CANDIDATES[0].auth, AuthVariant::JwtBoond);
        assert!(CANDIDATES.iter().any(|c| c.path == "/api/projects"));
    }
}
