// src/api.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::ProxyConfig;
use crate::gate;
use crate::normalize::normalize;
use crate::probe::{self, DEBUG_PARAM};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("boond-missions-proxy/0.1")
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("reqwest client");
        Self {
            config: Arc::new(config),
            http,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/open_missions", get(open_missions))
        .route("/api/ce_open_needs", get(ce_open_needs))
        .fallback(not_found)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

/// The gate runs before anything else a handler does; an unauthorized caller
/// never triggers an upstream attempt.
fn gate_check(state: &AppState, headers: &HeaderMap, query: &HashMap<String, String>) -> bool {
    let provided = gate::caller_secret(headers, query);
    gate::authorize(provided.as_deref(), &state.config.gatekeeper)
}

async fn open_missions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !gate_check(&state, &headers, &query) {
        return unauthorized();
    }

    let debug = query.get(DEBUG_PARAM).map(String::as_str) == Some("1");
    match fetch_missions(&state, &query, debug).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "open_missions fetch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "server_error", "detail": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Probe, then shape the payload: normalized missions by default, raw
/// document plus the full attempt trace in debug mode. Exhausted probing is
/// an expected not-configured-yet state and stays a 200.
async fn fetch_missions(
    state: &AppState,
    query: &HashMap<String, String>,
    debug: bool,
) -> anyhow::Result<serde_json::Value> {
    let outcome = probe::probe(&state.config, &state.http, query).await?;

    let body = match (outcome.data, debug) {
        (Some(raw), true) => json!({ "data": raw, "attempts": outcome.attempts }),
        (Some(raw), false) => normalize(&raw),
        (None, true) => json!({ "error": "No endpoint matched", "attempts": outcome.attempts }),
        (None, false) => json!({ "error": "No endpoint matched" }),
    };
    Ok(body)
}

/// Placeholder until the Connecting-Expertise integration exists: gated, and
/// always an empty well-shaped payload.
async fn ce_open_needs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !gate_check(&state, &headers, &query) {
        return unauthorized();
    }

    let payload = json!({
        "meta": {
            "source": "CONNECTING-EXPERTISE-STUB",
            "note": "Replace with live CE fetch later"
        },
        "data": [],
        "included": []
    });
    (StatusCode::OK, Json(payload)).into_response()
}
