// src/auth.rs
//
// Upstream credential builder. BoondManager tenants differ in which auth
// scheme they accept (signed client JWT, raw header tokens, or HTTP Basic
// with an unknown password pairing), so every known scheme is expressible
// as an `AuthVariant` and the prober tries them in candidate order.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Signed tokens are short-lived, mirroring what the upstream web app issues.
const TOKEN_TTL_SECS: i64 = 120;

/// Claims embedded in the signed client token (HS256).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iat: i64,
    pub exp: i64,
    pub user_token: String,
    pub client_token: String,
}

/// One upstream auth scheme. The set is static; candidates reference these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVariant {
    /// `X-Jwt-Client-Boondmanager: <signed token>` — what the official UI sends.
    JwtBoond,
    /// `X-Jwt-Client: <signed token>` — older header name, same token.
    JwtClient,
    /// Raw secrets as headers, for tenants that skip signing.
    StaticHeaders,
    /// `Authorization: Basic b64(user_token:client_key)`
    BasicKey,
    /// `Authorization: Basic b64(user_token:client_token)`
    BasicToken,
    /// `Authorization: Basic b64(user_token:)` — empty password slot.
    BasicBare,
}

/// A ready-to-apply credential for one outbound attempt.
#[derive(Debug, Clone)]
pub enum Credential {
    Header { name: &'static str, value: String },
    Headers(Vec<(&'static str, String)>),
    Basic(String),
}

/// Secrets the builder draws from; a borrowed view over `ProxyConfig`.
#[derive(Debug, Clone, Copy)]
pub struct Secrets<'a> {
    pub user_token: &'a str,
    pub client_token: &'a str,
    pub client_key: &'a str,
}

/// Sign a fresh short-lived client token. Built once per probing pass.
pub fn sign_client_token(secrets: Secrets<'_>) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        iat: now,
        exp: now + TOKEN_TTL_SECS,
        user_token: secrets.user_token.to_string(),
        client_token: secrets.client_token.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secrets.client_key.as_bytes()),
    )
    .context("signing upstream client token")
}

impl AuthVariant {
    /// Build the credential for this variant, or `None` when a secret it
    /// needs is not configured (the variant is skipped, never an error).
    pub fn build(self, secrets: Secrets<'_>, signed_token: Option<&str>) -> Option<Credential> {
        match self {
            AuthVariant::JwtBoond => signed_token.map(|t| Credential::Header {
                name: "X-Jwt-Client-Boondmanager",
                value: t.to_string(),
            }),
            AuthVariant::JwtClient => signed_token.map(|t| Credential::Header {
                name: "X-Jwt-Client",
                value: t.to_string(),
            }),
            AuthVariant::StaticHeaders => {
                if secrets.user_token.is_empty() || secrets.client_token.is_empty() {
                    return None;
                }
                Some(Credential::Headers(vec![
                    ("X-Jwt-Client", secrets.client_token.to_string()),
                    ("X-Jwt-User", secrets.user_token.to_string()),
                ]))
            }
            AuthVariant::BasicKey => basic(secrets.user_token, secrets.client_key),
            AuthVariant::BasicToken => basic(secrets.user_token, secrets.client_token),
            AuthVariant::BasicBare => basic(secrets.user_token, ""),
        }
    }

    /// Short label for attempt records and logs.
    pub fn label(self) -> &'static str {
        match self {
            AuthVariant::JwtBoond => "jwt-boond",
            AuthVariant::JwtClient => "jwt-client",
            AuthVariant::StaticHeaders => "static-headers",
            AuthVariant::BasicKey => "basic-key",
            AuthVariant::BasicToken => "basic-token",
            AuthVariant::BasicBare => "basic-bare",
        }
    }
}

fn basic(user: &str, password: &str) -> Option<Credential> {
    if user.is_empty() {
        return None;
    }
    Some(Credential::Basic(
        B64.encode(format!("{user}:{password}")),
    ))
}

impl Credential {
    /// Apply the credential plus the standard JSON:API content headers.
    pub fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = match self {
            Credential::Header { name, value } => req.header(*name, value),
            Credential::Headers(pairs) => pairs
                .iter()
                .fold(req, |r, (name, value)| r.header(*name, value)),
            Credential::Basic(b64) => req.header("Authorization", format!("Basic {b64}")),
        };
        req.header("Accept", "application/vnd.api+json")
            .header("Content-Type", "application/json")
    }
}
