// src/config.rs
use anyhow::{bail, Context, Result};

const DEFAULT_BASE_URL: &str = "https://ui.boondmanager.com";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Startup configuration, read once from the environment and passed by
/// reference into the gate, credential builder, and prober.
///
/// Required variables (startup fails without them):
///   - BOOND_USER_TOKEN   upstream user identifier
///   - BOOND_CLIENT_TOKEN upstream client identifier
///   - BOOND_CLIENT_KEY   symmetric signing key
///   - GATEKEEPER_TOKEN   shared caller secret
/// Optional:
///   - BOOND_BASE_URLS        comma-separated upstream bases (default: production UI host)
///   - UPSTREAM_TIMEOUT_SECS  per-attempt timeout, clamped to 5..=30
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub user_token: String,
    pub client_token: String,
    pub client_key: String,
    pub gatekeeper: String,
    pub base_urls: Vec<String>,
    pub timeout_secs: u64,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            user_token: required("BOOND_USER_TOKEN")?,
            client_token: required("BOOND_CLIENT_TOKEN")?,
            client_key: required("BOOND_CLIENT_KEY")?,
            gatekeeper: required("GATEKEEPER_TOKEN")?,
            base_urls: parse_base_urls(std::env::var("BOOND_BASE_URLS").ok().as_deref()),
            timeout_secs: parse_timeout(std::env::var("UPSTREAM_TIMEOUT_SECS").ok().as_deref()),
        })
    }

    /// Test helper: fully in-memory config pointing at the given base URL.
    pub fn for_tests(base_url: &str, gatekeeper: &str) -> Self {
        Self {
            user_token: "user-test".into(),
            client_token: "client-test".into(),
            client_key: "signing-key-test".into(),
            gatekeeper: gatekeeper.into(),
            base_urls: vec![base_url.trim_end_matches('/').to_string()],
            timeout_secs: 5,
        }
    }
}

fn required(name: &str) -> Result<String> {
    let v = std::env::var(name).with_context(|| format!("missing env var {name}"))?;
    let v = v.trim().to_string();
    if v.is_empty() {
        bail!("env var {name} is set but empty");
    }
    Ok(v)
}

fn parse_base_urls(raw: Option<&str>) -> Vec<String> {
    let urls: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if urls.is_empty() {
        vec![DEFAULT_BASE_URL.to_string()]
    } else {
        urls
    }
}

fn parse_timeout(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
        .clamp(5, 30)
}
