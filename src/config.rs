use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Runtime configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_bind: SocketAddr,
    /// Base URL of the remote identity provider; `None` runs offline.
    pub identity_url: Option<String>,
    pub identity_key: Option<String>,
    pub identity_timeout: Duration,
    /// Session cache file; `None` keeps the cache in memory only.
    pub session_file: Option<PathBuf>,
    pub seed_demo_accounts: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_bind: SocketAddr::from(([127, 0, 0, 1], 7878)),
            identity_url: None,
            identity_key: None,
            identity_timeout: Duration::from_millis(10_000),
            session_file: Some(PathBuf::from(".feedup/session.json")),
            seed_demo_accounts: true,
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("{name}: expected a boolean, got '{other}'")),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let http_bind = match non_empty(get("FEEDUP_HTTP_BIND")) {
            Some(v) => v.parse().with_context(|| format!("parse FEEDUP_HTTP_BIND '{v}'"))?,
            None => defaults.http_bind,
        };
        let identity_timeout = match non_empty(get("FEEDUP_IDENTITY_TIMEOUT_MS")) {
            Some(v) => Duration::from_millis(
                v.parse::<u64>().with_context(|| format!("parse FEEDUP_IDENTITY_TIMEOUT_MS '{v}'"))?,
            ),
            None => defaults.identity_timeout,
        };
        let session_file = match get("FEEDUP_SESSION_FILE") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(PathBuf::from(v.trim())),
            None => defaults.session_file,
        };
        let seed_demo_accounts = match non_empty(get("FEEDUP_SEED_DEMO")) {
            Some(v) => parse_bool("FEEDUP_SEED_DEMO", &v)?,
            None => defaults.seed_demo_accounts,
        };
        Ok(Self {
            http_bind,
            identity_url: non_empty(get("FEEDUP_IDENTITY_URL")),
            identity_key: non_empty(get("FEEDUP_IDENTITY_KEY")),
            identity_timeout,
            session_file,
            seed_demo_accounts,
        })
    }
}
