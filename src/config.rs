//! Client configuration.
//!
//! Precedence, lowest first: built-in defaults, environment (`MEDREC_API_URL`,
//! `MEDREC_TIMEOUT_SECS`, `MEDREC_NOTICE_MS`), then command-line overrides applied by the
//! binary.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use tracing::warn;

use crate::error::{AppError, AppResult};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const API_PORT: u16 = 5000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_millis(3000);

// <name>-<port>.app.github.dev
static CODESPACE_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+)-\d+\.app\.github\.dev$").expect("static regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base: Url,
    pub request_timeout: Duration,
    /// How long transient notices stay up before the surface is told to dismiss them.
    pub notice_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_URL).expect("static url"),
            request_timeout: DEFAULT_TIMEOUT,
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup so tests need not touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = ClientConfig::default();
        if let Some(url) = lookup("MEDREC_API_URL").filter(|s| !s.trim().is_empty()) {
            cfg.api_base = parse_api_base(&url)?;
        }
        if let Some(raw) = lookup("MEDREC_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => cfg.request_timeout = Duration::from_secs(secs),
                _ => warn!(target: "medrec::config", "ignoring MEDREC_TIMEOUT_SECS='{}'", raw),
            }
        }
        if let Some(raw) = lookup("MEDREC_NOTICE_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => cfg.notice_ttl = Duration::from_millis(ms),
                Err(_) => warn!(target: "medrec::config", "ignoring MEDREC_NOTICE_MS='{}'", raw),
            }
        }
        Ok(cfg)
    }

    /// API base for a client served from `origin`. A Codespaces forwarded host for any
    /// port maps to the same codespace's port-5000 host over https; any other host keeps
    /// its scheme and talks to port 5000.
    pub fn api_base_for_origin(origin: &str) -> AppResult<Url> {
        let page = Url::parse(origin).map_err(|e| AppError::config(format!("invalid origin '{}': {}", origin, e)))?;
        let host = page
            .host_str()
            .ok_or_else(|| AppError::config(format!("origin '{}' has no host", origin)))?;
        if let Some(caps) = CODESPACE_HOST.captures(host) {
            return parse_api_base(&format!("https://{}-{}.app.github.dev", &caps["name"], API_PORT));
        }
        parse_api_base(&format!("{}://{}:{}", page.scheme(), host, API_PORT))
    }
}

pub fn parse_api_base(raw: &str) -> AppResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| AppError::config(format!("invalid API URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::config(format!("unsupported API URL scheme '{}'", other))),
    }
}
