//! Runtime configuration, read from the environment with defaults.
//!
//! - `MEDLEDGER_API_URL`: backend base URL (default `http://localhost:5000`).
//! - `MEDLEDGER_TOKEN_DIR`: directory holding the persisted token (default `.medledger`).
//! - `MEDLEDGER_HTTP_TIMEOUT_SECS`: per-request timeout (default 30).

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{PortalError, PortalResult};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_TOKEN_DIR: &str = ".medledger";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Authentication endpoint, relative to the API base.
pub const LOGIN_PATH: &str = "/users/token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub api_url: Url,
    pub token_dir: PathBuf,
    pub timeout: Duration,
}

impl PortalConfig {
    pub fn new(api_url: &str, token_dir: impl Into<PathBuf>, timeout: Duration) -> PortalResult<Self> {
        let api_url = Url::parse(api_url).map_err(|e| PortalError::config(format!("invalid API URL '{}': {}", api_url, e)))?;
        if api_url.cannot_be_a_base() {
            return Err(PortalError::config(format!("API URL '{}' cannot be used as a base", api_url)));
        }
        Ok(Self { api_url, token_dir: token_dir.into(), timeout })
    }

    pub fn from_env() -> PortalResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as [`PortalConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> PortalResult<Self> {
        let api = lookup("MEDLEDGER_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let dir = lookup("MEDLEDGER_TOKEN_DIR").unwrap_or_else(|| DEFAULT_TOKEN_DIR.to_string());
        let timeout_secs = match lookup("MEDLEDGER_HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|_| PortalError::config(format!("MEDLEDGER_HTTP_TIMEOUT_SECS must be a whole number of seconds, got '{}'", v)))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Self::new(&api, dir, Duration::from_secs(timeout_secs))
    }

    pub fn login_url(&self) -> PortalResult<Url> {
        self.endpoint(LOGIN_PATH)
    }

    /// Resolve a backend path against the base URL, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> PortalResult<Url> {
        let mut base = self.api_url.clone();
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| PortalError::config(format!("invalid endpoint '{}': {}", path, e)))
    }
}
