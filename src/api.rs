//! Shared HTTP client for backend calls.
//!
//! Every request built here carries `Authorization: Bearer <token>` while a session
//! exists and no Authorization header otherwise. The header value lives in a slot
//! shared by all clones of the client; only the session store writes it.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::PortalConfig;
use crate::error::{PortalError, PortalResult};

#[derive(Clone)]
pub struct ApiClient {
    config: PortalConfig,
    client: reqwest::Client,
    bearer: Arc<RwLock<Option<HeaderValue>>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.config.api_url.as_str())
            .field("authorized", &self.is_authorized())
            .finish()
    }
}

impl ApiClient {
    pub fn new(config: &PortalConfig) -> PortalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PortalError::config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { config: config.clone(), client, bearer: Arc::new(RwLock::new(None)) })
    }

    pub fn config(&self) -> &PortalConfig { &self.config }

    pub(crate) fn http(&self) -> &reqwest::Client { &self.client }

    pub(crate) fn set_bearer(&self, token: &str) -> PortalResult<()> {
        let mut v = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| PortalError::token("token contains characters not allowed in an HTTP header"))?;
        v.set_sensitive(true);
        *self.bearer.write() = Some(v);
        Ok(())
    }

    pub(crate) fn clear_bearer(&self) {
        *self.bearer.write() = None;
    }

    pub fn is_authorized(&self) -> bool { self.bearer.read().is_some() }

    /// Current default Authorization header value, if any.
    pub fn authorization(&self) -> Option<String> {
        self.bearer.read().as_ref().and_then(|v| v.to_str().ok()).map(|s| s.to_string())
    }

    /// Start a request to `path` with the default Authorization header applied.
    pub fn request(&self, method: Method, path: &str) -> PortalResult<RequestBuilder> {
        let url = self.config.endpoint(path)?;
        let mut rb = self.client.request(method, url);
        if let Some(v) = self.bearer.read().clone() {
            rb = rb.header(AUTHORIZATION, v);
        }
        Ok(rb)
    }

    pub async fn get_json(&self, path: &str) -> PortalResult<Value> {
        let rb = self.request(Method::GET, path)?;
        send_for_json(rb, path).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> PortalResult<Value> {
        let rb = self.request(Method::POST, path)?.json(body);
        send_for_json(rb, path).await
    }
}

async fn send_for_json(rb: RequestBuilder, path: &str) -> PortalResult<Value> {
    let resp = rb.send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        let detail = detail_from_body(&text);
        warn!(target: "medledger::api", "{} failed: HTTP {} {}", path, status.as_u16(), detail.as_deref().unwrap_or(""));
        return Err(PortalError::from_status(status.as_u16(), detail));
    }
    debug!(target: "medledger::api", "{} ok: HTTP {} ({} bytes)", path, status.as_u16(), text.len());
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| PortalError::network(format!("invalid JSON from {}: {}", path, e)))
}

/// Pull the human-readable `detail` out of an error body.
/// Validation errors carry a structured detail; those are returned as compact JSON.
pub(crate) fn detail_from_body(text: &str) -> Option<String> {
    let v: Value = serde_json::from_str(text).ok()?;
    match v.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client() -> ApiClient {
        let cfg = PortalConfig::new("http://127.0.0.1:9", ".", Duration::from_secs(1)).unwrap();
        ApiClient::new(&cfg).unwrap()
    }

    #[test]
    fn header_attached_only_while_authorized() {
        let c = client();
        let req = c.request(Method::GET, "/patients/me").unwrap().build().unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());

        c.set_bearer("a.b.c").unwrap();
        let req = c.request(Method::GET, "/patients/me").unwrap().build().unwrap();
        assert_eq!(req.headers().get(AUTHORIZATION).unwrap(), "Bearer a.b.c");
        assert_eq!(req.url().as_str(), "http://127.0.0.1:9/patients/me");

        c.clear_bearer();
        let req = c.request(Method::GET, "/patients/me").unwrap().build().unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn clones_share_the_header_slot() {
        let c = client();
        let other = c.clone();
        c.set_bearer("x.y.z").unwrap();
        assert_eq!(other.authorization().as_deref(), Some("Bearer x.y.z"));
        other.clear_bearer();
        assert!(!c.is_authorized());
    }

    #[test]
    fn header_unsafe_token_is_rejected() {
        let c = client();
        assert_eq!(c.set_bearer("a.b\nc").unwrap_err().code(), "token_unreadable");
        assert!(!c.is_authorized());
    }

    #[test]
    fn detail_extraction() {
        assert_eq!(detail_from_body(r#"{"detail":"Incorrect username or password"}"#).as_deref(), Some("Incorrect username or password"));
        assert_eq!(detail_from_body(r#"{"detail":[{"loc":["body","password"]}]}"#).as_deref(), Some(r#"[{"loc":["body","password"]}]"#));
        assert_eq!(detail_from_body("<html>oops</html>"), None);
        assert_eq!(detail_from_body(r#"{"error":"x"}"#), None);
    }

    #[test]
    fn debug_output_never_shows_the_token() {
        let c = client();
        c.set_bearer("secret.token.value").unwrap();
        assert!(!format!("{:?}", c).contains("secret"));
    }
}
