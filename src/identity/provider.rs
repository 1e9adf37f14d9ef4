use std::future::Future;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{detail_from_body, ApiClient};
use crate::error::{PortalError, PortalResult};

#[derive(Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new<S: Into<String>>(username: S, password: S) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

// Never print the password.
impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest").field("username", &self.username).finish_non_exhaustive()
    }
}

/// Body of a successful authentication response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Exchanges credentials for a bearer token.
pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> impl Future<Output = PortalResult<LoginResponse>> + Send;
}

/// Password-flow login against the backend's token endpoint.
///
/// The credentials go out as `application/x-www-form-urlencoded`; the backend reads
/// form fields on this endpoint and rejects a JSON body.
#[derive(Debug, Clone)]
pub struct HttpAuthProvider {
    api: ApiClient,
}

impl HttpAuthProvider {
    pub fn new(api: ApiClient) -> Self { Self { api } }
}

impl AuthProvider for HttpAuthProvider {
    async fn login(&self, req: &LoginRequest) -> PortalResult<LoginResponse> {
        let url = self.api.config().login_url()?;
        let form = [("username", req.username.as_str()), ("password", req.password.as_str())];
        let resp = self
            .api
            .http()
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "medledger::auth", "login transport failure user={}: {}", req.username, e);
                PortalError::from(e)
            })?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            let detail = detail_from_body(&text).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!(target: "medledger::auth", "login rejected user={} status={} detail={}", req.username, status.as_u16(), detail);
            return Err(PortalError::auth(detail));
        }
        let parsed: LoginResponse = serde_json::from_str(&text)
            .map_err(|e| PortalError::token(format!("login response carried no usable access_token: {}", e)))?;
        if let Some(tt) = parsed.token_type.as_deref() {
            if !tt.eq_ignore_ascii_case("bearer") {
                debug!(target: "medledger::auth", "unexpected token_type={} (treating as bearer)", tt);
            }
        }
        Ok(parsed)
    }
}
