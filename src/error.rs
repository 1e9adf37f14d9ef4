//! Unified portal error model.
//! One variant per failure class surfaced to callers of the session layer and the
//! API client, along with stable codes and the user-facing message for each.
//! Token decoding never produces one of these: a malformed token is `None`.

use thiserror::Error;

/// Shown to the user whenever a login attempt does not produce a session.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Check your credentials.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortalError {
    /// The backend rejected the credentials or the bearer token.
    #[error("authentication rejected: {detail}")]
    Auth { detail: String },
    /// The backend could not be reached or the response could not be read.
    #[error("network error: {0}")]
    Network(String),
    /// The backend accepted the credentials but returned a token whose claims cannot be read.
    #[error("unreadable token: {0}")]
    Token(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("backend error {status}: {detail}")]
    Backend { status: u16, detail: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PortalError {
    pub fn auth<S: Into<String>>(detail: S) -> Self { PortalError::Auth { detail: detail.into() } }
    pub fn network<S: Into<String>>(msg: S) -> Self { PortalError::Network(msg.into()) }
    pub fn token<S: Into<String>>(msg: S) -> Self { PortalError::Token(msg.into()) }
    pub fn storage<S: Into<String>>(msg: S) -> Self { PortalError::Storage(msg.into()) }
    pub fn config<S: Into<String>>(msg: S) -> Self { PortalError::Config(msg.into()) }
    pub fn backend<S: Into<String>>(status: u16, detail: S) -> Self {
        PortalError::Backend { status, detail: detail.into() }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PortalError::Auth { .. } => "auth_rejected",
            PortalError::Network(_) => "network_error",
            PortalError::Token(_) => "token_unreadable",
            PortalError::Storage(_) => "storage_error",
            PortalError::Backend { .. } => "backend_error",
            PortalError::Config(_) => "config_error",
        }
    }

    /// Message suitable for display next to the login form or command prompt.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Auth { .. } | PortalError::Network(_) => LOGIN_FAILED_MESSAGE.to_string(),
            PortalError::Token(_) => {
                "Login succeeded but the session could not be read. Please contact support.".to_string()
            }
            PortalError::Storage(msg) => format!("Could not save the session locally: {}", msg),
            PortalError::Backend { detail, .. } => detail.clone(),
            PortalError::Config(msg) => msg.clone(),
        }
    }

    /// Map a non-success backend status into the matching variant.
    pub fn from_status(status: u16, detail: Option<String>) -> Self {
        let detail = detail.unwrap_or_else(|| format!("HTTP {}", status));
        match status {
            401 | 403 => PortalError::Auth { detail },
            _ => PortalError::Backend { status, detail },
        }
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        PortalError::Network(err.to_string())
    }
}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::Storage(err.to_string())
    }
}

pub type PortalResult<T> = Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_failures_share_one_user_message() {
        assert_eq!(PortalError::auth("Incorrect username or password").user_message(), LOGIN_FAILED_MESSAGE);
        assert_eq!(PortalError::network("connection refused").user_message(), LOGIN_FAILED_MESSAGE);
        assert_ne!(PortalError::token("bad segment").user_message(), LOGIN_FAILED_MESSAGE);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(PortalError::from_status(401, Some("Token expired".into())), PortalError::auth("Token expired"));
        assert_eq!(PortalError::from_status(403, None), PortalError::auth("HTTP 403"));
        let e = PortalError::from_status(500, None);
        assert_eq!(e.code(), "backend_error");
        assert_eq!(e.user_message(), "HTTP 500");
    }

    #[test]
    fn io_errors_become_storage_errors() {
        let e: PortalError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(e.code(), "storage_error");
    }
}
