use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::error::{PortalError, PortalResult};
use crate::storage::{TokenStorage, TOKEN_KEY};

use super::claims::{ClaimedRole, UnverifiedClaims};
use super::provider::{AuthProvider, LoginRequest};
use super::token;

/// Raw bearer credential as issued by the backend. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new<S: Into<String>>(s: S) -> Self { Self(s.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

impl PartialEq<&str> for BearerToken {
    fn eq(&self, other: &&str) -> bool { self.0 == *other }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: BearerToken,
    pub claims: UnverifiedClaims,
}

impl Session {
    pub fn subject(&self) -> &str { &self.claims.subject }
    pub fn role(&self) -> &ClaimedRole { &self.claims.role }
}

/// Owner of the current session.
///
/// The only writer of the persisted token and of the API client's default
/// Authorization header. Mutators take `&mut self`: login and logout are discrete
/// user actions that run to completion one at a time.
pub struct SessionStore<S: TokenStorage, P: AuthProvider> {
    storage: S,
    provider: P,
    api: ApiClient,
    current: Option<Session>,
}

impl<S: TokenStorage, P: AuthProvider> SessionStore<S, P> {
    /// Restore the session persisted by a previous run, without contacting the backend.
    pub fn open(storage: S, provider: P, api: ApiClient) -> Self {
        Self::open_at(storage, provider, api, Utc::now())
    }

    /// [`SessionStore::open`] with an explicit clock for the expiry check.
    pub fn open_at(storage: S, provider: P, api: ApiClient, now: DateTime<Utc>) -> Self {
        let mut store = Self { storage, provider, api, current: None };
        store.hydrate(now);
        store
    }

    fn hydrate(&mut self, now: DateTime<Utc>) {
        let raw = match self.storage.get(TOKEN_KEY) {
            Ok(Some(t)) => t,
            Ok(None) => {
                info!(target: "medledger::session", "no persisted session");
                return;
            }
            Err(e) => {
                warn!(target: "medledger::session", "could not read persisted session, starting signed out: {}", e);
                return;
            }
        };
        let Some(claims) = token::decode(&raw) else {
            warn!(target: "medledger::session", "discarding unreadable persisted token");
            self.drop_persisted();
            return;
        };
        if claims.is_expired_at(now) {
            warn!(target: "medledger::session", "discarding expired persisted token user={}", claims.subject);
            self.drop_persisted();
            return;
        }
        if let Err(e) = self.api.set_bearer(&raw) {
            warn!(target: "medledger::session", "discarding persisted token user={}: {}", claims.subject, e);
            self.drop_persisted();
            return;
        }
        info!(target: "medledger::session", "session restored user={} role={}", claims.subject, claims.role);
        self.current = Some(Session { token: BearerToken(raw), claims });
    }

    fn drop_persisted(&self) {
        if let Err(e) = self.storage.remove(TOKEN_KEY) {
            warn!(target: "medledger::session", "could not remove stale token: {}", e);
        }
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Option<Session> { self.current.clone() }

    pub fn is_authenticated(&self) -> bool { self.current.is_some() }

    pub fn api(&self) -> &ApiClient { &self.api }

    pub fn storage(&self) -> &S { &self.storage }

    /// Authenticate and replace the current session.
    ///
    /// On any error the session, the persisted token and the default header are
    /// left exactly as they were.
    pub async fn login(&mut self, username: &str, password: &str) -> PortalResult<Session> {
        let req = LoginRequest::new(username, password);
        let resp = self.provider.login(&req).await?;
        let raw = resp.access_token;

        let Some(claims) = token::decode(&raw) else {
            // backend accepted the credentials, so this is a client/backend contract defect
            error!(target: "medledger::session", "login accepted for user={} but the returned token has no readable claims", username);
            return Err(PortalError::token("the token issued at login has no readable subject/role claims"));
        };

        self.storage.set(TOKEN_KEY, &raw)?;
        if let Err(e) = self.api.set_bearer(&raw) {
            self.restore_persisted();
            return Err(e);
        }

        let session = Session { token: BearerToken(raw), claims };
        info!(target: "medledger::session", "login user={} role={}", session.subject(), session.role());
        self.current = Some(session.clone());
        Ok(session)
    }

    // Put back whatever the current session had persisted before a failed login.
    fn restore_persisted(&self) {
        let res = match &self.current {
            Some(s) => self.storage.set(TOKEN_KEY, s.token.as_str()),
            None => self.storage.remove(TOKEN_KEY),
        };
        if let Err(e) = res {
            warn!(target: "medledger::session", "could not restore persisted token: {}", e);
        }
    }

    /// Forget the session locally. Later backend calls carry no Authorization header.
    pub fn logout(&mut self) {
        if let Err(e) = self.storage.remove(TOKEN_KEY) {
            warn!(target: "medledger::session", "could not remove persisted token: {}", e);
        }
        self.api.clear_bearer();
        match self.current.take() {
            Some(s) => info!(target: "medledger::session", "logout user={}", s.subject()),
            None => info!(target: "medledger::session", "logout without an active session"),
        }
    }
}
