use std::fmt;

/// Portal roles. The set is closed: dashboards are gated on exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Patient, Role::Doctor, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }

    /// Exact, case-sensitive match on the wire form.
    pub fn parse(s: &str) -> Option<Self> {
        Role::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role as a token claims it. Anything outside the closed set is kept verbatim
/// so it can be shown, but it never satisfies a role requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimedRole {
    Known(Role),
    Unrecognized(String),
}

impl ClaimedRole {
    pub fn from_claim(raw: &str) -> Self {
        match Role::parse(raw) {
            Some(r) => ClaimedRole::Known(r),
            None => ClaimedRole::Unrecognized(raw.to_string()),
        }
    }

    pub fn known(&self) -> Option<Role> {
        match self {
            ClaimedRole::Known(r) => Some(*r),
            ClaimedRole::Unrecognized(_) => None,
        }
    }

    pub fn satisfies(&self, required: Role) -> bool {
        self.known() == Some(required)
    }
}

impl fmt::Display for ClaimedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimedRole::Known(r) => f.write_str(r.as_str()),
            ClaimedRole::Unrecognized(s) => f.write_str(s),
        }
    }
}

/// Identity read out of a bearer token *without* checking its signature.
///
/// Only good for deciding what to show; the backend re-validates the token on
/// every protected call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedClaims {
    pub subject: String,
    pub role: ClaimedRole,
    /// `exp` claim in seconds since the Unix epoch, when the token carries one.
    pub expires_at: Option<i64>,
}

impl UnverifiedClaims {
    pub fn is_expired_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match self.expires_at {
            Some(exp) => exp <= now.timestamp(),
            None => false,
        }
    }
}
