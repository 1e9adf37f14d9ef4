//! Portal destinations and the redirect that applies to each navigation attempt.
//!
//! Dashboards are gated on exactly one role; the landing page and the login
//! screens are public. Unknown paths go home.

use crate::identity::{authorize, Decision, Role, Session};

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Requires(Role),
}

struct RouteSpec {
    pattern: &'static str,
    access: Access,
}

const ROUTES: &[RouteSpec] = &[
    RouteSpec { pattern: "/", access: Access::Public },
    RouteSpec { pattern: "/login", access: Access::Public },
    RouteSpec { pattern: "/login/:role", access: Access::Public },
    RouteSpec { pattern: "/dashboard/patient", access: Access::Requires(Role::Patient) },
    RouteSpec { pattern: "/dashboard/doctor", access: Access::Requires(Role::Doctor) },
    RouteSpec { pattern: "/dashboard/doctor/patient/:id", access: Access::Requires(Role::Doctor) },
    RouteSpec { pattern: "/dashboard/admin", access: Access::Requires(Role::Admin) },
    RouteSpec { pattern: "/dashboard/admin/patient/:id", access: Access::Requires(Role::Admin) },
];

/// Where a navigation attempt ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(String),
    /// `return_to` is the original destination, kept so login can resume it.
    Redirect { to: String, return_to: Option<String> },
}

// Drop query/fragment and any trailing slash (except for the root).
fn normalize(path: &str) -> String {
    let p = path.split(['?', '#']).next().unwrap_or("");
    let p = p.trim();
    let p = if p.starts_with('/') { p.to_string() } else { format!("/{}", p) };
    let trimmed = p.trim_end_matches('/');
    if trimmed.is_empty() { HOME.to_string() } else { trimmed.to_string() }
}

fn matches(pattern: &str, path: &str) -> bool {
    let pat: Vec<&str> = pattern.split('/').collect();
    let segs: Vec<&str> = path.split('/').collect();
    if pat.len() != segs.len() {
        return false;
    }
    pat.iter().zip(segs.iter()).all(|(p, s)| {
        if p.starts_with(':') { !s.is_empty() } else { p == s }
    })
}

/// Access rule for a path, or `None` when no destination matches.
pub fn access_for(path: &str) -> Option<Access> {
    let p = normalize(path);
    ROUTES.iter().find(|r| matches(r.pattern, &p)).map(|r| r.access)
}

/// Dashboard a user with `role` lands on after signing in.
pub fn landing_for(role: Role) -> String {
    format!("/dashboard/{}", role.as_str())
}

pub fn navigate(path: &str, session: Option<&Session>) -> Navigation {
    let p = normalize(path);
    let Some(access) = access_for(&p) else {
        return Navigation::Redirect { to: HOME.to_string(), return_to: None };
    };
    let required = match access {
        Access::Public => return Navigation::Render(p),
        Access::Requires(r) => Some(r),
    };
    match authorize(session, required) {
        Decision::Allow => Navigation::Render(p),
        Decision::RedirectLogin => Navigation::Redirect { to: LOGIN.to_string(), return_to: Some(p) },
        Decision::RedirectHome => Navigation::Redirect { to: HOME.to_string(), return_to: None },
    }
}

/// Destination after a successful login: the remembered path if this session may
/// open it, otherwise the role's dashboard, otherwise home.
pub fn after_login(session: &Session, return_to: Option<&str>) -> String {
    if let Some(target) = return_to {
        if let Navigation::Render(p) = navigate(target, Some(session)) {
            if access_for(&p) != Some(Access::Public) {
                return p;
            }
        }
    }
    match session.role().known() {
        Some(r) => landing_for(r),
        None => HOME.to_string(),
    }
}
