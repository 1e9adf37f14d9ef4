use super::claims::Role;
use super::session::Session;

/// Verdict for one navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No session: send the user to the login screen.
    RedirectLogin,
    /// Signed in, but with a different role than the destination requires.
    RedirectHome,
}

/// Decide whether a destination requiring `required` may render for `session`.
///
/// Pure: the caller acts on the verdict. A claimed role outside the closed set
/// never satisfies a requirement.
pub fn authorize(session: Option<&Session>, required: Option<Role>) -> Decision {
    let Some(session) = session else { return Decision::RedirectLogin; };
    match required {
        Some(role) if !session.role().satisfies(role) => Decision::RedirectHome,
        _ => Decision::Allow,
    }
}
