//! Client-side identity: unverified token claims, the session store and the
//! role-based access guard. Keep the public surface thin and split implementation
//! across sub-modules.

mod claims;
mod session;
mod provider;
mod authorizer;
pub mod token;

pub use claims::{Role, ClaimedRole, UnverifiedClaims};
pub use session::{BearerToken, Session, SessionStore};
pub use provider::{AuthProvider, HttpAuthProvider, LoginRequest, LoginResponse};
pub use authorizer::{authorize, Decision};
