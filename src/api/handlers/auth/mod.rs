//! Authentication and authorization.
//!
//! Login checks a (handle, password) pair against the credential store and
//! returns a signed bearer token. Logout revokes the presented token on the
//! list of its role. Protected routes are wrapped in [`gate::require_role`],
//! configured with the role they need.
//!
//! ## Token lifetimes
//!
//! - **User:** 3 hours (`expiresIn: 10800`).
//! - **Admin:** 1 hour (`expiresIn: 3600`).
//!
//! ## Revocation
//!
//! Two in-memory lists, one per role, built once at startup. They only grow
//! and are lost on restart; a revoked token stays revoked until it would have
//! expired anyway.

mod error;
pub(crate) mod gate;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod password;
mod principal;
pub(crate) mod revocation;
mod state;
pub(crate) mod token;

pub use error::AuthError;
pub use principal::AuthContext;
pub use revocation::{InMemoryRevocationList, RevocationStore, Revocations};
pub use state::{AuthConfig, AuthState};
