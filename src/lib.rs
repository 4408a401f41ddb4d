//! # MLAB (software distribution catalog)
//!
//! `mlab` is a REST backend for a catalog of installable products. Admins
//! publish product metadata, images and platform installers (Windows `.exe`,
//! macOS `.dmg`); users browse the catalog and keep a list of products they own.
//!
//! ## Authentication
//!
//! Users log in with a username, admins with an email. Both receive a signed,
//! time-limited bearer token (HS256 JWT): three hours for users, one hour for
//! admins. Tokens carry the principal id, its login handle and its role.
//!
//! Logging out puts the token on an in-memory revocation list scoped to the
//! token's role. Revocation lists only grow and are cleared on restart.
//!
//! ## Authorization
//!
//! Protected routes sit behind a single gate parameterized by the required
//! role. The gate verifies signature and expiry, rejects revoked tokens and
//! tokens minted for the other role, then attaches an [`api::handlers::auth::AuthContext`]
//! to the request. Product writes check the admin role again inside the handler.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
