//! Logout: put the presented token on its role's revocation list.
//!
//! Logout routes sit outside the gate. The token is revoked as presented,
//! without signature or expiry checks, so a second logout still answers 200.

use axum::{http::HeaderMap, Extension, Json};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{error::AuthError, gate::bearer_token, state::AuthState};
use crate::{api::handlers::MessageResponse, store::Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Revocation {
    Revoked,
    AlreadyRevoked,
}

#[must_use]
pub fn revoke(state: &AuthState, role: Role, token: &str) -> Revocation {
    if state.revocations().for_role(role).add(token) {
        Revocation::Revoked
    } else {
        Revocation::AlreadyRevoked
    }
}

fn logout(
    state: &AuthState,
    role: Role,
    headers: &HeaderMap,
    messages: (&str, &str),
) -> Result<Json<MessageResponse>, AuthError> {
    let token = bearer_token(headers)?;
    let outcome = revoke(state, role, token);
    info!(role = %role, outcome = ?outcome, "Logout");
    let message = match outcome {
        Revocation::Revoked => messages.0,
        Revocation::AlreadyRevoked => messages.1,
    };
    Ok(Json(MessageResponse::new(message)))
}

#[utoipa::path(
    post,
    path = "/user/logout",
    responses(
        (status = 200, description = "Token revoked", body = MessageResponse),
        (status = 400, description = "Missing or malformed authorization header", body = crate::api::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout_user(
    Extension(auth_state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AuthError> {
    logout(
        &auth_state,
        Role::User,
        &headers,
        ("Logout successful", "Token is already revoked"),
    )
}

#[utoipa::path(
    post,
    path = "/admin/logout",
    responses(
        (status = 200, description = "Token revoked", body = MessageResponse),
        (status = 400, description = "Missing or malformed authorization header", body = crate::api::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout_admin(
    Extension(auth_state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AuthError> {
    logout(
        &auth_state,
        Role::Admin,
        &headers,
        ("Admin logout successful", "Admin token is already revoked"),
    )
}
