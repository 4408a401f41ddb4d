//! Role gate for protected routes.
//!
//! Flow Overview: parse the bearer header, verify signature and expiry, look
//! the token up on the revocation list of the gate's role, compare roles, then
//! attach an [`AuthContext`] for the handler.
//!
//! Verification comes before the revocation lookup so an expired token always
//! reports `InvalidToken`, revoked or not. A revoked token that still verifies
//! reports `TokenRevoked`.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use std::sync::Arc;
use tracing::debug;

use super::{error::AuthError, principal::AuthContext, state::AuthState};
use crate::store::Role;

/// Extract the token from `Authorization: Bearer <token>`.
///
/// # Errors
/// Returns [`AuthError::MalformedRequest`] when the header is missing, not
/// ASCII, uses another scheme, or carries an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MalformedRequest)?
        .to_str()
        .map_err(|_| AuthError::MalformedRequest)?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedRequest)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedRequest);
    }
    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MalformedRequest);
    }
    Ok(token)
}

/// Decide whether `token` admits its bearer to a route requiring `required`.
///
/// # Errors
/// `InvalidToken`, `TokenRevoked` or `WrongRole`, in that order of precedence.
pub fn authorize(state: &AuthState, required: Role, token: &str) -> Result<AuthContext, AuthError> {
    let claims = state.tokens().verify(token)?;
    if state.revocations().for_role(required).contains(token) {
        return Err(AuthError::TokenRevoked);
    }
    if claims.role() != required {
        return Err(AuthError::WrongRole { required });
    }
    Ok(AuthContext::from(claims))
}

/// Middleware form of the gate. Mount with
/// `middleware::from_fn_with_state(Role::Admin, require_role)`.
pub async fn require_role(
    State(required): State<Role>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome =
        bearer_token(request.headers()).and_then(|token| authorize(&auth_state, required, token));

    match outcome {
        Ok(context) => {
            debug!(
                principal_id = %context.principal_id,
                role = %context.role,
                "Request authorized"
            );
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(err) => {
            debug!(role = %required, "Request rejected: {err}");
            err.into_response()
        }
    }
}
