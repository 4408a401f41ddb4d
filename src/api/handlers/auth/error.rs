//! Auth failure taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::{Role, StoreError};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown handle. Renders like `InvalidCredential` so login does not
    /// reveal which accounts exist.
    #[error("Authentication failed. Invalid credentials.")]
    NotFound,
    #[error("Authentication failed. Invalid credentials.")]
    InvalidCredential,
    #[error("Missing or malformed authorization header.")]
    MalformedRequest,
    #[error("Authentication failed. Token is revoked.")]
    TokenRevoked,
    #[error("Authentication failed. Invalid token.")]
    InvalidToken,
    #[error("Authentication failed. Token is not valid for the {required} role.")]
    WrongRole { required: Role },
    #[error("Internal Server Error")]
    Store(#[from] StoreError),
    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound
            | Self::InvalidCredential
            | Self::TokenRevoked
            | Self::InvalidToken
            | Self::WrongRole { .. } => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Store(err) => error!("Auth store failure: {err}"),
            Self::Internal(err) => error!("Auth internal failure: {err:#}"),
            _ => {}
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_failures_share_one_message() {
        assert_eq!(
            AuthError::NotFound.to_string(),
            AuthError::InvalidCredential.to_string()
        );
    }

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(AuthError::NotFound.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::MalformedRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::TokenRevoked.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::WrongRole {
                required: Role::Admin
            }
            .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Store(StoreError::Duplicate).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_do_not_leak_details() {
        let err = AuthError::Store(StoreError::Corrupt("role root".to_string()));
        assert_eq!(err.to_string(), "Internal Server Error");
    }
}
