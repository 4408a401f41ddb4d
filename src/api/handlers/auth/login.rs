//! Credential login for users (username) and admins (email).

use axum::{extract::rejection::JsonRejection, Extension, Json};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{error::AuthError, password::verify_password, state::AuthState};
use crate::{
    api::error::ApiError,
    store::{CredentialStore, Role, SharedCredentials},
};

/// A login handle and the plaintext password offered for it.
pub struct Credential {
    pub handle: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct LoginGrant {
    pub principal_id: Uuid,
    pub handle: String,
    pub token: String,
    pub expires_in: u64,
}

/// Look up the principal, check the password and mint a token.
///
/// # Errors
/// `NotFound` for an unknown handle, `InvalidCredential` for a wrong password,
/// `Store`/`Internal` for backend faults.
pub async fn authenticate(
    state: &AuthState,
    store: &dyn CredentialStore,
    role: Role,
    credential: Credential,
) -> Result<LoginGrant, AuthError> {
    let Some(principal) = store.find_principal(role, &credential.handle).await? else {
        debug!(role = %role, "Login rejected: unknown handle");
        return Err(AuthError::NotFound);
    };

    if !verify_password(credential.password, principal.password_hash.clone()).await? {
        debug!(role = %role, principal_id = %principal.id, "Login rejected: wrong password");
        return Err(AuthError::InvalidCredential);
    }

    let issued = state
        .tokens()
        .issue(&principal, state.config().token_ttl_seconds(role))?;

    info!(role = %role, principal_id = %principal.id, "Login succeeded");

    Ok(LoginGrant {
        principal_id: principal.id,
        handle: principal.handle,
        token: issued.token,
        expires_in: issued.expires_in,
    })
}

#[derive(Deserialize, ToSchema)]
pub struct UserLoginRequest {
    username: String,
    #[schema(value_type = String, format = Password)]
    password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    email: String,
    #[schema(value_type = String, format = Password)]
    password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminSummary {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginResponse {
    pub message: String,
    pub token: String,
    pub expires_in: u64,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginResponse {
    pub message: String,
    pub token: String,
    pub expires_in: u64,
    pub admin: AdminSummary,
}

#[utoipa::path(
    post,
    path = "/user/login",
    request_body = UserLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserLoginResponse),
        (status = 400, description = "Malformed payload", body = crate::api::handlers::ErrorResponse),
        (status = 401, description = "Authentication failed", body = crate::api::handlers::ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login_user(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedCredentials>,
    payload: Result<Json<UserLoginRequest>, JsonRejection>,
) -> Result<Json<UserLoginResponse>, ApiError> {
    let Json(request) = payload?;
    let credential = Credential {
        handle: request.username.trim().to_string(),
        password: SecretString::from(request.password),
    };
    let grant = authenticate(&auth_state, store.as_ref(), Role::User, credential).await?;

    Ok(Json(UserLoginResponse {
        message: "Login successful".to_string(),
        token: grant.token,
        expires_in: grant.expires_in,
        user: UserSummary {
            id: grant.principal_id,
            username: grant.handle,
        },
    }))
}

#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Admin login successful", body = AdminLoginResponse),
        (status = 400, description = "Malformed payload", body = crate::api::handlers::ErrorResponse),
        (status = 401, description = "Authentication failed", body = crate::api::handlers::ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login_admin(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedCredentials>,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Result<Json<AdminLoginResponse>, ApiError> {
    let Json(request) = payload?;
    let credential = Credential {
        handle: request.email.trim().to_string(),
        password: SecretString::from(request.password),
    };
    let grant = authenticate(&auth_state, store.as_ref(), Role::Admin, credential).await?;

    Ok(Json(AdminLoginResponse {
        message: "Admin login successful".to_string(),
        token: grant.token,
        expires_in: grant.expires_in,
        admin: AdminSummary {
            id: grant.principal_id,
            email: grant.handle,
        },
    }))
}
