use axum::{extract::rejection::JsonRejection, http::StatusCode, Extension, Json};
use chrono::NaiveDate;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{
    auth::{password::hash_password, AuthState},
    required, valid_email, ErrorResponse,
};
use crate::{
    api::error::ApiError,
    store::{AdminProfile, NewAdmin, SharedCredentials, StoreError},
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminRegistration {
    first_name: String,
    last_name: String,
    dob: NaiveDate,
    email: String,
    #[schema(value_type = String, format = Password)]
    password: String,
    country: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminRegistered {
    pub message: String,
    pub admin: AdminProfile,
}

#[utoipa::path(
    post,
    path = "/admin/register",
    request_body = AdminRegistration,
    responses(
        (status = 201, description = "Admin created", body = AdminRegistered),
        (status = 400, description = "Invalid payload or email taken", body = ErrorResponse),
    ),
    tag = "admins"
)]
#[instrument(skip_all)]
pub async fn register_admin(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedCredentials>,
    payload: Result<Json<AdminRegistration>, JsonRejection>,
) -> Result<(StatusCode, Json<AdminRegistered>), ApiError> {
    let Json(request) = payload?;

    let email = required("email", &request.email)?;
    if !valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if request.password.is_empty() {
        return Err(ApiError::bad_request("password is required"));
    }

    let admin = NewAdmin {
        first_name: required("firstName", &request.first_name)?,
        last_name: required("lastName", &request.last_name)?,
        dob: request.dob,
        email,
        password_hash: hash_password(
            SecretString::from(request.password),
            auth_state.config().bcrypt_cost(),
        )
        .await?,
        country: request.country.filter(|c| !c.trim().is_empty()),
    };

    let profile = match store.insert_admin(admin).await {
        Ok(profile) => profile,
        Err(StoreError::Duplicate) => {
            return Err(ApiError::bad_request(
                "Email already exists. Please choose a different email.",
            ))
        }
        Err(err) => return Err(err.into()),
    };

    info!(admin_id = %profile.id, "Admin registered");

    Ok((
        StatusCode::CREATED,
        Json(AdminRegistered {
            message: "New admin created".to_string(),
            admin: profile,
        }),
    ))
}
