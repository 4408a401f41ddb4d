//! User accounts: registration and the owned-products list.

use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{
    auth::{password::hash_password, AuthContext, AuthState},
    parse_product_id, required, valid_email, ErrorResponse, MessageResponse,
};
use crate::{
    api::error::ApiError,
    store::{NewUser, Ownership, Product, SharedCatalog, SharedCredentials, StoreError, UserProfile},
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistration {
    first_name: String,
    last_name: String,
    username: String,
    dob: NaiveDate,
    email: String,
    #[schema(value_type = String, format = Password)]
    password: String,
    country: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserRegistered {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnedProducts {
    pub message: String,
    pub products_owned: Vec<Product>,
}

#[utoipa::path(
    post,
    path = "/user/register",
    request_body = UserRegistration,
    responses(
        (status = 201, description = "User created", body = UserRegistered),
        (status = 400, description = "Invalid payload or username taken", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn register_user(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedCredentials>,
    payload: Result<Json<UserRegistration>, JsonRejection>,
) -> Result<(StatusCode, Json<UserRegistered>), ApiError> {
    let Json(request) = payload?;

    let email = required("email", &request.email)?;
    if !valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if request.password.is_empty() {
        return Err(ApiError::bad_request("password is required"));
    }

    let password_hash = hash_password(
        SecretString::from(request.password),
        auth_state.config().bcrypt_cost(),
    )
    .await?;

    let user = NewUser {
        first_name: required("firstName", &request.first_name)?,
        last_name: required("lastName", &request.last_name)?,
        username: required("username", &request.username)?,
        dob: request.dob,
        email,
        password_hash,
        country: request.country.filter(|c| !c.trim().is_empty()),
    };

    let profile = match store.insert_user(user).await {
        Ok(profile) => profile,
        Err(StoreError::Duplicate) => {
            return Err(ApiError::bad_request(
                "Username already exists. Please choose a different username.",
            ))
        }
        Err(err) => return Err(err.into()),
    };

    info!(user_id = %profile.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(UserRegistered {
            message: "New user created".to_string(),
            user: profile,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/user/products",
    responses(
        (status = 200, description = "Products owned by the caller", body = OwnedProducts),
        (status = 401, description = "Missing, revoked or non-user token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all, fields(user_id = %context.principal_id))]
pub async fn owned_products(
    Extension(context): Extension<AuthContext>,
    Extension(catalog): Extension<SharedCatalog>,
) -> Result<Json<OwnedProducts>, ApiError> {
    let products = catalog
        .owned_products(context.principal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(OwnedProducts {
        message: "Access granted".to_string(),
        products_owned: products,
    }))
}

#[utoipa::path(
    post,
    path = "/user/products/{productId}",
    params(("productId" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product is owned by the caller", body = MessageResponse),
        (status = 400, description = "Invalid product id", body = ErrorResponse),
        (status = 401, description = "Missing, revoked or non-user token", body = ErrorResponse),
        (status = 404, description = "Unknown product or user", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all, fields(user_id = %context.principal_id))]
pub async fn own_product(
    Extension(context): Extension<AuthContext>,
    Extension(catalog): Extension<SharedCatalog>,
    Path(product_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let product_id = parse_product_id(&product_id)?;

    let message = match catalog
        .add_owned_product(context.principal_id, product_id)
        .await?
    {
        Ownership::Added => "Product added to owned products",
        Ownership::AlreadyOwned => "Product already owned",
        Ownership::UnknownProduct => return Err(ApiError::not_found("Product not found")),
        Ownership::UnknownUser => return Err(ApiError::not_found("User not found")),
    };

    Ok(Json(MessageResponse::new(message)))
}
