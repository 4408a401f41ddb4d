//! Product catalog: public reads, admin-only writes.
//!
//! Write handlers run behind the admin gate and still check the role from
//! the [`AuthContext`] before touching the catalog.

pub mod upload;

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use self::upload::{AssetKind, Uploads};
use super::{auth::AuthContext, parse_product_id, required, ErrorResponse, MessageResponse};
use crate::{
    api::error::ApiError,
    store::{NewProduct, Product, ProductChanges, Role, SharedCatalog, StoreError, Version},
};

const DUPLICATE_NAME: &str = "Product with this name already exists in the database.";
const NOT_FOUND: &str = "Product not found";

fn ensure_admin(context: &AuthContext, action: &str) -> Result<(), ApiError> {
    if context.has_role(Role::Admin) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Unauthorized. Only admin users can {action}."
        )))
    }
}

fn parse_price(raw: &str) -> Result<f64, ApiError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|price| validate_price(*price).is_ok())
        .ok_or_else(|| ApiError::bad_request("Price must be a non-negative number"))
}

fn validate_price(price: f64) -> Result<f64, ApiError> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(ApiError::bad_request("Price must be a non-negative number"))
    }
}

fn parse_version(raw: &str) -> Result<Version, ApiError> {
    raw.parse::<Version>().map_err(ApiError::BadRequest)
}

fn new_product(
    name: Option<&str>,
    price: Option<&str>,
    version: Option<&str>,
    product_image: Option<String>,
) -> Result<NewProduct, ApiError> {
    let name = required("name", name.unwrap_or_default())?;
    let price = parse_price(price.unwrap_or_default())?;
    let version = match version.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => parse_version(raw)?,
        None => Version::default(),
    };
    Ok(NewProduct {
        name,
        price,
        version,
        product_image,
    })
}

fn map_write_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Duplicate => ApiError::bad_request(DUPLICATE_NAME),
        other => other.into(),
    }
}

/// Public projection of a single product.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub product_image: String,
}

impl From<Product> for ProductSummary {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            product_image: product.product_image,
        }
    }
}

/// Multipart form accepted by `POST /products`.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct ProductForm {
    name: String,
    price: f64,
    /// `major.minor.patch`, defaults to `1.0.0`.
    version: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    product_image: Option<Vec<u8>>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct ImageForm {
    #[schema(value_type = String, format = Binary)]
    product_image: Vec<u8>,
}

#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct InstallerForm {
    #[schema(value_type = String, format = Binary)]
    installer: Vec<u8>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductUpdate {
    name: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PriceUpdate {
    price: f64,
}

#[utoipa::path(
    get,
    path = "/products",
    responses((status = 200, description = "All products", body = [Product])),
    tag = "products"
)]
#[instrument(skip_all)]
pub async fn list_products(
    Extension(catalog): Extension<SharedCatalog>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(catalog.list_products().await?))
}

#[utoipa::path(
    get,
    path = "/products/{productId}",
    params(("productId" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductSummary),
        (status = 400, description = "Invalid product id", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    tag = "products"
)]
#[instrument(skip_all)]
pub async fn get_product(
    Extension(catalog): Extension<SharedCatalog>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductSummary>, ApiError> {
    let product_id = parse_product_id(&product_id)?;
    let product = catalog
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(Json(product.into()))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body(content = ProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid form or duplicate name", body = ErrorResponse),
        (status = 401, description = "Missing, revoked or non-admin token", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
#[instrument(skip_all, fields(admin_id = %context.principal_id))]
pub async fn create_product(
    Extension(context): Extension<AuthContext>,
    Extension(catalog): Extension<SharedCatalog>,
    Extension(uploads): Extension<Arc<Uploads>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    ensure_admin(&context, "create products")?;

    let mut name = None;
    let mut price = None;
    let mut version = None;
    let mut product_image = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(ToString::to_string);
        match field_name.as_deref() {
            Some("name") => name = Some(field.text().await?),
            Some("price") => price = Some(field.text().await?),
            Some("version") => version = Some(field.text().await?),
            Some("productImage") => {
                if let Some(path) = uploads.save(AssetKind::Image, field).await? {
                    product_image = Some(path);
                }
            }
            _ => {}
        }
    }

    let result = match new_product(
        name.as_deref(),
        price.as_deref(),
        version.as_deref(),
        product_image.clone(),
    ) {
        Ok(product) => catalog
            .insert_product(product)
            .await
            .map_err(map_write_error),
        Err(err) => Err(err),
    };

    match result {
        Ok(product) => {
            info!(product_id = %product.id, "Product created");
            Ok((StatusCode::CREATED, Json(product)))
        }
        Err(err) => {
            if let Some(path) = product_image {
                uploads.discard(&path).await;
            }
            Err(err)
        }
    }
}

#[utoipa::path(
    patch,
    path = "/products/{productId}",
    params(("productId" = String, Path, description = "Product id")),
    request_body = ProductUpdate,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Invalid payload or duplicate name", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
#[instrument(skip_all, fields(admin_id = %context.principal_id))]
pub async fn update_product(
    Extension(context): Extension<AuthContext>,
    Extension(catalog): Extension<SharedCatalog>,
    Path(product_id): Path<String>,
    payload: Result<Json<ProductUpdate>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    ensure_admin(&context, "update products")?;
    let product_id = parse_product_id(&product_id)?;
    let Json(update) = payload?;

    let changes = ProductChanges {
        name: update
            .name
            .as_deref()
            .map(|name| required("name", name))
            .transpose()?,
        version: update.version.as_deref().map(parse_version).transpose()?,
        ..ProductChanges::default()
    };
    if changes.is_empty() {
        return Err(ApiError::bad_request("No changes supplied"));
    }

    apply(&catalog, product_id, changes).await
}

#[utoipa::path(
    put,
    path = "/products/{productId}/price",
    params(("productId" = String, Path, description = "Product id")),
    request_body = PriceUpdate,
    responses(
        (status = 200, description = "Price updated", body = Product),
        (status = 400, description = "Invalid price", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
#[instrument(skip_all, fields(admin_id = %context.principal_id))]
pub async fn update_price(
    Extension(context): Extension<AuthContext>,
    Extension(catalog): Extension<SharedCatalog>,
    Path(product_id): Path<String>,
    payload: Result<Json<PriceUpdate>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    ensure_admin(&context, "update product prices")?;
    let product_id = parse_product_id(&product_id)?;
    let Json(update) = payload?;

    let changes = ProductChanges {
        price: Some(validate_price(update.price)?),
        ..ProductChanges::default()
    };
    apply(&catalog, product_id, changes).await
}

#[utoipa::path(
    put,
    path = "/products/{productId}/image",
    params(("productId" = String, Path, description = "Product id")),
    request_body(content = ImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image replaced", body = Product),
        (status = 400, description = "Missing or unsupported image", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
#[instrument(skip_all, fields(admin_id = %context.principal_id))]
pub async fn update_image(
    Extension(context): Extension<AuthContext>,
    Extension(catalog): Extension<SharedCatalog>,
    Extension(uploads): Extension<Arc<Uploads>>,
    Path(product_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Product>, ApiError> {
    ensure_admin(&context, "update product images")?;
    let product_id = parse_product_id(&product_id)?;
    replace_asset(
        &catalog,
        &uploads,
        product_id,
        multipart,
        "productImage",
        AssetKind::Image,
    )
    .await
}

#[utoipa::path(
    put,
    path = "/products/{productId}/installers/windows",
    params(("productId" = String, Path, description = "Product id")),
    request_body(content = InstallerForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Windows installer replaced", body = Product),
        (status = 400, description = "Missing installer or not an .exe", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
#[instrument(skip_all, fields(admin_id = %context.principal_id))]
pub async fn upload_windows_installer(
    Extension(context): Extension<AuthContext>,
    Extension(catalog): Extension<SharedCatalog>,
    Extension(uploads): Extension<Arc<Uploads>>,
    Path(product_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Product>, ApiError> {
    ensure_admin(&context, "upload installers")?;
    let product_id = parse_product_id(&product_id)?;
    replace_asset(
        &catalog,
        &uploads,
        product_id,
        multipart,
        "installer",
        AssetKind::WindowsInstaller,
    )
    .await
}

#[utoipa::path(
    put,
    path = "/products/{productId}/installers/macos",
    params(("productId" = String, Path, description = "Product id")),
    request_body(content = InstallerForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "macOS installer replaced", body = Product),
        (status = 400, description = "Missing installer or not a .dmg", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
#[instrument(skip_all, fields(admin_id = %context.principal_id))]
pub async fn upload_macos_installer(
    Extension(context): Extension<AuthContext>,
    Extension(catalog): Extension<SharedCatalog>,
    Extension(uploads): Extension<Arc<Uploads>>,
    Path(product_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Product>, ApiError> {
    ensure_admin(&context, "upload installers")?;
    let product_id = parse_product_id(&product_id)?;
    replace_asset(
        &catalog,
        &uploads,
        product_id,
        multipart,
        "installer",
        AssetKind::MacosInstaller,
    )
    .await
}

#[utoipa::path(
    delete,
    path = "/products/{productId}",
    params(("productId" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted", body = MessageResponse),
        (status = 401, description = "Missing, revoked or non-admin token", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
#[instrument(skip_all, fields(admin_id = %context.principal_id))]
pub async fn delete_product(
    Extension(context): Extension<AuthContext>,
    Extension(catalog): Extension<SharedCatalog>,
    Path(product_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_admin(&context, "delete products")?;
    let product_id = parse_product_id(&product_id)?;

    if !catalog.delete_product(product_id).await? {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    info!(product_id = %product_id, "Product deleted");
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

async fn apply(
    catalog: &SharedCatalog,
    product_id: Uuid,
    changes: ProductChanges,
) -> Result<Json<Product>, ApiError> {
    let product = catalog
        .update_product(product_id, changes)
        .await
        .map_err(map_write_error)?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    info!(product_id = %product.id, "Product updated");
    Ok(Json(product))
}

/// Store the first acceptable file found in `field_name` and point the
/// product at it. The new file is removed if the update fails; the file it
/// replaces is removed once the update lands.
async fn replace_asset(
    catalog: &SharedCatalog,
    uploads: &Uploads,
    product_id: Uuid,
    mut multipart: Multipart,
    field_name: &str,
    kind: AssetKind,
) -> Result<Json<Product>, ApiError> {
    let Some(current) = catalog.get_product(product_id).await? else {
        return Err(ApiError::not_found(NOT_FOUND));
    };

    let mut stored = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        if let Some(path) = uploads.save(kind, field).await? {
            stored = Some(path);
            break;
        }
    }
    let Some(path) = stored else {
        return Err(ApiError::bad_request(match kind {
            AssetKind::Image => "Only JPEG and PNG images are accepted",
            AssetKind::WindowsInstaller => "Only .exe installers are accepted",
            AssetKind::MacosInstaller => "Only .dmg installers are accepted",
        }));
    };

    let mut changes = ProductChanges::default();
    let previous = match kind {
        AssetKind::Image => {
            changes.product_image = Some(path.clone());
            current.product_image
        }
        AssetKind::WindowsInstaller => {
            changes.win_installer = Some(path.clone());
            current.win_installer
        }
        AssetKind::MacosInstaller => {
            changes.macos_installer = Some(path.clone());
            current.macos_installer
        }
    };

    match apply(catalog, product_id, changes).await {
        Ok(product) => {
            if previous != path {
                uploads.discard(&previous).await;
            }
            Ok(product)
        }
        Err(err) => {
            uploads.discard(&path).await;
            Err(err)
        }
    }
}
