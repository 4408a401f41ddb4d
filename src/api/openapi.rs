use super::handlers::{
    admins,
    auth::{gate, login, logout},
    health, products, users,
};
use crate::store::Role;
use axum::middleware;
use utoipa::openapi::{
    security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    ComponentsBuilder, Contact, InfoBuilder, License, OpenApiBuilder, Tag,
};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Public routes, user-gated routes and admin-gated routes are built as three
/// routers and merged; each gated router carries the role gate as a route
/// layer. Routes added outside (like `/`) are not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    let public = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(users::register_user))
        .routes(routes!(login::login_user))
        .routes(routes!(logout::logout_user))
        .routes(routes!(admins::register_admin))
        .routes(routes!(login::login_admin))
        .routes(routes!(logout::logout_admin))
        .routes(routes!(products::list_products))
        .routes(routes!(products::get_product));

    let user_only = OpenApiRouter::new()
        .routes(routes!(users::owned_products))
        .routes(routes!(users::own_product))
        .route_layer(middleware::from_fn_with_state(Role::User, gate::require_role));

    let admin_only = OpenApiRouter::new()
        .routes(routes!(products::create_product))
        .routes(routes!(
            products::update_product,
            products::delete_product
        ))
        .routes(routes!(products::update_price))
        .routes(routes!(products::update_image))
        .routes(routes!(products::upload_windows_installer))
        .routes(routes!(products::upload_macos_installer))
        .route_layer(middleware::from_fn_with_state(Role::Admin, gate::require_role));

    let mut router = public.merge(user_only).merge(admin_only);

    router.get_openapi_mut().tags = Some(vec![
        tag("auth", "Login and logout for users and admins"),
        tag("users", "User registration and owned products"),
        tag("admins", "Admin registration"),
        tag("products", "Product catalog and installer uploads"),
        tag("health", "Service and database health"),
    ]);

    router
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    let components = ComponentsBuilder::new()
        .security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        )
        .build();

    OpenApiBuilder::new()
        .info(info)
        .components(Some(components))
        .build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}
