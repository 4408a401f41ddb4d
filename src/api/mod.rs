use crate::{
    api::handlers::{auth::AuthState, products::upload::Uploads, root},
    store::{PgStore, SharedCatalog, SharedCredentials},
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub(crate) mod error;
pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use error::ApiError;
pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Shared state handed to every request through `Extension` layers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthState>,
    pub credentials: SharedCredentials,
    pub catalog: SharedCatalog,
    pub uploads: Arc<Uploads>,
    pub max_upload_bytes: usize,
}

/// Assemble the full application: documented routes, `/`, Swagger UI, the
/// 404 fallback and the request-id, trace, CORS and state layers.
pub fn app(state: AppState) -> Router {
    let (router, openapi) = router().split_for_parts();

    router
        .route("/", get(root::root))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .fallback(root::not_found)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors())
                .layer(Extension(state.auth))
                .layer(Extension(state.credentials))
                .layer(Extension(state.catalog))
                .layer(Extension(state.uploads)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    store: PgStore,
    auth_state: AuthState,
    uploads: Uploads,
    max_upload_bytes: usize,
) -> Result<()> {
    uploads.prepare().await?;

    let store = Arc::new(store);
    let app = app(AppState {
        auth: Arc::new(auth_state),
        credentials: store.clone(),
        catalog: store,
        uploads: Arc::new(uploads),
        max_upload_bytes,
    });

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_headers([
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            CONTENT_TYPE,
            ACCEPT,
            AUTHORIZATION,
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_origin(Any)
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::handlers::test_support::{body_json, TestApp};
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };

    #[tokio::test]
    async fn root_greets() {
        let app = TestApp::new();
        let response = app.send(app.get("/", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&bytes[..], b"Welcome to MLAB SERVICES");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let app = TestApp::new();
        let response = app.send(app.get("/nope", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Not Found");
    }

    #[tokio::test]
    async fn health_reports_database() {
        let app = TestApp::new();
        let response = app.send(app.get("/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["database"], "ok");
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn request_id_is_propagated() {
        let app = TestApp::new();
        let response = app.send(app.get("/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-app"));

        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "fixed-id")
            .body(Body::empty())
            .expect("request");
        let response = app.send(request).await;
        assert_eq!(
            response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
            Some("fixed-id")
        );
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/products")
            .header("origin", "https://shop.example")
            .header("access-control-request-method", "PATCH")
            .header("access-control-request-headers", "authorization")
            .body(Body::empty())
            .expect("request");
        let response = app.send(request).await;
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = TestApp::new();
        let response = app.send(app.get("/api-docs/openapi.json", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["paths"].get("/user/login").is_some());
    }
}
