//! In-process harness for handler tests: the full router over a memory store.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use jsonwebtoken::get_current_timestamp;
use secrecy::SecretString;
use serde_json::Value;
use std::{path::PathBuf, sync::Arc};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use super::{
    auth::{password::hash_password, token::Claims, AuthConfig, AuthState, Revocations},
    products::upload::Uploads,
};
use crate::{
    api::{app, AppState},
    store::{
        memory::MemoryStore, CatalogStore, CredentialStore, NewAdmin, NewProduct, NewUser,
        Principal, Product, Role, SharedCatalog, Version,
    },
};

pub(crate) const TEST_SECRET: &str = "test-signing-secret";
const TEST_BCRYPT_COST: u32 = 4;
pub(crate) const BOUNDARY: &str = "mlab-test-boundary";

pub(crate) struct TestApp {
    pub(crate) router: Router,
    pub(crate) auth: Arc<AuthState>,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) storage: TempDir,
}

impl TestApp {
    pub(crate) fn new() -> Self {
        Self::with_max_upload_bytes(1024 * 1024)
    }

    pub(crate) fn with_max_upload_bytes(max_upload_bytes: usize) -> Self {
        Self::build(max_upload_bytes, |store| store as SharedCatalog)
    }

    /// Route catalog calls through `wrap`; seeding still goes to the memory store.
    pub(crate) fn with_catalog(wrap: impl FnOnce(Arc<MemoryStore>) -> SharedCatalog) -> Self {
        Self::build(1024 * 1024, wrap)
    }

    fn build(
        max_upload_bytes: usize,
        wrap: impl FnOnce(Arc<MemoryStore>) -> SharedCatalog,
    ) -> Self {
        let config = AuthConfig::new(SecretString::from(TEST_SECRET.to_string()))
            .with_bcrypt_cost(TEST_BCRYPT_COST);
        let auth = Arc::new(AuthState::new(config, Revocations::in_memory()));
        let store = Arc::new(MemoryStore::new());
        let storage = tempfile::tempdir().expect("tempdir");
        let router = app(AppState {
            auth: auth.clone(),
            credentials: store.clone(),
            catalog: wrap(store.clone()),
            uploads: Arc::new(Uploads::new(storage.path())),
            max_upload_bytes,
        });
        Self {
            router,
            auth,
            store,
            storage,
        }
    }

    pub(crate) async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router")
    }

    pub(crate) fn get(&self, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).expect("request")
    }

    /// Files currently stored under one asset directory.
    pub(crate) fn stored_files(&self, directory: &str) -> Vec<PathBuf> {
        std::fs::read_dir(self.storage.path().join(directory))
            .map(|entries| entries.filter_map(|entry| entry.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }

    /// Assert `value` is a path under `directory` ending in `-<file_name>`.
    pub(crate) fn stored_path(&self, directory: &str, value: &Value, file_name: &str) -> PathBuf {
        let path = PathBuf::from(value.as_str().expect("stored path"));
        assert_eq!(path.parent(), Some(self.storage.path().join(directory).as_path()));
        let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
        assert!(name.ends_with(&format!("-{file_name}")), "{name}");
        path
    }

    pub(crate) async fn seed_user(&self, username: &str, password: &str) -> (Uuid, String) {
        let password_hash = hash_password(
            SecretString::from(password.to_string()),
            TEST_BCRYPT_COST,
        )
        .await
        .expect("hash");
        let profile = self
            .store
            .insert_user(NewUser {
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                username: username.to_string(),
                dob: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).expect("date"),
                email: format!("{username}@users.test"),
                password_hash,
                country: None,
            })
            .await
            .expect("insert user");
        let token = self.token_for(profile.id, username, Role::User, 3600);
        (profile.id, token)
    }

    pub(crate) async fn seed_admin(&self, email: &str, password: &str) -> (Uuid, String) {
        let password_hash = hash_password(
            SecretString::from(password.to_string()),
            TEST_BCRYPT_COST,
        )
        .await
        .expect("hash");
        let profile = self
            .store
            .insert_admin(NewAdmin {
                first_name: "Test".to_string(),
                last_name: "Admin".to_string(),
                dob: chrono::NaiveDate::from_ymd_opt(1985, 1, 1).expect("date"),
                email: email.to_string(),
                password_hash,
                country: None,
            })
            .await
            .expect("insert admin");
        let token = self.token_for(profile.id, email, Role::Admin, 3600);
        (profile.id, token)
    }

    pub(crate) async fn seed_product(&self, name: &str) -> Product {
        self.store
            .insert_product(NewProduct {
                name: name.to_string(),
                price: 10.0,
                version: Version::default(),
                product_image: None,
            })
            .await
            .expect("insert product")
    }

    /// Sign a token directly, bypassing login.
    pub(crate) fn token_for(&self, id: Uuid, handle: &str, role: Role, ttl: u64) -> String {
        self.token_issued_at(id, handle, role, get_current_timestamp(), ttl)
    }

    pub(crate) fn token_issued_at(
        &self,
        id: Uuid,
        handle: &str,
        role: Role,
        issued_at: u64,
        ttl: u64,
    ) -> String {
        let principal = Principal {
            id,
            handle: handle.to_string(),
            password_hash: String::new(),
            role,
        };
        self.auth
            .tokens()
            .sign(&Claims::for_principal(&principal, issued_at, ttl))
            .expect("sign")
    }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: &Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).expect("json")))
        .expect("request")
}

pub(crate) fn bearer_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub(crate) enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub(crate) fn multipart_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    parts: &[Part<'_>],
) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                field,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).expect("request")
}

pub(crate) async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
