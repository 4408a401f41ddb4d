use crate::{
    api::{
        self,
        handlers::{
            auth::{AuthConfig, AuthState, Revocations},
            products::upload::Uploads,
        },
    },
    store::PgStore,
};
use anyhow::Result;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub user_token_ttl_seconds: u64,
    pub admin_token_ttl_seconds: u64,
    pub bcrypt_cost: u32,
    pub storage_dir: PathBuf,
    pub max_upload_bytes: usize,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, the storage directory cannot be created or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store = PgStore::connect(&args.dsn).await?;
    debug!("Database schema ready");

    let config = AuthConfig::new(args.jwt_secret)
        .with_user_token_ttl_seconds(args.user_token_ttl_seconds)
        .with_admin_token_ttl_seconds(args.admin_token_ttl_seconds)
        .with_bcrypt_cost(args.bcrypt_cost);
    let auth_state = AuthState::new(config, Revocations::in_memory());

    let uploads = Uploads::new(args.storage_dir);
    debug!(storage_dir = %uploads.root().display(), "Upload storage configured");

    api::new(args.port, store, auth_state, uploads, args.max_upload_bytes).await
}
