//! bcrypt hashing on the blocking pool.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

pub async fn hash_password(password: SecretString, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password.expose_secret(), cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

/// Compare `password` with a stored bcrypt hash.
pub async fn verify_password(password: SecretString, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password.expose_secret(), &hash))
        .await
        .context("password verification task failed")?
        .context("failed to verify password")
}
