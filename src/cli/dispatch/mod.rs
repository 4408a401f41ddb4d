//! Map validated CLI arguments to the action the binary executes.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, storage, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(4321);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let storage_opts = storage::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret: auth_opts.jwt_secret,
        user_token_ttl_seconds: auth_opts.user_token_ttl_seconds,
        admin_token_ttl_seconds: auth_opts.admin_token_ttl_seconds,
        bcrypt_cost: auth_opts.bcrypt_cost,
        storage_dir: storage_opts.storage_dir,
        max_upload_bytes: storage_opts.max_upload_bytes,
    }))
}
