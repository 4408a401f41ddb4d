use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_USER_TOKEN_TTL_SECONDS: &str = "user-token-ttl-seconds";
pub const ARG_ADMIN_TOKEN_TTL_SECONDS: &str = "admin-token-ttl-seconds";
pub const ARG_BCRYPT_COST: &str = "bcrypt-cost";

#[derive(Debug)]
pub struct Options {
    pub jwt_secret: SecretString,
    pub user_token_ttl_seconds: u64,
    pub admin_token_ttl_seconds: u64,
    pub bcrypt_cost: u32,
}

impl Options {
    /// Parse token and password hashing arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the signing secret is missing or blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .filter(|v| !v.trim().is_empty())
            .map(|v| SecretString::from(v.clone()))
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_JWT_SECRET}"))?;

        Ok(Self {
            jwt_secret,
            user_token_ttl_seconds: matches
                .get_one::<u64>(ARG_USER_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(10_800),
            admin_token_ttl_seconds: matches
                .get_one::<u64>(ARG_ADMIN_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(3600),
            bcrypt_cost: matches
                .get_one::<u32>(ARG_BCRYPT_COST)
                .copied()
                .unwrap_or(10),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign and verify bearer tokens")
                .env("MLAB_JWT_SECRET_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_USER_TOKEN_TTL_SECONDS)
                .long(ARG_USER_TOKEN_TTL_SECONDS)
                .help("User token TTL in seconds")
                .env("MLAB_USER_TOKEN_TTL_SECONDS")
                .default_value("10800")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_ADMIN_TOKEN_TTL_SECONDS)
                .long(ARG_ADMIN_TOKEN_TTL_SECONDS)
                .help("Admin token TTL in seconds")
                .env("MLAB_ADMIN_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_BCRYPT_COST)
                .long(ARG_BCRYPT_COST)
                .help("bcrypt work factor for new password hashes")
                .env("MLAB_BCRYPT_COST")
                .default_value("10")
                .value_parser(clap::value_parser!(u32).range(4..=31)),
        )
}
