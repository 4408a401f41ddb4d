//! Auth configuration and the shared state built from it at startup.

use secrecy::SecretString;

use super::{revocation::Revocations, token::TokenIssuer};
use crate::store::Role;

const DEFAULT_USER_TOKEN_TTL_SECONDS: u64 = 3 * 60 * 60;
const DEFAULT_ADMIN_TOKEN_TTL_SECONDS: u64 = 60 * 60;
const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    user_token_ttl_seconds: u64,
    admin_token_ttl_seconds: u64,
    bcrypt_cost: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString) -> Self {
        Self {
            jwt_secret,
            user_token_ttl_seconds: DEFAULT_USER_TOKEN_TTL_SECONDS,
            admin_token_ttl_seconds: DEFAULT_ADMIN_TOKEN_TTL_SECONDS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    #[must_use]
    pub fn with_user_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.user_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_admin_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.admin_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn token_ttl_seconds(&self, role: Role) -> u64 {
        match role {
            Role::User => self.user_token_ttl_seconds,
            Role::Admin => self.admin_token_ttl_seconds,
        }
    }

    #[must_use]
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

/// Everything the auth handlers and the gate share across requests.
#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenIssuer,
    revocations: Revocations,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, revocations: Revocations) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret);
        Self {
            config,
            tokens,
            revocations,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    #[must_use]
    pub fn revocations(&self) -> &Revocations {
        &self.revocations
    }
}
