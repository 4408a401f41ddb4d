//! Signed bearer tokens (HS256 JWT).
//!
//! A token is the only proof of login: there is no server-side session row.
//! Validity is signature plus expiry, unless the string sits on a revocation
//! list (see `revocation.rs`).

use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use super::error::AuthError;
use crate::store::{Principal, Role};

/// Identity half of the claims, tagged by `role`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Subject {
    User {
        #[serde(rename = "userId")]
        user_id: Uuid,
        username: String,
    },
    Admin {
        #[serde(rename = "adminId")]
        admin_id: Uuid,
        email: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub subject: Subject,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    #[must_use]
    pub fn for_principal(principal: &Principal, issued_at: u64, ttl_seconds: u64) -> Self {
        let subject = match principal.role {
            Role::User => Subject::User {
                user_id: principal.id,
                username: principal.handle.clone(),
            },
            Role::Admin => Subject::Admin {
                admin_id: principal.id,
                email: principal.handle.clone(),
            },
        };
        Self {
            subject,
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_seconds),
        }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        match self.subject {
            Subject::User { .. } => Role::User,
            Subject::Admin { .. } => Role::Admin,
        }
    }

    #[must_use]
    pub const fn principal_id(&self) -> Uuid {
        match self.subject {
            Subject::User { user_id, .. } => user_id,
            Subject::Admin { admin_id, .. } => admin_id,
        }
    }
}

#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

/// Mints and verifies tokens with one shared HMAC secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is dead the second `exp` passes.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }

    /// Issue a token for `principal` valid for `ttl_seconds` from now.
    ///
    /// # Errors
    /// Returns [`AuthError::Internal`] if signing fails.
    pub fn issue(&self, principal: &Principal, ttl_seconds: u64) -> Result<IssuedToken, AuthError> {
        let claims = Claims::for_principal(principal, get_current_timestamp(), ttl_seconds);
        let token = self.sign(&claims)?;
        Ok(IssuedToken {
            token,
            expires_in: ttl_seconds,
        })
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| AuthError::Internal(anyhow::anyhow!("failed to sign token: {err}")))
    }

    /// Check signature and expiry and decode the claims.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`] for any verification failure.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                debug!("Token verification failed: {err}");
                AuthError::InvalidToken
            })
    }
}
