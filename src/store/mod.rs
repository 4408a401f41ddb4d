//! Persistence collaborators: principal credentials and the product catalog.
//!
//! Handlers only see the [`CredentialStore`] and [`CatalogStore`] traits. The
//! server wires both to [`PgStore`]; tests use an in-memory implementation.

#[cfg(test)]
pub(crate) mod memory;
mod postgres;

pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_PRODUCT_IMAGE: &str = "No Product Image";
pub const DEFAULT_WINDOWS_INSTALLER: &str = "No Windows Installer Available";
pub const DEFAULT_MACOS_INSTALLER: &str = "No MacOS Installer Available";

pub type SharedCredentials = Arc<dyn CredentialStore>;
pub type SharedCatalog = Arc<dyn CatalogStore>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,
    #[error("invalid stored value: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Role of a principal. Fixed at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(StoreError::Corrupt(format!("role {other}"))),
        }
    }
}

/// Stored identity used for login. `handle` is the username for users and
/// the email for admins.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: Uuid,
    pub handle: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub dob: NaiveDate,
    pub email: String,
    pub password_hash: String,
    pub country: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewAdmin {
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub email: String,
    pub password_hash: String,
    pub country: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub dob: NaiveDate,
    pub email: String,
    pub country: Option<String>,
    pub role: Role,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub email: String,
    pub country: Option<String>,
    pub role: Role,
}

/// Semantic version of a product release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl Default for Version {
    fn default() -> Self {
        Self {
            major: 1,
            minor: 0,
            patch: 0,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = String;

    /// Parse `major[.minor[.patch]]`; missing parts take their defaults.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut version = Self {
            major: 0,
            minor: 0,
            patch: 0,
        };
        let parts: Vec<&str> = value.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(format!("invalid version: {value}"));
        }
        let slots = [&mut version.major, &mut version.minor, &mut version.patch];
        for (slot, part) in slots.into_iter().zip(parts) {
            *slot = part
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|n| *n >= 0)
                .ok_or_else(|| format!("invalid version: {value}"))?;
        }
        Ok(version)
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub version: Version,
    pub product_image: String,
    pub win_installer: String,
    pub macos_installer: String,
}

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub version: Version,
    pub product_image: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Clone, Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub version: Option<Version>,
    pub product_image: Option<String>,
    pub win_installer: Option<String>,
    pub macos_installer: Option<String>,
}

impl ProductChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.version.is_none()
            && self.product_image.is_none()
            && self.win_installer.is_none()
            && self.macos_installer.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    Added,
    AlreadyOwned,
    UnknownProduct,
    UnknownUser,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a principal by login handle in the table of the given role.
    async fn find_principal(
        &self,
        role: Role,
        handle: &str,
    ) -> Result<Option<Principal>, StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<UserProfile, StoreError>;

    async fn insert_admin(&self, admin: NewAdmin) -> Result<AdminProfile, StoreError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    /// Insert a product; a taken name yields [`StoreError::Duplicate`].
    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> Result<Option<Product>, StoreError>;

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Products owned by a user, or `None` when the user does not exist.
    async fn owned_products(&self, user_id: Uuid) -> Result<Option<Vec<Product>>, StoreError>;

    async fn add_owned_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Ownership, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().ok(), Some(role));
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn version_parses_partial_input() {
        assert_eq!(
            "2".parse::<Version>(),
            Ok(Version {
                major: 2,
                minor: 0,
                patch: 0
            })
        );
        assert_eq!(
            " 1.4.12 ".parse::<Version>(),
            Ok(Version {
                major: 1,
                minor: 4,
                patch: 12
            })
        );
    }

    #[test]
    fn version_rejects_garbage() {
        assert!("".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("1.-2".parse::<Version>().is_err());
        assert!("one".parse::<Version>().is_err());
    }

    #[test]
    fn version_default_is_one_zero_zero() {
        assert_eq!(Version::default().to_string(), "1.0.0");
    }

    #[test]
    fn empty_changes_are_detected() {
        assert!(ProductChanges::default().is_empty());
        let changes = ProductChanges {
            price: Some(9.5),
            ..ProductChanges::default()
        };
        assert!(!changes.is_empty());
    }
}
