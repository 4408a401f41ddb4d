//! In-memory store used by handler and auth tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AdminProfile, CatalogStore, CredentialStore, NewAdmin, NewProduct, NewUser, Ownership,
    Principal, Product, ProductChanges, Role, StoreError, UserProfile, DEFAULT_MACOS_INSTALLER,
    DEFAULT_PRODUCT_IMAGE, DEFAULT_WINDOWS_INSTALLER,
};

struct StoredUser {
    profile: UserProfile,
    password_hash: String,
    owned: Vec<Uuid>,
}

struct StoredAdmin {
    profile: AdminProfile,
    password_hash: String,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, StoredUser>,
    admins: HashMap<Uuid, StoredAdmin>,
    products: Vec<Product>,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_principal(
        &self,
        role: Role,
        handle: &str,
    ) -> Result<Option<Principal>, StoreError> {
        let tables = self.tables.read().await;
        let principal = match role {
            Role::User => tables
                .users
                .values()
                .find(|u| u.profile.username == handle)
                .map(|u| Principal {
                    id: u.profile.id,
                    handle: u.profile.username.clone(),
                    password_hash: u.password_hash.clone(),
                    role: u.profile.role,
                }),
            Role::Admin => tables
                .admins
                .values()
                .find(|a| a.profile.email == handle)
                .map(|a| Principal {
                    id: a.profile.id,
                    handle: a.profile.email.clone(),
                    password_hash: a.password_hash.clone(),
                    role: a.profile.role,
                }),
        };
        Ok(principal)
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserProfile, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.profile.username == user.username || u.profile.email == user.email)
        {
            return Err(StoreError::Duplicate);
        }
        let profile = UserProfile {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            dob: user.dob,
            email: user.email,
            country: user.country,
            role: Role::User,
        };
        tables.users.insert(
            profile.id,
            StoredUser {
                profile: profile.clone(),
                password_hash: user.password_hash,
                owned: Vec::new(),
            },
        );
        Ok(profile)
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<AdminProfile, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.admins.values().any(|a| a.profile.email == admin.email) {
            return Err(StoreError::Duplicate);
        }
        let profile = AdminProfile {
            id: Uuid::new_v4(),
            first_name: admin.first_name,
            last_name: admin.last_name,
            dob: admin.dob,
            email: admin.email,
            country: admin.country,
            role: Role::Admin,
        };
        tables.admins.insert(
            profile.id,
            StoredAdmin {
                profile: profile.clone(),
                password_hash: admin.password_hash,
            },
        );
        Ok(profile)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.tables.read().await.products.clone())
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.products.iter().any(|p| p.name == product.name) {
            return Err(StoreError::Duplicate);
        }
        let product = Product {
            id: Uuid::new_v4(),
            name: product.name,
            price: product.price,
            version: product.version,
            product_image: product
                .product_image
                .unwrap_or_else(|| DEFAULT_PRODUCT_IMAGE.to_string()),
            win_installer: DEFAULT_WINDOWS_INSTALLER.to_string(),
            macos_installer: DEFAULT_MACOS_INSTALLER.to_string(),
        };
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> Result<Option<Product>, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(name) = &changes.name {
            if tables.products.iter().any(|p| p.id != id && &p.name == name) {
                return Err(StoreError::Duplicate);
            }
        }
        let Some(product) = tables.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(version) = changes.version {
            product.version = version;
        }
        if let Some(image) = changes.product_image {
            product.product_image = image;
        }
        if let Some(installer) = changes.win_installer {
            product.win_installer = installer;
        }
        if let Some(installer) = changes.macos_installer {
            product.macos_installer = installer;
        }
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        let removed = tables.products.len() != before;
        if removed {
            for user in tables.users.values_mut() {
                user.owned.retain(|owned| *owned != id);
            }
        }
        Ok(removed)
    }

    async fn owned_products(&self, user_id: Uuid) -> Result<Option<Vec<Product>>, StoreError> {
        let tables = self.tables.read().await;
        let Some(user) = tables.users.get(&user_id) else {
            return Ok(None);
        };
        let products = user
            .owned
            .iter()
            .filter_map(|id| tables.products.iter().find(|p| p.id == *id).cloned())
            .collect();
        Ok(Some(products))
    }

    async fn add_owned_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Ownership, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.products.iter().any(|p| p.id == product_id) {
            return Ok(Ownership::UnknownProduct);
        }
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(Ownership::UnknownUser);
        };
        if user.owned.contains(&product_id) {
            return Ok(Ownership::AlreadyOwned);
        }
        user.owned.push(product_id);
        Ok(Ownership::Added)
    }
}
