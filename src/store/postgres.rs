//! PostgreSQL implementation of the credential and catalog stores.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Row,
};
use std::time::Duration;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use super::{
    AdminProfile, CatalogStore, CredentialStore, NewAdmin, NewProduct, NewUser, Ownership,
    Principal, Product, ProductChanges, Role, StoreError, UserProfile, Version,
    DEFAULT_MACOS_INSTALLER, DEFAULT_PRODUCT_IMAGE, DEFAULT_WINDOWS_INSTALLER,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const PRODUCT_COLUMNS: &str = "id, name, price, version_major, version_minor, version_patch, \
     product_image, win_installer, macos_installer";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and make sure the schema exists.
    ///
    /// # Errors
    /// Returns an error if the connection or a schema statement fails.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    async fn apply_schema(&self) -> Result<()> {
        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&self.pool)
                .instrument(db_span("CREATE", statement))
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }
        Ok(())
    }
}

fn db_span(operation: &str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn sqlstate_is(err: &sqlx::Error, code: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|c| c.as_ref() == code),
        _ => false,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    sqlstate_is(err, "23505")
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    sqlstate_is(err, "23503")
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Duplicate
    } else {
        StoreError::Database(err)
    }
}

fn role_from_row(row: &PgRow) -> Result<Role, StoreError> {
    let role: String = row.try_get("role")?;
    role.parse()
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        version: Version {
            major: row.try_get("version_major")?,
            minor: row.try_get("version_minor")?,
            patch: row.try_get("version_patch")?,
        },
        product_image: row.try_get("product_image")?,
        win_installer: row.try_get("win_installer")?,
        macos_installer: row.try_get("macos_installer")?,
    })
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_principal(
        &self,
        role: Role,
        handle: &str,
    ) -> Result<Option<Principal>, StoreError> {
        let query = match role {
            Role::User => "SELECT id, username AS handle, password_hash, role FROM users WHERE username = $1",
            Role::Admin => "SELECT id, email AS handle, password_hash, role FROM admins WHERE email = $1",
        };
        let row = sqlx::query(query)
            .bind(handle)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        row.map(|row| -> Result<Principal, StoreError> {
            Ok(Principal {
                id: row.try_get("id")?,
                handle: row.try_get("handle")?,
                password_hash: row.try_get("password_hash")?,
                role: role_from_row(&row)?,
            })
        })
        .transpose()
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserProfile, StoreError> {
        let query = r"
            INSERT INTO users
                (id, first_name, last_name, username, dob, email, password_hash, country, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'user')
            RETURNING id, first_name, last_name, username, dob, email, country, role
        ";
        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.username)
            .bind(user.dob)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.country)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(map_insert_error)?;

        Ok(UserProfile {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            username: row.try_get("username")?,
            dob: row.try_get("dob")?,
            email: row.try_get("email")?,
            country: row.try_get("country")?,
            role: role_from_row(&row)?,
        })
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<AdminProfile, StoreError> {
        let query = r"
            INSERT INTO admins
                (id, first_name, last_name, dob, email, password_hash, country, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'admin')
            RETURNING id, first_name, last_name, dob, email, country, role
        ";
        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(&admin.first_name)
            .bind(&admin.last_name)
            .bind(admin.dob)
            .bind(&admin.email)
            .bind(&admin.password_hash)
            .bind(&admin.country)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(map_insert_error)?;

        Ok(AdminProfile {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            dob: row.try_get("dob")?,
            email: row.try_get("email")?,
            country: row.try_get("country")?,
            role: role_from_row(&row)?,
        })
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at, name");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let query = format!(
            "INSERT INTO products \
                (id, name, price, version_major, version_minor, version_patch, \
                 product_image, win_installer, macos_installer) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&product.name)
            .bind(product.price)
            .bind(product.version.major)
            .bind(product.version.minor)
            .bind(product.version.patch)
            .bind(
                product
                    .product_image
                    .as_deref()
                    .unwrap_or(DEFAULT_PRODUCT_IMAGE),
            )
            .bind(DEFAULT_WINDOWS_INSTALLER)
            .bind(DEFAULT_MACOS_INSTALLER)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", &query))
            .await
            .map_err(map_insert_error)?;

        product_from_row(&row)
    }

    async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> Result<Option<Product>, StoreError> {
        let query = format!(
            "UPDATE products SET \
                name = COALESCE($2, name), \
                price = COALESCE($3, price), \
                version_major = COALESCE($4, version_major), \
                version_minor = COALESCE($5, version_minor), \
                version_patch = COALESCE($6, version_patch), \
                product_image = COALESCE($7, product_image), \
                win_installer = COALESCE($8, win_installer), \
                macos_installer = COALESCE($9, macos_installer) \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(changes.name)
            .bind(changes.price)
            .bind(changes.version.map(|v| v.major))
            .bind(changes.version.map(|v| v.minor))
            .bind(changes.version.map(|v| v.patch))
            .bind(changes.product_image)
            .bind(changes.win_installer)
            .bind(changes.macos_installer)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", &query))
            .await
            .map_err(map_insert_error)?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        let query = "DELETE FROM products WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn owned_products(&self, user_id: Uuid) -> Result<Option<Vec<Product>>, StoreError> {
        let exists_query = "SELECT 1 FROM users WHERE id = $1";
        let exists = sqlx::query(exists_query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", exists_query))
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let query = "SELECT p.id, p.name, p.price, p.version_major, p.version_minor, \
                    p.version_patch, p.product_image, p.win_installer, p.macos_installer \
             FROM products p \
             JOIN user_products up ON up.product_id = p.id \
             WHERE up.user_id = $1 \
             ORDER BY up.acquired_at, p.name";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        rows.iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    async fn add_owned_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Ownership, StoreError> {
        if self.get_product(product_id).await?.is_none() {
            return Ok(Ownership::UnknownProduct);
        }

        let query = r"
            INSERT INTO user_products (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
        ";
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(Ownership::AlreadyOwned),
            Ok(_) => Ok(Ownership::Added),
            // The product may vanish between the lookup and the insert.
            Err(err) if is_foreign_key_violation(&err) => {
                if self.get_product(product_id).await?.is_none() {
                    Ok(Ownership::UnknownProduct)
                } else {
                    Ok(Ownership::UnknownUser)
                }
            }
            Err(err) => Err(StoreError::Database(err)),
        }
    }
}
