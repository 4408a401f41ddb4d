//! Role-scoped token revocation lists.
//!
//! Entries are only ever added. Both lists live in process memory and start
//! empty on every boot.

use dashmap::DashSet;
use std::{fmt, sync::Arc};

use crate::store::Role;

pub trait RevocationStore: Send + Sync + fmt::Debug {
    fn contains(&self, token: &str) -> bool;

    /// Record `token`. Returns `false` when it was already present.
    fn add(&self, token: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRevocationList {
    tokens: DashSet<String>,
}

impl RevocationStore for InMemoryRevocationList {
    fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    fn add(&self, token: &str) -> bool {
        self.tokens.insert(token.to_string())
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }
}

/// One list per role, built once and shared by every request.
#[derive(Clone)]
pub struct Revocations {
    user: Arc<dyn RevocationStore>,
    admin: Arc<dyn RevocationStore>,
}

impl fmt::Debug for Revocations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Revocations")
            .field("user", &self.user.len())
            .field("admin", &self.admin.len())
            .finish()
    }
}

impl Revocations {
    #[must_use]
    pub fn new(user: Arc<dyn RevocationStore>, admin: Arc<dyn RevocationStore>) -> Self {
        Self { user, admin }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryRevocationList::default()),
            Arc::new(InMemoryRevocationList::default()),
        )
    }

    #[must_use]
    pub fn for_role(&self, role: Role) -> &dyn RevocationStore {
        match role {
            Role::User => self.user.as_ref(),
            Role::Admin => self.admin.as_ref(),
        }
    }
}
