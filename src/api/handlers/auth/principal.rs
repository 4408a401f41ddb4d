//! Authorization context attached to requests that pass the auth gate.
//!
//! Flow Overview: the gate verifies the bearer token, turns its claims into an
//! [`AuthContext`] and stores it as a request extension. Handlers read it with
//! `Extension<AuthContext>` and may enforce resource-level policy on top.

use serde::Serialize;
use uuid::Uuid;

use super::token::{Claims, Subject};
use crate::store::Role;

/// Authenticated principal derived from a verified token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub principal_id: Uuid,
    pub role: Role,
    /// Username for users, email for admins.
    pub handle: String,
}

impl AuthContext {
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        (self.role == Role::User).then_some(self.handle.as_str())
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        (self.role == Role::Admin).then_some(self.handle.as_str())
    }
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        match claims.subject {
            Subject::User { user_id, username } => Self {
                principal_id: user_id,
                role: Role::User,
                handle: username,
            },
            Subject::Admin { admin_id, email } => Self {
                principal_id: admin_id,
                role: Role::Admin,
                handle: email,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_claims_expose_email_only() {
        let admin_id = Uuid::new_v4();
        let context = AuthContext::from(Claims {
            subject: Subject::Admin {
                admin_id,
                email: "a@x.com".to_string(),
            },
            iat: 0,
            exp: 1,
        });
        assert_eq!(context.principal_id, admin_id);
        assert!(context.has_role(Role::Admin));
        assert_eq!(context.email(), Some("a@x.com"));
        assert_eq!(context.username(), None);
    }

    #[test]
    fn user_claims_expose_username_only() {
        let context = AuthContext::from(Claims {
            subject: Subject::User {
                user_id: Uuid::new_v4(),
                username: "neo".to_string(),
            },
            iat: 0,
            exp: 1,
        });
        assert!(!context.has_role(Role::Admin));
        assert_eq!(context.username(), Some("neo"));
        assert_eq!(context.email(), None);
    }
}
