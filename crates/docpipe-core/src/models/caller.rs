use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

/// User role for authorization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
    Viewer,
}

impl UserRole {
    /// Elevated callers see and mutate rows regardless of owner.
    pub fn is_elevated(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Editor => write!(f, "editor"),
            UserRole::Viewer => write!(f, "viewer"),
        }
    }
}

/// Authenticated caller identity, threaded explicitly through every scoped
/// operation instead of living in ambient request state.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl Caller {
    /// Owner filter for repository queries: `None` means unscoped (elevated).
    pub fn owner_scope(&self) -> Option<Uuid> {
        if self.role.is_elevated() {
            None
        } else {
            Some(self.user_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: UserRole) -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: "User".to_string(),
            role,
        }
    }

    #[test]
    fn test_admin_is_unscoped() {
        assert_eq!(caller(UserRole::Admin).owner_scope(), None);
    }

    #[test]
    fn test_non_admin_scoped_to_own_rows() {
        let c = caller(UserRole::Editor);
        assert_eq!(c.owner_scope(), Some(c.user_id));
        let c = caller(UserRole::Viewer);
        assert_eq!(c.owner_scope(), Some(c.user_id));
    }
}
