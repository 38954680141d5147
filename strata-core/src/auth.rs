//! The role gate: a single authorization predicate applied at the service entry points.
//!
//! Authorization is an *input* to the migration system; authenticating the caller and
//! attaching a role happens upstream. This module only answers "may this role perform
//! this operation".

use serde::{Deserialize, Serialize};

/// Caller roles with migration privileges. Unknown roles are denied everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including rollback and restore.
    SuperAdmin,
    /// May preview and apply schema changes.
    Admin,
    /// Read-mostly: preview, history, and backup listings.
    Moderator,
}

impl Role {
    /// Parses the wire form (`"super_admin"`, `"admin"`, `"moderator"`). Any other
    /// string has no migration privileges and yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "super_admin" => Some(Role::SuperAdmin),
            "admin" => Some(Role::Admin),
            "moderator" => Some(Role::Moderator),
            _ => None,
        }
    }

    /// The wire form of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
        }
    }
}

/// The operations exposed by the migration service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Compute a migration plan without executing it.
    Preview,
    /// Enqueue a migration plan for execution.
    Apply,
    /// Read the migration history of a form.
    History,
    /// Reverse a recorded migration.
    Rollback,
    /// List a form's column backups.
    ListBackups,
    /// Write a backup's snapshot back into its column.
    RestoreBackup,
    /// Read queue state counts.
    QueueStatus,
}

/// The authorization predicate.
///
/// | Role | Allowed |
/// |---|---|
/// | `super_admin` | everything |
/// | `admin` | preview, apply, queue status |
/// | `moderator` | preview, history, list backups, queue status |
pub fn is_allowed(role: Role, operation: Operation) -> bool {
    match role {
        Role::SuperAdmin => true,
        Role::Admin => matches!(
            operation,
            Operation::Preview | Operation::Apply | Operation::QueueStatus
        ),
        Role::Moderator => matches!(
            operation,
            Operation::Preview
                | Operation::History
                | Operation::ListBackups
                | Operation::QueueStatus
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_super_admin_allows_everything() {
        for op in [
            Operation::Preview,
            Operation::Apply,
            Operation::History,
            Operation::Rollback,
            Operation::ListBackups,
            Operation::RestoreBackup,
            Operation::QueueStatus,
        ] {
            assert!(is_allowed(Role::SuperAdmin, op));
        }
    }

    #[test]
    fn test_admin_matrix() {
        assert!(is_allowed(Role::Admin, Operation::Preview));
        assert!(is_allowed(Role::Admin, Operation::Apply));
        assert!(is_allowed(Role::Admin, Operation::QueueStatus));
        assert!(!is_allowed(Role::Admin, Operation::Rollback));
        assert!(!is_allowed(Role::Admin, Operation::RestoreBackup));
        assert!(!is_allowed(Role::Admin, Operation::History));
        assert!(!is_allowed(Role::Admin, Operation::ListBackups));
    }

    #[test]
    fn test_moderator_matrix() {
        assert!(is_allowed(Role::Moderator, Operation::Preview));
        assert!(is_allowed(Role::Moderator, Operation::History));
        assert!(is_allowed(Role::Moderator, Operation::ListBackups));
        assert!(is_allowed(Role::Moderator, Operation::QueueStatus));
        assert!(!is_allowed(Role::Moderator, Operation::Apply));
        assert!(!is_allowed(Role::Moderator, Operation::Rollback));
        assert!(!is_allowed(Role::Moderator, Operation::RestoreBackup));
    }

    #[test]
    fn test_unknown_roles_parse_to_none() {
        assert_eq!(Role::parse("user"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::parse("SUPER_ADMIN"), None);
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
    }
}
