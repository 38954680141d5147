//! Defines error types specific to migration execution within the `strata-engine`
//! crate.

use strata_storage_seaorm::schema_driver::DriverError;
use thiserror::Error;
use uuid::Uuid;

/// Represents errors that can occur while validating or applying migrations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A schema driver primitive failed.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Existing values cannot survive the requested type change. The DDL was never
    /// issued; a failed history record carries the same diagnostic.
    #[error("type conversion failed for column \"{column}\": {reason}")]
    TypeConversionFailed {
        /// Column under conversion.
        column: String,
        /// What the validation scan found.
        reason: String,
    },

    /// No migration record with the given identity exists.
    #[error("migration {0} not found")]
    MigrationNotFound(Uuid),

    /// The migration was already rolled back, or is itself a rollback (rollbacks of
    /// rollbacks are disallowed).
    #[error("migration {0} has already been rolled back")]
    AlreadyRolledBack(Uuid),

    /// The record cannot be reversed: it failed, or carries no rollback SQL.
    #[error("migration {0} has no rollback")]
    RollbackUnavailable(Uuid),

    /// Rolling back this ADD would drop a column whose field is still part of the
    /// form's current field set.
    #[error("field for column \"{0}\" is still present in the form")]
    FieldStillPresent(String),

    /// No backup with the given identity exists.
    #[error("backup {0} not found")]
    BackupNotFound(Uuid),

    /// The backup's 90-day restore window has closed.
    #[error("backup {0} has expired")]
    BackupExpired(Uuid),

    /// A repository operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),

    /// A transaction could not be opened or committed.
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

impl EngineError {
    /// Whether the queue may retry the failed migration with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Driver(e) if e.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_driver_transients_are_transient() {
        assert!(EngineError::Driver(DriverError::Deadlock("40P01".into())).is_transient());
        assert!(
            EngineError::Driver(DriverError::ConnectionLost("gone".into())).is_transient()
        );
        assert!(!EngineError::Driver(DriverError::PermissionDenied("no".into())).is_transient());
        assert!(
            !EngineError::TypeConversionFailed { column: "c".into(), reason: "bad".into() }
                .is_transient()
        );
        assert!(!EngineError::MigrationNotFound(Uuid::new_v4()).is_transient());
        assert!(!EngineError::BackupExpired(Uuid::new_v4()).is_transient());
    }
}
