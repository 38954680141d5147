//! Driver error taxonomy and database error classification.
//!
//! The queue's retry policy hinges on the transient/permanent split made here:
//! deadlocks and lost connections are retried with backoff, everything else is
//! surfaced immediately.

use sea_orm::DbErr;
use strata_core::ident::IdentError;
use thiserror::Error;

/// Errors raised by the schema driver.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The target column already exists.
    #[error("column \"{column}\" already exists on table \"{table}\"")]
    ColumnExists {
        /// Dynamic table name.
        table: String,
        /// Offending column name.
        column: String,
    },

    /// The target column does not exist.
    #[error("column \"{column}\" does not exist on table \"{table}\"")]
    ColumnMissing {
        /// Dynamic table name.
        table: String,
        /// Missing column name.
        column: String,
    },

    /// An identifier failed validation before any SQL was issued.
    #[error(transparent)]
    Ident(#[from] IdentError),

    /// The database could not cast existing values to the requested type.
    #[error("values in column \"{column}\" cannot be converted: {reason}")]
    TypeConversion {
        /// Column under conversion.
        column: String,
        /// Database diagnostic.
        reason: String,
    },

    /// Transient: two transactions deadlocked; safe to retry.
    #[error("deadlock detected: {0}")]
    Deadlock(String),

    /// Transient: the database connection dropped; safe to retry.
    #[error("database connection lost: {0}")]
    ConnectionLost(String),

    /// The database role lacks the required privilege.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The database is out of storage.
    #[error("disk full: {0}")]
    DiskFull(String),

    /// Any other database error.
    #[error("database error: {0}")]
    Db(DbErr),
}

impl DriverError {
    /// Whether the queue may retry the failed operation with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, DriverError::Deadlock(_) | DriverError::ConnectionLost(_))
    }
}

/// Classifies a raw database error by its SQLSTATE (when present in the message) or
/// by well-known message fragments.
pub fn classify_db_err(err: DbErr) -> DriverError {
    let text = err.to_string();
    let lowered = text.to_lowercase();

    if lowered.contains("40p01") || lowered.contains("deadlock detected") {
        DriverError::Deadlock(text)
    } else if is_connection_failure(&lowered) {
        DriverError::ConnectionLost(text)
    } else if lowered.contains("42501") || lowered.contains("permission denied") {
        DriverError::PermissionDenied(text)
    } else if lowered.contains("53100") || lowered.contains("disk full") {
        DriverError::DiskFull(text)
    } else {
        DriverError::Db(err)
    }
}

fn is_connection_failure(lowered: &str) -> bool {
    // 08xxx: connection exceptions; 57P01..57P03: server shutdown / crash / cannot
    // connect now.
    lowered.contains("08006")
        || lowered.contains("08001")
        || lowered.contains("08003")
        || lowered.contains("57p01")
        || lowered.contains("57p02")
        || lowered.contains("57p03")
        || lowered.contains("connection reset")
        || lowered.contains("connection refused")
        || lowered.contains("connection closed")
        || lowered.contains("broken pipe")
        || lowered.contains("pool timed out")
}

/// Whether a database diagnostic indicates a failed value cast (e.g. during
/// `ALTER COLUMN ... TYPE ... USING`).
pub fn is_cast_failure(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("22p02")
        || lowered.contains("invalid input syntax")
        || lowered.contains("22001")
        || lowered.contains("value too long")
        || lowered.contains("cannot be cast")
        || lowered.contains("out of range")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(msg: &str) -> DbErr {
        DbErr::Custom(msg.to_string())
    }

    #[test]
    fn test_deadlock_is_transient() {
        let err = classify_db_err(custom("ERROR: deadlock detected (SQLSTATE 40P01)"));
        assert!(matches!(err, DriverError::Deadlock(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_connection_loss_is_transient() {
        for msg in ["connection reset by peer", "SQLSTATE 57P01", "pool timed out"] {
            let err = classify_db_err(custom(msg));
            assert!(matches!(err, DriverError::ConnectionLost(_)), "{msg}");
            assert!(err.is_transient());
        }
    }

    #[test]
    fn test_permission_and_disk_are_permanent() {
        let err = classify_db_err(custom("ERROR: permission denied for table forms"));
        assert!(matches!(err, DriverError::PermissionDenied(_)));
        assert!(!err.is_transient());

        let err = classify_db_err(custom("ERROR: could not extend file: disk full"));
        assert!(matches!(err, DriverError::DiskFull(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_unclassified_stays_db() {
        let err = classify_db_err(custom("ERROR: something else entirely"));
        assert!(matches!(err, DriverError::Db(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_cast_failure_detection() {
        assert!(is_cast_failure("invalid input syntax for type numeric: \"abc\""));
        assert!(is_cast_failure("value too long for type character varying(20)"));
        assert!(!is_cast_failure("deadlock detected"));
    }
}
