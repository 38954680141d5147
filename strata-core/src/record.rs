//! Persistent record types: migration history entries and column backups.
//!
//! Migration records form an append-only audit trail. Once written they are never
//! updated; a rollback appends a *new* record whose forward SQL equals the original's
//! rollback SQL and whose `rollback_of` references the original.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Default retention window for column backups.
pub const BACKUP_RETENTION_DAYS: i64 = 90;

/// The kind of schema operation a migration record captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationKind {
    /// A column was added.
    AddColumn,
    /// A column was dropped.
    DropColumn,
    /// A column was renamed.
    RenameColumn,
    /// A column's type was changed.
    ModifyColumn,
}

impl MigrationKind {
    /// The persisted string form, e.g. `"ADD_COLUMN"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationKind::AddColumn => "ADD_COLUMN",
            MigrationKind::DropColumn => "DROP_COLUMN",
            MigrationKind::RenameColumn => "RENAME_COLUMN",
            MigrationKind::ModifyColumn => "MODIFY_COLUMN",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADD_COLUMN" => Some(MigrationKind::AddColumn),
            "DROP_COLUMN" => Some(MigrationKind::DropColumn),
            "RENAME_COLUMN" => Some(MigrationKind::RenameColumn),
            "MODIFY_COLUMN" => Some(MigrationKind::ModifyColumn),
            _ => None,
        }
    }
}

/// Why a column backup was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupKind {
    /// Automatic snapshot before a column drop.
    AutoDelete,
    /// Automatic snapshot before a type change.
    AutoModify,
    /// Operator-requested snapshot.
    Manual,
}

impl BackupKind {
    /// The persisted string form, e.g. `"AUTO_DELETE"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupKind::AutoDelete => "AUTO_DELETE",
            BackupKind::AutoModify => "AUTO_MODIFY",
            BackupKind::Manual => "MANUAL",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AUTO_DELETE" => Some(BackupKind::AutoDelete),
            "AUTO_MODIFY" => Some(BackupKind::AutoModify),
            "MANUAL" => Some(BackupKind::Manual),
            _ => None,
        }
    }
}

/// One `(row id, value)` pair of a column snapshot.
///
/// Values are captured as their text rendering (`column::text`), which round-trips
/// losslessly through a cast back to the column's physical type. `None` preserves SQL
/// `NULL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Primary key of the dynamic-table row.
    pub row_id: Uuid,
    /// Text rendering of the value, or `None` for `NULL`.
    pub value: Option<String>,
}

/// One entry of the append-only migration history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Identity of this record.
    pub id: Uuid,
    /// The form whose dynamic table was changed.
    pub form_id: Uuid,
    /// The field the change concerned, when applicable.
    pub field_id: Option<Uuid>,
    /// The operation kind.
    pub kind: MigrationKind,
    /// The dynamic table name at execution time.
    pub table_name: String,
    /// The column the operation targeted.
    pub column_name: String,
    /// Descriptor of the state before the change (type, name, ...).
    pub old_value: Option<Value>,
    /// Descriptor of the state after the change.
    pub new_value: Option<Value>,
    /// The SQL that was (or would have been) executed.
    pub forward_sql: String,
    /// SQL that reverses the change, when reversal is possible.
    pub rollback_sql: Option<String>,
    /// Whether the operation committed.
    pub success: bool,
    /// Diagnostic text for failed operations.
    pub error_message: Option<String>,
    /// Backup taken before a destructive change.
    pub backup_id: Option<Uuid>,
    /// Set when this record *is* a rollback of an earlier record.
    pub rollback_of: Option<Uuid>,
    /// Who requested the change.
    pub executed_by: Option<String>,
    /// When the record was appended.
    pub created_at: DateTime<Utc>,
}

/// An immutable snapshot of one column's data, retained for a bounded window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBackup {
    /// Identity of this backup.
    pub id: Uuid,
    /// The form whose column was snapshotted.
    pub form_id: Uuid,
    /// Dynamic table name at snapshot time.
    pub table_name: String,
    /// Column name at snapshot time.
    pub column_name: String,
    /// Why the snapshot was taken.
    pub kind: BackupKind,
    /// The ordered `(row id, value)` pairs.
    pub rows: Vec<SnapshotRow>,
    /// Number of rows captured.
    pub record_count: i64,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// When the snapshot stops being restorable.
    pub expires_at: DateTime<Utc>,
}

impl ColumnBackup {
    /// Whether the restore window has closed as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The default expiration for a snapshot taken at `created_at`.
    pub fn default_expiration(created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + Duration::days(BACKUP_RETENTION_DAYS)
    }
}
