//! This module provides the SeaORM entity definition for column backups.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An immutable snapshot of one column's `(row id, value)` pairs.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "column_backups")]
pub struct Model {
    /// Identity of the backup.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// The form whose column was snapshotted.
    pub form_id: Uuid,

    /// Dynamic table name at snapshot time.
    pub table_name: String,

    /// Column name at snapshot time.
    pub column_name: String,

    /// Backup kind: `AUTO_DELETE`, `AUTO_MODIFY`, or `MANUAL`.
    pub kind: String,

    /// The ordered `(row id, value)` pairs as a JSONB array.
    #[sea_orm(column_type = "JsonBinary")]
    pub snapshot: Json,

    /// Number of rows captured.
    pub record_count: i64,

    /// When the snapshot was taken.
    pub created_at: DateTimeUtc,

    /// When the snapshot stops being restorable.
    pub expires_at: DateTimeUtc,
}

/// Defines relationships for the backup entity.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Every backup belongs to a form.
    #[sea_orm(
        belongs_to = "super::form::Entity",
        from = "Column::FormId",
        to = "super::form::Column::Id"
    )]
    Form,
}

impl Related<super::form::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Form.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
