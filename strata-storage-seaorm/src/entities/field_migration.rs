//! This module provides the SeaORM entity definition for the append-only migration
//! history.
//!
//! Rows in this table are never updated. A rollback inserts a *new* row whose
//! `rollback_of` references the reversed record.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One entry of the migration history.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "field_migrations")]
pub struct Model {
    /// Identity of the record.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// The form whose dynamic table was changed.
    pub form_id: Uuid,

    /// The field the change concerned, when applicable.
    pub field_id: Option<Uuid>,

    /// Operation kind: `ADD_COLUMN`, `DROP_COLUMN`, `RENAME_COLUMN`, `MODIFY_COLUMN`.
    pub kind: String,

    /// Dynamic table name at execution time.
    pub table_name: String,

    /// Column the operation targeted.
    pub column_name: String,

    /// Descriptor of the state before the change.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub old_value: Option<Json>,

    /// Descriptor of the state after the change.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub new_value: Option<Json>,

    /// The SQL that was (or would have been) executed.
    #[sea_orm(column_type = "Text")]
    pub forward_sql: String,

    /// SQL that reverses the change, when reversal is possible.
    #[sea_orm(column_type = "Text", nullable)]
    pub rollback_sql: Option<String>,

    /// Whether the operation committed.
    pub success: bool,

    /// Diagnostic text for failed operations.
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    /// Backup taken before a destructive change.
    pub backup_id: Option<Uuid>,

    /// Set when this record is itself a rollback of an earlier record.
    pub rollback_of: Option<Uuid>,

    /// Who requested the change.
    pub executed_by: Option<String>,

    /// When the record was appended.
    pub created_at: DateTimeUtc,
}

/// Defines relationships for the migration history entity.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Every history record belongs to a form.
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
