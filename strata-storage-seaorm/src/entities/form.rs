//! This module provides the SeaORM entity definition for form schemas.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Represents a form schema stored in the database.
///
/// The full `FormSchema` is stored as a JSON document; the title and dynamic table
/// name are duplicated into SQL columns for fast lookups.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forms")]
pub struct Model {
    /// Stable identity of the form.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display title, duplicated from the schema for searching.
    pub title: String,

    /// Name of the form's dynamic table. Exactly one dynamic table exists per form.
    #[sea_orm(unique)]
    pub table_name: String,

    /// The complete `FormSchema` serialized as a JSONB document.
    #[sea_orm(column_type = "JsonBinary")]
    pub schema: Json,

    /// When the form was created.
    pub created_at: DateTimeUtc,
    /// When the form was last updated.
    pub updated_at: DateTimeUtc,
}

/// Defines relationships for the form entity.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A form accumulates migration history records.
    #[sea_orm(has_many = "super::field_migration::Entity")]
    FieldMigration,
    /// A form accumulates column backups.
    #[sea_orm(has_many = "super::column_backup::Entity")]
    ColumnBackup,
    /// A form accumulates queue jobs.
    #[sea_orm(has_many = "super::migration_job::Entity")]
    MigrationJob,
}

impl Related<super::field_migration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FieldMigration.def()
    }
}

impl Related<super::column_backup::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ColumnBackup.def()
    }
}

impl Related<super::migration_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MigrationJob.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
