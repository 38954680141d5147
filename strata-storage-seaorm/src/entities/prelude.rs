//! Re-exports of all SeaORM entities for convenient access.

pub use super::column_backup::Entity as ColumnBackup;
pub use super::field_migration::Entity as FieldMigration;
pub use super::form::Entity as Form;
pub use super::migration_job::Entity as MigrationJob;
