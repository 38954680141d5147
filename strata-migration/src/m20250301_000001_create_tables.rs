use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. Create Forms Table
        manager
            .create_table(
                Table::create()
                    .table(Forms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Forms::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Forms::Title).string().not_null())
                    .col(ColumnDef::new(Forms::TableName).string().not_null().unique_key())
                    // Store the full schema as JSONB
                    .col(ColumnDef::new(Forms::Schema).json_binary().not_null())
                    .col(
                        ColumnDef::new(Forms::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Forms::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 2. Create Migration History Table (append-only)
        manager
            .create_table(
                Table::create()
                    .table(FieldMigrations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FieldMigrations::Id).uuid().not_null().primary_key())
                    // Foreign keys are loose so history survives form deletion,
                    // but we index them for speed.
                    .col(ColumnDef::new(FieldMigrations::FormId).uuid().not_null())
                    .col(ColumnDef::new(FieldMigrations::FieldId).uuid())
                    .col(ColumnDef::new(FieldMigrations::Kind).string().not_null())
                    .col(ColumnDef::new(FieldMigrations::TableName).string().not_null())
                    .col(ColumnDef::new(FieldMigrations::ColumnName).string().not_null())
                    .col(ColumnDef::new(FieldMigrations::OldValue).json_binary())
                    .col(ColumnDef::new(FieldMigrations::NewValue).json_binary())
                    .col(ColumnDef::new(FieldMigrations::ForwardSql).text().not_null())
                    .col(ColumnDef::new(FieldMigrations::RollbackSql).text())
                    .col(ColumnDef::new(FieldMigrations::Success).boolean().not_null())
                    .col(ColumnDef::new(FieldMigrations::ErrorMessage).text())
                    .col(ColumnDef::new(FieldMigrations::BackupId).uuid())
                    .col(ColumnDef::new(FieldMigrations::RollbackOf).uuid())
                    .col(ColumnDef::new(FieldMigrations::ExecutedBy).string())
                    .col(
                        ColumnDef::new(FieldMigrations::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 3. Create Column Backups Table
        manager
            .create_table(
                Table::create()
                    .table(ColumnBackups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ColumnBackups::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ColumnBackups::FormId).uuid().not_null())
                    .col(ColumnDef::new(ColumnBackups::TableName).string().not_null())
                    .col(ColumnDef::new(ColumnBackups::ColumnName).string().not_null())
                    .col(ColumnDef::new(ColumnBackups::Kind).string().not_null())
                    // The (row id, value) pairs
                    .col(ColumnDef::new(ColumnBackups::Snapshot).json_binary().not_null())
                    .col(ColumnDef::new(ColumnBackups::RecordCount).big_integer().not_null())
                    .col(
                        ColumnDef::new(ColumnBackups::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ColumnBackups::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 4. Create Migration Jobs Table (the durable queue)
        manager
            .create_table(
                Table::create()
                    .table(MigrationJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MigrationJobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(MigrationJobs::FormId).uuid().not_null())
                    .col(ColumnDef::new(MigrationJobs::TableName).string().not_null())
                    .col(ColumnDef::new(MigrationJobs::Op).json_binary().not_null())
                    .col(ColumnDef::new(MigrationJobs::Actor).string())
                    .col(ColumnDef::new(MigrationJobs::State).string().not_null())
                    .col(ColumnDef::new(MigrationJobs::Attempt).integer().not_null())
                    .col(ColumnDef::new(MigrationJobs::LastError).text())
                    .col(ColumnDef::new(MigrationJobs::NextRunAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(MigrationJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MigrationJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(ColumnDef::new(MigrationJobs::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(MigrationJobs::FinishedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // 5. Indexes
        manager
            .create_index(
                Index::create()
                    .name("idx_field_migrations_form_created")
                    .table(FieldMigrations::Table)
                    .col(FieldMigrations::FormId)
                    .col(FieldMigrations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_field_migrations_rollback_of")
                    .table(FieldMigrations::Table)
                    .col(FieldMigrations::RollbackOf)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_column_backups_form_id")
                    .table(ColumnBackups::Table)
                    .col(ColumnBackups::FormId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_column_backups_expires_at")
                    .table(ColumnBackups::Table)
                    .col(ColumnBackups::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        // The claim query filters on (state, form_id) and orders by enqueue time.
        manager
            .create_index(
                Index::create()
                    .name("idx_migration_jobs_state_created")
                    .table(MigrationJobs::Table)
                    .col(MigrationJobs::State)
                    .col(MigrationJobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_migration_jobs_form_state")
                    .table(MigrationJobs::Table)
                    .col(MigrationJobs::FormId)
                    .col(MigrationJobs::State)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MigrationJobs::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ColumnBackups::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(FieldMigrations::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Forms::Table).to_owned()).await
    }
}

/// Helper Enums to avoid using string literals for table/column names.
/// This ensures typos are caught at compile time.
#[derive(Iden)]
enum Forms {
    Table,
    Id,
    Title,
    TableName,
    Schema,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum FieldMigrations {
    Table,
    Id,
    FormId,
    FieldId,
    Kind,
    TableName,
    ColumnName,
    OldValue,
    NewValue,
    ForwardSql,
    RollbackSql,
    Success,
    ErrorMessage,
    BackupId,
    RollbackOf,
    ExecutedBy,
    CreatedAt,
}

#[derive(Iden)]
enum ColumnBackups {
    Table,
    Id,
    FormId,
    TableName,
    ColumnName,
    Kind,
    Snapshot,
    RecordCount,
    CreatedAt,
    ExpiresAt,
}

#[derive(Iden)]
enum MigrationJobs {
    Table,
    Id,
    FormId,
    TableName,
    Op,
    Actor,
    State,
    Attempt,
    LastError,
    NextRunAt,
    CreatedAt,
    UpdatedAt,
    StartedAt,
    FinishedAt,
}
