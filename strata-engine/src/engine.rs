//! The migration engine: validates and applies single column migrations, appending
//! the history record inside the same transaction as the DDL.

use crate::backup::BackupStore;
use crate::error::EngineError;
use crate::preview::MigrationPreview;
use crate::rollback;
use crate::sql;
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use strata_core::convert::{self, ConversionCheck, ConversionRule};
use strata_core::field::FieldDescriptor;
use strata_core::physical::PhysicalType;
use strata_core::plan::{MigrationOp, QueuedOp};
use strata_core::record::{BackupKind, MigrationRecord};
use strata_storage_seaorm::repo::MigrationRepository;
use strata_storage_seaorm::schema_driver as driver;
use uuid::Uuid;

/// Audit metadata accompanying every engine call.
#[derive(Debug, Clone)]
pub struct MigrationContext {
    /// The form whose dynamic table is being changed.
    pub form_id: Uuid,
    /// Who requested the change.
    pub actor: Option<String>,
}

/// Applies, previews, and plans the reversal of single migration operations.
///
/// One engine instance is shared by all queue workers; it holds no per-migration
/// state. Per-form serialization is the queue's job, not the engine's.
pub struct MigrationEngine {
    db: DatabaseConnection,
    backups: BackupStore,
}

impl MigrationEngine {
    /// Creates an engine (and its backup store) on the given connection pool.
    pub fn new(db: DatabaseConnection) -> Self {
        let backups = BackupStore::new(db.clone());
        Self { db, backups }
    }

    /// Overrides the backup retention window.
    pub fn with_backup_retention_days(mut self, days: i64) -> Self {
        self.backups = BackupStore::new(self.db.clone()).with_retention_days(days);
        self
    }

    /// The backup store, for restore and listing operations.
    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Applies one queued operation.
    ///
    /// Order of work:
    /// 1. Type-change validation (classification plus value scan) in short read-only
    ///    statements. A rejected conversion writes a failed history record and never
    ///    issues DDL.
    /// 2. Backup for destructive ops, committed before the DDL transaction opens.
    /// 3. One transaction wrapping the DDL and the history append.
    /// 4. On failure, the DDL transaction rolls back and the failure is recorded in
    ///    a separate short transaction.
    pub async fn apply(
        &self,
        ctx: &MigrationContext,
        table: &str,
        queued: &QueuedOp,
    ) -> Result<MigrationRecord, EngineError> {
        let op = &queued.op;
        let mut record = build_record(ctx, table, queued, None);

        if let MigrationOp::ModifyColumn { column, from, to, .. } = op {
            let from_ty = PhysicalType::for_field_type(*from);
            let to_ty = PhysicalType::for_field_type(*to);
            match convert::classify(&from_ty, &to_ty) {
                ConversionRule::Rejected(reason) => {
                    let err = EngineError::TypeConversionFailed {
                        column: column.clone(),
                        reason: reason.to_string(),
                    };
                    self.record_failure(record, &err).await;
                    return Err(err);
                }
                ConversionRule::Allowed(ConversionCheck::NoOp) => {
                    // Identical physical types: success without touching the table.
                    MigrationRepository::insert(&self.db, &record).await?;
                    return Ok(record);
                }
                ConversionRule::Allowed(check) => {
                    // The value scan runs before the DDL transaction so the table
                    // only carries a statement-level lock while we read.
                    if let Some(violation) =
                        driver::scan_for_check(&self.db, table, column, &check).await?
                    {
                        let reason = match &violation.sample {
                            Some(sample) => format!(
                                "{} value(s) cannot be converted to {} (e.g. \"{}\")",
                                violation.count,
                                to_ty.ddl(),
                                sample
                            ),
                            None => format!(
                                "{} value(s) cannot be converted to {}",
                                violation.count,
                                to_ty.ddl()
                            ),
                        };
                        let err = EngineError::TypeConversionFailed {
                            column: column.clone(),
                            reason,
                        };
                        self.record_failure(record, &err).await;
                        return Err(err);
                    }
                }
            }
        }

        if op.requires_backup() {
            let kind = match op {
                MigrationOp::DropColumn { .. } => BackupKind::AutoDelete,
                _ => BackupKind::AutoModify,
            };
            let backup = self.backups.snapshot(ctx.form_id, table, op.column(), kind).await?;
            record.backup_id = Some(backup.id);
        }

        let txn = self.db.begin().await?;
        let outcome = match self.execute(&txn, table, op).await {
            Ok(()) => MigrationRepository::insert(&txn, &record).await.map_err(EngineError::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                txn.commit().await?;
                tracing::info!(
                    form_id = %ctx.form_id,
                    migration_id = %record.id,
                    kind = record.kind.as_str(),
                    table,
                    column = %record.column_name,
                    "migration applied"
                );
                Ok(record)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!(error = %rollback_err, "transaction rollback failed");
                }
                self.record_failure(record, &err).await;
                Err(err)
            }
        }
    }

    /// Computes what an operation would do, without mutating any state. All reads.
    pub async fn preview(
        &self,
        table: &str,
        op: &MigrationOp,
    ) -> Result<MigrationPreview, EngineError> {
        let mut warnings = Vec::new();
        let mut valid = true;
        let mut requires_backup = op.requires_backup();
        let estimated_rows = driver::count_rows(&self.db, table).await?;

        match op {
            MigrationOp::AddColumn { column, .. } => {
                if driver::column_exists(&self.db, table, column).await? {
                    warnings.push(format!("column \"{column}\" already exists"));
                    valid = false;
                }
            }
            MigrationOp::DropColumn { column, backup, .. } => {
                if !driver::column_exists(&self.db, table, column).await? {
                    warnings.push(format!("column \"{column}\" does not exist"));
                    valid = false;
                } else {
                    warnings.push(format!(
                        "dropping \"{column}\" deletes its data in {estimated_rows} row(s)"
                    ));
                    if *backup {
                        warnings.push(
                            "a backup will be taken first and kept for 90 days".to_string(),
                        );
                    }
                }
            }
            MigrationOp::RenameColumn { from, to, .. } => {
                if !driver::column_exists(&self.db, table, from).await? {
                    warnings.push(format!("column \"{from}\" does not exist"));
                    valid = false;
                }
                if driver::column_exists(&self.db, table, to).await? {
                    warnings.push(format!("column \"{to}\" already exists"));
                    valid = false;
                }
            }
            MigrationOp::ModifyColumn { column, from, to, .. } => {
                if !driver::column_exists(&self.db, table, column).await? {
                    warnings.push(format!("column \"{column}\" does not exist"));
                    valid = false;
                } else {
                    let from_ty = PhysicalType::for_field_type(*from);
                    let to_ty = PhysicalType::for_field_type(*to);
                    match convert::classify(&from_ty, &to_ty) {
                        ConversionRule::Rejected(reason) => {
                            warnings.push(reason.to_string());
                            valid = false;
                        }
                        ConversionRule::Allowed(ConversionCheck::NoOp) => {
                            // Apply records this without touching the table, so no
                            // backup is taken either.
                            requires_backup = false;
                            warnings.push("column type is unchanged; nothing to do".to_string());
                        }
                        ConversionRule::Allowed(ConversionCheck::Safe) => {
                            warnings.push(format!(
                                "values will be cast from {} to {}",
                                from_ty.ddl(),
                                to_ty.ddl()
                            ));
                        }
                        ConversionRule::Allowed(check) => {
                            warnings.push(format!(
                                "values will be cast from {} to {}; existing data will be scanned",
                                from_ty.ddl(),
                                to_ty.ddl()
                            ));
                            if let Some(violation) =
                                driver::scan_for_check(&self.db, table, column, &check).await?
                            {
                                let sample = violation
                                    .sample
                                    .map(|s| format!(" (e.g. \"{s}\")"))
                                    .unwrap_or_default();
                                warnings.push(format!(
                                    "{} value(s) would not survive the conversion{sample}",
                                    violation.count
                                ));
                                valid = false;
                            }
                        }
                    }
                }
            }
        }

        Ok(MigrationPreview {
            kind: op.kind(),
            column: op.column().to_string(),
            forward_sql: sql::forward_sql(table, op),
            rollback_sql: sql::rollback_sql(table, op),
            valid,
            requires_backup,
            estimated_rows,
            warnings,
        })
    }

    /// Validates a rollback request and produces the queued operation that reverses
    /// the recorded migration.
    pub async fn prepare_rollback(
        &self,
        migration_id: Uuid,
        current_fields: &[FieldDescriptor],
    ) -> Result<QueuedOp, EngineError> {
        let record = MigrationRepository::find_by_id(&self.db, migration_id)
            .await?
            .ok_or(EngineError::MigrationNotFound(migration_id))?;
        let existing = MigrationRepository::find_rollback_of(&self.db, migration_id).await?;

        rollback::plan_rollback(&record, existing.as_ref(), current_fields)
    }

    /// Looks for a successful history record matching the op signature, appended
    /// after `since`. Workers use this to reconcile retried jobs whose previous
    /// attempt committed but never acknowledged.
    pub async fn find_completed_since(
        &self,
        table: &str,
        op: &MigrationOp,
        since: chrono::DateTime<Utc>,
    ) -> Result<Option<MigrationRecord>, EngineError> {
        Ok(MigrationRepository::find_success_since(
            &self.db,
            table,
            op.column(),
            op.kind(),
            since,
        )
        .await?)
    }

    async fn execute<C: ConnectionTrait>(
        &self,
        conn: &C,
        table: &str,
        op: &MigrationOp,
    ) -> Result<(), EngineError> {
        match op {
            MigrationOp::AddColumn { column, field_type, .. } => {
                driver::add_column(conn, table, column, &PhysicalType::for_field_type(*field_type))
                    .await?
            }
            MigrationOp::DropColumn { column, .. } => {
                driver::drop_column(conn, table, column).await?
            }
            MigrationOp::RenameColumn { from, to, .. } => {
                driver::rename_column(conn, table, from, to).await?
            }
            MigrationOp::ModifyColumn { column, to, .. } => {
                driver::alter_column_type(conn, table, column, &PhysicalType::for_field_type(*to))
                    .await?
            }
        }
        Ok(())
    }

    /// Records a failed attempt in its own short transaction; the DDL transaction
    /// has already rolled back by the time this runs.
    async fn record_failure(&self, mut record: MigrationRecord, err: &EngineError) {
        record.success = false;
        record.error_message = Some(err.to_string());
        if let Err(insert_err) = MigrationRepository::insert(&self.db, &record).await {
            tracing::error!(
                error = %insert_err,
                migration_id = %record.id,
                "could not record migration failure"
            );
        }
    }
}

fn build_record(
    ctx: &MigrationContext,
    table: &str,
    queued: &QueuedOp,
    backup_id: Option<Uuid>,
) -> MigrationRecord {
    let op = &queued.op;
    let (old_value, new_value) = sql::column_states(op);
    MigrationRecord {
        id: Uuid::new_v4(),
        form_id: ctx.form_id,
        field_id: Some(op.field_id()),
        kind: op.kind(),
        table_name: table.to_string(),
        column_name: op.column().to_string(),
        old_value: old_value.and_then(|s| serde_json::to_value(s).ok()),
        new_value: new_value.and_then(|s| serde_json::to_value(s).ok()),
        forward_sql: sql::forward_sql(table, op),
        rollback_sql: sql::rollback_sql(table, op),
        success: true,
        error_message: None,
        backup_id,
        rollback_of: queued.rollback_of,
        executed_by: ctx.actor.clone(),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::field::FieldType;

    #[test]
    fn test_build_record_links_rollback_and_audit_fields() {
        let ctx = MigrationContext {
            form_id: Uuid::new_v4(),
            actor: Some("admin@example.com".into()),
        };
        let original = Uuid::new_v4();
        let queued = QueuedOp {
            op: MigrationOp::DropColumn {
                field_id: Uuid::new_v4(),
                column: "b_0a1b2c3d".into(),
                field_type: FieldType::Number,
                backup: true,
            },
            rollback_of: Some(original),
        };

        let record = build_record(&ctx, "t_12345678", &queued, None);
        assert_eq!(record.form_id, ctx.form_id);
        assert_eq!(record.rollback_of, Some(original));
        assert_eq!(record.executed_by.as_deref(), Some("admin@example.com"));
        assert!(record.success);
        assert_eq!(record.kind.as_str(), "DROP_COLUMN");
        // The forward SQL of a rollback equals the original's rollback SQL shape.
        assert_eq!(record.forward_sql, "ALTER TABLE \"t_12345678\" DROP COLUMN \"b_0a1b2c3d\"");
        assert!(record.old_value.is_some());
        assert!(record.new_value.is_none());
    }
}
