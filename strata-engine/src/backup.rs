//! The backup store: column snapshots taken before destructive changes, restorable
//! for a bounded window.

use crate::error::EngineError;
use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use strata_core::record::{BACKUP_RETENTION_DAYS, BackupKind, ColumnBackup};
use strata_storage_seaorm::repo::BackupRepository;
use strata_storage_seaorm::repo::backup::BackupFilter;
use strata_storage_seaorm::schema_driver::{self as driver, DriverError, RESTORE_BATCH_SIZE};
use uuid::Uuid;

/// Snapshots and restores single columns of dynamic tables.
pub struct BackupStore {
    db: DatabaseConnection,
    retention_days: i64,
}

impl BackupStore {
    /// Creates a backup store with the default 90-day retention window.
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, retention_days: BACKUP_RETENTION_DAYS }
    }

    /// Overrides the retention window. Used by deployments with different
    /// compliance requirements.
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    /// Snapshots every `(row id, value)` pair of a column.
    ///
    /// The read is a single statement, so the snapshot is never torn per-row even
    /// while application writes continue. The backup commits before the caller's DDL
    /// transaction begins; if the DDL later fails, the backup remains as a harmless
    /// orphan under normal retention.
    ///
    /// # Errors
    /// `ColumnMissing` (via the driver) when the column does not exist.
    pub async fn snapshot(
        &self,
        form_id: Uuid,
        table: &str,
        column: &str,
        kind: BackupKind,
    ) -> Result<ColumnBackup, EngineError> {
        if !driver::column_exists(&self.db, table, column).await? {
            return Err(DriverError::ColumnMissing {
                table: table.to_string(),
                column: column.to_string(),
            }
            .into());
        }

        let rows = driver::read_column(&self.db, table, column).await?;
        let now = Utc::now();
        let backup = ColumnBackup {
            id: Uuid::new_v4(),
            form_id,
            table_name: table.to_string(),
            column_name: column.to_string(),
            kind,
            record_count: rows.len() as i64,
            rows,
            created_at: now,
            expires_at: now + Duration::days(self.retention_days),
        };
        BackupRepository::insert(&self.db, &backup).await?;

        tracing::info!(
            %form_id,
            table,
            column,
            kind = kind.as_str(),
            rows = backup.record_count,
            backup_id = %backup.id,
            "column snapshot taken"
        );
        Ok(backup)
    }

    /// Writes a backup's snapshot back into its column, in batches of 100 rows,
    /// skipping rows whose primary key no longer exists.
    ///
    /// # Returns
    /// The number of rows actually restored.
    ///
    /// # Errors
    /// * [`EngineError::BackupNotFound`] when no such backup exists.
    /// * [`EngineError::BackupExpired`] when the restore window has closed.
    /// * `ColumnMissing` (via the driver) when the target column has been dropped
    ///   since the snapshot.
    pub async fn restore(&self, backup_id: Uuid) -> Result<u64, EngineError> {
        let backup = BackupRepository::find_by_id(&self.db, backup_id)
            .await?
            .ok_or(EngineError::BackupNotFound(backup_id))?;

        if backup.is_expired(Utc::now()) {
            return Err(EngineError::BackupExpired(backup_id));
        }

        // The column must still exist, with whatever physical type it has *now*;
        // snapshot text casts back into it.
        let ty = driver::fetch_column_type(&self.db, &backup.table_name, &backup.column_name)
            .await?
            .ok_or_else(|| {
                EngineError::Driver(DriverError::ColumnMissing {
                    table: backup.table_name.clone(),
                    column: backup.column_name.clone(),
                })
            })?;

        let mut restored = 0u64;
        for chunk in backup.rows.chunks(RESTORE_BATCH_SIZE) {
            let txn = self.db.begin().await?;
            restored += driver::write_column_batch(
                &txn,
                &backup.table_name,
                &backup.column_name,
                &ty,
                chunk,
            )
            .await?;
            txn.commit().await?;
        }

        tracing::info!(
            backup_id = %backup.id,
            table = %backup.table_name,
            column = %backup.column_name,
            restored,
            "backup restored"
        );
        Ok(restored)
    }

    /// Lists a form's backups, newest first.
    pub async fn list(
        &self,
        form_id: Uuid,
        filter: BackupFilter,
    ) -> Result<Vec<ColumnBackup>, EngineError> {
        Ok(BackupRepository::list_for_form(&self.db, form_id, filter, Utc::now()).await?)
    }

    /// Deletes every backup whose restore window has closed. Returns the number
    /// removed. Run periodically by the retention sweeper.
    pub async fn sweep_expired(&self) -> Result<u64, EngineError> {
        let removed = BackupRepository::delete_expired(&self.db, Utc::now()).await?;
        if removed > 0 {
            tracing::info!(removed, "expired backups swept");
        }
        Ok(removed)
    }
}
