//! The migration service: the system's public operations behind one role gate.

use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strata_core::auth::{self, Operation, Role};
use strata_core::field::{FieldDescriptor, FieldSpec};
use strata_core::form::FormSchema;
use strata_core::job::{MigrationJob, QueueCounts};
use strata_core::plan::{QueuedOp, detect_changes};
use strata_core::record::{BackupKind, ColumnBackup, MigrationRecord};
use strata_engine::{MigrationEngine, MigrationPreview};
use strata_queue::MigrationQueue;
use strata_storage_seaorm::repo::backup::BackupFilter;
use strata_storage_seaorm::repo::{FormRepository, MigrationRepository};
use uuid::Uuid;
use validator::Validate;

/// The authenticated caller, as attached by the upstream auth layer.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    /// Parsed role; `None` for roles without migration privileges.
    pub role: Option<Role>,
    /// Actor identifier recorded in the audit trail.
    pub actor: Option<String>,
}

impl Caller {
    /// Builds a caller from wire values. Unknown role strings parse to `None` and
    /// are denied everything.
    pub fn new(role: Option<&str>, actor: Option<String>) -> Self {
        Self { role: role.and_then(Role::parse), actor }
    }
}

/// A backup listing entry: everything but the snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSummary {
    /// Identity of the backup.
    pub id: Uuid,
    /// Dynamic table name at snapshot time.
    pub table_name: String,
    /// Column name at snapshot time.
    pub column_name: String,
    /// Why the snapshot was taken.
    pub kind: BackupKind,
    /// Number of rows captured.
    pub record_count: i64,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// When the snapshot stops being restorable.
    pub expires_at: DateTime<Utc>,
    /// Whether the restore window has already closed.
    pub expired: bool,
}

impl BackupSummary {
    fn from_backup(backup: &ColumnBackup, now: DateTime<Utc>) -> Self {
        BackupSummary {
            id: backup.id,
            table_name: backup.table_name.clone(),
            column_name: backup.column_name.clone(),
            kind: backup.kind,
            record_count: backup.record_count,
            created_at: backup.created_at,
            expires_at: backup.expires_at,
            expired: backup.is_expired(now),
        }
    }
}

/// Outcome of a backup restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOutcome {
    /// Rows actually written back (rows whose primary key vanished are skipped).
    pub restored_row_count: u64,
}

/// Service wiring the form store, engine, and queue behind the role gate.
pub struct MigrationService {
    db: DatabaseConnection,
    engine: Arc<MigrationEngine>,
    queue: Arc<MigrationQueue>,
}

impl MigrationService {
    /// Creates a new `MigrationService` instance.
    pub fn new(
        db: DatabaseConnection,
        engine: Arc<MigrationEngine>,
        queue: Arc<MigrationQueue>,
    ) -> Self {
        Self { db, engine, queue }
    }

    /// Computes the migration plan a proposed field list would produce, with the
    /// SQL, warnings, and validity of every operation. Mutates nothing.
    pub async fn preview(
        &self,
        caller: &Caller,
        form_id: Uuid,
        proposed: Vec<FieldSpec>,
    ) -> Result<Vec<MigrationPreview>, ServiceError> {
        self.authorize(caller, Operation::Preview)?;
        let form = self.load_form(form_id).await?;
        let proposed = resolve_fields(&form, proposed)?;

        let plan = detect_changes(&form.fields, &proposed);
        let mut previews = Vec::with_capacity(plan.len());
        for op in &plan {
            previews.push(self.engine.preview(&form.table_name, op).await?);
        }
        Ok(previews)
    }

    /// Saves the proposed field list and enqueues one job per detected operation.
    /// Returns the job identities in plan order.
    pub async fn apply(
        &self,
        caller: &Caller,
        form_id: Uuid,
        proposed: Vec<FieldSpec>,
    ) -> Result<Vec<Uuid>, ServiceError> {
        self.authorize(caller, Operation::Apply)?;
        let form = self.load_form(form_id).await?;
        let proposed = resolve_fields(&form, proposed)?;

        let plan = detect_changes(&form.fields, &proposed);

        // Persist the new field list first so later rollback guards (and concurrent
        // previews) see the saved schema the jobs are converging the table toward.
        let updated = FormSchema {
            id: form.id,
            title: form.title.clone(),
            table_name: form.table_name.clone(),
            fields: proposed,
        };
        FormRepository::save(&self.db, &updated).await?;

        let mut job_ids = Vec::with_capacity(plan.len());
        for op in plan {
            let job_id = self
                .queue
                .enqueue(form_id, &form.table_name, QueuedOp::forward(op), caller.actor.clone())
                .await?;
            job_ids.push(job_id);
        }
        Ok(job_ids)
    }

    /// Reads a form's migration history, newest first.
    pub async fn history(
        &self,
        caller: &Caller,
        form_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<MigrationRecord>, ServiceError> {
        self.authorize(caller, Operation::History)?;
        self.load_form(form_id).await?;
        Ok(MigrationRepository::list_for_form(&self.db, form_id, limit, offset).await?)
    }

    /// Enqueues the reversal of a recorded migration. Returns the new job identity.
    pub async fn rollback(&self, caller: &Caller, migration_id: Uuid) -> Result<Uuid, ServiceError> {
        self.authorize(caller, Operation::Rollback)?;

        let record = MigrationRepository::find_by_id(&self.db, migration_id)
            .await?
            .ok_or(strata_engine::EngineError::MigrationNotFound(migration_id))?;
        let form = self.load_form(record.form_id).await?;

        let queued = self.engine.prepare_rollback(migration_id, &form.fields).await?;
        let job_id = self
            .queue
            .enqueue(record.form_id, &record.table_name, queued, caller.actor.clone())
            .await?;
        Ok(job_id)
    }

    /// Lists a form's backups, optionally filtered by expiration.
    pub async fn list_backups(
        &self,
        caller: &Caller,
        form_id: Uuid,
        filter: BackupFilter,
    ) -> Result<Vec<BackupSummary>, ServiceError> {
        self.authorize(caller, Operation::ListBackups)?;
        self.load_form(form_id).await?;

        let now = Utc::now();
        let backups = self.engine.backups().list(form_id, filter).await?;
        Ok(backups.iter().map(|b| BackupSummary::from_backup(b, now)).collect())
    }

    /// Takes an operator-requested snapshot of one column. Backup management is a
    /// `super_admin` concern, so this shares the restore privilege.
    pub async fn create_backup(
        &self,
        caller: &Caller,
        form_id: Uuid,
        column: &str,
    ) -> Result<BackupSummary, ServiceError> {
        self.authorize(caller, Operation::RestoreBackup)?;
        let form = self.load_form(form_id).await?;

        let backup = self
            .engine
            .backups()
            .snapshot(form_id, &form.table_name, column, BackupKind::Manual)
            .await?;
        Ok(BackupSummary::from_backup(&backup, Utc::now()))
    }

    /// Writes a backup's snapshot back into its column.
    pub async fn restore_backup(
        &self,
        caller: &Caller,
        backup_id: Uuid,
    ) -> Result<RestoreOutcome, ServiceError> {
        self.authorize(caller, Operation::RestoreBackup)?;
        let restored_row_count = self.engine.backups().restore(backup_id).await?;
        Ok(RestoreOutcome { restored_row_count })
    }

    /// Queue state counts over the rolling 24-hour window.
    pub async fn queue_status(&self, caller: &Caller) -> Result<QueueCounts, ServiceError> {
        self.authorize(caller, Operation::QueueStatus)?;
        Ok(self.queue.status().await?)
    }

    /// A form's recent jobs, for the queue inspector.
    pub async fn queue_metrics(
        &self,
        caller: &Caller,
        form_id: Uuid,
    ) -> Result<Vec<MigrationJob>, ServiceError> {
        self.authorize(caller, Operation::QueueStatus)?;
        self.load_form(form_id).await?;
        Ok(self.queue.metrics(form_id).await?)
    }

    /// Cancels a waiting job.
    pub async fn cancel_job(&self, caller: &Caller, job_id: Uuid) -> Result<(), ServiceError> {
        self.authorize(caller, Operation::Apply)?;
        Ok(self.queue.cancel(job_id).await?)
    }

    fn authorize(&self, caller: &Caller, operation: Operation) -> Result<Role, ServiceError> {
        match caller.role {
            Some(role) if auth::is_allowed(role, operation) => Ok(role),
            _ => Err(ServiceError::Unauthorized { operation }),
        }
    }

    async fn load_form(&self, form_id: Uuid) -> Result<FormSchema, ServiceError> {
        FormRepository::find_by_id(&self.db, form_id)
            .await?
            .ok_or(ServiceError::FormNotFound(form_id))
    }
}

/// Converts wire field specs into validated descriptors, checking the result as a
/// complete schema (duplicate identities, title lengths).
fn resolve_fields(
    form: &FormSchema,
    specs: Vec<FieldSpec>,
) -> Result<Vec<FieldDescriptor>, ServiceError> {
    let fields = specs
        .into_iter()
        .map(FieldSpec::into_descriptor)
        .collect::<Result<Vec<_>, _>>()?;

    let candidate = FormSchema {
        id: form.id,
        title: form.title.clone(),
        table_name: form.table_name.clone(),
        fields,
    };
    candidate.validate()?;
    Ok(candidate.fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::field::FieldType;

    #[test]
    fn test_caller_parses_known_roles_only() {
        assert_eq!(Caller::new(Some("super_admin"), None).role, Some(Role::SuperAdmin));
        assert_eq!(Caller::new(Some("moderator"), None).role, Some(Role::Moderator));
        assert_eq!(Caller::new(Some("user"), None).role, None);
        assert_eq!(Caller::new(None, None).role, None);
    }

    #[test]
    fn test_resolve_fields_rejects_null_titles() {
        let form = FormSchema::new("F", vec![]).unwrap();
        let specs = vec![FieldSpec {
            field_id: None,
            title: None,
            field_type: FieldType::ShortAnswer,
            required: false,
            options: None,
        }];
        assert!(matches!(resolve_fields(&form, specs), Err(ServiceError::Ident(_))));
    }

    #[test]
    fn test_resolve_fields_rejects_duplicate_identities() {
        let form = FormSchema::new("F", vec![]).unwrap();
        let id = Uuid::new_v4();
        let spec = FieldSpec {
            field_id: Some(id),
            title: Some("A".into()),
            field_type: FieldType::ShortAnswer,
            required: false,
            options: None,
        };
        let specs = vec![spec.clone(), spec];
        assert!(matches!(
            resolve_fields(&form, specs),
            Err(ServiceError::SchemaValidationErrors(_))
        ));
    }

    #[test]
    fn test_backup_summary_drops_payload_and_flags_expiry() {
        let now = Utc::now();
        let backup = ColumnBackup {
            id: Uuid::new_v4(),
            form_id: Uuid::new_v4(),
            table_name: "t".into(),
            column_name: "c".into(),
            kind: BackupKind::Manual,
            rows: vec![],
            record_count: 0,
            created_at: now - chrono::Duration::days(91),
            expires_at: now - chrono::Duration::days(1),
        };
        let summary = BackupSummary::from_backup(&backup, now);
        assert!(summary.expired);
        assert_eq!(summary.kind, BackupKind::Manual);
    }
}
