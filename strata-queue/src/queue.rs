//! The migration queue: admission, cancellation, status, and metrics.

use crate::backoff::MAX_ATTEMPTS;
use crate::error::QueueError;
use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use strata_core::event::{EventSink, MigrationEvent};
use strata_core::job::{JobState, MigrationJob, QueueCounts};
use strata_core::plan::QueuedOp;
use strata_engine::MigrationEngine;
use strata_storage_seaorm::repo::JobRepository;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

/// Rolling window used by [`MigrationQueue::status`].
const STATUS_WINDOW_HOURS: i64 = 24;

/// Tuning knobs for the queue and its workers.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Number of worker tasks to spawn.
    pub workers: usize,
    /// Idle poll interval; also the upper bound on wake-up latency.
    pub poll_interval: Duration,
    /// How long a claimed job may stay `active` before it is presumed stranded by a
    /// crashed worker and reverted to `waiting`.
    pub visibility_timeout: Duration,
    /// Hard ceiling on execution attempts per job.
    pub max_attempts: i32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval: Duration::from_millis(500),
            visibility_timeout: Duration::from_secs(300),
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

/// Serializes migrations per form while independent forms migrate in parallel.
///
/// Durability: jobs and claims live in the `migration_jobs` table; the in-process
/// parts (claim lock, wake-up notify) only optimize dispatch and rebuild themselves
/// from the table on startup.
pub struct MigrationQueue {
    pub(crate) db: DatabaseConnection,
    pub(crate) engine: Arc<MigrationEngine>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) settings: QueueSettings,
    /// Serializes claim statements so two workers never race the same form between
    /// the eligibility check and the claim commit.
    pub(crate) claim_lock: Mutex<()>,
    /// Wakes an idle worker when a job is admitted.
    pub(crate) notify: Notify,
}

impl MigrationQueue {
    /// Creates a queue over the given pool, engine, and event sink.
    pub fn new(
        db: DatabaseConnection,
        engine: Arc<MigrationEngine>,
        events: Arc<dyn EventSink>,
        settings: QueueSettings,
    ) -> Self {
        Self { db, engine, events, settings, claim_lock: Mutex::new(()), notify: Notify::new() }
    }

    /// Admits one operation for a form. Returns the job identity immediately; the
    /// op executes when the form's earlier jobs have drained.
    pub async fn enqueue(
        &self,
        form_id: Uuid,
        table_name: &str,
        op: QueuedOp,
        actor: Option<String>,
    ) -> Result<Uuid, QueueError> {
        let now = Utc::now();
        let job = MigrationJob {
            id: Uuid::new_v4(),
            form_id,
            table_name: table_name.to_string(),
            op,
            actor,
            attempt: 1,
            state: JobState::Waiting,
            last_error: None,
            next_run_at: None,
            created_at: now,
            started_at: None,
            finished_at: None,
        };
        JobRepository::insert(&self.db, &job).await?;

        self.events.emit(&MigrationEvent::MigrationEnqueued { form_id, job_id: job.id });
        self.emit_depth(form_id).await;
        self.notify.notify_one();

        tracing::debug!(%form_id, job_id = %job.id, "job enqueued");
        Ok(job.id)
    }

    /// Cancels a job that is still waiting. Active jobs cannot be cancelled: their
    /// DDL is potentially in flight and must run to completion or failure.
    pub async fn cancel(&self, job_id: Uuid) -> Result<(), QueueError> {
        if JobRepository::cancel_waiting(&self.db, job_id, Utc::now()).await? {
            let job = JobRepository::find_by_id(&self.db, job_id).await?;
            if let Some(job) = job {
                self.emit_depth(job.form_id).await;
            }
            return Ok(());
        }

        match JobRepository::find_by_id(&self.db, job_id).await? {
            None => Err(QueueError::JobNotFound(job_id)),
            Some(job) => Err(QueueError::NotCancellable { id: job_id, state: job.state }),
        }
    }

    /// State counts over a rolling 24-hour window (live states always count).
    pub async fn status(&self) -> Result<QueueCounts, QueueError> {
        let since = Utc::now() - ChronoDuration::hours(STATUS_WINDOW_HOURS);
        Ok(JobRepository::counts_since(&self.db, since).await?)
    }

    /// A form's recent jobs with state, timestamps, and error text, newest first.
    pub async fn metrics(&self, form_id: Uuid) -> Result<Vec<MigrationJob>, QueueError> {
        Ok(JobRepository::recent_for_form(&self.db, form_id, 50).await?)
    }

    /// Retrieves one job by identity.
    pub async fn job(&self, job_id: Uuid) -> Result<MigrationJob, QueueError> {
        JobRepository::find_by_id(&self.db, job_id)
            .await?
            .ok_or(QueueError::JobNotFound(job_id))
    }

    pub(crate) async fn emit_depth(&self, form_id: Uuid) {
        match JobRepository::waiting_depth(&self.db, form_id).await {
            Ok(waiting) => {
                self.events.emit(&MigrationEvent::QueueDepthChanged { form_id, waiting });
            }
            Err(err) => tracing::debug!(%form_id, error = %err, "queue depth probe failed"),
        }
    }
}
