//! The worker pool: claiming, executing, retrying, and crash recovery.
//!
//! Each worker loops: promote due delayed jobs, claim the next eligible job (oldest
//! waiting job whose form has no active job), execute it through the engine, and
//! record the outcome. Idle workers suspend on a notify with a short poll fallback,
//! keeping wake-up latency under a second.
//!
//! Liveness: a maintenance task reverts `active` jobs older than the visibility
//! timeout back to `waiting` (charging an attempt), so a crashed worker never
//! strands a job. The same sweep runs once at startup before workers accept claims.

use crate::backoff::{FailureAction, failure_action};
use crate::queue::MigrationQueue;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use strata_core::event::MigrationEvent;
use strata_core::job::MigrationJob;
use strata_engine::MigrationContext;
use strata_storage_seaorm::repo::JobRepository;
use tokio::task::JoinHandle;

impl MigrationQueue {
    /// Recovers stranded jobs, then spawns the worker pool and the maintenance
    /// task. Returns the task handles; aborting them stops the pool.
    pub async fn start_workers(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        if let Err(err) = self.recover_stranded().await {
            tracing::error!(error = %err, "startup visibility sweep failed");
        }

        let mut handles = Vec::with_capacity(self.settings.workers + 1);
        for worker_id in 0..self.settings.workers {
            let queue = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                queue.worker_loop(worker_id).await;
            }));
        }

        let queue = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            queue.maintenance_loop().await;
        }));

        tracing::info!(workers = self.settings.workers, "migration workers started");
        handles
    }

    async fn worker_loop(&self, worker_id: usize) {
        loop {
            match self.tick().await {
                // Did work: look for the next job immediately.
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    }
                }
                Err(err) => {
                    tracing::error!(worker_id, error = %err, "worker tick failed");
                    tokio::time::sleep(self.settings.poll_interval).await;
                }
            }
        }
    }

    /// One dispatch cycle. Returns whether a job was executed.
    async fn tick(&self) -> Result<bool, anyhow::Error> {
        let now = Utc::now();
        JobRepository::promote_due_delayed(&self.db, now).await?;

        let claimed = {
            let _guard = self.claim_lock.lock().await;
            JobRepository::claim_next(&self.db, now).await?
        };

        match claimed {
            Some(job) => {
                self.run_job(job).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn run_job(&self, job: MigrationJob) {
        self.events.emit(&MigrationEvent::MigrationStarted {
            form_id: job.form_id,
            job_id: job.id,
        });

        // A retried job may have committed on a previous attempt whose worker died
        // before acknowledging. If history already shows this op succeeding after
        // the job was enqueued, completing trivially is the idempotent outcome.
        if job.attempt > 1 {
            match self
                .engine
                .find_completed_since(&job.table_name, &job.op.op, job.created_at)
                .await
            {
                Ok(Some(record)) => {
                    tracing::info!(
                        job_id = %job.id,
                        migration_id = %record.id,
                        "previous attempt already committed; completing job"
                    );
                    self.finish_completed(&job, record.id).await;
                    return;
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(job_id = %job.id, error = %err, "reconcile probe failed");
                }
            }
        }

        let ctx = MigrationContext { form_id: job.form_id, actor: job.actor.clone() };
        match self.engine.apply(&ctx, &job.table_name, &job.op).await {
            Ok(record) => self.finish_completed(&job, record.id).await,
            Err(err) => {
                match failure_action(err.is_transient(), job.attempt, self.settings.max_attempts)
                {
                    FailureAction::Retry(delay) => {
                        let now = Utc::now();
                        let next_run =
                            now + ChronoDuration::from_std(delay).unwrap_or_default();
                        tracing::warn!(
                            job_id = %job.id,
                            attempt = job.attempt,
                            error = %err,
                            delay_secs = delay.as_secs(),
                            "transient failure; job delayed for retry"
                        );
                        if let Err(mark_err) = JobRepository::mark_delayed(
                            &self.db,
                            job.id,
                            &err.to_string(),
                            next_run,
                            now,
                        )
                        .await
                        {
                            tracing::error!(job_id = %job.id, error = %mark_err, "mark_delayed failed");
                        }
                    }
                    FailureAction::Fail => {
                        tracing::error!(
                            job_id = %job.id,
                            attempt = job.attempt,
                            error = %err,
                            "job failed terminally"
                        );
                        if let Err(mark_err) =
                            JobRepository::mark_failed(&self.db, job.id, &err.to_string(), Utc::now())
                                .await
                        {
                            tracing::error!(job_id = %job.id, error = %mark_err, "mark_failed failed");
                        }
                        self.events.emit(&MigrationEvent::MigrationFailed {
                            form_id: job.form_id,
                            job_id: job.id,
                            error: err.to_string(),
                        });
                        self.emit_depth(job.form_id).await;
                    }
                }
            }
        }
    }

    async fn finish_completed(&self, job: &MigrationJob, migration_id: uuid::Uuid) {
        if let Err(err) = JobRepository::mark_completed(&self.db, job.id, Utc::now()).await {
            tracing::error!(job_id = %job.id, error = %err, "mark_completed failed");
        }
        self.events.emit(&MigrationEvent::MigrationCompleted {
            form_id: job.form_id,
            job_id: job.id,
            migration_id,
        });
        self.emit_depth(job.form_id).await;
    }

    /// Recovers jobs stranded in `active` past the visibility timeout: jobs with
    /// attempts left go back to `waiting` (charged one attempt), jobs that have
    /// exhausted the retry budget are failed instead, keeping the attempt counter
    /// within the same ceiling `failure_action` enforces.
    pub async fn recover_stranded(&self) -> Result<u64, anyhow::Error> {
        let now = Utc::now();
        let cutoff = now
            - ChronoDuration::from_std(self.settings.visibility_timeout).unwrap_or_default();
        let (released, failed) = JobRepository::release_stale_active(
            &self.db,
            cutoff,
            now,
            self.settings.max_attempts,
        )
        .await?;
        if failed > 0 {
            tracing::error!(failed, "stranded active jobs had no attempts left; marked failed");
        }
        if released > 0 {
            tracing::warn!(released, "stranded active jobs reverted to waiting");
            self.notify.notify_one();
        }
        Ok(released)
    }

    async fn maintenance_loop(&self) {
        // Sweep at half the visibility timeout so a stranded job waits at most
        // 1.5x the timeout.
        let interval = self.settings.visibility_timeout / 2;
        loop {
            tokio::time::sleep(interval).await;
            if let Err(err) = self.recover_stranded().await {
                tracing::error!(error = %err, "visibility sweep failed");
            }
        }
    }
}
