//! Repository implementation for queue jobs.
//!
//! State transitions are expressed as conditional single-statement updates so that a
//! crash between any two calls leaves the job in a recoverable state. The claim query
//! skips forms that already have an active job, which is what serializes migrations
//! per form; callers additionally serialize claim calls in-process (see
//! `strata-queue`) so two workers never race the same form.

use crate::entities::migration_job;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, Statement,
};
use strata_core::job::{JobState, MigrationJob, QueueCounts};
use strata_core::plan::QueuedOp;
use uuid::Uuid;

/// Claims the oldest waiting job whose form has no active job.
///
/// `SKIP LOCKED` keeps two concurrent claim statements from fighting over the same
/// row; FIFO order per form comes from the `created_at, id` ordering.
const CLAIM_SQL: &str = "\
UPDATE migration_jobs SET state = 'active', started_at = $1, updated_at = $1 \
WHERE id = ( \
    SELECT w.id FROM migration_jobs w \
    WHERE w.state = 'waiting' \
      AND NOT EXISTS ( \
          SELECT 1 FROM migration_jobs a \
          WHERE a.form_id = w.form_id AND a.state = 'active' \
      ) \
    ORDER BY w.created_at, w.id \
    LIMIT 1 \
    FOR UPDATE SKIP LOCKED \
) \
RETURNING *";

/// Repository for migration queue jobs.
pub struct JobRepository;

impl JobRepository {
    /// Admits a new job.
    pub async fn insert<C: ConnectionTrait>(conn: &C, job: &MigrationJob) -> Result<()> {
        migration_job::Entity::insert(to_active(job)?).exec(conn).await?;
        Ok(())
    }

    /// Retrieves one job by identity.
    pub async fn find_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<Option<MigrationJob>> {
        let model = migration_job::Entity::find_by_id(id).one(conn).await?;
        model.map(to_domain).transpose()
    }

    /// Atomically claims the next eligible job, transitioning it to `active`.
    pub async fn claim_next<C: ConnectionTrait>(
        conn: &C,
        now: DateTime<Utc>,
    ) -> Result<Option<MigrationJob>> {
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, CLAIM_SQL, [now.into()]);
        let model = migration_job::Entity::find().from_raw_sql(stmt).one(conn).await?;
        model.map(to_domain).transpose()
    }

    /// Moves delayed jobs whose backoff has elapsed back to `waiting`.
    pub async fn promote_due_delayed<C: ConnectionTrait>(
        conn: &C,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE migration_jobs SET state = 'waiting', next_run_at = NULL, updated_at = $1 \
             WHERE state = 'delayed' AND next_run_at <= $1",
            [now.into()],
        );
        Ok(conn.execute(stmt).await?.rows_affected())
    }

    /// Recovers `active` jobs claimed before `cutoff`. This is the
    /// visibility-timeout recovery for crashed workers, and it applies the same
    /// retry ceiling as the failure path: jobs with attempts left go back to
    /// `waiting` charged one attempt; jobs that have exhausted the budget are
    /// marked `failed` so the counter never climbs past the ceiling.
    ///
    /// # Returns
    /// `(released, failed)` row counts.
    pub async fn release_stale_active<C: ConnectionTrait>(
        conn: &C,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> Result<(u64, u64)> {
        let fail_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE migration_jobs \
             SET state = 'failed', finished_at = $2, updated_at = $2, \
                 last_error = 'worker exceeded visibility timeout; retry attempts exhausted' \
             WHERE state = 'active' AND started_at < $1 AND attempt >= $3",
            [cutoff.into(), now.into(), max_attempts.into()],
        );
        let failed = conn.execute(fail_stmt).await?.rows_affected();

        let release_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE migration_jobs \
             SET state = 'waiting', attempt = attempt + 1, started_at = NULL, updated_at = $2 \
             WHERE state = 'active' AND started_at < $1 AND attempt < $3",
            [cutoff.into(), now.into(), max_attempts.into()],
        );
        let released = conn.execute(release_stmt).await?.rows_affected();

        Ok((released, failed))
    }

    /// Cancels a job iff it is still waiting. Returns `false` when the job was in
    /// any other state (or did not exist).
    pub async fn cancel_waiting<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE migration_jobs SET state = 'cancelled', finished_at = $1, updated_at = $1 \
             WHERE id = $2 AND state = 'waiting'",
            [now.into(), id.into()],
        );
        Ok(conn.execute(stmt).await?.rows_affected() == 1)
    }

    /// Marks an active job completed.
    pub async fn mark_completed<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE migration_jobs \
             SET state = 'completed', finished_at = $1, updated_at = $1, last_error = NULL \
             WHERE id = $2",
            [now.into(), id.into()],
        );
        conn.execute(stmt).await?;
        Ok(())
    }

    /// Marks an active job terminally failed.
    pub async fn mark_failed<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE migration_jobs \
             SET state = 'failed', finished_at = $1, updated_at = $1, last_error = $2 \
             WHERE id = $3",
            [now.into(), error.into(), id.into()],
        );
        conn.execute(stmt).await?;
        Ok(())
    }

    /// Parks an active job for a retry backoff, charging an attempt.
    pub async fn mark_delayed<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
        error: &str,
        next_run_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE migration_jobs \
             SET state = 'delayed', attempt = attempt + 1, next_run_at = $1, \
                 last_error = $2, updated_at = $3 \
             WHERE id = $4",
            [next_run_at.into(), error.into(), now.into(), id.into()],
        );
        conn.execute(stmt).await?;
        Ok(())
    }

    /// Counts jobs per state. Live states (`waiting`, `active`, `delayed`) always
    /// count; terminal states count inside the rolling window starting at `since`.
    pub async fn counts_since<C: ConnectionTrait>(
        conn: &C,
        since: DateTime<Utc>,
    ) -> Result<QueueCounts> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT state, count(*) AS n FROM migration_jobs \
             WHERE state IN ('waiting', 'active', 'delayed') OR updated_at >= $1 \
             GROUP BY state",
            [since.into()],
        );
        let rows = conn.query_all(stmt).await?;

        let mut counts = QueueCounts::default();
        for row in rows {
            let state: String = row.try_get("", "state")?;
            let n: i64 = row.try_get("", "n")?;
            let n = u64::try_from(n).unwrap_or(0);
            match JobState::parse(&state) {
                Some(JobState::Waiting) => counts.waiting = n,
                Some(JobState::Active) => counts.active = n,
                Some(JobState::Completed) => counts.completed = n,
                Some(JobState::Failed) => counts.failed = n,
                Some(JobState::Delayed) => counts.delayed = n,
                Some(JobState::Cancelled) => counts.cancelled = n,
                None => {}
            }
        }
        Ok(counts)
    }

    /// Lists a form's most recent jobs, newest first.
    pub async fn recent_for_form<C: ConnectionTrait>(
        conn: &C,
        form_id: Uuid,
        limit: u64,
    ) -> Result<Vec<MigrationJob>> {
        let models = migration_job::Entity::find()
            .filter(migration_job::Column::FormId.eq(form_id))
            .order_by_desc(migration_job::Column::CreatedAt)
            .limit(limit)
            .all(conn)
            .await?;
        models.into_iter().map(to_domain).collect()
    }

    /// Number of jobs currently waiting for a form.
    pub async fn waiting_depth<C: ConnectionTrait>(conn: &C, form_id: Uuid) -> Result<u64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT count(*) AS n FROM migration_jobs WHERE form_id = $1 AND state = 'waiting'",
            [form_id.into()],
        );
        let row = conn.query_one(stmt).await?;
        match row {
            Some(row) => {
                let n: i64 = row.try_get("", "n")?;
                Ok(u64::try_from(n).unwrap_or(0))
            }
            None => Ok(0),
        }
    }
}

fn to_active(job: &MigrationJob) -> Result<migration_job::ActiveModel> {
    Ok(migration_job::ActiveModel {
        id: Set(job.id),
        form_id: Set(job.form_id),
        table_name: Set(job.table_name.clone()),
        op: Set(serde_json::to_value(&job.op)?),
        actor: Set(job.actor.clone()),
        state: Set(job.state.as_str().to_string()),
        attempt: Set(job.attempt),
        last_error: Set(job.last_error.clone()),
        next_run_at: Set(job.next_run_at),
        created_at: Set(job.created_at),
        updated_at: Set(job.created_at),
        started_at: Set(job.started_at),
        finished_at: Set(job.finished_at),
    })
}

fn to_domain(model: migration_job::Model) -> Result<MigrationJob> {
    let state = JobState::parse(&model.state)
        .with_context(|| format!("unknown job state '{}'", model.state))?;
    let op: QueuedOp =
        serde_json::from_value(model.op).context("malformed queued op payload")?;
    Ok(MigrationJob {
        id: model.id,
        form_id: model.form_id,
        table_name: model.table_name,
        op,
        actor: model.actor,
        attempt: model.attempt,
        state,
        last_error: model.last_error,
        next_run_at: model.next_run_at,
        created_at: model.created_at,
        started_at: model.started_at,
        finished_at: model.finished_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use strata_core::field::FieldType;
    use strata_core::plan::MigrationOp;

    fn sample_model(state: &str) -> migration_job::Model {
        let op = QueuedOp::forward(MigrationOp::AddColumn {
            field_id: Uuid::new_v4(),
            column: "age_0a1b2c3d".into(),
            field_type: FieldType::Rating,
        });
        let now = chrono::Utc::now();
        migration_job::Model {
            id: Uuid::new_v4(),
            form_id: Uuid::new_v4(),
            table_name: "form_t_12345678".into(),
            op: serde_json::to_value(&op).unwrap(),
            actor: Some("admin@example.com".into()),
            state: state.to_string(),
            attempt: 1,
            last_error: None,
            next_run_at: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_parses_state_and_op() {
        let model = sample_model("waiting");
        let id = model.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model]])
            .into_connection();

        let job = JobRepository::find_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Waiting);
        assert!(matches!(job.op.op, MigrationOp::AddColumn { .. }));
        assert_eq!(job.op.rollback_of, None);
    }

    #[tokio::test]
    async fn test_unknown_state_is_an_error() {
        let model = sample_model("limbo");
        let id = model.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model]])
            .into_connection();

        assert!(JobRepository::find_by_id(&db, id).await.is_err());
    }

    #[test]
    fn test_claim_sql_orders_fifo_and_skips_busy_forms() {
        assert!(CLAIM_SQL.contains("ORDER BY w.created_at, w.id"));
        assert!(CLAIM_SQL.contains("NOT EXISTS"));
        assert!(CLAIM_SQL.contains("a.state = 'active'"));
        assert!(CLAIM_SQL.contains("FOR UPDATE SKIP LOCKED"));
    }
}
