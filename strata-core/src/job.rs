//! Queue job types: the transient unit of work between "form saved" and "migration
//! recorded".

use crate::plan::QueuedOp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a queued migration job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Admitted, waiting for its form's turn.
    Waiting,
    /// Claimed by a worker; DDL may be in flight.
    Active,
    /// Executed and recorded successfully.
    Completed,
    /// Terminally failed (or retries exhausted).
    Failed,
    /// Parked for a retry backoff.
    Delayed,
    /// Cancelled while still waiting. Never retried.
    Cancelled,
}

impl JobState {
    /// The persisted string form, e.g. `"waiting"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Delayed => "delayed",
            JobState::Cancelled => "cancelled",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(JobState::Waiting),
            "active" => Some(JobState::Active),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            "delayed" => Some(JobState::Delayed),
            "cancelled" => Some(JobState::Cancelled),
            _ => None,
        }
    }

    /// Only waiting jobs may be cancelled; active DDL must run to completion.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, JobState::Waiting)
    }
}

/// A queued request to execute one migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationJob {
    /// Identity of the job.
    pub id: Uuid,
    /// Partition key: jobs on the same form run serially, FIFO.
    pub form_id: Uuid,
    /// Dynamic table the op targets.
    pub table_name: String,
    /// The operation (and rollback linkage, if any).
    pub op: QueuedOp,
    /// Who requested the migration.
    pub actor: Option<String>,
    /// Execution attempt counter, starting at 1.
    pub attempt: i32,
    /// Current state.
    pub state: JobState,
    /// Error text from the most recent failed attempt.
    pub last_error: Option<String>,
    /// For delayed jobs, when the next attempt becomes eligible.
    pub next_run_at: Option<DateTime<Utc>>,
    /// When the job was enqueued.
    pub created_at: DateTime<Utc>,
    /// When a worker last claimed the job.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Queue state counts over a rolling window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Jobs waiting for their form's turn.
    pub waiting: u64,
    /// Jobs currently executing.
    pub active: u64,
    /// Jobs completed inside the window.
    pub completed: u64,
    /// Jobs failed inside the window.
    pub failed: u64,
    /// Jobs parked for retry backoff.
    pub delayed: u64,
    /// Jobs cancelled inside the window.
    pub cancelled: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_string_round_trip() {
        for state in [
            JobState::Waiting,
            JobState::Active,
            JobState::Completed,
            JobState::Failed,
            JobState::Delayed,
            JobState::Cancelled,
        ] {
            assert_eq!(JobState::parse(state.as_str()), Some(state));
        }
        assert_eq!(JobState::parse("nope"), None);
    }

    #[test]
    fn test_only_waiting_jobs_are_cancellable() {
        assert!(JobState::Waiting.is_cancellable());
        assert!(!JobState::Active.is_cancellable());
        assert!(!JobState::Delayed.is_cancellable());
        assert!(!JobState::Completed.is_cancellable());
        assert!(!JobState::Failed.is_cancellable());
        assert!(!JobState::Cancelled.is_cancellable());
    }
}
