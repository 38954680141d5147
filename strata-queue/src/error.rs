//! Defines error types specific to queue operations within the `strata-queue` crate.

use strata_core::job::JobState;
use thiserror::Error;
use uuid::Uuid;

/// Represents errors that can occur while enqueuing, cancelling, or inspecting jobs.
#[derive(Error, Debug)]
pub enum QueueError {
    /// No job with the given identity exists.
    #[error("job {0} not found")]
    JobNotFound(Uuid),

    /// The job has left the `waiting` state; active DDL must run to completion.
    #[error("job {id} is '{}' and can no longer be cancelled", .state.as_str())]
    NotCancellable {
        /// The job that could not be cancelled.
        id: Uuid,
        /// Its current state.
        state: JobState,
    },

    /// A repository operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
