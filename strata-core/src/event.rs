//! Best-effort event notifications emitted by the queue and workers.
//!
//! Delivery targets (WebSocket fan-out, Telegram, email) live outside this system; the
//! core only defines the vocabulary and a pluggable sink. Emission must never fail a
//! migration: sinks are infallible by contract and do their own error handling.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event describing queue or migration progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MigrationEvent {
    /// A job was admitted to the queue.
    MigrationEnqueued {
        /// Form whose table the job targets.
        form_id: Uuid,
        /// Identity of the admitted job.
        job_id: Uuid,
    },
    /// A worker claimed a job and began executing it.
    MigrationStarted {
        /// Form whose table the job targets.
        form_id: Uuid,
        /// Identity of the claimed job.
        job_id: Uuid,
    },
    /// A job completed and its history record was written.
    MigrationCompleted {
        /// Form whose table the job targeted.
        form_id: Uuid,
        /// Identity of the completed job.
        job_id: Uuid,
        /// The appended migration record.
        migration_id: Uuid,
    },
    /// A job failed terminally.
    MigrationFailed {
        /// Form whose table the job targeted.
        form_id: Uuid,
        /// Identity of the failed job.
        job_id: Uuid,
        /// Diagnostic text.
        error: String,
    },
    /// The number of waiting jobs for a form changed.
    QueueDepthChanged {
        /// Form whose queue depth changed.
        form_id: Uuid,
        /// Jobs currently waiting for this form.
        waiting: u64,
    },
}

/// A pluggable, best-effort event consumer.
pub trait EventSink: Send + Sync {
    /// Delivers one event. Implementations must not panic and must swallow their own
    /// delivery errors.
    fn emit(&self, event: &MigrationEvent);
}

/// Default sink: structured log lines via `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::MigrationEnqueued { form_id, job_id } => {
                tracing::info!(%form_id, %job_id, "migration enqueued");
            }
            MigrationEvent::MigrationStarted { form_id, job_id } => {
                tracing::info!(%form_id, %job_id, "migration started");
            }
            MigrationEvent::MigrationCompleted { form_id, job_id, migration_id } => {
                tracing::info!(%form_id, %job_id, %migration_id, "migration completed");
            }
            MigrationEvent::MigrationFailed { form_id, job_id, error } => {
                tracing::warn!(%form_id, %job_id, error = %error, "migration failed");
            }
            MigrationEvent::QueueDepthChanged { form_id, waiting } => {
                tracing::debug!(%form_id, waiting, "queue depth changed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serialization_shape() {
        let form_id = Uuid::parse_str("f47ac10b-58cc-4372-a567-0e02b2c3d479").unwrap();
        let job_id = Uuid::parse_str("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9").unwrap();

        let event = MigrationEvent::QueueDepthChanged { form_id, waiting: 3 };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "queue_depth_changed",
                "form_id": "f47ac10b-58cc-4372-a567-0e02b2c3d479",
                "waiting": 3
            })
        );

        let event = MigrationEvent::MigrationEnqueued { form_id, job_id };
        let round: MigrationEvent =
            serde_json::from_value(serde_json::to_value(&event).unwrap()).unwrap();
        assert_eq!(round, event);
    }
}
