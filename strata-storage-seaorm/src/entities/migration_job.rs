//! This module provides the SeaORM entity definition for queue jobs.
//!
//! The job table is the durable half of the migration queue: claims, retries, and
//! visibility-timeout recovery are all expressed as conditional updates against it,
//! so a crashed worker never strands a job.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A queued request to execute one migration.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "migration_jobs")]
pub struct Model {
    /// Identity of the job.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Partition key: jobs on the same form run serially, FIFO.
    pub form_id: Uuid,

    /// Dynamic table the op targets.
    pub table_name: String,

    /// The queued operation (`QueuedOp`) as a JSONB document.
    #[sea_orm(column_type = "JsonBinary")]
    pub op: Json,

    /// Who requested the migration.
    pub actor: Option<String>,

    /// Lifecycle state: `waiting`, `active`, `completed`, `failed`, `delayed`,
    /// `cancelled`.
    pub state: String,

    /// Execution attempt counter, starting at 1.
    pub attempt: i32,

    /// Error text from the most recent failed attempt.
    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,

    /// For delayed jobs, when the next attempt becomes eligible.
    pub next_run_at: Option<DateTimeUtc>,

    /// When the job was enqueued.
    pub created_at: DateTimeUtc,

    /// When the job row last changed state.
    pub updated_at: DateTimeUtc,

    /// When a worker last claimed the job.
    pub started_at: Option<DateTimeUtc>,

    /// When the job reached a terminal state.
    pub finished_at: Option<DateTimeUtc>,
}

/// Defines relationships for the job entity.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Every job belongs to a form.
    #[sea_orm(
        belongs_to = "super::form::Entity",
        from = "Column::FormId",
        to = "super::form::Column::Id"
    )]
    Form,
}

impl Related<super::form::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Form.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
