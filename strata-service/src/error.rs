//! Defines error types specific to service orchestration within the
//! `strata-service` crate.

use strata_core::auth::Operation;
use strata_core::ident::IdentError;
use strata_engine::EngineError;
use strata_queue::QueueError;
use thiserror::Error;
use uuid::Uuid;

/// Represents errors that can occur within the Strata service layer.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The caller's role does not permit the operation.
    #[error("operation '{operation:?}' is not permitted for this role")]
    Unauthorized {
        /// The operation that was refused.
        operation: Operation,
    },

    /// A requested form was not found.
    #[error("form {0} not found")]
    FormNotFound(Uuid),

    /// A field label was absent or an identifier failed validation.
    #[error(transparent)]
    Ident(#[from] IdentError),

    /// The proposed field list failed schema validation.
    #[error("schema validation failed: {0:?}")]
    SchemaValidationErrors(#[from] validator::ValidationErrors),

    /// The engine refused or failed a migration.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The queue refused an operation.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// A repository operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),

    /// A database operation failed.
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}
