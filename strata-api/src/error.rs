//! Contains error types and their HTTP response conversions for the Strata API.
//!
//! This module defines `ApiError` for handling application-specific errors
//! originating from the service layer, converting them into appropriate HTTP
//! status codes and JSON responses. It also includes `BuildError` for errors
//! encountered during application startup.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use strata_engine::EngineError;
use strata_queue::QueueError;
use strata_service::ServiceError;
use strata_storage_seaorm::schema_driver::DriverError;
use thiserror::Error;

/// A wrapper to allow us to implement HTTP responses for the API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Errors generated from calling strata-service functions
    #[error("strata-service error: {0:?}")]
    Service(#[from] ServiceError),

    /// Malformed request input (bad filter values, bad paging parameters)
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),

            // 403 Forbidden
            ApiError::Service(ServiceError::Unauthorized { .. }) => {
                (StatusCode::FORBIDDEN, self.to_string())
            }

            // 404 Not Found
            ApiError::Service(ServiceError::FormNotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("Form '{id}' not found"))
            }
            ApiError::Service(ServiceError::Engine(EngineError::MigrationNotFound(id))) => {
                (StatusCode::NOT_FOUND, format!("Migration '{id}' not found"))
            }
            ApiError::Service(ServiceError::Engine(EngineError::BackupNotFound(id))) => {
                (StatusCode::NOT_FOUND, format!("Backup '{id}' not found"))
            }
            ApiError::Service(ServiceError::Queue(QueueError::JobNotFound(id))) => {
                (StatusCode::NOT_FOUND, format!("Job '{id}' not found"))
            }
            ApiError::Service(ServiceError::Engine(EngineError::Driver(
                DriverError::ColumnMissing { .. },
            ))) => (StatusCode::NOT_FOUND, self.to_string()),

            // 400 Bad Request (Validation)
            ApiError::Service(ServiceError::Ident(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Service(ServiceError::SchemaValidationErrors(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Service(ServiceError::Engine(
                EngineError::TypeConversionFailed { .. },
            )) => (StatusCode::BAD_REQUEST, self.to_string()),

            // 409 Conflict (state errors)
            ApiError::Service(ServiceError::Engine(
                EngineError::AlreadyRolledBack(_)
                | EngineError::RollbackUnavailable(_)
                | EngineError::FieldStillPresent(_)
                | EngineError::BackupExpired(_),
            )) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Service(ServiceError::Engine(EngineError::Driver(
                DriverError::ColumnExists { .. },
            ))) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Service(ServiceError::Queue(QueueError::NotCancellable { .. })) => {
                (StatusCode::CONFLICT, self.to_string())
            }

            // 503 Service Unavailable (transient infrastructure)
            ApiError::Service(ServiceError::Engine(e)) if e.is_transient() => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }

            // 500 Internal Server Error
            ApiError::Service(err) => {
                tracing::error!(error = ?err, "unhandled service error in API layer");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Represents errors that can occur during the API server's startup phase.
/// These errors typically relate to database connection issues or I/O operations
/// essential for initializing the application.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Errors generated during startup from database operations
    #[error("database error during startup")]
    Database(#[from] sea_orm::DbErr),

    /// Errors generated during startup from running the application
    #[error("I/O error during startup")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_error_status_mapping() {
        use strata_core::auth::Operation;

        assert_eq!(
            status_of(ApiError::Service(ServiceError::Unauthorized {
                operation: Operation::Rollback
            })),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::Service(ServiceError::FormNotFound(Uuid::new_v4()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Service(ServiceError::Engine(
                EngineError::TypeConversionFailed { column: "c".into(), reason: "bad".into() }
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Service(ServiceError::Engine(
                EngineError::BackupExpired(Uuid::new_v4())
            ))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::Service(ServiceError::Engine(EngineError::Driver(
                DriverError::Deadlock("40P01".into())
            )))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ApiError::BadRequest("nope".into())),
            StatusCode::BAD_REQUEST
        );
    }
}
