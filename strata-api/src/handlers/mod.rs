//! This module serves as a re-export module for the API handlers within the
//! `strata-api` crate.

/// API handlers for managing column backups.
pub mod backup;
/// API handlers for form schema CRUD.
pub mod form;
/// API handlers for previewing, applying, and rolling back migrations.
pub mod migration;
/// API handlers for observing the migration queue.
pub mod queue;

pub use backup::{create_backup, list_backups, restore_backup};
pub use form::{create_form, get_form};
pub use migration::{apply_migrations, migration_history, preview_migrations, rollback_migration};
pub use queue::{cancel_job, queue_metrics, queue_status};

use axum::http::HeaderMap;
use strata_service::Caller;

/// Builds the caller identity from the auth headers attached upstream.
///
/// `x-strata-role` carries the role string; unknown roles end up with no
/// privileges. `x-strata-actor` is recorded in the audit trail.
pub(crate) fn caller_from_headers(headers: &HeaderMap) -> Caller {
    let role = headers.get("x-strata-role").and_then(|v| v.to_str().ok());
    let actor = headers
        .get("x-strata-actor")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Caller::new(role, actor)
}
