//! This module provides the API handlers for listing and restoring column backups.

use crate::{error::ApiError, handlers::caller_from_headers, state::AppState};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use strata_service::services::migration::{BackupSummary, RestoreOutcome};
use strata_storage_seaorm::repo::backup::BackupFilter;
use uuid::Uuid;

/// Query parameters for the backup listing.
#[derive(Debug, Deserialize)]
pub struct BackupListParams {
    /// `active`, `expired`, or `all`. Defaults to `active`.
    #[serde(default)]
    pub filter: Option<String>,
}

/// List a form's column backups.
///
/// # Route
/// `GET /forms/{id}/backups`
pub async fn list_backups(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    Query(params): Query<BackupListParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<BackupSummary>>, ApiError> {
    let filter = match params.filter.as_deref() {
        None => BackupFilter::Active,
        Some(raw) => BackupFilter::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown backup filter '{raw}'")))?,
    };

    let caller = caller_from_headers(&headers);
    let backups = state
        .migration_service
        .list_backups(&caller, form_id, filter)
        .await?;
    Ok(Json(backups))
}

/// Request body for a manual column snapshot.
#[derive(Debug, Deserialize)]
pub struct CreateBackupRequest {
    /// Column to snapshot.
    pub column: String,
}

/// Take a manual snapshot of one column.
///
/// # Route
/// `POST /forms/{id}/backups`
pub async fn create_backup(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<CreateBackupRequest>,
) -> Result<Json<BackupSummary>, ApiError> {
    let caller = caller_from_headers(&headers);
    let backup = state
        .migration_service
        .create_backup(&caller, form_id, &request.column)
        .await?;
    Ok(Json(backup))
}

/// Restore a backup's snapshot into its column.
///
/// # Route
/// `POST /backups/{id}/restore`
pub async fn restore_backup(
    State(state): State<AppState>,
    Path(backup_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<RestoreOutcome>, ApiError> {
    let caller = caller_from_headers(&headers);
    let outcome = state.migration_service.restore_backup(&caller, backup_id).await?;
    Ok(Json(outcome))
}
