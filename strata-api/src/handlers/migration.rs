//! This module provides the API handlers for previewing, applying, inspecting, and
//! rolling back migrations.

use crate::{error::ApiError, handlers::caller_from_headers, state::AppState};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use strata_core::field::FieldSpec;
use strata_core::record::MigrationRecord;
use strata_engine::MigrationPreview;
use uuid::Uuid;

/// Request body carrying a proposed field list.
#[derive(Debug, Deserialize)]
pub struct FieldListRequest {
    /// The full proposed field list, in display order.
    pub fields: Vec<FieldSpec>,
}

/// Response body for `apply`: one job per detected operation, in plan order.
#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    /// Identities of the enqueued jobs.
    pub job_ids: Vec<Uuid>,
}

/// Response body for `rollback`.
#[derive(Debug, Serialize)]
pub struct RollbackResponse {
    /// Identity of the job executing the reversal.
    pub job_id: Uuid,
}

/// Paging for the history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Page size; defaults to 50.
    #[serde(default = "default_history_limit")]
    pub limit: u64,
    /// Offset into the newest-first listing.
    #[serde(default)]
    pub offset: u64,
}

fn default_history_limit() -> u64 {
    50
}

/// Preview the migration plan a proposed field list would produce.
///
/// Pure: nothing is mutated, and every warning the engine attaches is returned for
/// the confirmation modal.
///
/// # Route
/// `POST /forms/{id}/migrations/preview`
pub async fn preview_migrations(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<FieldListRequest>,
) -> Result<Json<Vec<MigrationPreview>>, ApiError> {
    let caller = caller_from_headers(&headers);
    let previews = state
        .migration_service
        .preview(&caller, form_id, request.fields)
        .await?;
    Ok(Json(previews))
}

/// Save a proposed field list and enqueue the detected operations.
///
/// # Route
/// `POST /forms/{id}/migrations/apply`
pub async fn apply_migrations(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<FieldListRequest>,
) -> Result<Json<ApplyResponse>, ApiError> {
    let caller = caller_from_headers(&headers);
    let job_ids = state
        .migration_service
        .apply(&caller, form_id, request.fields)
        .await?;
    Ok(Json(ApplyResponse { job_ids }))
}

/// Read a form's migration history, newest first.
///
/// # Route
/// `GET /forms/{id}/migrations`
pub async fn migration_history(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<MigrationRecord>>, ApiError> {
    let caller = caller_from_headers(&headers);
    let records = state
        .migration_service
        .history(&caller, form_id, params.limit, params.offset)
        .await?;
    Ok(Json(records))
}

/// Enqueue the reversal of a recorded migration.
///
/// # Route
/// `POST /migrations/{id}/rollback`
pub async fn rollback_migration(
    State(state): State<AppState>,
    Path(migration_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<RollbackResponse>, ApiError> {
    let caller = caller_from_headers(&headers);
    let job_id = state.migration_service.rollback(&caller, migration_id).await?;
    Ok(Json(RollbackResponse { job_id }))
}
