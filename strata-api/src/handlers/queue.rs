//! This module provides the API handlers for observing and managing the migration
//! queue.

use crate::{error::ApiError, handlers::caller_from_headers, state::AppState};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    http::StatusCode,
};
use strata_core::job::{MigrationJob, QueueCounts};
use uuid::Uuid;

/// Queue state counts over the rolling 24-hour window.
///
/// # Route
/// `GET /queue/status`
pub async fn queue_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<QueueCounts>, ApiError> {
    let caller = caller_from_headers(&headers);
    let counts = state.migration_service.queue_status(&caller).await?;
    Ok(Json(counts))
}

/// A form's recent jobs with state, timestamps, and error text.
///
/// # Route
/// `GET /forms/{id}/jobs`
pub async fn queue_metrics(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Vec<MigrationJob>>, ApiError> {
    let caller = caller_from_headers(&headers);
    let jobs = state.migration_service.queue_metrics(&caller, form_id).await?;
    Ok(Json(jobs))
}

/// Cancel a job that is still waiting. Active jobs run to completion.
///
/// # Route
/// `POST /jobs/{id}/cancel`
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = caller_from_headers(&headers);
    state.migration_service.cancel_job(&caller, job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
