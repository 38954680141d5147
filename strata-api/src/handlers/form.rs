//! This module provides the API handlers for form schema operations.

use crate::{error::ApiError, handlers::caller_from_headers, state::AppState};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Deserialize;
use strata_core::field::FieldSpec;
use strata_core::form::FormSchema;
use uuid::Uuid;

/// Request body for creating a form.
#[derive(Debug, Deserialize)]
pub struct CreateFormRequest {
    /// Display title; the dynamic table name is derived from it.
    pub title: String,
    /// Initial field list.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// Create a new form and provision its dynamic table.
///
/// # Route
/// `POST /forms`
///
/// # Errors
/// - Returns an error if the caller may not apply schema changes.
/// - Returns an error if the title or fields fail validation.
pub async fn create_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateFormRequest>,
) -> Result<Json<FormSchema>, ApiError> {
    let caller = caller_from_headers(&headers);
    let form = state
        .form_service
        .create_form(&caller, &request.title, request.fields)
        .await?;
    Ok(Json(form))
}

/// Retrieve a form schema by id.
///
/// # Route
/// `GET /forms/{id}`
///
/// # Errors
/// - Returns an error if the form does not exist.
pub async fn get_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FormSchema>, ApiError> {
    let form = state.form_service.get_form(id).await?;
    Ok(Json(form))
}
