//! # Recurring Class Handlers
//!
//! Weekly recurring classes are never edited in place: an edit sets the old
//! interval's exclusive `endAt` to the new start date and opens a new one.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use classbook_core::models::class::{
    CreateRecurringClassRequest, EditRecurringClassRequest, EditRecurringClassResponse, RecurringClass,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{middleware::auth::Caller, middleware::error_handling::AppError, ApiState};

#[axum::debug_handler]
pub async fn create_recurring_class(
    State(state): State<Arc<ApiState>>,
    Caller(identity): Caller,
    Json(payload): Json<CreateRecurringClassRequest>,
) -> Result<(StatusCode, Json<RecurringClass>), AppError> {
    let recurring = state.service.create_recurring_class(&identity, &payload).await?;
    Ok((StatusCode::CREATED, Json(recurring)))
}

#[axum::debug_handler]
pub async fn edit_recurring_class(
    State(state): State<Arc<ApiState>>,
    Caller(identity): Caller,
    Path(recurring_class_id): Path<Uuid>,
    Json(payload): Json<EditRecurringClassRequest>,
) -> Result<Json<EditRecurringClassResponse>, AppError> {
    let response = state
        .service
        .edit_recurring_class(&identity, recurring_class_id, &payload)
        .await?;

    Ok(Json(response))
}
