//! # Schedule Handlers
//!
//! Versioned weekly schedules. Creating a version closes the open one with an
//! exclusive `effectiveTo` equal to the new `effectiveFrom`, so the history is
//! never edited in place.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use classbook_core::models::schedule::{
    CreateScheduleRequest, ScheduleWithSlots, TerminateAvailabilityRequest, TerminateAvailabilityResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{middleware::auth::Caller, middleware::error_handling::AppError, ApiState};

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<Arc<ApiState>>,
    Caller(identity): Caller,
    Path(instructor_id): Path<Uuid>,
    Json(payload): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleWithSlots>), AppError> {
    let schedule = state
        .service
        .create_instructor_schedule(&identity, instructor_id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(schedule)))
}

#[axum::debug_handler]
pub async fn list_schedules(
    State(state): State<Arc<ApiState>>,
    Path(instructor_id): Path<Uuid>,
) -> Result<Json<Vec<ScheduleWithSlots>>, AppError> {
    let schedules = state.service.list_schedules(instructor_id).await?;
    Ok(Json(schedules))
}

/// Ends a version at `endAt`. Refused with 409 while a booked class sits
/// beyond the new end.
#[axum::debug_handler]
pub async fn terminate_schedule(
    State(state): State<Arc<ApiState>>,
    Caller(identity): Caller,
    Path((instructor_id, schedule_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<TerminateAvailabilityRequest>,
) -> Result<Json<TerminateAvailabilityResponse>, AppError> {
    let response = state
        .service
        .terminate_recurring_availability(&identity, instructor_id, schedule_id, payload.end_at)
        .await?;

    Ok(Json(response))
}
