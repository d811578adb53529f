//! # Availability Handlers
//!
//! Read side of instructor availability plus the two write paths that reshape
//! it outside of schedule versioning: absence batches and the horizon job.
//!
//! Slot listing is public. Absence batches require the instructor or an admin;
//! the horizon job is admin-only since it is normally triggered by a scheduler.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use classbook_core::{
    errors::BookingError,
    models::{
        availability::{
            AvailableSlotsQuery, AvailableSlotsResponse, BatchAbsenceRequest, BatchAbsenceResult, HorizonReport,
        },
        people::UserType,
    },
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{middleware::auth::Caller, middleware::error_handling::AppError, ApiState};

/// Lists bookable instants for an instructor.
///
/// ```text
/// GET /api/instructors/:id/available-slots?start=..&end=..&excludeBookedSlots=true
/// ```
#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<ApiState>>,
    Path(instructor_id): Path<Uuid>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<AvailableSlotsResponse>, AppError> {
    let slots = state
        .service
        .generate_available_slots(instructor_id, query.start, query.end, query.exclude_booked_slots)
        .await?;

    Ok(Json(AvailableSlotsResponse { instructor_id, slots }))
}

/// Applies absence changes item by item. Always answers 200 with per-item
/// outcomes once the caller and instructor check out.
#[axum::debug_handler]
pub async fn batch_update_absences(
    State(state): State<Arc<ApiState>>,
    Caller(identity): Caller,
    Path(instructor_id): Path<Uuid>,
    Json(request): Json<BatchAbsenceRequest>,
) -> Result<Json<BatchAbsenceResult>, AppError> {
    let result = state
        .service
        .batch_update_absences(&identity, instructor_id, &request.changes)
        .await?;

    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn extend_availability(
    State(state): State<Arc<ApiState>>,
    Caller(identity): Caller,
    Path(instructor_id): Path<Uuid>,
) -> Result<Json<HorizonReport>, AppError> {
    if identity.user_type != UserType::Admin {
        return Err(AppError(BookingError::Authorization(
            "Only administrators can extend availability".to_string(),
        )));
    }

    let report = state.service.extend_availability_horizon(instructor_id).await?;
    Ok(Json(report))
}
