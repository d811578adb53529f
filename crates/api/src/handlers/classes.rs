//! # Class Handlers
//!
//! One-off bookings, conflict checks, cancellations and rebookings.
//!
//! Booking and rebooking answer in two shapes distinguished by the `result`
//! tag: `booked`/`rebooked` with the stored class (201), or
//! `needsConfirmation` with the soft conflicts (200). Resubmitting with
//! `confirmed: true` accepts the warnings.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use classbook_core::models::class::{
    BookClassRequest, BookingOutcome, Class, ConflictCheck, ConflictCheckRequest, RebookClassRequest,
    RebookOutcome,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{middleware::auth::Caller, middleware::error_handling::AppError, ApiState};

#[axum::debug_handler]
pub async fn check_conflicts(
    State(state): State<Arc<ApiState>>,
    _caller: Caller,
    Json(request): Json<ConflictCheckRequest>,
) -> Result<Json<ConflictCheck>, AppError> {
    let check = state.service.check_conflicts(&request).await?;
    Ok(Json(check))
}

#[axum::debug_handler]
pub async fn book_class(
    State(state): State<Arc<ApiState>>,
    Caller(identity): Caller,
    Json(request): Json<BookClassRequest>,
) -> Result<(StatusCode, Json<BookingOutcome>), AppError> {
    let outcome = state.service.book_class(&identity, &request).await?;
    let status = match outcome {
        BookingOutcome::Booked { .. } => StatusCode::CREATED,
        BookingOutcome::NeedsConfirmation { .. } => StatusCode::OK,
    };

    Ok((status, Json(outcome)))
}

/// Customers cancel their own classes and receive a credit when early enough.
/// Instructors and admins cancel on the instructor's behalf.
#[axum::debug_handler]
pub async fn cancel_class(
    State(state): State<Arc<ApiState>>,
    Caller(identity): Caller,
    Path(class_id): Path<Uuid>,
) -> Result<Json<Class>, AppError> {
    let class = state.service.cancel_class(&identity, class_id).await?;
    Ok(Json(class))
}

#[axum::debug_handler]
pub async fn rebook_class(
    State(state): State<Arc<ApiState>>,
    Caller(identity): Caller,
    Path(class_id): Path<Uuid>,
    Json(request): Json<RebookClassRequest>,
) -> Result<(StatusCode, Json<RebookOutcome>), AppError> {
    let outcome = state.service.rebook_class(&identity, class_id, &request).await?;
    let status = match outcome {
        RebookOutcome::Rebooked { .. } => StatusCode::CREATED,
        RebookOutcome::NeedsConfirmation { .. } => StatusCode::OK,
    };

    Ok((status, Json(outcome)))
}
