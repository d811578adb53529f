use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/instructors/:id/available-slots",
            get(handlers::availability::get_available_slots),
        )
        .route(
            "/api/instructors/:id/absences/batch",
            post(handlers::availability::batch_update_absences),
        )
        .route(
            "/api/instructors/:id/availability/extend",
            post(handlers::availability::extend_availability),
        )
}
