use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/instructors/:id/schedules",
            get(handlers::schedule::list_schedules).post(handlers::schedule::create_schedule),
        )
        .route(
            "/api/instructors/:id/schedules/:schedule_id/terminate",
            post(handlers::schedule::terminate_schedule),
        )
}
