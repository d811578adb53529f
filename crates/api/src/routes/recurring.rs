use axum::{
    routing::{post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/recurring-classes",
            post(handlers::recurring::create_recurring_class),
        )
        .route(
            "/api/recurring-classes/:id",
            put(handlers::recurring::edit_recurring_class),
        )
}
