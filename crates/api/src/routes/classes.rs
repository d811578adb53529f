use axum::{routing::post, Router};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/classes", post(handlers::classes::book_class))
        .route(
            "/api/classes/check-conflicts",
            post(handlers::classes::check_conflicts),
        )
        .route("/api/classes/:id/cancel", post(handlers::classes::cancel_class))
        .route("/api/classes/:id/rebook", post(handlers::classes::rebook_class))
}
