//! # Classbook API
//!
//! HTTP surface of the class booking engine.
//!
//! ## Architecture
//!
//! - **Routes**: URL structure, one module per resource
//! - **Handlers**: extract input, call the [`SchedulingService`], shape the response
//! - **Middleware**: caller identity and error-to-status mapping
//! - **Config**: environment and scheduling policy
//!
//! Handlers hold no business logic. Every rule lives in `classbook-core`, and
//! persistence is whatever [`Store`] the binary hands in.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    Json, Router,
};
use classbook_core::{
    clock::SystemClock,
    notify::LogNotifier,
    service::SchedulingService,
    store::Store,
};
use eyre::{Result, WrapErr};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::{BoxError, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use crate::middleware::auth::{USER_ID_HEADER, USER_TYPE_HEADER};

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    pub service: SchedulingService,
}

/// Builds the router with every endpoint and request tracing, without the
/// deployment-specific layers.
pub fn app(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::schedule::routes())
        .merge(routes::availability::routes())
        .merge(routes::classes::routes())
        .merge(routes::recurring::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .wrap_err_with(|| format!("Invalid CORS origin: {origin}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_TYPE_HEADER),
        ])
        .allow_origin(origins)
        .allow_credentials(true))
}

async fn handle_timeout(err: BoxError) -> (StatusCode, Json<Value>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, Json(json!({ "error": "Request timed out" })))
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
    }
}

/// Starts the API server on top of the given store.
///
/// Installs the tracing subscriber, wires the service with the system clock and
/// the logging notifier, then serves until the listener fails.
pub async fn start_server(config: config::ApiConfig, store: Arc<dyn Store>) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let service = SchedulingService::new(
        store,
        config.policy.clone(),
        Arc::new(SystemClock),
        Arc::new(LogNotifier),
    );
    let state = Arc::new(ApiState { service });

    let app = app(state);

    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)?),
        None => app,
    };

    let app = app.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout))
            .timeout(Duration::from_secs(config.request_timeout)),
    );

    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        timezone = config.policy.timezone_name(),
        "Server listening on http://{}", addr
    );
    axum::serve(listener, app).await?;

    Ok(())
}
