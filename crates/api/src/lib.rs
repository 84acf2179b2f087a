#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use services::ProgressService;
use tower_http::{
    LatencyUnit,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod error;
pub mod routes;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub progress: Arc<ProgressService>,
}

/// Request limits applied to every route.
#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    pub request_timeout: Duration,
    pub request_body_size_limit: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            request_body_size_limit: 1024 * 1024,
        }
    }
}

/// Routes only, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status/ping", get(routes::get_status_ping))
        .route("/v1/events", post(routes::post_event))
        .route("/v1/events/user/{user_id}", get(routes::get_events_by_user))
        .route(
            "/v1/events/analysis/course/{course_id}",
            get(routes::get_course_analysis),
        )
        .with_state(state)
}

/// Routes wrapped in timeout, body-limit and request tracing layers.
pub fn app(state: AppState, limits: HttpLimits) -> Router {
    router(state)
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(RequestBodyLimitLayer::new(limits.request_body_size_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
}
