use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use progress_core::CourseStats;
use progress_core::model::{CourseProgressEvent, EventDraft};
use tracing::info;

use crate::{AppState, error::ApiError};

pub async fn post_event(
    State(state): State<AppState>,
    payload: Result<Json<EventDraft>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(draft) = payload?;
    state.progress.ingest(draft).await?;
    Ok((StatusCode::CREATED, "Event created"))
}

pub async fn get_events_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<CourseProgressEvent>>, ApiError> {
    let events = state.progress.history_for(&user_id).await?;
    Ok(Json(events))
}

pub async fn get_course_analysis(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseStats>, ApiError> {
    let stats = state.progress.analyze(&course_id).await?;
    Ok(Json(stats))
}

pub async fn get_status_ping() -> impl IntoResponse {
    info!("Status");
    StatusCode::OK
}
