use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use services::ProgressServiceError;
use tracing::error;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Invalid event data: {0}")]
    BadRequest(String),
    #[error("{1}")]
    Server(StatusCode, String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let msg = self.to_string();
        let status: StatusCode = self.into();
        if status.is_server_error() {
            error!(%status, "{msg}");
        }

        (status, msg).into_response()
    }
}

impl From<ApiError> for StatusCode {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Server(c, _) => c,
        }
    }
}

impl From<ProgressServiceError> for ApiError {
    fn from(error: ProgressServiceError) -> Self {
        match error {
            ProgressServiceError::Validation(e) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Server(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_)
            | JsonRejection::JsonSyntaxError(_)
            | JsonRejection::MissingJsonContentType(_) => {
                ApiError::BadRequest(rejection.body_text())
            }
            other => ApiError::Server(other.status(), other.body_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::model::{EventDraft, EventValidationError};

    #[test]
    fn validation_errors_are_client_errors() {
        let err: EventValidationError = EventDraft::default().validate().unwrap_err();
        let api: ApiError = ProgressServiceError::from(err).into();
        assert_eq!(
            api.to_string(),
            "Invalid event data: missing required fields: userId, courseId, timestamp, eventType"
        );
        assert_eq!(StatusCode::from(api), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn server_errors_keep_their_message() {
        let api = ApiError::Server(StatusCode::SERVICE_UNAVAILABLE, "busy".into());
        assert_eq!(api.to_string(), "busy");
        assert_eq!(StatusCode::from(api), StatusCode::SERVICE_UNAVAILABLE);
    }
}
