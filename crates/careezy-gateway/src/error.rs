use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use careezy_common::Error;
use tracing::error;

/// JSON error response: `{"error": message}`.
///
/// Client errors carry their own message. Everything else is logged and
/// replaced by a generic message naming the failed operation.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Map a domain error; `operation` is the message shown for server-side failures.
    pub fn from_error(err: Error, operation: &'static str) -> Self {
        match err {
            Error::Unauthorized(message) => Self::unauthorized(message),
            Error::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            Error::InvalidInput(message) => Self::bad_request(message),
            other => {
                error!("{operation}: {other}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, operation)
            }
        }
    }

    /// `map_err` adapter for [`ApiError::from_error`].
    pub fn context(operation: &'static str) -> impl FnOnce(Error) -> Self {
        move |err| Self::from_error(err, operation)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}
