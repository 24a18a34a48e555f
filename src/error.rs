use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("tokenization error: {0}")]
    Tokenization(String),
    #[error("protocol violation for request '{request_id}': {reason}")]
    ProtocolViolation { request_id: String, reason: String },
    #[error("output stream closed for request '{0}'")]
    StreamClosed(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("other: {0}")]
    Other(String),
}

impl ServeError {
    pub(crate) fn protocol(request_id: &str, reason: impl Into<String>) -> Self {
        ServeError::ProtocolViolation {
            request_id: request_id.to_string(),
            reason: reason.into(),
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = match self {
            ServeError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ServeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServeError::Tokenization(_)
            | ServeError::ProtocolViolation { .. }
            | ServeError::StreamClosed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServeError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
