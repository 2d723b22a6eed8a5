use crate::domain::error::PipelineError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

// Newtype so the domain error can implement an axum trait here, not in domain.
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(PipelineError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self.0 {
            PipelineError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            PipelineError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            PipelineError::WebhookSignature(_) => (
                StatusCode::BAD_REQUEST,
                "invalid webhook signature".to_string(),
                None,
            ),
            PipelineError::Configuration(msg) => {
                tracing::error!("configuration error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg, None)
            }
            PipelineError::Gateway { message, details } => {
                tracing::error!(%details, "gateway error: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message, Some(details))
            }
            PipelineError::Database(err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                    Some(serde_json::Value::String(err.to_string())),
                )
            }
            PipelineError::Store(msg) => {
                tracing::error!("store error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                    Some(serde_json::Value::String(msg)),
                )
            }
            PipelineError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                    None,
                )
            }
        };

        let body = match details {
            Some(details) => serde_json::json!({ "error": message, "details": details }),
            None => serde_json::json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
