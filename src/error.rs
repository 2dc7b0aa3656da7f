//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::ml::InferenceError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // The mandatory model artifact is not loaded and could not be loaded on demand
    ModelUnavailable,

    // Input failed validation; carries every violation found
    ValidationFailed(Vec<String>),

    // The model computation itself failed
    Inference(String),

    // Database errors
    DatabaseError(String),
}

impl AppError {
    /// One-line description, used for batch sentinel slots and logs.
    pub fn detail(&self) -> String {
        match self {
            AppError::ModelUnavailable => "model is not available".to_string(),
            AppError::ValidationFailed(errors) => {
                format!("validation failed: {}", errors.join(", "))
            }
            AppError::Inference(msg) => format!("prediction failed: {}", msg),
            AppError::DatabaseError(msg) => format!("database error: {}", msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "Model is not available. Load the model artifacts first.",
                    "status": StatusCode::SERVICE_UNAVAILABLE.as_u16()
                }),
            ),
            AppError::ValidationFailed(errors) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Validation failed",
                    "details": errors,
                    "status": StatusCode::BAD_REQUEST.as_u16()
                }),
            ),
            AppError::Inference(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": format!("Prediction failed: {}", msg),
                    "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16()
                }),
            ),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Database error occurred",
                        "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16()
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::NotLoaded => AppError::ModelUnavailable,
            InferenceError::Failed(msg) => AppError::Inference(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_detail_lists_every_violation() {
        let err = AppError::ValidationFailed(vec![
            "missing required field: age".to_string(),
            "monthly_income must be a non-negative number".to_string(),
        ]);

        let detail = err.detail();
        assert!(detail.contains("missing required field: age"));
        assert!(detail.contains("monthly_income must be a non-negative number"));
    }

    #[test]
    fn test_inference_error_preserves_message() {
        let err: AppError = InferenceError::Failed("tensor shape mismatch".to_string()).into();
        assert!(err.detail().contains("tensor shape mismatch"));
    }

    #[test]
    fn test_not_loaded_maps_to_unavailable() {
        let err: AppError = InferenceError::NotLoaded.into();
        assert!(matches!(err, AppError::ModelUnavailable));
    }
}
