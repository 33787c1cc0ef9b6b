use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Common error types used across the application.
///
/// Every variant is terminal for the invocation that raised it; the webhook
/// source owns redelivery.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Preference lookup failed: {0}")]
    PreferenceLookup(String),

    #[error("Destination lookup failed: {0}")]
    DestinationLookup(String),

    #[error("Credential exchange failed: {0}")]
    Credential(String),

    #[error("{failed} of {total} notifications failed")]
    Delivery { failed: usize, total: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::PreferenceLookup(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_)
            | AppError::Http(_)
            | AppError::Config(_)
            | AppError::DestinationLookup(_)
            | AppError::Credential(_)
            | AppError::Delivery { .. }
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Validation(msg) | AppError::Auth(msg) => msg.clone(),
            AppError::Delivery { .. } => "Some notifications failed".to_string(),
            AppError::PreferenceLookup(_) => {
                tracing::warn!(error = %self, "Preference lookup failed");
                "Failed to fetch notification preferences".to_string()
            }
            AppError::DestinationLookup(_) => {
                tracing::error!(error = %self, "Destination lookup failed");
                "Failed to fetch FCM tokens".to_string()
            }
            AppError::Credential(_) => {
                tracing::error!(error = %self, "Credential exchange failed");
                "Failed to obtain FCM access token".to_string()
            }
            AppError::Database(_)
            | AppError::Http(_)
            | AppError::Config(_)
            | AppError::Internal(_) => {
                tracing::error!(error = %self, "Unhandled error while dispatching notification");
                "Internal Server Error".to_string()
            }
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
