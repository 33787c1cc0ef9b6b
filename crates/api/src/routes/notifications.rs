//! Database webhook route: one inserted notification row per call.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use herald_common::error::AppError;
use herald_common::types::{DispatchOutcome, WebhookEventType, WebhookPayload};

use crate::middleware::auth::WebhookCaller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handle_webhook))
        .route("/notifications", post(handle_webhook))
}

/// Body returned for a delivered or intentionally skipped notification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub target_user_id: String,
    pub source_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl From<DispatchOutcome> for DispatchResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Skipped {
                target_user_id,
                source_id,
            } => Self {
                success: None,
                message: Some("Notifications disabled for this conversation"),
                target_user_id,
                source_id,
                kind: None,
            },
            DispatchOutcome::Sent {
                target_user_id,
                source_id,
                kind,
                ..
            } => Self {
                success: Some("Notifications sent"),
                message: None,
                target_user_id,
                source_id,
                kind: Some(kind.to_string()),
            },
        }
    }
}

/// POST /notifications: dispatch the inserted row to the recipient's devices.
async fn handle_webhook(
    State(state): State<AppState>,
    _caller: WebhookCaller,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<Json<DispatchResponse>, AppError> {
    let Json(payload) =
        payload.map_err(|e| AppError::Validation(format!("Invalid webhook payload: {}", e)))?;

    if payload.event_type != WebhookEventType::Insert {
        return Err(AppError::Validation(format!(
            "Unsupported webhook event {:?}; only INSERT is handled",
            payload.event_type
        )));
    }

    tracing::debug!(
        event_id = %payload.record.id,
        table = %payload.table,
        kind = %payload.record.kind,
        "Webhook received"
    );

    let outcome = state.dispatcher.dispatch(&payload.record).await?;
    Ok(Json(DispatchResponse::from(outcome)))
}
