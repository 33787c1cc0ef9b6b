//! Dispatch orchestrator: the single entry point per notification event.
//!
//! Steps run strictly in order and every early exit is terminal:
//! 1. Reject events without a recipient
//! 2. Preference gate (denied → skip)
//! 3. Resolve destinations (none → validation failure)
//! 4. Exchange the service credential (failure → nothing is sent)
//! 5. Fan out to every destination and aggregate

use std::sync::Arc;

use herald_common::error::AppError;
use herald_common::types::{DispatchOutcome, NotificationEvent};
use herald_notifier::credential::{ServiceCredential, TokenExchanger};
use herald_notifier::fanout::send_all;
use herald_notifier::fcm::{PushMessage, PushSender};
use herald_notifier::token_hint;

use crate::gate::{Permission, PreferenceGate};
use crate::resolver::DestinationResolver;
use crate::store::NotificationStore;

/// Orchestrates the dispatch pipeline.
///
/// Collaborators are built once at process start and shared by every
/// invocation; the dispatcher itself keeps no per-event state.
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    exchanger: Arc<dyn TokenExchanger>,
    sender: Arc<dyn PushSender>,
    credential: Arc<ServiceCredential>,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        exchanger: Arc<dyn TokenExchanger>,
        sender: Arc<dyn PushSender>,
        credential: ServiceCredential,
    ) -> Self {
        Self {
            store,
            exchanger,
            sender,
            credential: Arc::new(credential),
        }
    }

    /// Run one event through the pipeline.
    pub async fn dispatch(&self, event: &NotificationEvent) -> Result<DispatchOutcome, AppError> {
        let target_user_id = event
            .target_user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Missing target_user_id".to_string()))?;
        let source_id = event.source_id.as_deref();

        let permission = PreferenceGate::check_permission(
            self.store.as_ref(),
            &event.kind,
            source_id,
            target_user_id,
        )
        .await?;

        if permission == Permission::Denied {
            tracing::info!(
                event_id = %event.id,
                target_user_id,
                source_id = ?source_id,
                "Notifications disabled for conversation, skipping"
            );
            return Ok(DispatchOutcome::Skipped {
                target_user_id: target_user_id.to_string(),
                source_id: event.source_id.clone(),
            });
        }

        let destinations =
            DestinationResolver::resolve_destinations(self.store.as_ref(), target_user_id).await?;
        if destinations.is_empty() {
            tracing::info!(event_id = %event.id, target_user_id, "No FCM tokens registered");
            return Err(AppError::Validation("No FCM tokens found".to_string()));
        }

        let access_token = self
            .exchanger
            .exchange(&self.credential)
            .await
            .inspect_err(|e| {
                tracing::error!(event_id = %event.id, error = %e, "Could not obtain FCM access token");
            })?;

        let message = PushMessage::from_event(event);
        let summary = send_all(
            self.sender.as_ref(),
            &destinations,
            &access_token,
            &self.credential.project_id,
            &message,
        )
        .await;

        if !summary.is_success() {
            for report in summary.failures() {
                tracing::warn!(
                    event_id = %event.id,
                    token = %token_hint(&report.destination),
                    status = ?report.status,
                    error = ?report.error,
                    "Push delivery failed"
                );
            }
            tracing::error!(
                event_id = %event.id,
                target_user_id,
                failed = summary.failed(),
                total = summary.total(),
                "Some notifications failed"
            );
            return Err(AppError::Delivery {
                failed: summary.failed(),
                total: summary.total(),
            });
        }

        tracing::info!(
            event_id = %event.id,
            target_user_id,
            kind = %event.kind,
            token_count = summary.total(),
            "Notifications sent"
        );

        Ok(DispatchOutcome::Sent {
            target_user_id: target_user_id.to_string(),
            source_id: event.source_id.clone(),
            kind: event.kind.clone(),
            delivered: summary.total(),
        })
    }
}
