//! FCM HTTP v1 message payloads and the per-token sender.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use herald_common::config::AppConfig;
use herald_common::types::NotificationEvent;

use crate::credential::AccessToken;
use crate::token_hint;

/// Content of one push notification, independent of the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub kind: String,
    pub source_id: Option<String>,
}

impl PushMessage {
    pub fn from_event(event: &NotificationEvent) -> Self {
        Self {
            title: event.display_title(),
            body: event.display_body(),
            image: event
                .sender_photo
                .clone()
                .filter(|url| !url.trim().is_empty()),
            kind: event.kind.to_string(),
            source_id: event.source_id.clone(),
        }
    }
}

/// Per-deployment platform delivery hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryHints {
    pub android_icon: String,
    pub android_color: String,
    pub android_channel_id: Option<String>,
}

impl DeliveryHints {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            android_icon: config.push_android_icon.clone(),
            android_color: config.push_android_color.clone(),
            android_channel_id: config.push_android_channel_id.clone(),
        }
    }
}

impl Default for DeliveryHints {
    fn default() -> Self {
        Self {
            android_icon: "ic_notification".to_string(),
            android_color: "#1E88E5".to_string(),
            android_channel_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendRequest {
    pub message: FcmMessage,
}

#[derive(Debug, Serialize)]
pub struct FcmMessage {
    pub token: String,
    pub notification: FcmNotification,
    pub android: AndroidConfig,
    pub apns: ApnsConfig,
    /// FCM requires every data value to be a string.
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AndroidConfig {
    pub priority: &'static str,
    pub notification: AndroidNotification,
}

#[derive(Debug, Serialize)]
pub struct AndroidNotification {
    pub icon: String,
    pub color: String,
    pub sound: &'static str,
    pub default_sound: bool,
    pub default_vibrate_timings: bool,
    pub visibility: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApnsConfig {
    pub headers: BTreeMap<&'static str, &'static str>,
    pub payload: serde_json::Value,
}

/// Build the send request for one destination token.
pub fn build_request(destination: &str, message: &PushMessage, hints: &DeliveryHints) -> SendRequest {
    let mut data = BTreeMap::new();
    data.insert("type".to_string(), message.kind.clone());
    data.insert(
        "sourceId".to_string(),
        message.source_id.clone().unwrap_or_default(),
    );

    SendRequest {
        message: FcmMessage {
            token: destination.to_string(),
            notification: FcmNotification {
                title: message.title.clone(),
                body: message.body.clone(),
                image: message.image.clone(),
            },
            android: AndroidConfig {
                priority: "high",
                notification: AndroidNotification {
                    icon: hints.android_icon.clone(),
                    color: hints.android_color.clone(),
                    sound: "default",
                    default_sound: true,
                    default_vibrate_timings: true,
                    visibility: "public",
                    channel_id: hints.android_channel_id.clone(),
                },
            },
            apns: ApnsConfig {
                headers: BTreeMap::from([("apns-priority", "10")]),
                payload: serde_json::json!({ "aps": { "sound": "default" } }),
            },
            data,
        },
    }
}

/// Result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub destination: String,
    /// HTTP status, absent when no response arrived.
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl DeliveryReport {
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(code) if (200..300).contains(&code))
    }
}

/// Sends one message to one destination.
///
/// Implementations never fail the call; failures are recorded in the report.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        destination: &str,
        access_token: &AccessToken,
        project_id: &str,
        message: &PushMessage,
    ) -> DeliveryReport;
}

/// Sender backed by the FCM HTTP v1 API.
pub struct FcmSender {
    client: reqwest::Client,
    base_url: String,
    hints: DeliveryHints,
}

impl FcmSender {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, hints: DeliveryHints) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            hints,
        }
    }

    fn send_url(&self, project_id: &str) -> String {
        format!("{}/v1/projects/{}/messages:send", self.base_url, project_id)
    }
}

#[async_trait]
impl PushSender for FcmSender {
    async fn send(
        &self,
        destination: &str,
        access_token: &AccessToken,
        project_id: &str,
        message: &PushMessage,
    ) -> DeliveryReport {
        let request = build_request(destination, message, &self.hints);

        let result = self
            .client
            .post(self.send_url(project_id))
            .bearer_auth(&access_token.token)
            .json(&request)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    tracing::debug!(token = %token_hint(destination), "Push delivered");
                    DeliveryReport {
                        destination: destination.to_string(),
                        status: Some(status.as_u16()),
                        error: None,
                    }
                } else {
                    let body = response.text().await.unwrap_or_default();
                    tracing::warn!(
                        token = %token_hint(destination),
                        %status,
                        body = %body,
                        "FCM rejected push"
                    );
                    DeliveryReport {
                        destination: destination.to_string(),
                        status: Some(status.as_u16()),
                        error: Some(format!("HTTP {}: {}", status, body)),
                    }
                }
            }
            Err(e) => {
                tracing::error!(token = %token_hint(destination), error = %e, "FCM request failed");
                DeliveryReport {
                    destination: destination.to_string(),
                    status: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
