use serde::{Deserialize, Serialize};

/// Classification of a notification record.
///
/// Conversation-scoped kinds are gated by the recipient's per-conversation
/// preference; everything else is delivered unconditionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Message,
    Typing,
    Call,
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::Message => "message",
            NotificationKind::Typing => "typing",
            NotificationKind::Call => "call",
            NotificationKind::Other(raw) => raw,
        }
    }

    /// Whether delivery depends on a per-conversation preference.
    pub fn is_conversation_scoped(&self) -> bool {
        match self {
            NotificationKind::Message | NotificationKind::Typing | NotificationKind::Call => true,
            NotificationKind::Other(_) => false,
        }
    }
}

impl From<String> for NotificationKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "message" => NotificationKind::Message,
            "typing" => NotificationKind::Typing,
            "call" => NotificationKind::Call,
            _ => NotificationKind::Other(raw),
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(raw: &str) -> Self {
        NotificationKind::from(raw.to_string())
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A freshly inserted notification row, as delivered by the database webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: String,
    pub target_user_id: Option<String>,
    #[serde(default)]
    pub sender_user_id: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sender_photo: Option<String>,
    #[serde(default)]
    pub user_username: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl NotificationEvent {
    /// Display title: the record's title, falling back to its type.
    pub fn display_title(&self) -> String {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.kind.to_string())
    }

    pub fn display_body(&self) -> String {
        self.content.clone().unwrap_or_default()
    }
}

/// Row-change operation reported by the database webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookEventType {
    Insert,
    Update,
    Delete,
}

/// Database webhook envelope wrapping one notification row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "type")]
    pub event_type: WebhookEventType,
    pub table: String,
    pub schema: String,
    pub record: NotificationEvent,
    #[serde(default)]
    pub old_record: Option<serde_json::Value>,
}

/// A recipient's delivery preference for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryPreference {
    pub notifications_enabled: bool,
}

/// The push-token column of a user row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserDestinations {
    pub fcm_token: Option<Vec<String>>,
}

/// Terminal, non-error outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The recipient disabled notifications for the originating conversation.
    Skipped {
        target_user_id: String,
        source_id: Option<String>,
    },
    /// Every destination accepted the message.
    Sent {
        target_user_id: String,
        source_id: Option<String>,
        kind: NotificationKind,
        delivered: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_scoped_kinds() {
        assert!(NotificationKind::from("message").is_conversation_scoped());
        assert!(NotificationKind::from("typing").is_conversation_scoped());
        assert!(NotificationKind::from("call").is_conversation_scoped());
        assert!(!NotificationKind::from("follow").is_conversation_scoped());
        // Matching is exact
        assert!(!NotificationKind::from("Message").is_conversation_scoped());
    }

    #[test]
    fn test_unknown_kind_keeps_raw_string() {
        let kind = NotificationKind::from("trip_invite");
        assert_eq!(kind, NotificationKind::Other("trip_invite".to_string()));
        assert_eq!(kind.to_string(), "trip_invite");
        assert_eq!(
            serde_json::to_value(&kind).unwrap(),
            serde_json::json!("trip_invite")
        );
    }

    #[test]
    fn test_webhook_payload_deserializes() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "type": "INSERT",
            "table": "notifications",
            "schema": "public",
            "record": {
                "id": "5b3c6c1e-0000-4000-8000-000000000001",
                "target_user_id": "user-1",
                "sender_user_id": null,
                "source_id": "conv-9",
                "type": "message",
                "content": "hello",
                "created_at": "2024-05-01T10:00:00+00:00",
                "is_read": false,
                "sender_photo": null,
                "user_username": "ana"
            },
            "old_record": null
        }))
        .unwrap();

        assert_eq!(payload.event_type, WebhookEventType::Insert);
        assert_eq!(payload.record.kind, NotificationKind::Message);
        assert_eq!(payload.record.target_user_id.as_deref(), Some("user-1"));
        assert!(payload.old_record.is_none());
    }

    #[test]
    fn test_display_title_falls_back_to_type() {
        let event: NotificationEvent = serde_json::from_value(serde_json::json!({
            "id": "n1",
            "target_user_id": "u1",
            "type": "follow",
            "title": "  ",
            "content": null
        }))
        .unwrap();

        assert_eq!(event.display_title(), "follow");
        assert_eq!(event.display_body(), "");
    }
}
