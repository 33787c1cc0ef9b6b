use async_trait::async_trait;
use serde::de::DeserializeOwned;

use herald_common::error::AppError;
use herald_common::types::{DeliveryPreference, UserDestinations};

use super::NotificationStore;

/// Store backed by the Supabase PostgREST API, authenticated with the
/// service-role key.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl RestStore {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        }
    }

    /// GET `/rest/v1/{table}` and return the first matching row.
    async fn first_row<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, AppError> {
        let rows: Vec<T> = self
            .client
            .get(format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .query(query)
            .query(&[("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl NotificationStore for RestStore {
    async fn delivery_preference(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<DeliveryPreference>, AppError> {
        self.first_row(
            "conversation_participants",
            &[
                ("select", "notifications_enabled".to_string()),
                ("conversation_id", format!("eq.{}", conversation_id)),
                ("user_id", format!("eq.{}", user_id)),
            ],
        )
        .await
    }

    async fn user_destinations(&self, user_id: &str) -> Result<Option<UserDestinations>, AppError> {
        self.first_row(
            "users",
            &[
                ("select", "fcm_token".to_string()),
                ("id", format!("eq.{}", user_id)),
            ],
        )
        .await
    }
}
