use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{DeliveryPreference, UserDestinations};

use super::NotificationStore;

/// Store backed by a direct PostgreSQL connection pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn delivery_preference(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<DeliveryPreference>, AppError> {
        // A non-uuid id cannot match any row.
        let (Some(conversation_id), Some(user_id)) = (parse_id(conversation_id), parse_id(user_id))
        else {
            return Ok(None);
        };

        let preference: Option<DeliveryPreference> = sqlx::query_as(
            r#"
            SELECT notifications_enabled
            FROM conversation_participants
            WHERE conversation_id = $1
              AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(preference)
    }

    async fn user_destinations(&self, user_id: &str) -> Result<Option<UserDestinations>, AppError> {
        let Some(user_id) = parse_id(user_id) else {
            return Ok(None);
        };

        let destinations: Option<UserDestinations> =
            sqlx::query_as("SELECT fcm_token FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(destinations)
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    let id = Uuid::parse_str(raw.trim()).ok();
    if id.is_none() {
        tracing::debug!(id = raw, "Not a uuid, no row can match");
    }
    id
}
