//! Read-only access to the tables the pipeline consults.
//!
//! Two backends: direct PostgreSQL through sqlx, or the Supabase PostgREST API.

pub mod postgres;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;

use herald_common::config::{AppConfig, StoreBackend};
use herald_common::db::connect_store_pool;
use herald_common::error::AppError;
use herald_common::types::{DeliveryPreference, UserDestinations};

pub use postgres::PostgresStore;
pub use rest::RestStore;

/// Lookups for delivery preferences and push destinations.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Preference row for (conversation, user), `None` when absent.
    async fn delivery_preference(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<DeliveryPreference>, AppError>;

    /// Push-token column of the user row, `None` when the user is absent.
    async fn user_destinations(&self, user_id: &str) -> Result<Option<UserDestinations>, AppError>;
}

/// Connect the backend selected by configuration.
pub async fn connect(
    config: &AppConfig,
    http: reqwest::Client,
) -> anyhow::Result<Arc<dyn NotificationStore>> {
    match config.store_backend()? {
        StoreBackend::Postgres { database_url } => {
            let pool = connect_store_pool(&database_url, config).await?;
            Ok(Arc::new(PostgresStore::new(pool)))
        }
        StoreBackend::Rest {
            base_url,
            service_key,
        } => {
            tracing::info!(base_url = %base_url, "Using PostgREST store");
            Ok(Arc::new(RestStore::new(http, base_url, service_key)))
        }
    }
}
