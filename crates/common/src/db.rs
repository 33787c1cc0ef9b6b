//! Connection pool for the direct PostgreSQL store.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;

/// Idle connections beyond the warm one are closed after this long.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Pool options for lookups made inside a webhook request.
///
/// Waiting for a connection counts against the caller's request, so the wait
/// is bounded by the outbound connect timeout. One connection stays open
/// between webhook bursts.
pub fn pool_options(config: &AppConfig) -> PgPoolOptions {
    let max_connections = config.db_max_connections.max(1);
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(config.http_connect_timeout_secs))
        .idle_timeout(IDLE_TIMEOUT)
}

/// Connect the store pool. Fails at startup when the database is unreachable.
pub async fn connect_store_pool(database_url: &str, config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = pool_options(config).connect(database_url).await?;

    tracing::info!(
        max_connections = config.db_max_connections.max(1),
        acquire_timeout_secs = config.http_connect_timeout_secs,
        "Store pool connected"
    );
    Ok(pool)
}
