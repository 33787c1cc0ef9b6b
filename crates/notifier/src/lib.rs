//! Push delivery through Firebase Cloud Messaging.
//!
//! - `credential`: service-account loading and OAuth2 token exchange
//! - `fcm`: message payloads and the per-token HTTP sender
//! - `fanout`: concurrent delivery to every destination of one recipient

pub mod credential;
pub mod fanout;
pub mod fcm;

use std::time::Duration;

use herald_common::config::AppConfig;
use herald_common::error::AppError;

/// Build the shared outbound HTTP client.
///
/// Pipeline steps impose no timeouts of their own; the client's timeouts apply.
pub fn build_http_client(config: &AppConfig) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.http_connect_timeout_secs))
        .timeout(Duration::from_secs(config.http_request_timeout_secs))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Shorten a push token for log output.
pub fn token_hint(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    if prefix.len() < token.len() {
        format!("{}…", prefix)
    } else {
        prefix
    }
}
