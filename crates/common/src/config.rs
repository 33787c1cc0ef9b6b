use std::str::FromStr;

use serde::Deserialize;

/// Default OAuth2 token endpoint for Google service accounts.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Default Firebase Cloud Messaging API base URL.
pub const DEFAULT_FCM_BASE_URL: &str = "https://fcm.googleapis.com";

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Socket address the webhook server binds to
    pub bind_addr: String,

    /// PostgreSQL connection string (direct store access)
    pub database_url: Option<String>,

    /// Supabase project URL (PostgREST store access)
    pub supabase_url: Option<String>,

    /// Supabase service-role key used for PostgREST requests
    pub supabase_service_role_key: Option<String>,

    /// Maximum number of PostgreSQL connections in the pool (default: 5)
    pub db_max_connections: u32,

    /// Path to a Google service-account JSON file
    pub fcm_service_account_path: Option<String>,

    /// Inline service-account email (used when no file path is set)
    pub fcm_client_email: Option<String>,

    /// Inline service-account private key, PEM, may contain literal `\n`
    pub fcm_private_key: Option<String>,

    /// Inline Firebase project id
    pub fcm_project_id: Option<String>,

    /// OAuth2 token endpoint
    pub fcm_token_uri: String,

    /// FCM API base URL
    pub fcm_base_url: String,

    /// Reuse access tokens across invocations until shortly before expiry
    pub fcm_cache_access_token: bool,

    /// Android small icon resource name
    pub push_android_icon: String,

    /// Android notification accent color (#RRGGBB)
    pub push_android_color: String,

    /// Android notification channel id
    pub push_android_channel_id: Option<String>,

    /// Outbound HTTP connect timeout in seconds
    pub http_connect_timeout_secs: u64,

    /// Outbound HTTP request timeout in seconds
    pub http_request_timeout_secs: u64,

    /// HS256 secret the webhook caller signs its bearer JWT with
    pub webhook_jwt_secret: Option<String>,
}

/// Which backend answers preference and destination lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Rest { base_url: String, service_key: String },
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            bind_addr: std::env::var("HERALD_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_url: non_empty_var("DATABASE_URL"),
            supabase_url: non_empty_var("SUPABASE_URL"),
            supabase_service_role_key: non_empty_var("SUPABASE_SERVICE_ROLE_KEY"),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            fcm_service_account_path: non_empty_var("FCM_SERVICE_ACCOUNT_PATH"),
            fcm_client_email: non_empty_var("FCM_CLIENT_EMAIL"),
            fcm_private_key: non_empty_var("FCM_PRIVATE_KEY"),
            fcm_project_id: non_empty_var("FCM_PROJECT_ID"),
            fcm_token_uri: std::env::var("FCM_TOKEN_URI")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URI.to_string()),
            fcm_base_url: std::env::var("FCM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_FCM_BASE_URL.to_string()),
            fcm_cache_access_token: parse_var("FCM_CACHE_ACCESS_TOKEN", false)?,
            push_android_icon: std::env::var("PUSH_ANDROID_ICON")
                .unwrap_or_else(|_| "ic_notification".to_string()),
            push_android_color: std::env::var("PUSH_ANDROID_COLOR")
                .unwrap_or_else(|_| "#1E88E5".to_string()),
            push_android_channel_id: non_empty_var("PUSH_ANDROID_CHANNEL_ID"),
            http_connect_timeout_secs: parse_var("HTTP_CONNECT_TIMEOUT_SECS", 10)?,
            http_request_timeout_secs: parse_var("HTTP_REQUEST_TIMEOUT_SECS", 30)?,
            webhook_jwt_secret: non_empty_var("WEBHOOK_JWT_SECRET"),
        })
    }

    /// Resolve the store backend. `DATABASE_URL` wins over the Supabase pair.
    pub fn store_backend(&self) -> anyhow::Result<StoreBackend> {
        if let Some(url) = &self.database_url {
            return Ok(StoreBackend::Postgres {
                database_url: url.clone(),
            });
        }

        match (&self.supabase_url, &self.supabase_service_role_key) {
            (Some(base_url), Some(service_key)) => Ok(StoreBackend::Rest {
                base_url: base_url.trim_end_matches('/').to_string(),
                service_key: service_key.clone(),
            }),
            _ => Err(anyhow::anyhow!(
                "Either DATABASE_URL or SUPABASE_URL + SUPABASE_SERVICE_ROLE_KEY must be set"
            )),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            anyhow::anyhow!(
                "{} must be a valid {}",
                key,
                std::any::type_name::<T>()
            )
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: None,
        supabase_url: None,
        supabase_service_role_key: None,
        db_max_connections: 5,
        fcm_service_account_path: None,
        fcm_client_email: None,
        fcm_private_key: None,
        fcm_project_id: None,
        fcm_token_uri: DEFAULT_TOKEN_URI.to_string(),
        fcm_base_url: DEFAULT_FCM_BASE_URL.to_string(),
        fcm_cache_access_token: false,
        push_android_icon: "ic_notification".to_string(),
        push_android_color: "#1E88E5".to_string(),
        push_android_channel_id: None,
        http_connect_timeout_secs: 10,
        http_request_timeout_secs: 30,
        webhook_jwt_secret: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_wins() {
        let mut config = test_config();
        config.database_url = Some("postgres://localhost/herald".to_string());
        config.supabase_url = Some("https://x.supabase.co".to_string());
        config.supabase_service_role_key = Some("key".to_string());

        assert_eq!(
            config.store_backend().unwrap(),
            StoreBackend::Postgres {
                database_url: "postgres://localhost/herald".to_string()
            }
        );
    }

    #[test]
    fn test_rest_backend_trims_trailing_slash() {
        let mut config = test_config();
        config.supabase_url = Some("https://x.supabase.co/".to_string());
        config.supabase_service_role_key = Some("key".to_string());

        assert_eq!(
            config.store_backend().unwrap(),
            StoreBackend::Rest {
                base_url: "https://x.supabase.co".to_string(),
                service_key: "key".to_string()
            }
        );
    }

    #[test]
    fn test_missing_backend_rejected() {
        let mut config = test_config();
        config.supabase_url = Some("https://x.supabase.co".to_string());
        assert!(config.store_backend().is_err());
    }
}
