//! Service-account credentials and the OAuth2 JWT-bearer token exchange.
//!
//! A long-lived service identity (email + RSA private key) is traded for a
//! short-lived bearer token scoped to Firebase Cloud Messaging. By default every
//! dispatch performs its own exchange; `CachedTokenExchanger` is the opt-in
//! process-wide cache.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use herald_common::config::{AppConfig, DEFAULT_TOKEN_URI};
use herald_common::error::AppError;

/// OAuth2 scope granting access to the FCM send API.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion (Google caps it at one hour).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Static service identity used to obtain access tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceCredential {
    pub client_email: String,
    pub private_key: String,
    pub project_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceCredential {
    /// Parse a Google service-account JSON document.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("Invalid service account JSON: {}", e)))
    }

    /// Read a Google service-account JSON file.
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read service account file {}: {}", path, e))
        })?;
        Self::from_json(&raw)
    }

    /// Load the credential from configuration. A service-account file takes
    /// precedence over the inline `FCM_*` variables.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let mut credential = if let Some(path) = &config.fcm_service_account_path {
            Self::from_file(path)?
        } else {
            match (
                &config.fcm_client_email,
                &config.fcm_private_key,
                &config.fcm_project_id,
            ) {
                (Some(client_email), Some(private_key), Some(project_id)) => Self {
                    client_email: client_email.clone(),
                    private_key: private_key.clone(),
                    project_id: project_id.clone(),
                    token_uri: config.fcm_token_uri.clone(),
                },
                _ => {
                    return Err(AppError::Config(
                        "Set FCM_SERVICE_ACCOUNT_PATH or FCM_CLIENT_EMAIL, FCM_PRIVATE_KEY and FCM_PROJECT_ID"
                            .to_string(),
                    ));
                }
            }
        };

        // An explicit override beats whatever the file says.
        if config.fcm_token_uri != DEFAULT_TOKEN_URI {
            credential.token_uri = config.fcm_token_uri.clone();
        }

        Ok(credential)
    }
}

/// Replace literal `\n` escape sequences with real newlines.
///
/// Keys passed through environment variables usually arrive with the PEM line
/// breaks escaped; the PEM parser needs them restored.
pub fn normalize_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

/// Short-lived bearer token for the FCM API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// True when the token is still valid `margin` from now.
    pub fn is_fresh(&self, margin: Duration) -> bool {
        self.expires_at - margin > Utc::now()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Exchanges a service credential for an access token.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, credential: &ServiceCredential) -> Result<AccessToken, AppError>;
}

/// Claims of the signed JWT assertion sent to the token endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// Sign the RS256 assertion for `credential`.
pub fn sign_assertion(credential: &ServiceCredential, now: DateTime<Utc>) -> Result<String, AppError> {
    let pem = normalize_private_key(&credential.private_key);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| AppError::Credential(format!("Invalid private key: {}", e)))?;

    let claims = AssertionClaims {
        iss: credential.client_email.clone(),
        scope: FCM_SCOPE.to_string(),
        aud: credential.token_uri.clone(),
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
    };

    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| AppError::Credential(format!("Failed to sign assertion: {}", e)))
}

/// Performs the JWT-bearer grant against the credential's token endpoint.
///
/// One HTTP exchange per call, no retries.
pub struct OAuthTokenExchanger {
    client: reqwest::Client,
}

impl OAuthTokenExchanger {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenExchanger for OAuthTokenExchanger {
    async fn exchange(&self, credential: &ServiceCredential) -> Result<AccessToken, AppError> {
        let now = Utc::now();
        let assertion = sign_assertion(credential, now)?;

        let response = self
            .client
            .post(&credential.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Credential(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "Token endpoint rejected assertion");
            return Err(AppError::Credential(format!(
                "Token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Credential(format!("Malformed token response: {}", e)))?;

        if token.access_token.is_empty() {
            return Err(AppError::Credential(
                "Token endpoint returned an empty access token".to_string(),
            ));
        }

        tracing::debug!(
            client_email = %credential.client_email,
            expires_in = token.expires_in,
            "Obtained FCM access token"
        );

        Ok(AccessToken::new(
            token.access_token,
            now + Duration::seconds(token.expires_in),
        ))
    }
}

/// Process-wide token cache with expiry-aware refresh.
///
/// Concurrent callers serialize on one async mutex, so an expired token is
/// refreshed by exactly one exchange while the others wait for its result.
pub struct CachedTokenExchanger<E> {
    inner: E,
    refresh_margin: Duration,
    cached: Mutex<Option<(String, AccessToken)>>,
}

impl<E: TokenExchanger> CachedTokenExchanger<E> {
    pub fn new(inner: E) -> Self {
        Self::with_refresh_margin(inner, Duration::seconds(60))
    }

    pub fn with_refresh_margin(inner: E, refresh_margin: Duration) -> Self {
        Self {
            inner,
            refresh_margin,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<E: TokenExchanger> TokenExchanger for CachedTokenExchanger<E> {
    async fn exchange(&self, credential: &ServiceCredential) -> Result<AccessToken, AppError> {
        let mut cached = self.cached.lock().await;

        if let Some((owner, token)) = cached.as_ref()
            && owner == &credential.client_email
            && token.is_fresh(self.refresh_margin)
        {
            return Ok(token.clone());
        }

        let token = self.inner.exchange(credential).await?;
        *cached = Some((credential.client_email.clone(), token.clone()));
        Ok(token)
    }
}
