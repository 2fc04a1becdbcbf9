//! Google service account authentication
//!
//! Mints OAuth access tokens with the JWT-bearer grant and caches them until
//! shortly before they expire.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{Error, Result};

/// Read-only calendar scope
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Seconds before expiry at which a cached token is replaced
const REFRESH_MARGIN_SECS: i64 = 300;

/// Lifetime requested for each signed assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Source of bearer tokens for API calls
#[async_trait]
pub trait AccessToken: Send + Sync {
    /// Return a currently valid access token
    ///
    /// # Errors
    ///
    /// Returns error if a token cannot be obtained
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token, for local testing or pre-minted credentials
pub struct StaticToken(SecretString);

impl StaticToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }
}

#[async_trait]
impl AccessToken for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.expose_secret().to_string())
    }
}

/// Service account JSON key
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    private_key: SecretString,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    /// Load a service account key file
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or not a service account key
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Auth(format!(
                "failed to read service account {}: {e}",
                path.display()
            ))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Auth(format!("failed to parse service account: {e}")))
    }
}

/// JWT claims for the token exchange
#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

/// Token response from the OAuth endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Cached token
struct TokenInfo {
    access_token: String,
    expires_at: i64,
}

/// Service account token source with caching
pub struct ServiceAccountAuth {
    account: ServiceAccount,
    client: reqwest::Client,
    token_url: String,
    scope: String,
    cached: Mutex<Option<TokenInfo>>,
}

impl ServiceAccountAuth {
    /// Create a token source for `scope`
    #[must_use]
    pub fn new(account: ServiceAccount, token_url: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            account,
            client: reqwest::Client::new(),
            token_url: token_url.into(),
            scope: scope.into(),
            cached: Mutex::new(None),
        }
    }

    /// Sign the JWT assertion
    fn create_jwt(&self, now: i64) -> Result<String> {
        use jsonwebtoken::{Algorithm, EncodingKey, Header};

        let claims = JwtClaims {
            iss: &self.account.client_email,
            scope: &self.scope,
            aud: &self.token_url,
            exp: now + ASSERTION_LIFETIME_SECS,
            iat: now,
        };

        let key = EncodingKey::from_rsa_pem(self.account.private_key.expose_secret().as_bytes())
            .map_err(|e| Error::Auth(format!("invalid private key: {e}")))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| Error::Auth(format!("JWT encoding failed: {e}")))
    }
}

#[async_trait]
impl AccessToken for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached
            .as_ref()
            .filter(|t| t.expires_at > now + REFRESH_MARGIN_SECS)
        {
            return Ok(token.access_token.clone());
        }

        let jwt = self.create_jwt(now)?;

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("token request failed: {status} - {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("token parse error: {e}")))?;

        tracing::debug!(
            client_email = %self.account.client_email,
            expires_in = token.expires_in,
            "minted calendar access token"
        );

        *cached = Some(TokenInfo {
            access_token: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });

        Ok(token.access_token)
    }
}
