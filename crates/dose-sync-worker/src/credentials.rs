//! Access tokens for the remote ingress.
//!
//! The coordinator asks its [`AccessTokenProvider`] for a token at the start
//! of every sync pass, so an expired session is refreshed before any event
//! is attempted rather than failing each delivery with a 401.

use crate::{SyncError, SyncResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Refresh this long before the recorded expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Source of a bearer token for remote calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A token valid for the upcoming pass, or `None` when signed out.
    async fn access_token(&self) -> SyncResult<Option<String>>;
}

/// A fixed token (or none), for hosts that manage the session themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticAccessToken {
    token: Option<String>,
}

impl StaticAccessToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticAccessToken {
    async fn access_token(&self) -> SyncResult<Option<String>> {
        Ok(self.token.clone())
    }
}

/// Session tokens as last seen.
#[derive(Debug, Clone, Default)]
pub struct SessionTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionTokens {
    /// Whether a refresh should happen before using the access token.
    ///
    /// Without a refresh token there is nothing to do. With one, refresh when
    /// the access token is missing, its expiry is unknown, or it expires
    /// within the skew window.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.refresh_token.is_none() {
            return false;
        }
        match (&self.access_token, self.expires_at) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(_), Some(expires_at)) => {
                expires_at - ChronoDuration::seconds(EXPIRY_SKEW_SECS) <= now
            }
        }
    }
}

/// Response of the Supabase refresh-token grant.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
}

/// Refreshes a Supabase session through the auth refresh-token grant.
pub struct SupabaseTokenRefresher {
    http_client: reqwest::Client,
    token_url: String,
    anon_key: String,
    tokens: Mutex<SessionTokens>,
}

impl SupabaseTokenRefresher {
    /// # Arguments
    /// * `token_url` - `…/auth/v1/token?grant_type=refresh_token`
    /// * `anon_key` - Supabase publishable key
    /// * `tokens` - Initial session tokens
    /// * `timeout` - Per-request timeout
    pub fn new(
        token_url: impl Into<String>,
        anon_key: impl Into<String>,
        tokens: SessionTokens,
        timeout: Duration,
    ) -> SyncResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            token_url: token_url.into(),
            anon_key: anon_key.into(),
            tokens: Mutex::new(tokens),
        })
    }

    /// Current tokens, e.g. for persisting the rotated refresh token.
    pub async fn tokens(&self) -> SessionTokens {
        self.tokens.lock().await.clone()
    }

    async fn refresh(&self, refresh_token: &str) -> SyncResult<SessionTokens> {
        let response = self
            .http_client
            .post(&self.token_url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Auth(format!("token refresh rejected: HTTP {status}")));
        }

        let body: RefreshResponse = response.json().await?;
        let expires_at = match (body.expires_at, body.expires_in) {
            (Some(ts), _) => DateTime::<Utc>::from_timestamp(ts, 0),
            (None, Some(secs)) => Some(Utc::now() + ChronoDuration::seconds(secs)),
            (None, None) => None,
        };

        Ok(SessionTokens {
            access_token: Some(body.access_token),
            refresh_token: Some(body.refresh_token),
            expires_at,
        })
    }
}

#[async_trait]
impl AccessTokenProvider for SupabaseTokenRefresher {
    async fn access_token(&self) -> SyncResult<Option<String>> {
        // Held across the refresh so concurrent callers don't spend the same
        // single-use refresh token twice.
        let mut tokens = self.tokens.lock().await;

        if !tokens.needs_refresh(Utc::now()) {
            debug!("Access token still valid");
            return Ok(tokens.access_token.clone());
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            return Ok(tokens.access_token.clone());
        };

        match self.refresh(&refresh_token).await {
            Ok(fresh) => {
                info!(expires_at = ?fresh.expires_at, "Access token refreshed");
                *tokens = fresh;
                Ok(tokens.access_token.clone())
            }
            Err(err) => {
                warn!(error = %err, "Access token refresh failed");
                Err(err)
            }
        }
    }
}
