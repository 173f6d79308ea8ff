//! Remote dose-event ingress.
//!
//! One authenticated POST per dose event to the BaaS edge function. The
//! event id travels as an idempotency key so the ingress can upsert instead
//! of double-inserting when a delivery is retried.

use crate::{SyncError, SyncResult};
use aarogya_database::DoseEvent;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tracing::debug;

/// Delivers a single dose event to the remote store.
#[async_trait]
pub trait DoseEventRemote: Send + Sync {
    /// Returns `Ok(())` only when the remote acknowledged with a 2xx status.
    async fn push_dose_event(&self, event: &DoseEvent, access_token: &str) -> SyncResult<()>;
}

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// HTTP client for the dose-event edge function.
#[derive(Clone)]
pub struct DoseEventIngressClient {
    http_client: reqwest::Client,
    endpoint_url: String,
    anon_key: String,
}

impl DoseEventIngressClient {
    /// Create a client.
    ///
    /// # Arguments
    /// * `endpoint_url` - Full ingress URL (`…/functions/v1/<route>`)
    /// * `anon_key` - Supabase publishable key sent as `apikey`
    /// * `timeout` - Per-request timeout
    pub fn new(
        endpoint_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> SyncResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            endpoint_url: endpoint_url.into(),
            anon_key: anon_key.into(),
        })
    }
}

#[async_trait]
impl DoseEventRemote for DoseEventIngressClient {
    async fn push_dose_event(&self, event: &DoseEvent, access_token: &str) -> SyncResult<()> {
        debug!(event_id = %event.id, url = %self.endpoint_url, "Posting dose event");

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Idempotency-Key", &event.id)
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                message: summarize_response_body(&body),
            });
        }

        Ok(())
    }
}
