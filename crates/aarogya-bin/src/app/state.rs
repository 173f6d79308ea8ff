//! Component wiring.
//!
//! Every client is constructed here from `Config` and handed to the
//! components that need it; nothing reaches for a global.

use super::BoxError;
use aarogya_config_and_utils::{Config, Paths};
use aarogya_database::DoseEventStore;
use dose_sync_worker::{
    AccessTokenProvider, ConnectivityMonitor, ConnectivityProbe, DoseEventIngressClient,
    DoseSyncCoordinator, HttpConnectivityProbe, SessionTokens, StaticAccessToken,
    SupabaseTokenRefresher,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const ACCESS_TOKEN_ENV: &str = "AAROGYA_ACCESS_TOKEN";
const REFRESH_TOKEN_ENV: &str = "AAROGYA_REFRESH_TOKEN";
/// Rotated refresh token from the last successful refresh.
const REFRESH_TOKEN_SETTING: &str = "session_refresh_token";
/// The environment token the stored session was rotated from.
const REFRESH_TOKEN_SOURCE_SETTING: &str = "session_refresh_token_source";

/// Shared state for all commands.
pub struct AppState {
    pub config: Config,
    pub store: DoseEventStore,
    pub connectivity: ConnectivityMonitor,
    pub probe: Arc<HttpConnectivityProbe>,
    pub coordinator: Arc<DoseSyncCoordinator>,
    refresher: Option<Arc<SupabaseTokenRefresher>>,
    session_source: Option<String>,
}

impl AppState {
    pub async fn init(config: Config, paths: &Paths) -> Result<Self, BoxError> {
        let store = DoseEventStore::open(&paths.database_file()).await?;
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let remote = Arc::new(DoseEventIngressClient::new(
            config.dose_events_url(),
            config.supabase_publishable_key.clone(),
            timeout,
        )?);

        let session_source = std::env::var(REFRESH_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty());
        let refresher = build_refresher(&config, &store, session_source.clone(), timeout).await?;
        let credentials: Arc<dyn AccessTokenProvider> = match &refresher {
            Some(refresher) => refresher.clone(),
            None => Arc::new(StaticAccessToken::new(std::env::var(ACCESS_TOKEN_ENV).ok())),
        };

        // Offline until a probe says otherwise.
        let connectivity = ConnectivityMonitor::new(false);
        let probe = Arc::new(HttpConnectivityProbe::new(config.health_url(), timeout)?);

        let coordinator = Arc::new(DoseSyncCoordinator::new(
            store.clone(),
            remote,
            credentials,
            connectivity.handle(),
        ));

        debug!(
            database = %paths.database_file().display(),
            ingress = %config.dose_events_url(),
            "App state initialized"
        );

        Ok(Self {
            config,
            store,
            connectivity,
            probe,
            coordinator,
            refresher,
            session_source,
        })
    }

    /// Probe once and update the connectivity monitor.
    pub async fn refresh_connectivity(&self) -> bool {
        let online = self.probe.check().await;
        self.connectivity.set_online(online);
        online
    }

    /// Keep the rotated refresh token for the next run.
    pub async fn persist_session(&self) -> Result<(), BoxError> {
        let Some(refresher) = &self.refresher else {
            return Ok(());
        };
        if let Some(token) = refresher.tokens().await.refresh_token {
            self.store.set_setting(REFRESH_TOKEN_SETTING, &token).await?;
            if let Some(source) = &self.session_source {
                self.store.set_setting(REFRESH_TOKEN_SOURCE_SETTING, source).await?;
            }
        }
        Ok(())
    }
}

/// The refresh token to start from.
///
/// A rotated token is only reused while the environment still names the
/// session it was rotated from; a different environment token means a new
/// sign-in and wins.
async fn resolve_refresh_token(
    store: &DoseEventStore,
    from_env: Option<String>,
) -> Result<Option<String>, BoxError> {
    let stored = store.get_setting(REFRESH_TOKEN_SETTING).await?;
    let stored_source = store.get_setting(REFRESH_TOKEN_SOURCE_SETTING).await?;

    Ok(match (from_env, stored) {
        (Some(env), Some(rotated)) if stored_source.as_deref() == Some(env.as_str()) => Some(rotated),
        (Some(env), _) => Some(env),
        (None, stored) => stored,
    })
}

/// A refresher when a refresh token is available.
async fn build_refresher(
    config: &Config,
    store: &DoseEventStore,
    from_env: Option<String>,
    timeout: Duration,
) -> Result<Option<Arc<SupabaseTokenRefresher>>, BoxError> {
    let Some(refresh_token) = resolve_refresh_token(store, from_env).await? else {
        return Ok(None);
    };

    info!("Using refresh-token session");
    let tokens = SessionTokens {
        access_token: std::env::var(ACCESS_TOKEN_ENV).ok(),
        refresh_token: Some(refresh_token),
        expires_at: None,
    };
    Ok(Some(Arc::new(SupabaseTokenRefresher::new(
        config.auth_token_url(),
        config.supabase_publishable_key.clone(),
        tokens,
        timeout,
    )?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_session(rotated: &str, source: Option<&str>) -> DoseEventStore {
        let store = DoseEventStore::open_in_memory().await.unwrap();
        store.set_setting(REFRESH_TOKEN_SETTING, rotated).await.unwrap();
        if let Some(source) = source {
            store.set_setting(REFRESH_TOKEN_SOURCE_SETTING, source).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn rotated_token_is_reused_for_the_same_sign_in() {
        let store = store_with_session("rotated-1", Some("env-a")).await;
        let token = resolve_refresh_token(&store, Some("env-a".to_string())).await.unwrap();
        assert_eq!(token.as_deref(), Some("rotated-1"));
    }

    #[tokio::test]
    async fn new_environment_token_replaces_stale_session() {
        let store = store_with_session("rotated-1", Some("env-a")).await;
        let token = resolve_refresh_token(&store, Some("env-b".to_string())).await.unwrap();
        assert_eq!(token.as_deref(), Some("env-b"));

        // A session stored without its source cannot be matched either.
        let store = store_with_session("rotated-1", None).await;
        let token = resolve_refresh_token(&store, Some("env-b".to_string())).await.unwrap();
        assert_eq!(token.as_deref(), Some("env-b"));
    }

    #[tokio::test]
    async fn stored_session_is_used_without_environment_token() {
        let store = store_with_session("rotated-1", Some("env-a")).await;
        let token = resolve_refresh_token(&store, None).await.unwrap();
        assert_eq!(token.as_deref(), Some("rotated-1"));

        let empty = DoseEventStore::open_in_memory().await.unwrap();
        assert_eq!(resolve_refresh_token(&empty, None).await.unwrap(), None);
    }
}
