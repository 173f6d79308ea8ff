//! Connectivity monitor.
//!
//! Holds the current online/offline state as a watch channel. The host feeds
//! it (from a platform signal or the [`HttpConnectivityProbe`]); the sync
//! worker subscribes and runs a pass on every transition into online.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Owner of the connectivity state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    sender: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Report the latest host signal.
    ///
    /// Returns true only on an offline → online transition. Repeated reports
    /// of the same state do not notify subscribers.
    pub fn set_online(&self, online: bool) -> bool {
        let mut came_online = false;
        self.sender.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            came_online = online;
            *current = online;
            true
        });
        if came_online {
            info!("Connectivity restored");
        } else {
            debug!(online, "Connectivity report");
        }
        came_online
    }

    /// Current connectivity, for UI banners.
    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Read-only handle for components that only query.
    pub fn handle(&self) -> ConnectivityHandle {
        ConnectivityHandle {
            receiver: self.sender.subscribe(),
        }
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// Read side of the connectivity state.
#[derive(Clone)]
pub struct ConnectivityHandle {
    receiver: watch::Receiver<bool>,
}

impl ConnectivityHandle {
    pub fn is_online(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Active check for hosts without a push-style online signal.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn check(&self) -> bool;
}

/// Probe that treats any HTTP response from the health route as online.
pub struct HttpConnectivityProbe {
    http_client: reqwest::Client,
    url: String,
}

impl HttpConnectivityProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> crate::SyncResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::SyncError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn check(&self) -> bool {
        // Any status proves the network path works; only transport errors
        // count as offline.
        match self.http_client.get(&self.url).send().await {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, "Connectivity probe failed");
                false
            }
        }
    }
}

/// Poll `probe` every `interval` and feed the result into `monitor`.
///
/// Stops when `shutdown` flips to true or its sender is dropped.
pub fn spawn_probe_loop(
    monitor: ConnectivityMonitor,
    probe: Arc<dyn ConnectivityProbe>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let online = probe.check().await;
                    monitor.set_online(online);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("Connectivity probe loop stopped");
    })
}
