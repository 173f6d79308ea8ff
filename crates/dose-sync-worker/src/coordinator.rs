//! Sync coordinator.
//!
//! One sync pass delivers every currently-unsynced dose event to the remote
//! ingress, sequentially, and flips each acknowledged event to synced. A
//! failed delivery leaves its record untouched, so a pass can be re-run at
//! any time; the per-event state only ever moves `unsynced → synced`.

use crate::{AccessTokenProvider, ConnectivityHandle, DoseEventRemote};
use aarogya_database::{DatabaseResult, DoseEvent, DoseEventStore};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

/// Coarse sync state for UI indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Error,
}

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum PassOutcome {
    /// Every unsynced event was attempted.
    Completed,
    /// Connectivity dropped mid-pass; remaining events were not attempted.
    Interrupted,
    /// Device offline at the start; nothing read or sent.
    SkippedOffline,
    /// No signed-in session.
    SkippedNoCredentials,
    /// Another pass was already running.
    SkippedAlreadyRunning,
    /// Credentials or the local store failed before any delivery.
    Aborted(String),
}

/// Per-pass counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPassReport {
    pub outcome: PassOutcome,
    /// Delivery attempts made.
    pub attempted: usize,
    /// Events flipped to synced.
    pub synced: usize,
    /// Acknowledged, but rewritten locally while in flight; left unsynced.
    pub superseded: usize,
    /// Deliveries that failed (remote, network, or local flag write).
    pub failed: usize,
}

impl SyncPassReport {
    fn new(outcome: PassOutcome) -> Self {
        Self {
            outcome,
            attempted: 0,
            synced: 0,
            superseded: 0,
            failed: 0,
        }
    }

    /// Fold a follow-up round into this report; the latest outcome wins.
    fn absorb(&mut self, next: SyncPassReport) {
        self.outcome = next.outcome;
        self.attempted += next.attempted;
        self.synced += next.synced;
        self.superseded += next.superseded;
        self.failed += next.failed;
    }
}

/// Delivers unsynced dose events and reconciles local sync flags.
pub struct DoseSyncCoordinator {
    store: DoseEventStore,
    remote: Arc<dyn DoseEventRemote>,
    credentials: Arc<dyn AccessTokenProvider>,
    connectivity: ConnectivityHandle,
    status: watch::Sender<SyncStatus>,
    /// Serializes passes; a pass requested while one runs is skipped.
    pass_guard: Mutex<()>,
    /// Set by a skipped caller; the running pass re-reads the queue.
    rerun_requested: AtomicBool,
}

impl DoseSyncCoordinator {
    pub fn new(
        store: DoseEventStore,
        remote: Arc<dyn DoseEventRemote>,
        credentials: Arc<dyn AccessTokenProvider>,
        connectivity: ConnectivityHandle,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            store,
            remote,
            credentials,
            connectivity,
            status,
            pass_guard: Mutex::new(()),
            rerun_requested: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// The "N pending" indicator.
    pub async fn pending_count(&self) -> DatabaseResult<u64> {
        self.store.pending_count().await
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }

    /// Record a dose confirmation locally, then sync at once if online.
    ///
    /// A storage failure is returned to the caller for display; the sync
    /// attempt never fails the call.
    pub async fn record_dose_event(
        &self,
        event: DoseEvent,
    ) -> DatabaseResult<(DoseEvent, Option<SyncPassReport>)> {
        let stored = self.store.record_dose_event(event).await?;

        let report = if self.connectivity.is_online() {
            Some(self.sync_pass().await)
        } else {
            debug!(event_id = %stored.id, "Offline, dose event queued");
            None
        };

        Ok((stored, report))
    }

    /// Run one best-effort sync pass.
    ///
    /// A call that finds another pass running returns
    /// `SkippedAlreadyRunning` at once, and the running pass makes another
    /// round over the queue before returning, so events recorded meanwhile
    /// are not left behind.
    pub async fn sync_pass(&self) -> SyncPassReport {
        let mut report: Option<SyncPassReport> = None;

        loop {
            let guard = match self.pass_guard.try_lock() {
                Ok(guard) => guard,
                Err(_) if report.is_some() => break,
                Err(_) => {
                    self.rerun_requested.store(true, Ordering::SeqCst);
                    // The holder may have released between the two checks.
                    match self.pass_guard.try_lock() {
                        Ok(guard) => guard,
                        Err(_) => {
                            debug!("Sync pass already running, follow-up requested");
                            return SyncPassReport::new(PassOutcome::SkippedAlreadyRunning);
                        }
                    }
                }
            };

            self.rerun_requested.store(false, Ordering::SeqCst);
            let round = self.run_round().await;
            let completed = round.outcome == PassOutcome::Completed;
            match report.as_mut() {
                Some(total) => total.absorb(round),
                None => report = Some(round),
            }
            drop(guard);

            if !completed || !self.rerun_requested.swap(false, Ordering::SeqCst) {
                break;
            }
            debug!("Events recorded during the pass, running another round");
        }

        report.unwrap_or_else(|| SyncPassReport::new(PassOutcome::SkippedAlreadyRunning))
    }

    async fn run_round(&self) -> SyncPassReport {
        if !self.connectivity.is_online() {
            debug!("Offline, skipping sync pass");
            return SyncPassReport::new(PassOutcome::SkippedOffline);
        }

        let access_token = match self.credentials.access_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                info!("No auth session, skipping sync");
                self.set_status(SyncStatus::Idle);
                return SyncPassReport::new(PassOutcome::SkippedNoCredentials);
            }
            Err(err) => {
                warn!(error = %err, "Could not obtain access token, skipping sync");
                self.set_status(SyncStatus::Error);
                return SyncPassReport::new(PassOutcome::Aborted(err.to_string()));
            }
        };

        self.set_status(SyncStatus::Syncing);

        let pending = match self.store.get_all_unsynced().await {
            Ok(pending) => pending,
            Err(err) => {
                error!(error = %err, "Failed to read unsynced dose events");
                self.set_status(SyncStatus::Error);
                return SyncPassReport::new(PassOutcome::Aborted(err.to_string()));
            }
        };

        let total = pending.len();
        let mut report = SyncPassReport::new(PassOutcome::Completed);

        for item in pending {
            if !self.connectivity.is_online() {
                info!(
                    remaining = total - report.attempted,
                    "Connectivity lost, stopping sync pass"
                );
                report.outcome = PassOutcome::Interrupted;
                break;
            }

            report.attempted += 1;
            let event_id = item.event.id.clone();

            if let Err(err) = self.remote.push_dose_event(&item.event, &access_token).await {
                warn!(
                    event_id = %event_id,
                    auth_rejected = err.is_auth_rejection(),
                    error = %err,
                    "Failed to sync dose event"
                );
                report.failed += 1;
                continue;
            }

            match self.store.mark_synced(&event_id, item.revision).await {
                Ok(true) => {
                    debug!(event_id = %event_id, "Dose event synced");
                    report.synced += 1;
                }
                Ok(false) => {
                    debug!(
                        event_id = %event_id,
                        revision = item.revision,
                        "Dose event changed during delivery, left unsynced"
                    );
                    report.superseded += 1;
                }
                Err(err) => {
                    error!(event_id = %event_id, error = %err, "Failed to mark dose event synced");
                    report.failed += 1;
                }
            }
        }

        self.set_status(SyncStatus::Idle);

        info!(
            pending = total,
            attempted = report.attempted,
            synced = report.synced,
            superseded = report.superseded,
            failed = report.failed,
            outcome = ?report.outcome,
            "Sync pass finished"
        );

        report
    }
}
