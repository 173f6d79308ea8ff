//! Background sync worker.
//!
//! Runs [`DoseSyncCoordinator::sync_pass`] on a spawned task whenever a pass
//! is requested or connectivity comes back. Requests that arrive while a pass
//! is running collapse into a single follow-up pass.

use crate::{DoseSyncCoordinator, SyncPassReport};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Pending-trigger capacity. One queued trigger is enough to guarantee a
/// pass after the current one.
const TRIGGER_CAPACITY: usize = 1;

/// Why a pass was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Requested,
    ConnectivityRestored,
}

/// Drives the coordinator from triggers and connectivity changes.
///
/// # Lifecycle
///
/// 1. Create with [`DoseSyncWorker::new()`]
/// 2. Call [`DoseSyncWorker::start()`] to spawn the background task
/// 3. Call [`DoseSyncWorker::request_sync()`] after local writes
/// 4. Call [`DoseSyncWorker::shutdown()`] to stop the task
pub struct DoseSyncWorker {
    coordinator: Arc<DoseSyncCoordinator>,
    connectivity: watch::Receiver<bool>,
    sender: mpsc::Sender<SyncTrigger>,
    /// Channel receiver (taken by the task on start).
    receiver: Mutex<Option<mpsc::Receiver<SyncTrigger>>>,
    shutdown: watch::Sender<bool>,
    reports: watch::Sender<Option<SyncPassReport>>,
}

impl DoseSyncWorker {
    /// # Arguments
    ///
    /// * `coordinator` - Shared sync coordinator
    /// * `connectivity` - Receiver from [`crate::ConnectivityMonitor::subscribe`]
    pub fn new(coordinator: Arc<DoseSyncCoordinator>, connectivity: watch::Receiver<bool>) -> Self {
        let (sender, receiver) = mpsc::channel(TRIGGER_CAPACITY);
        let (shutdown, _) = watch::channel(false);
        let (reports, _) = watch::channel(None);
        Self {
            coordinator,
            connectivity,
            sender,
            receiver: Mutex::new(Some(receiver)),
            shutdown,
            reports,
        }
    }

    pub fn coordinator(&self) -> &Arc<DoseSyncCoordinator> {
        &self.coordinator
    }

    /// Report of the most recent pass run by the worker.
    pub fn subscribe_reports(&self) -> watch::Receiver<Option<SyncPassReport>> {
        self.reports.subscribe()
    }

    /// Ask for a pass. Returns false if a pass is already queued or the
    /// worker has stopped.
    pub fn request_sync(&self) -> bool {
        self.sender.try_send(SyncTrigger::Requested).is_ok()
    }

    /// Stop the background task after any in-flight pass.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Spawn the background task. Returns `None` if already started.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        let mut receiver = self.receiver.lock().ok()?.take()?;

        let coordinator = self.coordinator.clone();
        let mut connectivity = self.connectivity.clone();
        let mut shutdown = self.shutdown.subscribe();
        let reports = self.reports.clone();

        // Only transitions observed from here on should trigger.
        connectivity.borrow_and_update();

        Some(tokio::spawn(async move {
            let mut watching_connectivity = true;

            loop {
                let trigger = tokio::select! {
                    biased;

                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                    maybe = receiver.recv() => match maybe {
                        Some(trigger) => trigger,
                        None => break,
                    },
                    changed = connectivity.changed(), if watching_connectivity => {
                        if changed.is_err() {
                            watching_connectivity = false;
                            continue;
                        }
                        if !*connectivity.borrow_and_update() {
                            debug!("Went offline, sync paused");
                            continue;
                        }
                        SyncTrigger::ConnectivityRestored
                    }
                };

                debug!(trigger = ?trigger, "Starting sync pass");
                let report = coordinator.sync_pass().await;
                reports.send_replace(Some(report));
            }

            info!("Dose sync worker stopped");
        }))
    }
}
