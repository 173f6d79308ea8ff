//! Sync commands: one-shot pass and long-running watch.

use super::{AppState, BoxError};
use dose_sync_worker::{spawn_probe_loop, DoseSyncWorker, PassOutcome, SyncPassReport, SyncStatus};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

fn describe(report: &SyncPassReport) -> String {
    match &report.outcome {
        PassOutcome::Completed | PassOutcome::Interrupted => format!(
            "{} synced, {} failed, {} changed during sync{}",
            report.synced,
            report.failed,
            report.superseded,
            if report.outcome == PassOutcome::Interrupted {
                " (connection lost)"
            } else {
                ""
            }
        ),
        PassOutcome::SkippedOffline => "offline, nothing sent".to_string(),
        PassOutcome::SkippedNoCredentials => "not signed in, nothing sent".to_string(),
        PassOutcome::SkippedAlreadyRunning => "a sync is already running".to_string(),
        PassOutcome::Aborted(reason) => format!("sync aborted: {reason}"),
    }
}

/// Status transitions worth showing; `Idle` is implied by the pass summary.
fn status_line(status: SyncStatus) -> Option<&'static str> {
    match status {
        SyncStatus::Syncing => Some("syncing..."),
        SyncStatus::Error => Some("sync error, events stay queued"),
        SyncStatus::Idle => None,
    }
}

pub async fn sync_once(state: &AppState) -> Result<(), BoxError> {
    state.refresh_connectivity().await;
    let report = state.coordinator.sync_pass().await;
    state.persist_session().await?;

    let pending = state.coordinator.pending_count().await?;
    println!("{} ({pending} pending)", describe(&report));
    Ok(())
}

/// Probe connectivity periodically and sync on every reconnect until Ctrl-C.
pub async fn watch(state: &AppState) -> Result<(), BoxError> {
    let interval = Duration::from_secs(state.config.connectivity_probe_interval_secs);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = DoseSyncWorker::new(state.coordinator.clone(), state.connectivity.subscribe());
    let mut reports = worker.subscribe_reports();
    let mut status = state.coordinator.subscribe_status();
    let Some(worker_task) = worker.start() else {
        return Err("sync worker already started".into());
    };

    let probe_task = spawn_probe_loop(
        state.connectivity.clone(),
        state.probe.clone(),
        interval,
        shutdown_rx,
    );

    // The first probe flips the monitor online, which triggers the first pass.
    info!(interval_secs = interval.as_secs(), "Watching for connectivity changes");
    println!("Watching for connectivity (Ctrl-C to stop)");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = reports.borrow_and_update().clone();
                if let Some(report) = report {
                    if let Err(err) = state.persist_session().await {
                        warn!(error = %err, "Failed to persist session tokens");
                    }
                    let pending = state.coordinator.pending_count().await.unwrap_or(0);
                    println!("{} ({pending} pending)", describe(&report));
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                if let Some(line) = status_line(current) {
                    println!("{line}");
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    shutdown_tx.send_replace(true);
    worker.shutdown();
    let _ = probe_task.await;
    let _ = worker_task.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: PassOutcome) -> SyncPassReport {
        SyncPassReport {
            outcome,
            attempted: 3,
            synced: 2,
            superseded: 0,
            failed: 1,
        }
    }

    #[test]
    fn describe_mentions_counts_and_interruptions() {
        assert_eq!(
            describe(&report(PassOutcome::Completed)),
            "2 synced, 1 failed, 0 changed during sync"
        );
        assert!(describe(&report(PassOutcome::Interrupted)).ends_with("(connection lost)"));
        assert_eq!(
            describe(&report(PassOutcome::SkippedNoCredentials)),
            "not signed in, nothing sent"
        );
    }

    #[test]
    fn only_active_statuses_are_printed() {
        assert_eq!(status_line(SyncStatus::Syncing), Some("syncing..."));
        assert!(status_line(SyncStatus::Error).unwrap().starts_with("sync error"));
        assert_eq!(status_line(SyncStatus::Idle), None);
    }
}
