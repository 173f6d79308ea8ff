//! Dose commands: record, list, pending.

use super::{print_json, AppState, BoxError};
use aarogya_database::{Collection, DoseEvent, DoseStatus};
use chrono::{DateTime, Utc};
use clap::Args;
use tracing::warn;

#[derive(Args)]
pub struct RecordArgs {
    /// Medication the dose belongs to
    #[arg(short, long)]
    pub medication_id: String,

    /// taken, skipped, missed or pending
    #[arg(short, long, default_value = "taken", value_parser = parse_status)]
    pub status: DoseStatus,

    /// Scheduled time (RFC 3339). Defaults to now
    #[arg(long)]
    pub scheduled_time: Option<DateTime<Utc>>,

    /// When the dose was taken (RFC 3339). Defaults to now for taken doses
    #[arg(long)]
    pub taken_at: Option<DateTime<Utc>>,

    /// Optional photo verification URL
    #[arg(long)]
    pub verification_image_url: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Event id. Defaults to a new UUID
    #[arg(long)]
    pub id: Option<String>,
}

fn parse_status(value: &str) -> Result<DoseStatus, String> {
    DoseStatus::parse(value).ok_or_else(|| format!("unknown dose status: {value}"))
}

/// Build the event a `record` invocation describes.
pub(crate) fn event_from_args(args: RecordArgs, now: DateTime<Utc>) -> DoseEvent {
    let id = args.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut event = DoseEvent::new(
        id,
        args.medication_id,
        args.scheduled_time.unwrap_or(now),
        args.status,
    );
    event.taken_at = match (args.taken_at, args.status) {
        (Some(at), _) => Some(at),
        (None, DoseStatus::Taken) => Some(now),
        (None, _) => None,
    };
    event.verification_image_url = args.verification_image_url;
    event.notes = args.notes;
    event
}

pub async fn record(state: &AppState, args: RecordArgs) -> Result<(), BoxError> {
    let event = event_from_args(args, Utc::now());

    state.refresh_connectivity().await;
    let (stored, report) = match state.coordinator.record_dose_event(event).await {
        Ok(result) => result,
        Err(err) => {
            warn!(error = %err, storage_exhausted = err.is_storage_exhausted(), "Record failed");
            eprintln!("Could not save your dose confirmation locally: {err}");
            return Err(err.into());
        }
    };
    state.persist_session().await?;

    let pending = state.coordinator.pending_count().await?;
    match report {
        Some(report) => println!(
            "Recorded {} ({} synced, {} pending)",
            stored.id, report.synced, pending
        ),
        None => println!("Recorded {} offline ({} pending)", stored.id, pending),
    }
    Ok(())
}

pub async fn list(state: &AppState, collection: Collection) -> Result<(), BoxError> {
    let records = state.store.get_all(collection).await?;
    print_json(&records)
}

pub async fn pending(state: &AppState) -> Result<(), BoxError> {
    let count = state.coordinator.pending_count().await?;
    println!("{count} pending");
    Ok(())
}
