//! Cached projections: medication and reminder import, upcoming reminders.

use super::notifications::{manager, TerminalRegistrar};
use super::{print_json, AppState, BoxError};
use aarogya_database::{Medication, Reminder};
use chrono::Utc;
use push_subscription::Notification;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

/// Parse a JSON array file. Any unknown field fails the whole import.
fn read_records<T: DeserializeOwned>(file: &Path) -> Result<Vec<T>, BoxError> {
    let content = std::fs::read_to_string(file)?;
    Ok(serde_json::from_str(&content)?)
}

pub async fn cache_medications(state: &AppState, file: &Path) -> Result<(), BoxError> {
    let medications: Vec<Medication> = read_records(file)?;
    for medication in &medications {
        state.store.put_medication(medication).await?;
    }
    info!(count = medications.len(), "Medications cached");
    println!("Cached {} medications", medications.len());
    Ok(())
}

pub async fn cache_reminders(state: &AppState, file: &Path) -> Result<(), BoxError> {
    let reminders: Vec<Reminder> = read_records(file)?;
    for reminder in &reminders {
        state.store.put_reminder(reminder).await?;
    }
    info!(count = reminders.len(), "Reminders cached");
    println!("Cached {} reminders", reminders.len());
    Ok(())
}

pub async fn upcoming_reminders(state: &AppState, hours: i64, notify: bool) -> Result<(), BoxError> {
    let reminders = state.store.upcoming_reminders(Utc::now(), hours).await?;

    if notify {
        let manager = manager(state, TerminalRegistrar::default());
        for reminder in &reminders {
            let notification = Notification::new(&reminder.message).with_body(format!(
                "Due {}",
                reminder.scheduled_time.format("%Y-%m-%d %H:%M UTC")
            ));
            manager.show_notification(&notification).await?;
        }
    }

    print_json(&reminders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_records_accepts_snake_case_server_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"m1","name":"Metformin","strength":"500mg","dosage":"1 tablet","frequency":"twice daily","timing":["08:00","20:00"],"duration":"30 days","instructions":"with food","image_url":"https://img.example/m1.png","created_at":"2026-03-01T08:00:00Z"}}]"#
        )
        .unwrap();

        let medications: Vec<Medication> = read_records(file.path()).unwrap();
        assert_eq!(medications[0].image_url.as_deref(), Some("https://img.example/m1.png"));
    }

    #[test]
    fn read_records_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"r1","medicationId":"m1","scheduledTime":"2026-03-01T08:00:00Z","message":"Take","tone":"gentle","priority":"high"}}]"#
        )
        .unwrap();

        assert!(read_records::<Reminder>(file.path()).is_err());
    }
}
