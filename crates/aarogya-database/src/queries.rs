//! Standalone query functions.
//!
//! Each function takes a `&Connection` as its first parameter so it can run
//! inside `AsyncDatabase::call` or directly against a test connection.

use crate::{
    DatabaseError, DatabaseResult, DoseEvent, DoseStatus, Medication, PendingDoseEvent, Reminder,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const DOSE_EVENT_COLUMNS: &str = "id, medication_id, scheduled_time, taken_at, status, \
     verification_image_url, notes, synced, created_at, revision";

/// Format a timestamp for storage.
///
/// Fixed-width nanosecond precision keeps stored values exact and makes
/// lexicographic order match chronological order for range queries.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_datetime_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn dose_event_from_row(row: &Row<'_>) -> rusqlite::Result<PendingDoseEvent> {
    let status_raw: String = row.get(4)?;
    let status = DoseStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown dose status {status_raw:?}").into(),
        )
    })?;

    Ok(PendingDoseEvent {
        event: DoseEvent {
            id: row.get(0)?,
            medication_id: row.get(1)?,
            scheduled_time: parse_datetime_column(row, 2)?,
            taken_at: parse_optional_datetime_column(row, 3)?,
            status,
            verification_image_url: row.get(5)?,
            notes: row.get(6)?,
            synced: row.get::<_, i64>(7)? != 0,
            created_at: parse_datetime_column(row, 8)?,
        },
        revision: row.get(9)?,
    })
}

// ==========================================
// Dose events
// ==========================================

/// Insert or overwrite a dose event by id. Returns the new revision.
pub fn put_dose_event(conn: &Connection, event: &DoseEvent) -> DatabaseResult<i64> {
    event.validate().map_err(DatabaseError::InvalidData)?;

    let now = format_datetime(&Utc::now());
    let revision: i64 = conn.query_row(
        "INSERT INTO dose_events (id, medication_id, scheduled_time, taken_at, status, verification_image_url, notes, synced, revision, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            medication_id = excluded.medication_id,
            scheduled_time = excluded.scheduled_time,
            taken_at = excluded.taken_at,
            status = excluded.status,
            verification_image_url = excluded.verification_image_url,
            notes = excluded.notes,
            synced = excluded.synced,
            created_at = excluded.created_at,
            revision = dose_events.revision + 1,
            updated_at = excluded.updated_at
         RETURNING revision",
        params![
            event.id,
            event.medication_id,
            format_datetime(&event.scheduled_time),
            event.taken_at.as_ref().map(format_datetime),
            event.status.as_str(),
            event.verification_image_url,
            event.notes,
            i64::from(event.synced),
            format_datetime(&event.created_at),
            now,
        ],
        |row| row.get(0),
    )?;

    debug!(event_id = %event.id, revision, synced = event.synced, "Dose event stored");
    Ok(revision)
}

/// Get a dose event by id.
pub fn get_dose_event(conn: &Connection, id: &str) -> DatabaseResult<Option<PendingDoseEvent>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {DOSE_EVENT_COLUMNS} FROM dose_events WHERE id = ?1"
    ))?;

    Ok(stmt.query_row(params![id], dose_event_from_row).optional()?)
}

/// List every dose event, most recently scheduled first.
pub fn list_dose_events(conn: &Connection) -> DatabaseResult<Vec<DoseEvent>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {DOSE_EVENT_COLUMNS} FROM dose_events ORDER BY scheduled_time DESC, id"
    ))?;

    let events = stmt
        .query_map([], dose_event_from_row)?
        .map(|r| r.map(|pending| pending.event))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

/// List dose events still awaiting remote acknowledgment.
///
/// Served by `idx_dose_events_synced`, oldest scheduled dose first.
pub fn list_unsynced_dose_events(conn: &Connection) -> DatabaseResult<Vec<PendingDoseEvent>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {DOSE_EVENT_COLUMNS} FROM dose_events WHERE synced = 0
         ORDER BY scheduled_time, created_at, id"
    ))?;

    let events = stmt
        .query_map([], dose_event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

/// Count dose events still awaiting remote acknowledgment.
pub fn count_unsynced_dose_events(conn: &Connection) -> DatabaseResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM dose_events WHERE synced = 0",
        [],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Flip a dose event to synced if it is still at `revision`.
///
/// Returns false when the record was rewritten (or already synced) since it
/// was read; the newer content stays unsynced and goes out on a later pass.
pub fn mark_dose_event_synced(conn: &Connection, id: &str, revision: i64) -> DatabaseResult<bool> {
    let count = conn.execute(
        "UPDATE dose_events SET synced = 1, updated_at = ?3
         WHERE id = ?1 AND revision = ?2 AND synced = 0",
        params![id, revision, format_datetime(&Utc::now())],
    )?;
    Ok(count > 0)
}

// ==========================================
// Medications
// ==========================================

/// Insert or overwrite a cached medication (last write wins).
pub fn put_medication(conn: &Connection, medication: &Medication) -> DatabaseResult<()> {
    if medication.id.trim().is_empty() {
        return Err(DatabaseError::InvalidData("medication id is empty".to_string()));
    }

    let timing = serde_json::to_string(&medication.timing)?;
    conn.execute(
        "INSERT INTO medications (id, name, strength, dosage, frequency, timing, duration, instructions, image_url, created_at, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            strength = excluded.strength,
            dosage = excluded.dosage,
            frequency = excluded.frequency,
            timing = excluded.timing,
            duration = excluded.duration,
            instructions = excluded.instructions,
            image_url = excluded.image_url,
            created_at = excluded.created_at,
            cached_at = excluded.cached_at",
        params![
            medication.id,
            medication.name,
            medication.strength,
            medication.dosage,
            medication.frequency,
            timing,
            medication.duration,
            medication.instructions,
            medication.image_url,
            format_datetime(&medication.created_at),
            format_datetime(&Utc::now()),
        ],
    )?;
    Ok(())
}

/// List cached medications by name.
pub fn list_medications(conn: &Connection) -> DatabaseResult<Vec<Medication>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, strength, dosage, frequency, timing, duration, instructions, image_url, created_at
         FROM medications ORDER BY name, id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let timing_raw: String = row.get(5)?;
            let timing: Vec<String> = serde_json::from_str(&timing_raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
            })?;
            Ok(Medication {
                id: row.get(0)?,
                name: row.get(1)?,
                strength: row.get(2)?,
                dosage: row.get(3)?,
                frequency: row.get(4)?,
                timing,
                duration: row.get(6)?,
                instructions: row.get(7)?,
                image_url: row.get(8)?,
                created_at: parse_datetime_column(row, 9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

// ==========================================
// Reminders
// ==========================================

fn reminder_from_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        medication_id: row.get(1)?,
        scheduled_time: parse_datetime_column(row, 2)?,
        message: row.get(3)?,
        tone: row.get(4)?,
        notified: row.get(5)?,
    })
}

/// Insert or overwrite a cached reminder (last write wins).
pub fn put_reminder(conn: &Connection, reminder: &Reminder) -> DatabaseResult<()> {
    if reminder.id.trim().is_empty() {
        return Err(DatabaseError::InvalidData("reminder id is empty".to_string()));
    }

    conn.execute(
        "INSERT INTO reminders (id, medication_id, scheduled_time, message, tone, notified, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            medication_id = excluded.medication_id,
            scheduled_time = excluded.scheduled_time,
            message = excluded.message,
            tone = excluded.tone,
            notified = excluded.notified,
            cached_at = excluded.cached_at",
        params![
            reminder.id,
            reminder.medication_id,
            format_datetime(&reminder.scheduled_time),
            reminder.message,
            reminder.tone,
            reminder.notified,
            format_datetime(&Utc::now()),
        ],
    )?;
    Ok(())
}

/// List every cached reminder in schedule order.
pub fn list_reminders(conn: &Connection) -> DatabaseResult<Vec<Reminder>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, medication_id, scheduled_time, message, tone, notified
         FROM reminders ORDER BY scheduled_time, id",
    )?;

    let rows = stmt
        .query_map([], reminder_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// List reminders scheduled within `[from, to]`, inclusive.
pub fn list_reminders_between(
    conn: &Connection,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> DatabaseResult<Vec<Reminder>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, medication_id, scheduled_time, message, tone, notified
         FROM reminders WHERE scheduled_time BETWEEN ?1 AND ?2
         ORDER BY scheduled_time, id",
    )?;

    let rows = stmt
        .query_map(
            params![format_datetime(from), format_datetime(to)],
            reminder_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ==========================================
// Settings
// ==========================================

/// Get a setting value.
pub fn get_setting(conn: &Connection, key: &str) -> DatabaseResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

/// Set a setting value.
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

/// Delete a setting. Returns whether a row existed.
pub fn delete_setting(conn: &Connection, key: &str) -> DatabaseResult<bool> {
    let count = conn.execute("DELETE FROM app_settings WHERE key = ?1", params![key])?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;
    use chrono::{Duration, TimeZone};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn event(id: &str) -> DoseEvent {
        DoseEvent::new(
            id,
            "m1",
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
            DoseStatus::Taken,
        )
    }

    #[test]
    fn put_then_get_returns_equal_event() {
        let conn = conn();
        let mut e = event("e1");
        e.taken_at = Some(Utc::now());
        e.verification_image_url = Some("https://img/e1.jpg".to_string());
        e.notes = Some("with food".to_string());

        put_dose_event(&conn, &e).unwrap();
        let stored = get_dose_event(&conn, "e1").unwrap().unwrap();
        assert_eq!(stored.event, e);
        assert_eq!(stored.revision, 1);
    }

    #[test]
    fn put_overwrites_and_bumps_revision() {
        let conn = conn();
        let mut e = event("e1");
        assert_eq!(put_dose_event(&conn, &e).unwrap(), 1);

        e.status = DoseStatus::Skipped;
        assert_eq!(put_dose_event(&conn, &e).unwrap(), 2);

        let all = list_dose_events(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, DoseStatus::Skipped);
    }

    #[test]
    fn put_rejects_empty_id() {
        let conn = conn();
        let result = put_dose_event(&conn, &event(""));
        assert!(matches!(result, Err(DatabaseError::InvalidData(_))));
    }

    #[test]
    fn unsynced_query_filters_by_flag() {
        let conn = conn();
        put_dose_event(&conn, &event("e1")).unwrap();
        let mut synced = event("e2");
        synced.synced = true;
        put_dose_event(&conn, &synced).unwrap();

        let pending = list_unsynced_dose_events(&conn).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event.id, "e1");
        assert_eq!(count_unsynced_dose_events(&conn).unwrap(), 1);
    }

    #[test]
    fn mark_synced_requires_matching_revision() {
        let conn = conn();
        let mut e = event("e1");
        put_dose_event(&conn, &e).unwrap();

        // A correction lands while revision 1 is in flight.
        e.notes = Some("corrected".to_string());
        put_dose_event(&conn, &e).unwrap();

        assert!(!mark_dose_event_synced(&conn, "e1", 1).unwrap());
        assert!(!get_dose_event(&conn, "e1").unwrap().unwrap().event.synced);

        assert!(mark_dose_event_synced(&conn, "e1", 2).unwrap());
        assert!(get_dose_event(&conn, "e1").unwrap().unwrap().event.synced);

        // Already synced: no second flip.
        assert!(!mark_dose_event_synced(&conn, "e1", 2).unwrap());
    }

    #[test]
    fn mark_synced_unknown_id_is_noop() {
        let conn = conn();
        assert!(!mark_dose_event_synced(&conn, "missing", 1).unwrap());
    }

    #[test]
    fn medications_roundtrip_with_timing() {
        let conn = conn();
        let med = Medication {
            id: "m1".to_string(),
            name: "Metformin".to_string(),
            strength: "500mg".to_string(),
            dosage: "1 tablet".to_string(),
            frequency: "twice daily".to_string(),
            timing: vec!["08:00".to_string(), "20:00".to_string()],
            duration: "30 days".to_string(),
            instructions: "after meals".to_string(),
            image_url: None,
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        };
        put_medication(&conn, &med).unwrap();

        let mut updated = med.clone();
        updated.image_url = Some("https://img/m1.jpg".to_string());
        put_medication(&conn, &updated).unwrap();

        assert_eq!(list_medications(&conn).unwrap(), vec![updated]);
    }

    #[test]
    fn reminders_between_is_inclusive_range() {
        let conn = conn();
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap();
        for (id, hours) in [("r-past", -1), ("r-now", 0), ("r-soon", 3), ("r-late", 30)] {
            put_reminder(
                &conn,
                &Reminder {
                    id: id.to_string(),
                    medication_id: "m1".to_string(),
                    scheduled_time: base + Duration::hours(hours),
                    message: String::new(),
                    tone: "gentle".to_string(),
                    notified: false,
                },
            )
            .unwrap();
        }

        let upcoming = list_reminders_between(&conn, &base, &(base + Duration::hours(24))).unwrap();
        let ids: Vec<_> = upcoming.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r-now", "r-soon"]);
        assert_eq!(list_reminders(&conn).unwrap().len(), 4);
    }

    #[test]
    fn settings_crud() {
        let conn = conn();
        assert_eq!(get_setting(&conn, "k").unwrap(), None);

        set_setting(&conn, "k", "v1").unwrap();
        set_setting(&conn, "k", "v2").unwrap();
        assert_eq!(get_setting(&conn, "k").unwrap().as_deref(), Some("v2"));

        assert!(delete_setting(&conn, "k").unwrap());
        assert!(!delete_setting(&conn, "k").unwrap());
    }
}
