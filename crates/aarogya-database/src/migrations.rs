//! Database migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table.

use crate::DatabaseResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_local_collections(conn)?;
    }
    if current_version < 2 {
        migrate_v2_app_settings(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: dose events, cached medications, cached reminders.
fn migrate_v1_local_collections(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v1: local collections");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS dose_events (
            id TEXT PRIMARY KEY,
            medication_id TEXT NOT NULL,
            scheduled_time TEXT NOT NULL,
            taken_at TEXT,
            status TEXT NOT NULL,
            verification_image_url TEXT,
            notes TEXT,
            synced INTEGER NOT NULL DEFAULT 0 CHECK (synced IN (0, 1)),
            revision INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_dose_events_synced
            ON dose_events(synced);
        CREATE INDEX IF NOT EXISTS idx_dose_events_scheduled_time
            ON dose_events(scheduled_time);
        ",
    )?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS medications (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            strength TEXT NOT NULL DEFAULT '',
            dosage TEXT NOT NULL DEFAULT '',
            frequency TEXT NOT NULL DEFAULT '',
            timing TEXT NOT NULL DEFAULT '[]',
            duration TEXT NOT NULL DEFAULT '',
            instructions TEXT NOT NULL DEFAULT '',
            image_url TEXT,
            created_at TEXT NOT NULL,
            cached_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reminders (
            id TEXT PRIMARY KEY,
            medication_id TEXT NOT NULL,
            scheduled_time TEXT NOT NULL,
            message TEXT NOT NULL DEFAULT '',
            tone TEXT NOT NULL DEFAULT '',
            notified INTEGER NOT NULL DEFAULT 0,
            cached_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_reminders_scheduled_time
            ON reminders(scheduled_time);
        ",
    )?;

    record_migration(conn, 1, "local_collections")?;
    Ok(())
}

/// V2: key/value settings (push subscription state lives here).
fn migrate_v2_app_settings(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v2: app settings");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    record_migration(conn, 2, "app_settings")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_create_tables_and_synced_index() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["dose_events", "medications", "reminders", "app_settings"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }

        let index: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_dose_events_synced'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 2);
    }

    #[test]
    fn synced_flag_is_constrained() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO dose_events (id, medication_id, scheduled_time, status, synced, created_at)
             VALUES ('e1', 'm1', '2026-03-01T08:00:00+00:00', 'taken', 5, '2026-03-01T08:00:00+00:00')",
            [],
        );
        assert!(result.is_err());
    }
}
