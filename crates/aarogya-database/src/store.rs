//! Local event store.
//!
//! `DoseEventStore` is the single entry point the rest of the app uses for
//! offline persistence. It owns an [`AsyncDatabase`] handle and exposes the
//! collection operations as async methods; each one is a single executor
//! call, so operations never interleave inside the store.

use crate::{
    queries, AsyncDatabase, Collection, DatabaseError, DatabaseResult, DoseEvent, Medication,
    PendingDoseEvent, Reminder, StoredRecord,
};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{debug, info};

/// Default look-ahead window for upcoming reminders.
pub const DEFAULT_UPCOMING_HOURS: i64 = 24;

/// Durable, process-local store for dose events, medications and reminders.
#[derive(Clone)]
pub struct DoseEventStore {
    db: AsyncDatabase,
}

impl DoseEventStore {
    /// Wrap an already-open database.
    pub fn new(db: AsyncDatabase) -> Self {
        Self { db }
    }

    /// Open (or create) the store at `path`.
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        Ok(Self::new(AsyncDatabase::open(path).await?))
    }

    /// Open a throwaway in-memory store.
    pub async fn open_in_memory() -> DatabaseResult<Self> {
        Ok(Self::new(AsyncDatabase::open_in_memory().await?))
    }

    // ==========================================
    // Dose events
    // ==========================================

    /// Insert or overwrite a dose event by id, exactly as given.
    pub async fn put(&self, event: &DoseEvent) -> DatabaseResult<()> {
        let event = event.clone();
        self.db
            .call(move |conn| queries::put_dose_event(conn, &event))
            .await?;
        Ok(())
    }

    /// Record a dose confirmation from a user action.
    ///
    /// The stored copy is always unsynced and stamped with the local
    /// creation time, whatever the caller passed in.
    pub async fn record_dose_event(&self, mut event: DoseEvent) -> DatabaseResult<DoseEvent> {
        event.synced = false;
        event.created_at = Utc::now();
        self.put(&event).await?;
        info!(
            event_id = %event.id,
            medication_id = %event.medication_id,
            status = event.status.as_str(),
            "Dose event recorded locally"
        );
        Ok(event)
    }

    /// Get a single dose event.
    pub async fn get_dose_event(&self, id: &str) -> DatabaseResult<Option<DoseEvent>> {
        let id = id.to_string();
        let found = self
            .db
            .call(move |conn| queries::get_dose_event(conn, &id))
            .await?;
        Ok(found.map(|pending| pending.event))
    }

    /// Every dose event awaiting remote acknowledgment, with its revision.
    pub async fn get_all_unsynced(&self) -> DatabaseResult<Vec<PendingDoseEvent>> {
        self.db.call(queries::list_unsynced_dose_events).await
    }

    /// Flip an event to synced, conditional on it still being at `revision`.
    pub async fn mark_synced(&self, id: &str, revision: i64) -> DatabaseResult<bool> {
        let id = id.to_string();
        let flipped = self
            .db
            .call(move |conn| queries::mark_dose_event_synced(conn, &id, revision))
            .await?;
        debug!(revision, flipped, "Sync flag update");
        Ok(flipped)
    }

    /// Number of dose events awaiting remote acknowledgment.
    pub async fn pending_count(&self) -> DatabaseResult<u64> {
        self.db.call(queries::count_unsynced_dose_events).await
    }

    /// Every dose event, most recently scheduled first.
    pub async fn list_dose_events(&self) -> DatabaseResult<Vec<DoseEvent>> {
        self.db.call(queries::list_dose_events).await
    }

    // ==========================================
    // Cached projections
    // ==========================================

    /// Cache a medication (last write wins).
    pub async fn put_medication(&self, medication: &Medication) -> DatabaseResult<()> {
        let medication = medication.clone();
        self.db
            .call(move |conn| queries::put_medication(conn, &medication))
            .await
    }

    /// Every cached medication.
    pub async fn list_medications(&self) -> DatabaseResult<Vec<Medication>> {
        self.db.call(queries::list_medications).await
    }

    /// Cache a reminder (last write wins).
    pub async fn put_reminder(&self, reminder: &Reminder) -> DatabaseResult<()> {
        let reminder = reminder.clone();
        self.db
            .call(move |conn| queries::put_reminder(conn, &reminder))
            .await
    }

    /// Every cached reminder.
    pub async fn list_reminders(&self) -> DatabaseResult<Vec<Reminder>> {
        self.db.call(queries::list_reminders).await
    }

    /// Reminders due within `hours` of `now` (inclusive on both ends).
    ///
    /// Negative windows are empty; windows past the representable date
    /// range are rejected.
    pub async fn upcoming_reminders(
        &self,
        now: DateTime<Utc>,
        hours: i64,
    ) -> DatabaseResult<Vec<Reminder>> {
        let until = Duration::try_hours(hours.max(0))
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| {
                DatabaseError::InvalidData(format!("reminder window of {hours} hours is out of range"))
            })?;
        self.db
            .call(move |conn| queries::list_reminders_between(conn, &now, &until))
            .await
    }

    /// Every record in a collection, for dashboard population.
    pub async fn get_all(&self, collection: Collection) -> DatabaseResult<Vec<StoredRecord>> {
        let records = match collection {
            Collection::DoseEvents => self
                .list_dose_events()
                .await?
                .into_iter()
                .map(StoredRecord::DoseEvent)
                .collect(),
            Collection::Medications => self
                .list_medications()
                .await?
                .into_iter()
                .map(StoredRecord::Medication)
                .collect(),
            Collection::Reminders => self
                .list_reminders()
                .await?
                .into_iter()
                .map(StoredRecord::Reminder)
                .collect(),
        };
        Ok(records)
    }

    // ==========================================
    // Settings
    // ==========================================

    pub async fn get_setting(&self, key: &str) -> DatabaseResult<Option<String>> {
        let key = key.to_string();
        self.db.call(move |conn| queries::get_setting(conn, &key)).await
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> DatabaseResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .call(move |conn| queries::set_setting(conn, &key, &value))
            .await
    }

    pub async fn delete_setting(&self, key: &str) -> DatabaseResult<bool> {
        let key = key.to_string();
        self.db
            .call(move |conn| queries::delete_setting(conn, &key))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DoseStatus;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn event(id: &str) -> DoseEvent {
        DoseEvent::new(
            id,
            "m1",
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
            DoseStatus::Taken,
        )
    }

    #[tokio::test]
    async fn put_then_get_all_returns_equal_record() {
        let store = DoseEventStore::open_in_memory().await.unwrap();
        let e = event("e1");
        store.put(&e).await.unwrap();

        let all = store.get_all(Collection::DoseEvents).await.unwrap();
        assert_eq!(all, vec![StoredRecord::DoseEvent(e)]);
    }

    #[tokio::test]
    async fn record_forces_unsynced_and_fresh_timestamp() {
        let store = DoseEventStore::open_in_memory().await.unwrap();
        let mut e = event("e1");
        e.synced = true;
        e.created_at = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();

        let before = Utc::now();
        let stored = store.record_dose_event(e).await.unwrap();
        assert!(!stored.synced);
        assert!(stored.created_at >= before);

        assert_eq!(store.get_dose_event("e1").await.unwrap(), Some(stored));
        assert_eq!(store.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn records_survive_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aarogya.sqlite");

        {
            let store = DoseEventStore::open(&path).await.unwrap();
            store.record_dose_event(event("e1")).await.unwrap();
            store.record_dose_event(event("e2")).await.unwrap();
        }

        let store = DoseEventStore::open(&path).await.unwrap();
        let unsynced = store.get_all_unsynced().await.unwrap();
        let mut ids: Vec<_> = unsynced.iter().map(|p| p.event.id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["e1", "e2"]);
    }

    #[tokio::test]
    async fn mark_synced_removes_from_unsynced_set() {
        let store = DoseEventStore::open_in_memory().await.unwrap();
        store.record_dose_event(event("e1")).await.unwrap();
        store.record_dose_event(event("e2")).await.unwrap();

        let pending = store.get_all_unsynced().await.unwrap();
        let e1 = pending.iter().find(|p| p.event.id == "e1").unwrap();
        assert!(store.mark_synced("e1", e1.revision).await.unwrap());

        let remaining = store.get_all_unsynced().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].event.id, "e2");
        assert!(store.get_dose_event("e1").await.unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn get_all_per_collection() {
        let store = DoseEventStore::open_in_memory().await.unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap();

        store
            .put_reminder(&Reminder {
                id: "r1".to_string(),
                medication_id: "m1".to_string(),
                scheduled_time: now + Duration::hours(2),
                message: "Metformin".to_string(),
                tone: "gentle".to_string(),
                notified: false,
            })
            .await
            .unwrap();

        assert!(store.get_all(Collection::Medications).await.unwrap().is_empty());
        let reminders = store.get_all(Collection::Reminders).await.unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].id(), "r1");

        assert_eq!(store.upcoming_reminders(now, 1).await.unwrap().len(), 0);
        assert_eq!(
            store
                .upcoming_reminders(now, DEFAULT_UPCOMING_HOURS)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn oversized_reminder_window_is_rejected() {
        let store = DoseEventStore::open_in_memory().await.unwrap();
        let now = Utc::now();

        for hours in [3_000_000_000, 3_000_000_000_000_000, i64::MAX] {
            assert!(matches!(
                store.upcoming_reminders(now, hours).await,
                Err(DatabaseError::InvalidData(_))
            ));
        }
        assert!(store.upcoming_reminders(now, -5).await.unwrap().is_empty());
    }
}
