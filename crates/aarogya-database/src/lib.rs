//! SQLite-backed local store for Aarogya.
//!
//! This crate provides:
//! - Async SQLite executor with a dedicated thread
//! - Schema migrations
//! - Canonical record types for dose events, medications and reminders
//! - Query helpers for each collection
//! - [`DoseEventStore`], the offline store used by the sync worker and CLI
//!
//! ```ignore
//! let store = DoseEventStore::open(&paths.database_file()).await?;
//! store.record_dose_event(DoseEvent::new(id, "m1", due, DoseStatus::Taken)).await?;
//! let pending = store.get_all_unsynced().await?;
//! ```

mod error;
mod executor;
mod migrations;
mod models;
pub mod queries;
mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::*;
pub use store::{DoseEventStore, DEFAULT_UPCOMING_HOURS};
