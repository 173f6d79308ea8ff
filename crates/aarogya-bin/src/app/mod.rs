//! Command implementations and component wiring.

mod cache;
mod doses;
mod notifications;
mod state;
mod sync;

pub use cache::{cache_medications, cache_reminders, upcoming_reminders};
pub use doses::{list, pending, record, RecordArgs};
pub use notifications::{notifications, NotificationsCommand};
pub use state::AppState;
pub use sync::{sync_once, watch};

pub(crate) type BoxError = Box<dyn std::error::Error>;

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), BoxError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
