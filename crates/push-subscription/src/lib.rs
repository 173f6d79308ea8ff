//! Notification permission and push subscription lifecycle.
//!
//! [`PushSubscriptionManager`] is an explicit subscription object: hosts ask
//! it for the current [`SubscriptionState`] rather than polling the platform.
//! The platform side (prompt, push service, notification display) is the
//! injected [`PushRegistrar`].

mod error;
mod manager;
mod models;

pub use error::{SubscriptionError, SubscriptionResult};
pub use manager::{PushRegistrar, PushSubscriptionManager};
pub use models::{Notification, NotificationPermission, PushKeys, PushSubscription, SubscriptionState};
