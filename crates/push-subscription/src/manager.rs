//! Subscription lifecycle: `Unsubscribed → Active → Unsubscribed`.
//!
//! Permission and the active subscription are persisted in the local store's
//! settings table, so callers query the manager instead of polling the
//! platform.

use crate::{
    Notification, NotificationPermission, PushSubscription, SubscriptionError,
    SubscriptionResult, SubscriptionState,
};
use aarogya_database::DoseEventStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

const PERMISSION_KEY: &str = "notification_permission";
const SUBSCRIPTION_KEY: &str = "push_subscription";

/// Platform push service and notification surface.
#[async_trait]
pub trait PushRegistrar: Send + Sync {
    /// Prompt the user (or report a previous answer).
    async fn request_permission(&self) -> SubscriptionResult<NotificationPermission>;

    /// A subscription the platform already holds for this app, if any.
    async fn existing_subscription(&self) -> SubscriptionResult<Option<PushSubscription>>;

    /// Create a new subscription with the push service.
    async fn subscribe(&self) -> SubscriptionResult<PushSubscription>;

    async fn unsubscribe(&self, subscription: &PushSubscription) -> SubscriptionResult<()>;

    async fn show_notification(&self, notification: &Notification) -> SubscriptionResult<()>;
}

/// Owns the device's notification permission and push subscription.
pub struct PushSubscriptionManager {
    store: DoseEventStore,
    registrar: Arc<dyn PushRegistrar>,
}

impl PushSubscriptionManager {
    pub fn new(store: DoseEventStore, registrar: Arc<dyn PushRegistrar>) -> Self {
        Self { store, registrar }
    }

    /// Last known permission; `Default` if never asked.
    pub async fn permission(&self) -> SubscriptionResult<NotificationPermission> {
        let stored = self.store.get_setting(PERMISSION_KEY).await?;
        Ok(stored
            .as_deref()
            .and_then(NotificationPermission::parse)
            .unwrap_or_default())
    }

    /// Ask for permission and subscribe when granted.
    ///
    /// Returns whether permission was granted. A subscription failure after
    /// a grant is logged and does not change the answer.
    pub async fn request_permission(&self) -> SubscriptionResult<bool> {
        let permission = self.registrar.request_permission().await?;
        self.store
            .set_setting(PERMISSION_KEY, permission.as_str())
            .await?;
        info!(permission = permission.as_str(), "Notification permission updated");

        if permission != NotificationPermission::Granted {
            return Ok(false);
        }

        if let Err(err) = self.subscribe().await {
            warn!(error = %err, "Push subscription failed after permission grant");
        }
        Ok(true)
    }

    pub async fn state(&self) -> SubscriptionResult<SubscriptionState> {
        match self.store.get_setting(SUBSCRIPTION_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(SubscriptionState::Unsubscribed),
        }
    }

    async fn save_state(&self, state: &SubscriptionState) -> SubscriptionResult<()> {
        match state {
            SubscriptionState::Unsubscribed => {
                self.store.delete_setting(SUBSCRIPTION_KEY).await?;
            }
            SubscriptionState::Active(_) => {
                let json = serde_json::to_string(state)?;
                self.store.set_setting(SUBSCRIPTION_KEY, &json).await?;
            }
        }
        Ok(())
    }

    /// Move to `Active`, reusing an existing subscription when there is one.
    pub async fn subscribe(&self) -> SubscriptionResult<PushSubscription> {
        let permission = self.permission().await?;
        if permission != NotificationPermission::Granted {
            return Err(SubscriptionError::PermissionNotGranted(permission));
        }

        if let SubscriptionState::Active(subscription) = self.state().await? {
            debug!(endpoint = %subscription.endpoint, "Push subscription already active");
            return Ok(subscription);
        }

        let subscription = match self.registrar.existing_subscription().await? {
            Some(existing) => {
                debug!(endpoint = %existing.endpoint, "Reusing platform push subscription");
                existing
            }
            None => self.registrar.subscribe().await?,
        };
        subscription.validate()?;

        self.save_state(&SubscriptionState::Active(subscription.clone()))
            .await?;
        info!(endpoint = %subscription.endpoint, "Push subscription active");
        Ok(subscription)
    }

    /// Move to `Unsubscribed`. Returns false if nothing was active.
    pub async fn unsubscribe(&self) -> SubscriptionResult<bool> {
        let SubscriptionState::Active(subscription) = self.state().await? else {
            return Ok(false);
        };

        self.registrar.unsubscribe(&subscription).await?;
        self.save_state(&SubscriptionState::Unsubscribed).await?;
        info!(endpoint = %subscription.endpoint, "Push subscription removed");
        Ok(true)
    }

    /// Display a notification if permission is granted.
    ///
    /// Returns false without contacting the registrar otherwise.
    pub async fn show_notification(&self, notification: &Notification) -> SubscriptionResult<bool> {
        if self.permission().await? != NotificationPermission::Granted {
            debug!(title = %notification.title, "Notification suppressed, permission not granted");
            return Ok(false);
        }
        self.registrar.show_notification(notification).await?;
        Ok(true)
    }
}
