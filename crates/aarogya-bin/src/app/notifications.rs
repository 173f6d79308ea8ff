//! Notification commands.
//!
//! A terminal has no push service, so the registrar here takes the user's
//! permission answer and any subscription details from the command line and
//! prints notifications to stdout.

use super::{print_json, AppState, BoxError};
use async_trait::async_trait;
use clap::{Args, Subcommand, ValueEnum};
use push_subscription::{
    Notification, NotificationPermission, PushKeys, PushRegistrar, PushSubscription,
    PushSubscriptionManager, SubscriptionError, SubscriptionResult,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Subcommand)]
pub enum NotificationsCommand {
    /// Show permission and subscription state
    Status,
    /// Answer the notification permission prompt
    Permission {
        #[arg(value_enum)]
        answer: PermissionAnswer,
        #[command(flatten)]
        push: PushArgs,
    },
    /// Register a push subscription (requires granted permission)
    Subscribe {
        #[command(flatten)]
        push: PushArgs,
    },
    /// Remove the active push subscription
    Unsubscribe,
    /// Show a test notification
    Test {
        #[arg(long, default_value = "Aarogya")]
        title: String,
        #[arg(long)]
        body: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PermissionAnswer {
    Grant,
    Deny,
}

/// Push service details as handed out by the platform.
#[derive(Args)]
pub struct PushArgs {
    /// Push service endpoint URL
    #[arg(long, requires_all = ["p256dh", "auth"])]
    pub endpoint: Option<String>,
    /// Base64 P-256 public key
    #[arg(long)]
    pub p256dh: Option<String>,
    /// Base64 auth secret
    #[arg(long)]
    pub auth: Option<String>,
}

impl PushArgs {
    fn subscription(self) -> Option<PushSubscription> {
        Some(PushSubscription {
            endpoint: self.endpoint?,
            keys: PushKeys {
                p256dh: self.p256dh?,
                auth: self.auth?,
            },
        })
    }
}

/// Registrar backed by command-line input and stdout.
#[derive(Default)]
pub(crate) struct TerminalRegistrar {
    answer: Option<NotificationPermission>,
    subscription: Option<PushSubscription>,
}

#[async_trait]
impl PushRegistrar for TerminalRegistrar {
    async fn request_permission(&self) -> SubscriptionResult<NotificationPermission> {
        Ok(self.answer.unwrap_or_default())
    }

    async fn existing_subscription(&self) -> SubscriptionResult<Option<PushSubscription>> {
        Ok(None)
    }

    async fn subscribe(&self) -> SubscriptionResult<PushSubscription> {
        self.subscription.clone().ok_or_else(|| {
            SubscriptionError::Registrar("no push endpoint given (--endpoint)".to_string())
        })
    }

    async fn unsubscribe(&self, subscription: &PushSubscription) -> SubscriptionResult<()> {
        debug!(endpoint = %subscription.endpoint, "Dropping push subscription");
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> SubscriptionResult<()> {
        match &notification.body {
            Some(body) => println!("[notification] {}: {body}", notification.title),
            None => println!("[notification] {}", notification.title),
        }
        Ok(())
    }
}

pub(crate) fn manager(state: &AppState, registrar: TerminalRegistrar) -> PushSubscriptionManager {
    PushSubscriptionManager::new(state.store.clone(), Arc::new(registrar))
}

#[derive(Serialize)]
struct StatusView {
    permission: NotificationPermission,
    push: push_subscription::SubscriptionState,
}

pub async fn notifications(state: &AppState, command: NotificationsCommand) -> Result<(), BoxError> {
    match command {
        NotificationsCommand::Status => {
            let manager = manager(state, TerminalRegistrar::default());
            print_json(&StatusView {
                permission: manager.permission().await?,
                push: manager.state().await?,
            })?;
        }
        NotificationsCommand::Permission { answer, push } => {
            let answer = match answer {
                PermissionAnswer::Grant => NotificationPermission::Granted,
                PermissionAnswer::Deny => NotificationPermission::Denied,
            };
            let manager = manager(
                state,
                TerminalRegistrar {
                    answer: Some(answer),
                    subscription: push.subscription(),
                },
            );
            let granted = manager.request_permission().await?;
            let active = manager.state().await?.is_active();
            println!(
                "Permission {answer}; push subscription {}",
                if active { "active" } else { "inactive" }
            );
            debug!(granted, active, "Permission command finished");
        }
        NotificationsCommand::Subscribe { push } => {
            let manager = manager(
                state,
                TerminalRegistrar {
                    answer: None,
                    subscription: push.subscription(),
                },
            );
            let subscription = manager.subscribe().await?;
            println!("Subscribed: {}", subscription.endpoint);
        }
        NotificationsCommand::Unsubscribe => {
            let manager = manager(state, TerminalRegistrar::default());
            if manager.unsubscribe().await? {
                println!("Unsubscribed");
            } else {
                println!("No active subscription");
            }
        }
        NotificationsCommand::Test { title, body } => {
            let manager = manager(state, TerminalRegistrar::default());
            let mut notification = Notification::new(title);
            if let Some(body) = body {
                notification = notification.with_body(body);
            }
            if !manager.show_notification(&notification).await? {
                println!("Notifications are not permitted");
            }
        }
    }
    Ok(())
}
