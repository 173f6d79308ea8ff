//! Permission and subscription types.

use crate::{SubscriptionError, SubscriptionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// User's answer to the notification prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

impl NotificationPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "default" => Some(Self::Default),
            "granted" => Some(Self::Granted),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base64 key material of a Web Push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A push endpoint plus the keys needed to encrypt payloads for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
}

impl PushSubscription {
    /// Reject subscriptions a push service could never deliver to.
    pub fn validate(&self) -> SubscriptionResult<()> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| SubscriptionError::InvalidEndpoint(format!("{}: {e}", self.endpoint)))?;
        if url.scheme() != "https" {
            return Err(SubscriptionError::InvalidEndpoint(format!(
                "{}: scheme must be https",
                self.endpoint
            )));
        }
        if self.keys.p256dh.trim().is_empty() || self.keys.auth.trim().is_empty() {
            return Err(SubscriptionError::Registrar(
                "subscription keys are empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle of the device's push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "subscription", rename_all = "lowercase")]
pub enum SubscriptionState {
    Unsubscribed,
    Active(PushSubscription),
}

impl SubscriptionState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn subscription(&self) -> Option<&PushSubscription> {
        match self {
            Self::Active(sub) => Some(sub),
            Self::Unsubscribed => None,
        }
    }
}

/// A local notification to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    /// Vibration pattern in milliseconds.
    pub vibrate: Vec<u32>,
}

impl Notification {
    /// A notification with the app's default icon, badge and vibration.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: None,
            icon: Some("/icon-192.png".to_string()),
            badge: Some("/badge-72.png".to_string()),
            vibrate: vec![200, 100, 200],
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(endpoint: &str) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.to_string(),
            keys: PushKeys {
                p256dh: "BNc...".to_string(),
                auth: "tBH...".to_string(),
            },
        }
    }

    #[test]
    fn permission_parse_and_display() {
        assert_eq!(
            NotificationPermission::parse("granted"),
            Some(NotificationPermission::Granted)
        );
        assert_eq!(NotificationPermission::parse("maybe"), None);
        assert_eq!(NotificationPermission::default().to_string(), "default");
    }

    #[test]
    fn validate_requires_https_endpoint() {
        assert!(subscription("https://fcm.googleapis.com/fcm/send/abc").validate().is_ok());
        assert!(matches!(
            subscription("http://push.example/abc").validate(),
            Err(SubscriptionError::InvalidEndpoint(_))
        ));
        assert!(subscription("not a url").validate().is_err());
    }

    #[test]
    fn state_json_shape() {
        let json = serde_json::to_value(SubscriptionState::Active(subscription(
            "https://push.example/abc",
        )))
        .unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["subscription"]["keys"]["auth"], "tBH...");

        let parsed: SubscriptionState =
            serde_json::from_str(r#"{"state":"unsubscribed"}"#).unwrap();
        assert_eq!(parsed, SubscriptionState::Unsubscribed);
    }

    #[test]
    fn unknown_subscription_fields_rejected() {
        let result: Result<PushSubscription, _> = serde_json::from_str(
            r#"{"endpoint":"https://p.example","keys":{"p256dh":"a","auth":"b"},"expirationTime":null}"#,
        );
        assert!(result.is_err());
    }
}
