//! Record types for the three local collections.
//!
//! These are the canonical shapes. Server rows arriving with alternate field
//! names are normalized here during deserialization; anything else unknown is
//! rejected rather than cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome recorded for a single scheduled dose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseStatus {
    #[default]
    Pending,
    Taken,
    Missed,
    Skipped,
}

impl DoseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Taken => "taken",
            Self::Missed => "missed",
            Self::Skipped => "skipped",
        }
    }

    /// Parse a stored status. Unknown values are rejected, not defaulted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "taken" => Some(Self::Taken),
            "missed" => Some(Self::Missed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// A single medication-taking occurrence, scheduled or actual.
///
/// This is also the JSON body posted to the remote ingress, hence the
/// camelCase field names and the integer `synced` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DoseEvent {
    pub id: String,
    #[serde(alias = "medication_id")]
    pub medication_id: String,
    #[serde(alias = "scheduled_time")]
    pub scheduled_time: DateTime<Utc>,
    #[serde(default, alias = "taken_at", skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    pub status: DoseStatus,
    #[serde(default, alias = "verification_image_url", skip_serializing_if = "Option::is_none")]
    pub verification_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "synced_flag", default)]
    pub synced: bool,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl DoseEvent {
    /// Create an unsynced event stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        medication_id: impl Into<String>,
        scheduled_time: DateTime<Utc>,
        status: DoseStatus,
    ) -> Self {
        Self {
            id: id.into(),
            medication_id: medication_id.into(),
            scheduled_time,
            taken_at: None,
            status,
            verification_image_url: None,
            notes: None,
            synced: false,
            created_at: Utc::now(),
        }
    }

    /// Check the fields the store relies on.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("dose event id is empty".to_string());
        }
        if self.medication_id.trim().is_empty() {
            return Err(format!("dose event {} has no medication id", self.id));
        }
        Ok(())
    }
}

/// An unsynced dose event together with the revision it was read at.
///
/// The revision lets the sync flag flip be conditional on the record not
/// having been rewritten while its delivery was in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDoseEvent {
    pub event: DoseEvent,
    pub revision: i64,
}

/// Cached projection of a server-side medication row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Medication {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub strength: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub timing: Vec<String>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

/// Cached projection of a server-side reminder row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Reminder {
    pub id: String,
    #[serde(alias = "medication_id")]
    pub medication_id: String,
    #[serde(alias = "scheduled_time")]
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub notified: bool,
}

/// The three logical collections of the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    DoseEvents,
    Medications,
    Reminders,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoseEvents => "doseEvents",
            Self::Medications => "medications",
            Self::Reminders => "reminders",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "doseEvents" | "dose-events" | "dose_events" => Some(Self::DoseEvents),
            "medications" => Some(Self::Medications),
            "reminders" => Some(Self::Reminders),
            _ => None,
        }
    }
}

/// A record read back from any collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoredRecord {
    DoseEvent(DoseEvent),
    Medication(Medication),
    Reminder(Reminder),
}

impl StoredRecord {
    pub fn id(&self) -> &str {
        match self {
            Self::DoseEvent(e) => &e.id,
            Self::Medication(m) => &m.id,
            Self::Reminder(r) => &r.id,
        }
    }
}

/// Serde adapter for the boolean-as-integer `synced` flag.
///
/// Writes `0`/`1`; reads either an integer or a JSON boolean.
pub mod synced_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Int(i64),
            Bool(bool),
        }

        match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => Ok(b),
            Flag::Int(0) => Ok(false),
            Flag::Int(1) => Ok(true),
            Flag::Int(other) => Err(serde::de::Error::custom(format!(
                "synced flag must be 0 or 1, got {other}"
            ))),
        }
    }
}
