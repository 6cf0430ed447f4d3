//! Security event records owned by the event log

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::{Device, DeviceKind};

/// Priority of a security event.
///
/// Medium and high priority events are forwarded to the notification
/// sinks; low priority events are logged silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    Low,
    Medium,
    High,
}

impl fmt::Display for EventPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventPriority::Low => "low",
            EventPriority::Medium => "medium",
            EventPriority::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// An immutable entry in the security event log.
///
/// Events are ordered newest-first and only ever removed by clearing the
/// whole log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Unique identifier (ULID, creation-time ordered).
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    pub device_kind: DeviceKind,
    pub room: String,
    /// Free-text description of what happened.
    pub description: String,
    pub priority: EventPriority,
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    /// Materialize a draft with a fresh ULID and the current time.
    pub fn from_draft(draft: SecurityEventDraft) -> Self {
        Self {
            id: Ulid::new().to_string(),
            device_id: draft.device_id,
            device_name: draft.device_name,
            device_kind: draft.device_kind,
            room: draft.room,
            description: draft.description,
            priority: draft.priority,
            timestamp: Utc::now(),
        }
    }
}

/// A security event before the log assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEventDraft {
    pub device_id: String,
    pub device_name: String,
    pub device_kind: DeviceKind,
    pub room: String,
    pub description: String,
    pub priority: EventPriority,
}

impl SecurityEventDraft {
    /// Draft attributed to `device`.
    pub fn for_device(
        device: &Device,
        description: impl Into<String>,
        priority: EventPriority,
    ) -> Self {
        Self {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            device_kind: device.kind,
            room: device.room.clone(),
            description: description.into(),
            priority,
        }
    }
}
