//! Core types for the HAVEN smart-home engine
//!
//! This crate provides the fundamental types used throughout HAVEN:
//! the device model with its typed state bags, security event records,
//! the rule-addressable state vocabulary, and the event bus envelope.

mod device;
mod event;
mod security_event;

pub use device::{
    ClimateMode, DataPatch, Device, DeviceData, DeviceKind, DeviceSettings, Sensitivity,
    SettingsPatch, StateKey, StateValue, UnknownStateKey,
};
pub use event::{Event, EventData, EventType};
pub use security_event::{EventPriority, SecurityEvent, SecurityEventDraft};

/// Standard event types fired on the HAVEN event bus
pub mod events {
    use serde::{Deserialize, Serialize};

    use crate::{Device, EventData, SecurityEvent};

    /// Event type for device state changes
    pub const DEVICE_CHANGED: &str = "device_changed";

    /// Event type for new security event log entries
    pub const SECURITY_EVENT_RECORDED: &str = "security_event_recorded";

    /// Event type for automation rule actions that mutated state
    pub const RULE_FIRED: &str = "rule_fired";

    /// Data for DEVICE_CHANGED events
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DeviceChangedData {
        pub device_id: String,
        /// `None` when the device was just registered.
        pub old: Option<Device>,
        pub new: Device,
    }

    impl EventData for DeviceChangedData {
        fn event_type() -> &'static str {
            DEVICE_CHANGED
        }
    }

    /// Data for SECURITY_EVENT_RECORDED events
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SecurityEventRecordedData {
        pub event: SecurityEvent,
    }

    impl EventData for SecurityEventRecordedData {
        fn event_type() -> &'static str {
            SECURITY_EVENT_RECORDED
        }
    }

    /// Data for RULE_FIRED events
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RuleFiredData {
        pub rule_id: String,
        pub rule_name: String,
        /// Device the rule's action mutated.
        pub device_id: String,
    }

    impl EventData for RuleFiredData {
        fn event_type() -> &'static str {
            RULE_FIRED
        }
    }
}
