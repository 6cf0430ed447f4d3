//! Seed catalog
//!
//! The fixed device set and starter rules a session begins with. Devices
//! are created once here and then only ever mutated through the store.

use haven_automation::{RuleClause, RuleConfig};
use haven_core::{
    ClimateMode, Device, DeviceData, DeviceKind, DeviceSettings, Sensitivity, StateKey, StateValue,
};

/// The default device set: a small home with three lights, a climate
/// unit, an entry motion sensor, a front-door camera and lock, a
/// thermostat, a smart plug, and an environment sensor.
pub fn default_devices() -> Vec<Device> {
    vec![
        Device {
            id: "light-1".to_string(),
            name: "Living Room Ceiling Light".to_string(),
            kind: DeviceKind::Light,
            room: "Living Room".to_string(),
            is_on: false,
            data: DeviceData {
                brightness: Some(80.0),
                ..DeviceData::default()
            },
            settings: DeviceSettings {
                default_brightness: Some(80.0),
                auto_off_minutes: Some(0),
                ..DeviceSettings::default()
            },
        },
        Device {
            id: "light-2".to_string(),
            name: "Kitchen Light".to_string(),
            kind: DeviceKind::Light,
            room: "Kitchen".to_string(),
            is_on: false,
            data: DeviceData {
                brightness: Some(100.0),
                ..DeviceData::default()
            },
            settings: DeviceSettings {
                default_brightness: Some(100.0),
                auto_off_minutes: Some(0),
                ..DeviceSettings::default()
            },
        },
        Device {
            id: "light-3".to_string(),
            name: "Bedroom Light".to_string(),
            kind: DeviceKind::Light,
            room: "Bedroom".to_string(),
            is_on: false,
            data: DeviceData {
                brightness: Some(60.0),
                ..DeviceData::default()
            },
            settings: DeviceSettings {
                default_brightness: Some(60.0),
                auto_off_minutes: Some(0),
                ..DeviceSettings::default()
            },
        },
        Device {
            id: "ac-1".to_string(),
            name: "Living Room AC".to_string(),
            kind: DeviceKind::Climate,
            room: "Living Room".to_string(),
            is_on: false,
            data: DeviceData {
                temperature: Some(23.0),
                mode: Some(ClimateMode::Cooling),
                ..DeviceData::default()
            },
            settings: DeviceSettings {
                default_temp: Some(23.0),
                default_mode: Some(ClimateMode::Cooling),
                ..DeviceSettings::default()
            },
        },
        Device {
            id: "motion-1".to_string(),
            name: "Entry Motion Sensor".to_string(),
            kind: DeviceKind::MotionSensor,
            room: "Entry".to_string(),
            is_on: true,
            data: DeviceData {
                motion: Some(false),
                ..DeviceData::default()
            },
            settings: DeviceSettings {
                sensitivity: Some(Sensitivity::Medium),
                auto_clear_seconds: Some(30),
                ..DeviceSettings::default()
            },
        },
        Device {
            id: "camera-1".to_string(),
            name: "Front Door Camera".to_string(),
            kind: DeviceKind::Camera,
            room: "Outside".to_string(),
            is_on: true,
            data: DeviceData {
                recording: Some(true),
                ..DeviceData::default()
            },
            settings: DeviceSettings {
                auto_record: Some(false),
                notify_on_motion: Some(true),
                ..DeviceSettings::default()
            },
        },
        Device {
            id: "lock-1".to_string(),
            name: "Front Door Lock".to_string(),
            kind: DeviceKind::Lock,
            room: "Entry".to_string(),
            is_on: true,
            data: DeviceData {
                locked: Some(true),
                ..DeviceData::default()
            },
            settings: DeviceSettings::default(),
        },
        Device {
            id: "thermostat-1".to_string(),
            name: "Main Thermostat".to_string(),
            kind: DeviceKind::Thermostat,
            room: "Living Room".to_string(),
            is_on: true,
            data: DeviceData {
                temperature: Some(22.0),
                target_temp: Some(22.0),
                mode: Some(ClimateMode::Cooling),
                ..DeviceData::default()
            },
            settings: DeviceSettings {
                default_temp: Some(22.0),
                default_mode: Some(ClimateMode::Cooling),
                ..DeviceSettings::default()
            },
        },
        Device {
            id: "plug-1".to_string(),
            name: "TV Smart Plug".to_string(),
            kind: DeviceKind::SmartPlug,
            room: "Living Room".to_string(),
            is_on: false,
            data: DeviceData::default(),
            settings: DeviceSettings::default(),
        },
        Device {
            id: "sensor-1".to_string(),
            name: "Living Room Environmental Sensor".to_string(),
            kind: DeviceKind::EnvSensor,
            room: "Living Room".to_string(),
            is_on: true,
            data: DeviceData {
                temperature: Some(23.0),
                humidity: Some(45.0),
                ..DeviceData::default()
            },
            settings: DeviceSettings::default(),
        },
    ]
}

/// The starter rules: lights follow the entry motion sensor. Only the
/// turn-off rule starts active.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            id: Some("rule-1".to_string()),
            name: "Turn off lights when no motion".to_string(),
            condition: RuleClause {
                device_id: "motion-1".to_string(),
                key: StateKey::Motion,
                value: StateValue::Bool(false),
            },
            action: RuleClause {
                device_id: "light-1".to_string(),
                key: StateKey::IsOn,
                value: StateValue::Bool(false),
            },
            active: true,
        },
        RuleConfig {
            id: Some("rule-2".to_string()),
            name: "Turn on lights when motion detected".to_string(),
            condition: RuleClause {
                device_id: "motion-1".to_string(),
                key: StateKey::Motion,
                value: StateValue::Bool(true),
            },
            action: RuleClause {
                device_id: "light-1".to_string(),
                key: StateKey::IsOn,
                value: StateValue::Bool(true),
            },
            active: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_ids_are_unique() {
        let devices = default_devices();
        let mut ids: Vec<_> = devices.iter().map(|d| d.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), devices.len());
        assert_eq!(devices.len(), 10);
    }

    #[test]
    fn test_seed_rules_reference_seeded_devices() {
        let devices = default_devices();
        for rule in default_rules() {
            assert!(devices.iter().any(|d| d.id == rule.condition.device_id));
            assert!(devices.iter().any(|d| d.id == rule.action.device_id));
        }
    }
}
