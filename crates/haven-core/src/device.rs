//! Device model: kinds, typed state bags, and the rule-addressable keys

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed set of device categories.
///
/// The kind determines which `data` and `settings` fields are meaningful
/// for a device; the engine itself only ever writes fields a device
/// already carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Light,
    /// Standalone climate unit (window AC or similar).
    Climate,
    MotionSensor,
    Camera,
    Lock,
    Thermostat,
    SmartPlug,
    /// Combined temperature/humidity sensor.
    EnvSensor,
}

impl DeviceKind {
    /// Human-readable label used in event descriptions and logs.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Light => "light",
            DeviceKind::Climate => "climate unit",
            DeviceKind::MotionSensor => "motion sensor",
            DeviceKind::Camera => "camera",
            DeviceKind::Lock => "lock",
            DeviceKind::Thermostat => "thermostat",
            DeviceKind::SmartPlug => "smart plug",
            DeviceKind::EnvSensor => "environment sensor",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Operating mode of climate devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClimateMode {
    Cooling,
    Heating,
    Off,
}

/// Motion sensor sensitivity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

/// Kind-specific mutable state of a device.
///
/// Every recognized key is an explicit field; a `None` field means the key
/// is absent from the device's bag. Field names serialize in their
/// camelCase wire form (`targetTemp`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ClimateMode>,
}

impl DeviceData {
    /// Shallow-merge `patch` into the bag: each present key replaces the
    /// stored value wholesale, absent keys are left untouched.
    pub fn merge(&mut self, patch: &DataPatch) {
        if let Some(v) = patch.brightness {
            self.brightness = Some(v);
        }
        if let Some(v) = patch.temperature {
            self.temperature = Some(v);
        }
        if let Some(v) = patch.humidity {
            self.humidity = Some(v);
        }
        if let Some(v) = patch.motion {
            self.motion = Some(v);
        }
        if let Some(v) = patch.locked {
            self.locked = Some(v);
        }
        if let Some(v) = patch.recording {
            self.recording = Some(v);
        }
        if let Some(v) = patch.target_temp {
            self.target_temp = Some(v);
        }
        if let Some(v) = patch.mode {
            self.mode = Some(v);
        }
    }
}

/// Partial update over [`DeviceData`]; only `Some` fields are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ClimateMode>,
}

impl DataPatch {
    /// Patch that writes only `motion`.
    pub fn motion(value: bool) -> Self {
        Self {
            motion: Some(value),
            ..Self::default()
        }
    }

    /// Patch that writes only `locked`.
    pub fn locked(value: bool) -> Self {
        Self {
            locked: Some(value),
            ..Self::default()
        }
    }

    /// Patch that writes only `recording`.
    pub fn recording(value: bool) -> Self {
        Self {
            recording: Some(value),
            ..Self::default()
        }
    }

    /// Typed single-key patch for a rule action.
    ///
    /// Returns `None` when the key is the power state (handled by toggling,
    /// not by a data write) or when the value's type does not fit the key.
    pub fn for_key(key: StateKey, value: StateValue) -> Option<Self> {
        let mut patch = Self::default();
        match (key, value) {
            (StateKey::Brightness, StateValue::Number(n)) => patch.brightness = Some(n),
            (StateKey::Temperature, StateValue::Number(n)) => patch.temperature = Some(n),
            (StateKey::Humidity, StateValue::Number(n)) => patch.humidity = Some(n),
            (StateKey::TargetTemp, StateValue::Number(n)) => patch.target_temp = Some(n),
            (StateKey::Motion, StateValue::Bool(b)) => patch.motion = Some(b),
            (StateKey::Locked, StateValue::Bool(b)) => patch.locked = Some(b),
            (StateKey::Recording, StateValue::Bool(b)) => patch.recording = Some(b),
            _ => return None,
        }
        Some(patch)
    }
}

/// Kind-specific configuration of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_record: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_on_motion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_clear_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_off_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<ClimateMode>,
}

impl DeviceSettings {
    /// Shallow-merge, same semantics as [`DeviceData::merge`].
    pub fn merge(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.auto_record {
            self.auto_record = Some(v);
        }
        if let Some(v) = patch.notify_on_motion {
            self.notify_on_motion = Some(v);
        }
        if let Some(v) = patch.auto_clear_seconds {
            self.auto_clear_seconds = Some(v);
        }
        if let Some(v) = patch.sensitivity {
            self.sensitivity = Some(v);
        }
        if let Some(v) = patch.default_brightness {
            self.default_brightness = Some(v);
        }
        if let Some(v) = patch.auto_off_minutes {
            self.auto_off_minutes = Some(v);
        }
        if let Some(v) = patch.default_temp {
            self.default_temp = Some(v);
        }
        if let Some(v) = patch.default_mode {
            self.default_mode = Some(v);
        }
    }
}

/// Partial update over [`DeviceSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_record: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_on_motion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_clear_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_off_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<ClimateMode>,
}

impl SettingsPatch {
    /// Patch that writes only `auto_record`.
    pub fn auto_record(value: bool) -> Self {
        Self {
            auto_record: Some(value),
            ..Self::default()
        }
    }

    /// Patch that writes only `auto_off_minutes`.
    pub fn auto_off_minutes(value: u64) -> Self {
        Self {
            auto_off_minutes: Some(value),
            ..Self::default()
        }
    }
}

/// State keys a rule clause may address.
///
/// `IsOn` reads the power switch; every other key reads the device's data
/// bag. The climate `mode` is deliberately absent: rule values are
/// booleans or numbers, so a clause over the mode could never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateKey {
    IsOn,
    Brightness,
    Temperature,
    Humidity,
    Motion,
    Locked,
    Recording,
    TargetTemp,
}

impl StateKey {
    /// Wire name of the key (`isOn`, `targetTemp`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::IsOn => "isOn",
            StateKey::Brightness => "brightness",
            StateKey::Temperature => "temperature",
            StateKey::Humidity => "humidity",
            StateKey::Motion => "motion",
            StateKey::Locked => "locked",
            StateKey::Recording => "recording",
            StateKey::TargetTemp => "targetTemp",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for state key names that are not part of the recognized set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown state key: {0}")]
pub struct UnknownStateKey(pub String);

impl FromStr for StateKey {
    type Err = UnknownStateKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "isOn" => Ok(StateKey::IsOn),
            "brightness" => Ok(StateKey::Brightness),
            "temperature" => Ok(StateKey::Temperature),
            "humidity" => Ok(StateKey::Humidity),
            "motion" => Ok(StateKey::Motion),
            "locked" => Ok(StateKey::Locked),
            "recording" => Ok(StateKey::Recording),
            "targetTemp" => Ok(StateKey::TargetTemp),
            other => Err(UnknownStateKey(other.to_string())),
        }
    }
}

/// A typed rule value.
///
/// Comparison is strict in both type and value: a boolean never equals a
/// number, and numbers carry no tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Number(f64),
}

impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        StateValue::Bool(v)
    }
}

impl From<f64> for StateValue {
    fn from(v: f64) -> Self {
        StateValue::Number(v)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Bool(b) => write!(f, "{}", b),
            StateValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A virtual smart-home device.
///
/// Devices are created once at session start and only ever mutated through
/// the device store; they are never deleted during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Stable unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    pub kind: DeviceKind,
    /// Free-form room label.
    pub room: String,
    /// Power state; `isOn` in rule clauses.
    pub is_on: bool,
    #[serde(default)]
    pub data: DeviceData,
    #[serde(default)]
    pub settings: DeviceSettings,
}

impl Device {
    /// Read the value behind a rule-addressable key.
    ///
    /// Returns `None` when the device's bag does not carry the key; a rule
    /// clause over a missing key is simply never satisfied.
    pub fn value(&self, key: StateKey) -> Option<StateValue> {
        match key {
            StateKey::IsOn => Some(StateValue::Bool(self.is_on)),
            StateKey::Brightness => self.data.brightness.map(StateValue::Number),
            StateKey::Temperature => self.data.temperature.map(StateValue::Number),
            StateKey::Humidity => self.data.humidity.map(StateValue::Number),
            StateKey::Motion => self.data.motion.map(StateValue::Bool),
            StateKey::Locked => self.data.locked.map(StateValue::Bool),
            StateKey::Recording => self.data.recording.map(StateValue::Bool),
            StateKey::TargetTemp => self.data.target_temp.map(StateValue::Number),
        }
    }

    /// Whether the device currently reports motion.
    pub fn motion_active(&self) -> bool {
        self.data.motion == Some(true)
    }
}
