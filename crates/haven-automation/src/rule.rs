//! Automation rule model
//!
//! A rule ties a single condition clause to a single action clause. The
//! condition is a read-only comparison against one device, the action is
//! a write to one device; both reference their device by id, and a
//! reference to a device that does not exist makes the rule inert rather
//! than erroring.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use haven_core::{StateKey, StateValue};

/// One side of a rule: a `(device, state-key, value)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleClause {
    /// Device the clause reads from or writes to.
    pub device_id: String,
    /// `isOn` addresses the power state; every other key addresses the
    /// device's data bag.
    #[serde(rename = "state")]
    pub key: StateKey,
    pub value: StateValue,
}

/// Rule configuration as authored by a form or programmatic caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique id; auto-generated when not provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable name, used to attribute automated changes.
    pub name: String,

    pub condition: RuleClause,

    pub action: RuleClause,

    /// Whether the rule participates in evaluation passes.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A registered automation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: String,
    pub name: String,
    pub condition: RuleClause,
    pub action: RuleClause,
    pub active: bool,
}

impl AutomationRule {
    /// Create from config, assigning a ULID when no id was provided.
    pub fn from_config(config: RuleConfig) -> Self {
        let id = config.id.unwrap_or_else(|| Ulid::new().to_string());
        Self {
            id,
            name: config.name,
            condition: config.condition,
            action: config.action,
            active: config.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_parses_wire_form() {
        let config: RuleConfig = serde_json::from_value(json!({
            "name": "Turn on lights when motion detected",
            "condition": { "deviceId": "motion-1", "state": "motion", "value": true },
            "action": { "deviceId": "light-1", "state": "isOn", "value": true }
        }))
        .unwrap();

        assert_eq!(config.condition.device_id, "motion-1");
        assert_eq!(config.condition.key, StateKey::Motion);
        assert_eq!(config.condition.value, StateValue::Bool(true));
        assert_eq!(config.action.key, StateKey::IsOn);
        assert!(config.active);
    }

    #[test]
    fn test_from_config_assigns_ulid() {
        let config: RuleConfig = serde_json::from_value(json!({
            "name": "Night setback",
            "condition": { "deviceId": "thermostat-1", "state": "targetTemp", "value": 22 },
            "action": { "deviceId": "thermostat-1", "state": "targetTemp", "value": 19 },
            "active": false
        }))
        .unwrap();

        let rule = AutomationRule::from_config(config);
        assert!(!rule.active);
        assert_eq!(rule.id.len(), 26);
        assert_eq!(rule.condition.value, StateValue::Number(22.0));
    }
}
