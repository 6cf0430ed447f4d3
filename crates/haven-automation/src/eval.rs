//! Rule-pass planning
//!
//! The planner turns the current device state plus the registered rules
//! into a list of planned steps, at most one per rule per pass. Planning
//! is read-only; the engine applies the steps and re-checks each target
//! against live state at apply time, so a step that raced against an
//! earlier step in the same pass degrades to a no-op instead of a
//! duplicate mutation.

use std::sync::Arc;

use tracing::trace;

use haven_core::{DataPatch, StateKey, StateValue};
use haven_device_store::DeviceStore;

use crate::rule::AutomationRule;

/// A single mutation a rule wants applied.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedStep {
    /// Bring the target's power state to the given value.
    SetPower(bool),
    /// Write one data key on the target.
    SetData { key: StateKey, value: StateValue },
}

/// One rule's planned action for the current pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAction {
    pub rule_id: String,
    pub rule_name: String,
    /// Device the step mutates.
    pub device_id: String,
    pub step: PlannedStep,
}

impl PlannedAction {
    /// Log-line description of the automated change, attributed to the rule.
    pub fn event_description(&self) -> String {
        match &self.step {
            PlannedStep::SetPower(true) => {
                format!("Automated: Turned ON by rule \"{}\"", self.rule_name)
            }
            PlannedStep::SetPower(false) => {
                format!("Automated: Turned OFF by rule \"{}\"", self.rule_name)
            }
            PlannedStep::SetData { key, value } => format!(
                "Automated: {} changed to {} by rule \"{}\"",
                key, value, self.rule_name
            ),
        }
    }

    /// The typed data patch for a `SetData` step.
    pub fn data_patch(&self) -> Option<DataPatch> {
        match &self.step {
            PlannedStep::SetPower(_) => None,
            PlannedStep::SetData { key, value } => DataPatch::for_key(*key, *value),
        }
    }
}

/// Plans rule passes against the device store.
pub struct RulePlanner {
    store: Arc<DeviceStore>,
}

impl RulePlanner {
    /// Create a planner reading from the given store
    pub fn new(store: Arc<DeviceStore>) -> Self {
        Self { store }
    }

    /// Plan one evaluation pass over the given rules
    ///
    /// Rules are visited in order; each active rule contributes at most
    /// one step. Rules whose condition or action device is missing are
    /// inert, and rules whose action target already holds the desired
    /// value plan nothing, which is what lets cascades reach a fixed
    /// point.
    pub fn plan_pass(&self, rules: &[AutomationRule]) -> Vec<PlannedAction> {
        rules
            .iter()
            .filter(|rule| rule.active)
            .filter_map(|rule| self.plan_rule(rule))
            .collect()
    }

    fn plan_rule(&self, rule: &AutomationRule) -> Option<PlannedAction> {
        let condition_device = self.store.get(&rule.condition.device_id)?;
        let target = self.store.get(&rule.action.device_id)?;

        // Strict typed equality; a missing key or a stored value of the
        // wrong type never matches.
        let current = condition_device.value(rule.condition.key)?;
        if current != rule.condition.value {
            return None;
        }

        let step = match rule.action.key {
            StateKey::IsOn => {
                let StateValue::Bool(desired) = rule.action.value else {
                    return None;
                };
                if target.is_on == desired {
                    return None;
                }
                PlannedStep::SetPower(desired)
            }
            key => {
                // Only keys the target's bag already carries are writable
                // by a rule, and writing the value it already holds is a
                // planned no-op.
                let stored = target.value(key)?;
                if stored == rule.action.value {
                    return None;
                }
                DataPatch::for_key(key, rule.action.value)?;
                PlannedStep::SetData {
                    key,
                    value: rule.action.value,
                }
            }
        };

        trace!(rule_id = %rule.id, device_id = %target.id, ?step, "Planned rule step");

        Some(PlannedAction {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            device_id: target.id.clone(),
            step,
        })
    }
}
