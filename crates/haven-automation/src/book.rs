//! Rule lifecycle management
//!
//! The RuleBook owns the registered automation rules: explicit add,
//! explicit remove, and an active flag that can be toggled. Rules never
//! self-modify.

use std::sync::RwLock;

use thiserror::Error;
use tracing::info;

use crate::rule::{AutomationRule, RuleConfig};

/// Rule lifecycle errors
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule not found: {0}")]
    NotFound(String),

    #[error("rule with id {0} already exists")]
    Duplicate(String),
}

/// Result type for rule lifecycle operations
pub type RuleResult<T> = Result<T, RuleError>;

/// Manages all registered automation rules
///
/// Rules are kept in registration order; evaluation passes walk them in
/// that order so cascades produce deterministic event sequences.
pub struct RuleBook {
    rules: RwLock<Vec<AutomationRule>>,
}

impl RuleBook {
    /// Create an empty rule book
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Load a batch of rule configs, e.g. the seed rules
    pub fn load(&self, configs: Vec<RuleConfig>) -> RuleResult<()> {
        for config in configs {
            self.add(config)?;
        }
        Ok(())
    }

    /// Register a new rule, returning its id
    pub fn add(&self, config: RuleConfig) -> RuleResult<String> {
        let rule = AutomationRule::from_config(config);
        let id = rule.id.clone();

        let mut rules = self.rules.write().expect("rule lock poisoned");
        if rules.iter().any(|r| r.id == id) {
            return Err(RuleError::Duplicate(id));
        }

        info!(rule_id = %id, name = %rule.name, "Added automation rule");
        rules.push(rule);
        Ok(id)
    }

    /// Remove a rule by id
    pub fn remove(&self, id: &str) -> RuleResult<AutomationRule> {
        let mut rules = self.rules.write().expect("rule lock poisoned");
        let pos = rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| RuleError::NotFound(id.to_string()))?;

        let rule = rules.remove(pos);
        info!(rule_id = %id, name = %rule.name, "Removed automation rule");
        Ok(rule)
    }

    /// Flip a rule's active flag, returning the new state
    pub fn toggle(&self, id: &str) -> RuleResult<bool> {
        let mut rules = self.rules.write().expect("rule lock poisoned");
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RuleError::NotFound(id.to_string()))?;

        rule.active = !rule.active;
        info!(
            rule_id = %id,
            name = %rule.name,
            active = rule.active,
            "Toggled automation rule"
        );
        Ok(rule.active)
    }

    /// Get a rule by id
    pub fn get(&self, id: &str) -> Option<AutomationRule> {
        self.rules
            .read()
            .expect("rule lock poisoned")
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// All rules in registration order
    pub fn all(&self) -> Vec<AutomationRule> {
        self.rules.read().expect("rule lock poisoned").clone()
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.read().expect("rule lock poisoned").len()
    }

    /// Whether no rules are registered
    pub fn is_empty(&self) -> bool {
        self.rules.read().expect("rule lock poisoned").is_empty()
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::new()
    }
}
