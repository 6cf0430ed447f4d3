//! Automation rules for HAVEN
//!
//! This crate provides the automation layer: user-defined rules that
//! watch one device's state and, when it matches, drive another device's
//! state.
//!
//! # Architecture
//!
//! ```text
//! RULE = CONDITION (read one device) → ACTION (write one device)
//! ```
//!
//! - [`AutomationRule`] - a condition/action pair with an active flag
//! - [`RuleBook`] - lifecycle manager: add, remove, toggle
//! - [`RulePlanner`] - plans at most one step per rule against the
//!   current device snapshot; the engine applies the steps and feeds the
//!   resulting mutations back in until the cascade reaches a fixed point

pub mod book;
pub mod eval;
pub mod rule;

pub use book::{RuleBook, RuleError, RuleResult};
pub use eval::{PlannedAction, PlannedStep, RulePlanner};
pub use rule::{AutomationRule, RuleClause, RuleConfig};
