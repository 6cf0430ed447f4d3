//! HAVEN engine
//!
//! This crate wires the device store, event log, and automation layer
//! into the [`Controller`], the single in-process API its collaborators
//! (UI, voice parser, settings forms) talk to. It also owns everything
//! time-driven: the per-device timer table (motion auto-clear, light
//! auto-off, camera auto-record polling) and the background environment
//! simulator.
//!
//! # Guarantees
//!
//! - Every mutation source is serialized through one command gate; a
//!   command returns only after its mutation, the timer re-evaluation,
//!   and the full rule cascade have completed.
//! - At most one timer of a given purpose is live per device; arming
//!   supersedes, powering off cancels, and a cancelled timer never fires.
//! - Rule cascades terminate: passes that apply nothing end the chain,
//!   and a pass budget bounds pathological rule cycles.

mod controller;
pub mod seed;
mod simulator;
mod timers;

pub use controller::Controller;
