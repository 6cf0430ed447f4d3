//! The HAVEN controller
//!
//! The controller is the single entry point its collaborators (UI, voice
//! parser, settings forms) use to read and mutate the smart home. Every
//! mutation source (external command, rule action, timer firing,
//! simulator tick) is serialized through one command gate, and a command
//! only returns once its mutation, the timer re-evaluation, and the full
//! rule cascade it caused have settled. Events therefore land in the log
//! in causal order: the manual change first, then first-order rule and
//! timer effects, then theirs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use haven_automation::{
    AutomationRule, PlannedAction, PlannedStep, RuleBook, RuleConfig, RulePlanner, RuleResult,
};
use haven_core::events::RuleFiredData;
use haven_core::{
    DataPatch, Device, DeviceKind, EventPriority, SecurityEvent, SecurityEventDraft, SettingsPatch,
};
use haven_device_store::{DeviceChange, DeviceStore};
use haven_event_bus::EventBus;
use haven_event_log::EventLog;

use crate::seed;
use crate::timers::TimerTable;

/// Upper bound on planner passes per logical change.
///
/// The rule language has no cycle breaker, so mutually re-triggering
/// rules can oscillate; the budget bounds what one external stimulus can
/// cost. Hitting it logs a warning and abandons the rest of the cascade.
pub(crate) const CASCADE_PASS_LIMIT: usize = 8;

/// Shared engine state behind the [`Controller`] handle.
pub(crate) struct Core {
    pub(crate) bus: Arc<EventBus>,
    pub(crate) store: Arc<DeviceStore>,
    pub(crate) log: Arc<EventLog>,
    pub(crate) rules: Arc<RuleBook>,
    pub(crate) planner: RulePlanner,
    pub(crate) timers: TimerTable,
    /// Serializes every mutation source; see the crate-level notes.
    pub(crate) gate: Mutex<()>,
    pub(crate) shutdown_tx: broadcast::Sender<()>,
    pub(crate) running: AtomicBool,
}

impl Core {
    /// Timer re-evaluation plus the rule cascade for one applied change.
    pub(crate) fn settle(core: &Arc<Core>, change: &DeviceChange) {
        Core::sync_device_timers(core, change);
        Core::run_cascade(core);
    }

    /// Run planner passes until a pass applies nothing, or the budget
    /// runs out.
    pub(crate) fn run_cascade(core: &Arc<Core>) {
        for _ in 0..CASCADE_PASS_LIMIT {
            let rules = core.rules.all();
            let planned = core.planner.plan_pass(&rules);

            let mut applied = 0usize;
            for action in &planned {
                if Core::apply_planned(core, action) {
                    applied += 1;
                }
            }
            if applied == 0 {
                return;
            }
        }
        warn!(
            limit = CASCADE_PASS_LIMIT,
            "Rule cascade exceeded its pass budget; abandoning the remainder"
        );
    }

    /// Apply one planned rule step, re-checked against live state.
    ///
    /// Returns whether a mutation was actually applied; only then is the
    /// low-priority attribution event recorded.
    fn apply_planned(core: &Arc<Core>, action: &PlannedAction) -> bool {
        let Some(target) = core.store.get(&action.device_id) else {
            return false;
        };

        let change = match &action.step {
            PlannedStep::SetPower(desired) => {
                // An earlier step in this pass may have satisfied it already.
                if target.is_on == *desired {
                    return false;
                }
                core.store.toggle(&action.device_id)
            }
            PlannedStep::SetData { .. } => match action.data_patch() {
                Some(patch) => core.store.update_data(&action.device_id, patch),
                None => return false,
            },
        };
        let Some(change) = change else {
            return false;
        };

        debug!(
            rule = %action.rule_name,
            device_id = %action.device_id,
            "Applied automation rule action"
        );

        core.log.record(SecurityEventDraft::for_device(
            &change.new,
            action.event_description(),
            EventPriority::Low,
        ));
        core.bus.fire_typed(RuleFiredData {
            rule_id: action.rule_id.clone(),
            rule_name: action.rule_name.clone(),
            device_id: action.device_id.clone(),
        });
        Core::sync_device_timers(core, &change);

        true
    }
}

/// Handle to the smart-home engine.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct Controller {
    core: Arc<Core>,
}

impl Controller {
    /// Create an engine with no devices or rules.
    pub fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let store = Arc::new(DeviceStore::new(bus.clone()));
        let log = Arc::new(EventLog::new(bus.clone()));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            core: Arc::new(Core {
                planner: RulePlanner::new(store.clone()),
                bus,
                store,
                log,
                rules: Arc::new(RuleBook::new()),
                timers: TimerTable::new(),
                gate: Mutex::new(()),
                shutdown_tx,
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Create an engine populated with the seed catalog and starter rules.
    pub async fn seeded() -> Self {
        let controller = Self::new();
        controller
            .load(seed::default_devices(), seed::default_rules())
            .await
            .expect("seed catalog rule ids are unique");
        controller
    }

    /// Register a batch of devices and rules, then settle once.
    pub async fn load(&self, devices: Vec<Device>, rules: Vec<RuleConfig>) -> RuleResult<()> {
        let _gate = self.core.gate.lock().await;

        for device in devices {
            let change = self.core.store.add(device);
            Core::sync_device_timers(&self.core, &change);
        }
        self.core.rules.load(rules)?;
        Core::run_cascade(&self.core);
        Ok(())
    }

    /// The event bus collaborators may subscribe to.
    pub fn bus(&self) -> Arc<EventBus> {
        self.core.bus.clone()
    }

    /// Register a `(title, body)` notification sink for medium/high
    /// priority events. Sinks are invoked inline while the command that
    /// produced the event is settling; keep them lightweight.
    pub fn on_notification(&self, sink: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.core.log.add_sink(sink);
    }

    // ── Queries ──

    /// Current device list, registration-ordered.
    pub fn list_devices(&self) -> Vec<Device> {
        self.core.store.snapshot()
    }

    /// Security events, newest first.
    pub fn list_events(&self) -> Vec<SecurityEvent> {
        self.core.log.all()
    }

    /// Registered automation rules, registration-ordered.
    pub fn list_rules(&self) -> Vec<AutomationRule> {
        self.core.rules.all()
    }

    // ── Commands ──

    /// Register a single device.
    pub async fn add_device(&self, device: Device) {
        let _gate = self.core.gate.lock().await;
        let change = self.core.store.add(device);
        Core::settle(&self.core, &change);
    }

    /// Flip a device's power state. Unknown ids are a silent no-op.
    pub async fn toggle_device(&self, device_id: &str) {
        let _gate = self.core.gate.lock().await;
        if let Some(change) = self.core.store.toggle(device_id) {
            Core::settle(&self.core, &change);
        }
    }

    /// Merge a patch into a device's data bag. Unknown ids are a silent
    /// no-op; a patch that changes nothing settles nothing.
    pub async fn update_device_data(&self, device_id: &str, patch: DataPatch) {
        let _gate = self.core.gate.lock().await;
        if let Some(change) = self.core.store.update_data(device_id, patch) {
            Core::settle(&self.core, &change);
        }
    }

    /// Merge a patch into a device's settings bag.
    pub async fn update_device_settings(&self, device_id: &str, patch: SettingsPatch) {
        let _gate = self.core.gate.lock().await;
        if let Some(change) = self.core.store.update_settings(device_id, patch) {
            Core::settle(&self.core, &change);
        }
    }

    /// Record an externally observed security event.
    pub async fn record_security_event(&self, draft: SecurityEventDraft) -> SecurityEvent {
        let _gate = self.core.gate.lock().await;
        self.core.log.record(draft)
    }

    /// Empty the security event log.
    pub async fn clear_events(&self) {
        let _gate = self.core.gate.lock().await;
        self.core.log.clear();
    }

    /// Register a rule; it participates in evaluation immediately.
    pub async fn add_rule(&self, config: RuleConfig) -> RuleResult<String> {
        let _gate = self.core.gate.lock().await;
        let id = self.core.rules.add(config)?;
        Core::run_cascade(&self.core);
        Ok(id)
    }

    /// Remove a rule by id.
    pub async fn remove_rule(&self, rule_id: &str) -> RuleResult<AutomationRule> {
        let _gate = self.core.gate.lock().await;
        self.core.rules.remove(rule_id)
    }

    /// Flip a rule's active flag; an activated rule is evaluated
    /// immediately.
    pub async fn toggle_rule(&self, rule_id: &str) -> RuleResult<bool> {
        let _gate = self.core.gate.lock().await;
        let active = self.core.rules.toggle(rule_id)?;
        if active {
            Core::run_cascade(&self.core);
        }
        Ok(active)
    }

    /// Lock or unlock a lock device, recording the security event an
    /// operator would expect: unlocking is notice-worthy, locking is not.
    pub async fn set_locked(&self, device_id: &str, locked: bool) {
        let _gate = self.core.gate.lock().await;
        let Some(device) = self.core.store.get(device_id) else {
            return;
        };
        if device.kind != DeviceKind::Lock {
            return;
        }
        let Some(change) = self.core.store.update_data(device_id, DataPatch::locked(locked))
        else {
            return;
        };

        let (description, priority) = if locked {
            ("Door locked", EventPriority::Low)
        } else {
            ("Door unlocked", EventPriority::Medium)
        };
        self.core.log.record(SecurityEventDraft::for_device(
            &change.new,
            description,
            priority,
        ));
        Core::settle(&self.core, &change);
    }

    /// Manual motion impulse on a powered-on, currently clear motion
    /// sensor: reports motion, records the notice, and arms the standard
    /// auto-clear timer.
    pub async fn trigger_motion(&self, device_id: &str) {
        let _gate = self.core.gate.lock().await;
        let Some(device) = self.core.store.get(device_id) else {
            return;
        };
        if device.kind != DeviceKind::MotionSensor || !device.is_on || device.motion_active() {
            return;
        }
        let Some(change) = self.core.store.update_data(device_id, DataPatch::motion(true))
        else {
            return;
        };

        self.core.log.record(SecurityEventDraft::for_device(
            &change.new,
            "Motion detected",
            EventPriority::Medium,
        ));
        Core::settle(&self.core, &change);
    }

    // ── Lifecycle ──

    /// Start the background environment simulator.
    pub fn start(&self) {
        if self.core.running.swap(true, Ordering::SeqCst) {
            warn!("Engine already running");
            return;
        }
        info!("Starting environment simulator");
        let _ = Core::spawn_simulator(&self.core);
    }

    /// Stop the simulator and tear down every timer.
    pub fn stop(&self) {
        if !self.core.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Stopping engine");
        let _ = self.core.shutdown_tx.send(());
        self.core.timers.clear();
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &Arc<Core> {
        &self.core
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}
