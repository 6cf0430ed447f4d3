//! Timer ownership and the per-device timer behaviors
//!
//! Every delayed or periodic behavior the engine owns lives in the
//! [`TimerTable`], keyed by `(device id, purpose)` so at most one timer
//! of a given purpose is live per device. Arming an occupied slot aborts
//! the previous task; powering a device off cancels everything it owns.
//!
//! Cancellation is race-free because it only ever happens while the
//! command gate is held: a timer task that has already woken is parked on
//! the gate, which is an abort point, so a cancelled timer never runs its
//! body.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use haven_core::{DataPatch, DeviceKind, EventPriority, SecurityEventDraft};
use haven_device_store::DeviceChange;

use crate::controller::Core;

/// Auto-clear delay applied when a motion sensor has no configured value.
pub(crate) const DEFAULT_AUTO_CLEAR_SECS: u64 = 30;

/// Period of the camera auto-record poll.
pub(crate) const RECORD_POLL_PERIOD: Duration = Duration::from_secs(5);

/// What a timer slot is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TimerPurpose {
    /// Deferred `motion: false` write on a motion sensor.
    MotionClear,
    /// Deferred power-off of a light.
    AutoOff,
    /// Recurring same-room motion check for a camera.
    RecordPoll,
}

/// Table of live timers keyed by `(device id, purpose)`.
pub(crate) struct TimerTable {
    slots: DashMap<(String, TimerPurpose), JoinHandle<()>>,
}

impl TimerTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Arm a slot, aborting whatever previously occupied it.
    pub(crate) fn arm(&self, device_id: &str, purpose: TimerPurpose, handle: JoinHandle<()>) {
        trace!(device_id, ?purpose, "Arming timer");
        if let Some(previous) = self
            .slots
            .insert((device_id.to_string(), purpose), handle)
        {
            previous.abort();
        }
    }

    /// Whether a slot is occupied.
    pub(crate) fn is_armed(&self, device_id: &str, purpose: TimerPurpose) -> bool {
        self.slots
            .contains_key(&(device_id.to_string(), purpose))
    }

    /// Abort and free a slot.
    pub(crate) fn cancel(&self, device_id: &str, purpose: TimerPurpose) {
        if let Some((_, handle)) = self.slots.remove(&(device_id.to_string(), purpose)) {
            trace!(device_id, ?purpose, "Cancelling timer");
            handle.abort();
        }
    }

    /// Abort every timer owned by a device.
    pub(crate) fn cancel_device(&self, device_id: &str) {
        for purpose in [
            TimerPurpose::MotionClear,
            TimerPurpose::AutoOff,
            TimerPurpose::RecordPoll,
        ] {
            self.cancel(device_id, purpose);
        }
    }

    /// Free a slot without aborting; called by a timer task for itself
    /// once it has fired.
    pub(crate) fn release(&self, device_id: &str, purpose: TimerPurpose) {
        self.slots.remove(&(device_id.to_string(), purpose));
    }

    /// Abort everything; engine teardown.
    pub(crate) fn clear(&self) {
        self.slots.retain(|_, handle| {
            handle.abort();
            false
        });
    }
}

impl Core {
    /// Bring a device's timers in line with its post-mutation state.
    ///
    /// Runs after every effective mutation, under the command gate.
    pub(crate) fn sync_device_timers(core: &Arc<Core>, change: &DeviceChange) {
        let device = &change.new;

        if !device.is_on {
            // A powered-off device owns no timers.
            core.timers.cancel_device(&device.id);
            return;
        }

        match device.kind {
            DeviceKind::MotionSensor => Core::sync_motion_clear(core, change),
            DeviceKind::Light => Core::sync_auto_off(core, change),
            DeviceKind::Camera => Core::sync_record_poll(core, change),
            _ => {}
        }
    }

    /// Motion auto-clear: arm on a fresh false→true motion transition.
    fn sync_motion_clear(core: &Arc<Core>, change: &DeviceChange) {
        let device = &change.new;

        if !device.motion_active() {
            core.timers.cancel(&device.id, TimerPurpose::MotionClear);
            return;
        }

        let was_active = change
            .old
            .as_ref()
            .is_some_and(|old| old.is_on && old.motion_active());
        if was_active {
            // Not a fresh transition; the running timer keeps its deadline.
            return;
        }

        let delay = match device.settings.auto_clear_seconds {
            // An explicit zero disables auto-clear entirely.
            Some(0) => return,
            Some(secs) => secs,
            None => DEFAULT_AUTO_CLEAR_SECS,
        };

        debug!(device_id = %device.id, delay, "Arming motion auto-clear");

        let task_core = Arc::clone(core);
        let device_id = device.id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay)).await;

            let _gate = task_core.gate.lock().await;
            task_core
                .timers
                .release(&device_id, TimerPurpose::MotionClear);

            let Some(device) = task_core.store.get(&device_id) else {
                return;
            };
            if !device.is_on || !device.motion_active() {
                return;
            }

            debug!(device_id = %device_id, "Motion auto-clear elapsed");
            if let Some(change) = task_core
                .store
                .update_data(&device_id, DataPatch::motion(false))
            {
                Core::settle(&task_core, &change);
            }
        });

        core.timers.arm(&device.id, TimerPurpose::MotionClear, handle);
    }

    /// Light auto-off: arm on power-on, re-arm on a setting change.
    fn sync_auto_off(core: &Arc<Core>, change: &DeviceChange) {
        let device = &change.new;

        let Some(minutes) = device.settings.auto_off_minutes.filter(|m| *m > 0) else {
            core.timers.cancel(&device.id, TimerPurpose::AutoOff);
            return;
        };

        let was_on = change.old.as_ref().is_some_and(|old| old.is_on);
        let setting_changed = change.old.as_ref().is_some_and(|old| {
            old.settings.auto_off_minutes != device.settings.auto_off_minutes
        });
        if was_on && !setting_changed && core.timers.is_armed(&device.id, TimerPurpose::AutoOff) {
            // An unrelated write while the light stays on must not reset
            // the deadline.
            return;
        }

        debug!(device_id = %device.id, minutes, "Arming light auto-off");

        let task_core = Arc::clone(core);
        let device_id = device.id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(minutes * 60)).await;

            let _gate = task_core.gate.lock().await;
            task_core.timers.release(&device_id, TimerPurpose::AutoOff);

            let Some(device) = task_core.store.get(&device_id) else {
                return;
            };
            if !device.is_on {
                return;
            }

            debug!(device_id = %device_id, "Light auto-off elapsed");
            if let Some(change) = task_core.store.toggle(&device_id) {
                task_core.log.record(SecurityEventDraft::for_device(
                    &change.new,
                    "Auto-off timer completed",
                    EventPriority::Low,
                ));
                Core::settle(&task_core, &change);
            }
        });

        core.timers.arm(&device.id, TimerPurpose::AutoOff, handle);
    }

    /// Camera auto-record: keep one recurring same-room motion poll per
    /// camera that is powered on with `auto_record` enabled.
    fn sync_record_poll(core: &Arc<Core>, change: &DeviceChange) {
        let device = &change.new;

        if device.settings.auto_record != Some(true) {
            core.timers.cancel(&device.id, TimerPurpose::RecordPoll);
            return;
        }
        if core.timers.is_armed(&device.id, TimerPurpose::RecordPoll) {
            // The poll is recurring; arming is idempotent.
            return;
        }

        debug!(device_id = %device.id, "Starting camera auto-record poll");

        let task_core = Arc::clone(core);
        let device_id = device.id.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(RECORD_POLL_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let _gate = task_core.gate.lock().await;
                let Some(camera) = task_core.store.get(&device_id) else {
                    task_core
                        .timers
                        .release(&device_id, TimerPurpose::RecordPoll);
                    return;
                };
                if !camera.is_on || camera.settings.auto_record != Some(true) {
                    task_core
                        .timers
                        .release(&device_id, TimerPurpose::RecordPoll);
                    return;
                }
                if camera.data.recording == Some(true) {
                    continue;
                }

                let motion_in_room = task_core
                    .store
                    .devices_in_room(&camera.room)
                    .into_iter()
                    .any(|d| d.kind == DeviceKind::MotionSensor && d.is_on && d.motion_active());
                if !motion_in_room {
                    continue;
                }

                let Some(change) = task_core
                    .store
                    .update_data(&device_id, DataPatch::recording(true))
                else {
                    continue;
                };

                debug!(device_id = %device_id, "Auto-record started on motion");
                if camera.settings.notify_on_motion == Some(true) {
                    task_core.log.record(SecurityEventDraft::for_device(
                        &change.new,
                        "Motion detected - recording started",
                        EventPriority::Medium,
                    ));
                }
                Core::settle(&task_core, &change);
            }
        });

        core.timers.arm(&device.id, TimerPurpose::RecordPoll, handle);
    }
}
