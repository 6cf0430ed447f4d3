//! Background environment simulator
//!
//! A periodic process that stands in for the physical world: it perturbs
//! sensor readings and occasionally trips motion sensors, driving the
//! same mutation path a real sensor integration would.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use haven_core::{DataPatch, DeviceKind, EventPriority, SecurityEventDraft};

use crate::controller::Core;

/// How often the simulator wakes up.
pub(crate) const SIMULATOR_PERIOD: Duration = Duration::from_secs(10);

/// Probability that a tick perturbs anything at all.
const TICK_CHANCE: f64 = 0.1;

/// Readings assumed for a sensor whose bag is missing them.
const TEMPERATURE_FALLBACK: f64 = 22.0;
const HUMIDITY_FALLBACK: f64 = 45.0;

const HUMIDITY_MIN: f64 = 30.0;
const HUMIDITY_MAX: f64 = 70.0;

impl Core {
    /// Spawn the simulator loop; it runs until the shutdown signal.
    pub(crate) fn spawn_simulator(core: &Arc<Core>) -> JoinHandle<()> {
        let core = Arc::clone(core);
        let mut shutdown_rx = core.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SIMULATOR_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let _gate = core.gate.lock().await;
                        Core::simulate_tick(&core);
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Environment simulator stopped");
                        return;
                    }
                }
            }
        })
    }

    /// One simulator tick; must run under the command gate.
    pub(crate) fn simulate_tick(core: &Arc<Core>) {
        if fastrand::f64() >= TICK_CHANCE {
            return;
        }

        let devices = core.store.snapshot();
        if devices.is_empty() {
            return;
        }
        let device = &devices[fastrand::usize(..devices.len())];
        if !device.is_on {
            return;
        }

        match device.kind {
            DeviceKind::MotionSensor => {
                let detected = fastrand::bool();
                trace!(device_id = %device.id, detected, "Simulated motion reading");

                let was_active = device.motion_active();
                let Some(change) = core
                    .store
                    .update_data(&device.id, DataPatch::motion(detected))
                else {
                    return;
                };

                if detected && !was_active {
                    core.log.record(SecurityEventDraft::for_device(
                        &change.new,
                        "Motion detected",
                        EventPriority::Medium,
                    ));
                }
                Core::settle(core, &change);
            }
            DeviceKind::EnvSensor => {
                let temperature = device.data.temperature.unwrap_or(TEMPERATURE_FALLBACK);
                let humidity = device.data.humidity.unwrap_or(HUMIDITY_FALLBACK);
                let temperature_step = if fastrand::bool() { 0.5 } else { -0.5 };
                let humidity_step = if fastrand::bool() { 1.0 } else { -1.0 };

                let patch = DataPatch {
                    temperature: Some(((temperature + temperature_step) * 10.0).round() / 10.0),
                    humidity: Some((humidity + humidity_step).clamp(HUMIDITY_MIN, HUMIDITY_MAX)),
                    ..DataPatch::default()
                };
                trace!(device_id = %device.id, ?patch, "Simulated environment drift");

                // Ordinary drift records no event.
                if let Some(change) = core.store.update_data(&device.id, patch) {
                    Core::settle(core, &change);
                }
            }
            _ => {}
        }
    }
}
