//! Canonical device records with room indexing for HAVEN
//!
//! This crate provides the DeviceStore, the single authority for device
//! state. It holds every device record, maintains a room index for
//! same-room queries, and fires `device_changed` events on the bus for
//! every effective mutation.
//!
//! Mutations are scoped: `toggle` flips the power state, `update_data`
//! and `update_settings` shallow-merge a patch into the respective bag.
//! A mutation that names an unknown device id is a silent no-op, and a
//! patch that changes nothing fires no event.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use haven_core::events::DeviceChangedData;
use haven_core::{DataPatch, Device, SettingsPatch};
use haven_event_bus::EventBus;
use tracing::{debug, instrument, trace};

/// An effective mutation of a single device.
#[derive(Debug, Clone)]
pub struct DeviceChange {
    /// State before the mutation; `None` when the device was just added.
    pub old: Option<Device>,
    /// State after the mutation.
    pub new: Device,
}

/// The device store tracks all device records
///
/// The DeviceStore is responsible for:
/// - Holding the canonical state of every device
/// - Maintaining a room index for same-room queries
/// - Firing `device_changed` events when a mutation takes effect
/// - Providing thread-safe concurrent access to snapshots
pub struct DeviceStore {
    /// All devices keyed by id
    devices: DashMap<String, Device>,
    /// Device ids grouped by room label
    room_index: DashMap<String, Vec<String>>,
    /// Device ids in registration order, for stable snapshots
    order: RwLock<Vec<String>>,
    /// Event bus for firing change events
    bus: Arc<EventBus>,
}

impl DeviceStore {
    /// Create a new device store publishing to the given bus
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            devices: DashMap::new(),
            room_index: DashMap::new(),
            order: RwLock::new(Vec::new()),
            bus,
        }
    }

    /// Register a device
    ///
    /// This is the seeding path; devices are created once at session
    /// start and never deleted. Re-adding an existing id replaces the
    /// record in place without disturbing the registration order.
    #[instrument(skip(self, device), fields(device_id = %device.id))]
    pub fn add(&self, device: Device) -> DeviceChange {
        let id = device.id.clone();
        let old = self.devices.insert(id.clone(), device.clone());

        match &old {
            Some(prev) => {
                if prev.room != device.room {
                    if let Some(mut ids) = self.room_index.get_mut(&prev.room) {
                        ids.retain(|other| other != &id);
                    }
                    self.room_index.entry(device.room.clone()).or_default().push(id.clone());
                }
            }
            None => {
                self.room_index.entry(device.room.clone()).or_default().push(id.clone());
                self.order.write().expect("order lock poisoned").push(id.clone());
            }
        }

        debug!(room = %device.room, kind = %device.kind, "Registered device");

        let change = DeviceChange { old, new: device };
        self.fire_changed(&id, &change);
        change
    }

    /// Flip a device's power state
    ///
    /// Unknown ids are a silent no-op and return `None`.
    #[instrument(skip(self))]
    pub fn toggle(&self, device_id: &str) -> Option<DeviceChange> {
        let change = {
            let mut entry = self.devices.get_mut(device_id)?;
            let old = entry.clone();
            entry.is_on = !entry.is_on;
            DeviceChange {
                new: entry.clone(),
                old: Some(old),
            }
        };

        debug!(is_on = change.new.is_on, "Toggled device power");
        self.fire_changed(device_id, &change);
        Some(change)
    }

    /// Shallow-merge a patch into a device's data bag
    ///
    /// Each key present in the patch replaces the stored value wholesale.
    /// Unknown ids and patches that change nothing return `None` and fire
    /// no event.
    #[instrument(skip(self, patch))]
    pub fn update_data(&self, device_id: &str, patch: DataPatch) -> Option<DeviceChange> {
        let change = {
            let mut entry = self.devices.get_mut(device_id)?;
            let old = entry.clone();
            entry.data.merge(&patch);
            if *entry == old {
                trace!("Data patch changed nothing");
                return None;
            }
            DeviceChange {
                new: entry.clone(),
                old: Some(old),
            }
        };

        self.fire_changed(device_id, &change);
        Some(change)
    }

    /// Shallow-merge a patch into a device's settings bag
    ///
    /// Same merge and no-op semantics as [`DeviceStore::update_data`].
    #[instrument(skip(self, patch))]
    pub fn update_settings(&self, device_id: &str, patch: SettingsPatch) -> Option<DeviceChange> {
        let change = {
            let mut entry = self.devices.get_mut(device_id)?;
            let old = entry.clone();
            entry.settings.merge(&patch);
            if *entry == old {
                trace!("Settings patch changed nothing");
                return None;
            }
            DeviceChange {
                new: entry.clone(),
                old: Some(old),
            }
        };

        self.fire_changed(device_id, &change);
        Some(change)
    }

    /// Get a device by id
    pub fn get(&self, device_id: &str) -> Option<Device> {
        self.devices.get(device_id).map(|d| d.clone())
    }

    /// Full device list in registration order
    ///
    /// Callers must treat the snapshot as read-only; all mutation goes
    /// through the scoped update operations.
    pub fn snapshot(&self) -> Vec<Device> {
        self.order
            .read()
            .expect("order lock poisoned")
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// All devices in the given room
    pub fn devices_in_room(&self, room: &str) -> Vec<Device> {
        self.room_index
            .get(room)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// All distinct room labels
    pub fn rooms(&self) -> Vec<String> {
        self.room_index.iter().map(|r| r.key().clone()).collect()
    }

    /// Total number of devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the store holds no devices
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn fire_changed(&self, device_id: &str, change: &DeviceChange) {
        self.bus.fire_typed(DeviceChangedData {
            device_id: device_id.to_string(),
            old: change.old.clone(),
            new: change.new.clone(),
        });
    }
}

/// Thread-safe wrapper for DeviceStore
pub type SharedDeviceStore = Arc<DeviceStore>;
