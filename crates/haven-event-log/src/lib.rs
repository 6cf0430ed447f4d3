//! Append-only security event log for HAVEN
//!
//! This crate provides the EventLog, the side-effect sink for everything
//! security-relevant the engine does. Entries are ordered newest-first,
//! never mutated or removed individually, and only drop out through a
//! bulk [`EventLog::clear`].
//!
//! Recording an event also routes it by priority: high and medium
//! priority events are forwarded to every registered notification sink
//! as a `(title, body)` pair, low priority events are logged silently.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use haven_core::events::SecurityEventRecordedData;
use haven_core::{EventPriority, SecurityEvent, SecurityEventDraft};
use haven_event_bus::EventBus;
use tracing::{debug, info};

/// Callback invoked with `(title, body)` for medium/high priority events.
///
/// A toast layer is one possible subscriber; the log only guarantees the
/// sink is called, not how it renders.
pub type NotificationSink = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// The security event log
pub struct EventLog {
    /// Entries, newest first
    events: RwLock<VecDeque<SecurityEvent>>,
    /// Notification sinks for medium/high priority events
    sinks: RwLock<Vec<NotificationSink>>,
    /// Event bus for announcing new entries
    bus: Arc<EventBus>,
}

impl EventLog {
    /// Create a new, empty log publishing to the given bus
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            sinks: RwLock::new(Vec::new()),
            bus,
        }
    }

    /// Register a notification sink
    pub fn add_sink(&self, sink: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.sinks
            .write()
            .expect("sink lock poisoned")
            .push(Arc::new(sink));
    }

    /// Record a security event
    ///
    /// Assigns the id and current timestamp, prepends the entry, fires
    /// `security_event_recorded` on the bus, and notifies the sinks when
    /// the priority warrants it.
    pub fn record(&self, draft: SecurityEventDraft) -> SecurityEvent {
        let event = SecurityEvent::from_draft(draft);

        debug!(
            device = %event.device_name,
            priority = %event.priority,
            description = %event.description,
            "Recording security event"
        );

        self.events
            .write()
            .expect("event lock poisoned")
            .push_front(event.clone());

        self.bus.fire_typed(SecurityEventRecordedData {
            event: event.clone(),
        });

        let title = match event.priority {
            EventPriority::High => Some(format!("Alert: {}", event.description)),
            EventPriority::Medium => Some(format!("Notice: {}", event.description)),
            EventPriority::Low => None,
        };
        if let Some(title) = title {
            let body = format!("{} in {}", event.device_name, event.room);
            let sinks = self.sinks.read().expect("sink lock poisoned").clone();
            for sink in sinks {
                sink(&title, &body);
            }
        }

        event
    }

    /// All entries, newest first
    pub fn all(&self) -> Vec<SecurityEvent> {
        self.events
            .read()
            .expect("event lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Empty the log
    pub fn clear(&self) {
        let mut events = self.events.write().expect("event lock poisoned");
        info!(cleared = events.len(), "Clearing security event log");
        events.clear();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.events.read().expect("event lock poisoned").len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.read().expect("event lock poisoned").is_empty()
    }
}

/// Thread-safe wrapper for EventLog
pub type SharedEventLog = Arc<EventLog>;
