//! End-to-end tests for the engine: command surface, rule cascades,
//! timers, and event ordering, all under the paused tokio clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use haven_automation::{RuleClause, RuleConfig};
use haven_core::{
    DataPatch, Device, DeviceData, DeviceKind, DeviceSettings, EventPriority, SecurityEventDraft,
    SettingsPatch, StateKey, StateValue,
};
use haven_engine::{seed, Controller};

fn plug(id: &str) -> Device {
    Device {
        id: id.to_string(),
        name: format!("Plug {id}"),
        kind: DeviceKind::SmartPlug,
        room: "Office".to_string(),
        is_on: false,
        data: DeviceData::default(),
        settings: DeviceSettings::default(),
    }
}

fn light(id: &str, auto_off_minutes: Option<u64>) -> Device {
    Device {
        id: id.to_string(),
        name: format!("Light {id}"),
        kind: DeviceKind::Light,
        room: "Office".to_string(),
        is_on: false,
        data: DeviceData {
            brightness: Some(80.0),
            ..DeviceData::default()
        },
        settings: DeviceSettings {
            auto_off_minutes,
            ..DeviceSettings::default()
        },
    }
}

fn motion_sensor(id: &str, room: &str, auto_clear_seconds: Option<u64>) -> Device {
    Device {
        id: id.to_string(),
        name: format!("Sensor {id}"),
        kind: DeviceKind::MotionSensor,
        room: room.to_string(),
        is_on: true,
        data: DeviceData {
            motion: Some(false),
            ..DeviceData::default()
        },
        settings: DeviceSettings {
            auto_clear_seconds,
            ..DeviceSettings::default()
        },
    }
}

fn camera(id: &str, room: &str) -> Device {
    Device {
        id: id.to_string(),
        name: format!("Camera {id}"),
        kind: DeviceKind::Camera,
        room: room.to_string(),
        is_on: true,
        data: DeviceData {
            recording: Some(false),
            ..DeviceData::default()
        },
        settings: DeviceSettings {
            auto_record: Some(true),
            notify_on_motion: Some(true),
            ..DeviceSettings::default()
        },
    }
}

fn power_rule(id: &str, when: (&str, bool), then: (&str, bool)) -> RuleConfig {
    RuleConfig {
        id: Some(id.to_string()),
        name: format!("rule {id}"),
        condition: RuleClause {
            device_id: when.0.to_string(),
            key: StateKey::IsOn,
            value: StateValue::Bool(when.1),
        },
        action: RuleClause {
            device_id: then.0.to_string(),
            key: StateKey::IsOn,
            value: StateValue::Bool(then.1),
        },
        active: true,
    }
}

fn device(controller: &Controller, id: &str) -> Device {
    controller
        .list_devices()
        .into_iter()
        .find(|d| d.id == id)
        .unwrap_or_else(|| panic!("device {id} not found"))
}

#[tokio::test(start_paused = true)]
async fn test_rule_fires_once_with_one_low_event() {
    let controller = Controller::new();
    controller
        .load(
            vec![plug("plug-a"), plug("plug-b")],
            vec![power_rule("follow", ("plug-a", true), ("plug-b", true))],
        )
        .await
        .unwrap();

    controller.toggle_device("plug-a").await;

    assert!(device(&controller, "plug-b").is_on);
    let events = controller.list_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].priority, EventPriority::Low);
    assert_eq!(events[0].device_id, "plug-b");
    assert_eq!(
        events[0].description,
        "Automated: Turned ON by rule \"rule follow\""
    );
}

#[tokio::test(start_paused = true)]
async fn test_settled_rules_are_idempotent() {
    let controller = Controller::new();
    controller
        .load(
            vec![plug("plug-a"), plug("plug-b")],
            vec![power_rule("follow", ("plug-a", true), ("plug-b", true))],
        )
        .await
        .unwrap();

    controller.toggle_device("plug-a").await;
    assert_eq!(controller.list_events().len(), 1);

    // An unrelated mutation runs another pass over the already-satisfied
    // snapshot: zero new mutations, zero new events.
    controller
        .update_device_data(
            "plug-a",
            DataPatch {
                brightness: Some(10.0),
                ..DataPatch::default()
            },
        )
        .await;

    assert_eq!(controller.list_events().len(), 1);
    assert!(device(&controller, "plug-b").is_on);
}

#[tokio::test(start_paused = true)]
async fn test_cascade_orders_events_causally() {
    let controller = Controller::new();
    controller
        .load(
            vec![plug("plug-a"), plug("plug-b"), plug("plug-c")],
            vec![
                power_rule("first", ("plug-a", true), ("plug-b", true)),
                power_rule("second", ("plug-b", true), ("plug-c", true)),
            ],
        )
        .await
        .unwrap();

    controller.toggle_device("plug-a").await;

    assert!(device(&controller, "plug-b").is_on);
    assert!(device(&controller, "plug-c").is_on);

    // Newest first: the second-order effect sits on top.
    let events = controller.list_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].device_id, "plug-c");
    assert_eq!(events[1].device_id, "plug-b");
}

#[tokio::test(start_paused = true)]
async fn test_manual_event_precedes_rule_effects() {
    let controller = Controller::new();
    let mut rule = power_rule("lights-on", ("sensor-a", true), ("light-a", true));
    rule.condition = RuleClause {
        device_id: "sensor-a".to_string(),
        key: StateKey::Motion,
        value: StateValue::Bool(true),
    };
    controller
        .load(
            vec![motion_sensor("sensor-a", "Hall", Some(30)), light("light-a", None)],
            vec![rule],
        )
        .await
        .unwrap();

    controller.trigger_motion("sensor-a").await;

    let events = controller.list_events();
    assert_eq!(events.len(), 2);
    // The manual motion notice was recorded before the automated change.
    assert_eq!(events[1].description, "Motion detected");
    assert_eq!(events[1].priority, EventPriority::Medium);
    assert!(events[0].description.starts_with("Automated: Turned ON"));
    assert!(device(&controller, "light-a").is_on);
}

#[tokio::test(start_paused = true)]
async fn test_motion_auto_clear_fires_no_sooner_than_delay() {
    let controller = Controller::new();
    controller
        .load(vec![motion_sensor("sensor-a", "Hall", Some(2))], Vec::new())
        .await
        .unwrap();

    controller
        .update_device_data("sensor-a", DataPatch::motion(true))
        .await;

    tokio::time::sleep(Duration::from_millis(1900)).await;
    assert_eq!(device(&controller, "sensor-a").data.motion, Some(true));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(device(&controller, "sensor-a").data.motion, Some(false));

    // Neither the external write nor the auto-clear records an event.
    assert!(controller.list_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_motion_auto_clear_defaults_to_thirty_seconds() {
    let controller = Controller::new();
    controller
        .load(vec![motion_sensor("sensor-a", "Hall", None)], Vec::new())
        .await
        .unwrap();

    controller
        .update_device_data("sensor-a", DataPatch::motion(true))
        .await;

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(device(&controller, "sensor-a").data.motion, Some(true));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(device(&controller, "sensor-a").data.motion, Some(false));
}

#[tokio::test(start_paused = true)]
async fn test_motion_auto_clear_rearms_only_on_fresh_transition() {
    let controller = Controller::new();
    controller
        .load(vec![motion_sensor("sensor-a", "Hall", Some(10))], Vec::new())
        .await
        .unwrap();

    controller
        .update_device_data("sensor-a", DataPatch::motion(true))
        .await;

    // A redundant write halfway through must not extend the deadline.
    tokio::time::sleep(Duration::from_secs(6)).await;
    controller
        .update_device_data(
            "sensor-a",
            DataPatch {
                motion: Some(true),
                ..DataPatch::default()
            },
        )
        .await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(device(&controller, "sensor-a").data.motion, Some(false));
}

#[tokio::test(start_paused = true)]
async fn test_light_auto_off_completes_with_one_event() {
    let controller = Controller::new();
    controller
        .load(vec![light("light-a", Some(1))], Vec::new())
        .await
        .unwrap();

    controller.toggle_device("light-a").await;

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(device(&controller, "light-a").is_on);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!device(&controller, "light-a").is_on);

    let events = controller.list_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].description, "Auto-off timer completed");
    assert_eq!(events[0].priority, EventPriority::Low);
}

#[tokio::test(start_paused = true)]
async fn test_manual_off_cancels_auto_off() {
    let controller = Controller::new();
    controller
        .load(vec![light("light-a", Some(1))], Vec::new())
        .await
        .unwrap();

    controller.toggle_device("light-a").await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    controller.toggle_device("light-a").await;

    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(!device(&controller, "light-a").is_on);
    // The cancelled timer never completed, so its event never appears.
    assert!(controller.list_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_auto_off_rearms_on_setting_change() {
    let controller = Controller::new();
    controller
        .load(vec![light("light-a", Some(10))], Vec::new())
        .await
        .unwrap();

    controller.toggle_device("light-a").await;
    tokio::time::sleep(Duration::from_secs(120)).await;

    // Shrinking the delay supersedes the pending timer.
    controller
        .update_device_settings("light-a", SettingsPatch::auto_off_minutes(1))
        .await;

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(device(&controller, "light-a").is_on);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!device(&controller, "light-a").is_on);
    assert_eq!(controller.list_events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_record_cascade_within_one_poll() {
    let controller = Controller::new();
    controller
        .load(
            vec![
                camera("camera-a", "Porch"),
                motion_sensor("sensor-a", "Porch", Some(60)),
            ],
            Vec::new(),
        )
        .await
        .unwrap();

    controller
        .update_device_data("sensor-a", DataPatch::motion(true))
        .await;

    tokio::time::sleep(Duration::from_millis(5100)).await;

    assert_eq!(device(&controller, "camera-a").data.recording, Some(true));
    let events = controller.list_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].priority, EventPriority::Medium);
    assert_eq!(events[0].description, "Motion detected - recording started");
    assert_eq!(events[0].device_id, "camera-a");

    // The poll keeps running but an already-recording camera stays quiet.
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(controller.list_events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_record_ignores_other_rooms_and_disabled_cameras() {
    let controller = Controller::new();
    controller
        .load(
            vec![
                camera("camera-a", "Porch"),
                motion_sensor("sensor-a", "Garage", Some(0)),
            ],
            Vec::new(),
        )
        .await
        .unwrap();

    // Motion in a different room never starts a recording.
    controller
        .update_device_data("sensor-a", DataPatch::motion(true))
        .await;
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(device(&controller, "camera-a").data.recording, Some(false));

    // Disabling auto-record stops the poll even with same-room motion.
    let controller = Controller::new();
    controller
        .load(
            vec![
                camera("camera-b", "Porch"),
                motion_sensor("sensor-b", "Porch", Some(0)),
            ],
            Vec::new(),
        )
        .await
        .unwrap();
    controller
        .update_device_settings("camera-b", SettingsPatch::auto_record(false))
        .await;
    controller
        .update_device_data("sensor-b", DataPatch::motion(true))
        .await;
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(device(&controller, "camera-b").data.recording, Some(false));
    assert!(controller.list_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_powering_camera_off_stops_poll() {
    let controller = Controller::new();
    controller
        .load(
            vec![
                camera("camera-a", "Porch"),
                motion_sensor("sensor-a", "Porch", Some(0)),
            ],
            Vec::new(),
        )
        .await
        .unwrap();

    controller.toggle_device("camera-a").await;
    controller
        .update_device_data("sensor-a", DataPatch::motion(true))
        .await;

    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(device(&controller, "camera-a").data.recording, Some(false));
}

#[tokio::test(start_paused = true)]
async fn test_feedback_loop_is_bounded_by_pass_budget() {
    let controller = Controller::new();
    controller
        .load(
            vec![plug("plug-a"), plug("plug-b")],
            vec![
                power_rule("r1", ("plug-a", true), ("plug-b", true)),
                power_rule("r2", ("plug-b", true), ("plug-a", false)),
                power_rule("r3", ("plug-a", false), ("plug-b", false)),
            ],
        )
        .await
        .unwrap();
    assert!(controller.list_events().is_empty());

    // The fourth rule closes the cycle; the cascade oscillates and the
    // pass budget has to stop it.
    controller
        .add_rule(power_rule("r4", ("plug-b", false), ("plug-a", true)))
        .await
        .unwrap();

    let events = controller.list_events();
    assert_eq!(events.len(), 8);
    assert!(events.iter().all(|e| e.priority == EventPriority::Low));
}

#[tokio::test(start_paused = true)]
async fn test_clear_events_empties_log() {
    let controller = Controller::seeded().await;
    controller.trigger_motion("motion-1").await;
    controller.set_locked("lock-1", false).await;
    assert!(!controller.list_events().is_empty());

    controller.clear_events().await;
    assert!(controller.list_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_ids_leave_everything_unchanged() {
    let controller = Controller::seeded().await;
    let devices_before = controller.list_devices();

    controller.toggle_device("nope").await;
    controller
        .update_device_data("nope", DataPatch::motion(true))
        .await;
    controller
        .update_device_settings("nope", SettingsPatch::auto_record(true))
        .await;
    controller.trigger_motion("nope").await;
    controller.set_locked("nope", true).await;

    assert_eq!(controller.list_devices(), devices_before);
    assert!(controller.list_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_add_rule_evaluates_immediately() {
    let controller = Controller::new();
    controller
        .load(vec![plug("plug-a"), plug("plug-b")], Vec::new())
        .await
        .unwrap();
    controller.toggle_device("plug-a").await;
    assert!(!device(&controller, "plug-b").is_on);

    controller
        .add_rule(power_rule("follow", ("plug-a", true), ("plug-b", true)))
        .await
        .unwrap();

    assert!(device(&controller, "plug-b").is_on);
    assert_eq!(controller.list_events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_rule_activates_and_deactivates() {
    let controller = Controller::seeded().await;

    // Seeded rule-2 (lights on with motion) starts inactive.
    controller.trigger_motion("motion-1").await;
    assert!(!device(&controller, "light-1").is_on);

    let active = controller.toggle_rule("rule-2").await.unwrap();
    assert!(active);
    assert!(device(&controller, "light-1").is_on);

    assert!(controller.remove_rule("rule-2").await.is_ok());
    assert!(controller.toggle_rule("rule-2").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_notification_sink_routing() {
    let controller = Controller::seeded().await;
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    controller.on_notification(move |title, body| {
        sink_seen.lock().unwrap().push(format!("{title} / {body}"));
    });

    controller.set_locked("lock-1", true).await; // already locked: no-op
    controller.set_locked("lock-1", false).await; // medium
    controller.trigger_motion("motion-1").await; // medium
    controller.trigger_motion("motion-1").await; // already active: no-op
    controller
        .record_security_event(SecurityEventDraft {
            device_id: "camera-1".to_string(),
            device_name: "Front Door Camera".to_string(),
            device_kind: DeviceKind::Camera,
            room: "Outside".to_string(),
            description: "Tamper detected".to_string(),
            priority: EventPriority::High,
        })
        .await;

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            "Notice: Door unlocked / Front Door Lock in Entry".to_string(),
            "Notice: Motion detected / Entry Motion Sensor in Entry".to_string(),
            "Alert: Tamper detected / Front Door Camera in Outside".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_seeded_catalog_matches_defaults() {
    let controller = Controller::seeded().await;

    assert_eq!(controller.list_devices().len(), seed::default_devices().len());
    assert_eq!(controller.list_rules().len(), 2);
    // Seeding settles without producing any events.
    assert!(controller.list_events().is_empty());
}
