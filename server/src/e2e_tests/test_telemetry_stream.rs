//! Test the shape and content of telemetry and incident frames.

use serde_json::json;

use crate::config::SimulationConfig;
use crate::e2e_tests::helpers::*;
use crate::simulation::ScriptedRandom;
use crate::testing::{TEST_QUEUE_CAPACITY, steady_config};

#[test]
fn test_one_frame_per_driver_per_tick() {
    let mut hub = TestHub::new();
    let mut viewer = hub.connect(false);
    hub.ticks(10);

    let all = drain_json(&mut viewer);
    let telemetry = frames(&all, "telemetry");
    assert_eq!(telemetry.len(), 40);
    let ids: Vec<&str> = telemetry[..4]
        .iter()
        .map(|f| f["data"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["driver-1", "driver-2", "driver-3", "driver-4"]);
}

#[test]
fn test_telemetry_frame_shape() {
    let mut hub = TestHub::new();
    let mut viewer = hub.connect(false);
    hub.tick();

    let all = drain_json(&mut viewer);
    let mut frame = frames(&all, "telemetry")[0].clone();
    // Depends on the random start position; checked separately.
    let lap = frame["data"]["telemetry"]
        .as_object_mut()
        .unwrap()
        .remove("lapDistPct")
        .unwrap();
    assert!((0.0..1.0).contains(&lap.as_f64().unwrap()));

    assert_eq!(
        frame,
        json!({
            "event": "telemetry",
            "data": {
                "id": "driver-1",
                "driver": "JOEY LOGANO",
                "car": "22",
                "manufacturer": "Ford",
                "color": "#facc15",
                "telemetry": {
                    "speed": 185.0,
                    "rpm": 8325,
                    "throttle": 70.0,
                    "brake": 0.0,
                    "gear": 4,
                    "fuel": 100.0,
                    "incidents": 0,
                    "pitStatus": false,
                    "tires": { "fl": 210.0, "fr": 215.0, "rl": 205.0, "rr": 208.0 },
                    "gForce": { "lat": 1.2, "long": 0.1 }
                }
            }
        })
    );
}

#[test]
fn test_optional_fields_can_be_left_out() {
    let config = SimulationConfig {
        report_fuel: false,
        report_pit_status: false,
        ..steady_config()
    };
    let mut hub = TestHub::with(config, ScriptedRandom::constant(0.5), TEST_QUEUE_CAPACITY);
    let mut viewer = hub.connect(false);
    hub.tick();

    let all = drain_json(&mut viewer);
    let frame = frames(&all, "telemetry")[0];
    let telemetry = &frame["data"]["telemetry"];
    assert!(telemetry.get("fuel").is_none());
    assert!(telemetry.get("pitStatus").is_none());
    assert!(telemetry.get("speed").is_some());
}

#[test]
fn test_incident_alert_precedes_telemetry() {
    let config = SimulationConfig {
        incident_probability: 1.0,
        ..steady_config()
    };
    let mut hub = TestHub::with(config, ScriptedRandom::constant(0.5), TEST_QUEUE_CAPACITY);
    let mut viewer = hub.connect(false);
    hub.ticks(2);

    let all = drain_json(&mut viewer);
    assert_eq!(all.len(), 1 + 2 * 8);
    assert_eq!(
        all[1],
        json!({
            "event": "incident_alert",
            "data": {
                "driver": "JOEY LOGANO",
                "id": "driver-1",
                "car": "22",
                "points": 4,
                "timestamp": "22:13:20"
            }
        })
    );
    assert_eq!(all[2]["event"], "telemetry");
    assert_eq!(all[2]["data"]["telemetry"]["incidents"], 1);

    // Second tick: counts keep climbing.
    assert_eq!(all[10]["event"], "telemetry");
    assert_eq!(all[10]["data"]["telemetry"]["incidents"], 2);
}

#[test]
fn test_pit_stop_is_visible() {
    let config = SimulationConfig {
        fuel_burn_rate: 40.0,
        fuel_refuel_rate: 50.0,
        ..steady_config()
    };
    let mut hub = TestHub::with(config, ScriptedRandom::constant(0.5), TEST_QUEUE_CAPACITY);
    let mut viewer = hub.connect(false);
    hub.ticks(4);

    let all = drain_json(&mut viewer);
    let driver_1: Vec<_> = frames(&all, "telemetry")
        .into_iter()
        .filter(|f| f["data"]["id"] == "driver-1")
        .map(|f| &f["data"]["telemetry"])
        .collect();

    // Burns 40 per tick from a full tank; 20 is not below the threshold.
    assert_eq!(driver_1[0]["fuel"], 60.0);
    assert_eq!(driver_1[0]["pitStatus"], false);
    assert_eq!(driver_1[1]["fuel"], 20.0);
    assert_eq!(driver_1[1]["pitStatus"], false);
    // 20 - 40 floors at 0, below the threshold: pit, refuel to 50.
    assert_eq!(driver_1[2]["fuel"], 50.0);
    assert_eq!(driver_1[2]["pitStatus"], true);
    assert_eq!(driver_1[2]["speed"], 45.0);
    // 50 + 50 reaches a full tank and leaves the pit.
    assert_eq!(driver_1[3]["fuel"], 100.0);
    assert_eq!(driver_1[3]["pitStatus"], false);
}
