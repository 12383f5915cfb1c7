//! Test flag changes end to end: broadcast to everyone, then felt by the
//! simulation on the next tick.

use serde_json::json;

use crate::e2e_tests::helpers::*;
use crate::race_state::Flag;

#[test]
fn test_update_flag_broadcasts_to_all() {
    let hub = TestHub::new();
    let mut admin = hub.connect(true);
    let mut viewer = hub.connect(false);
    drain_json(&mut admin);
    drain_json(&mut viewer);

    let reply = admin.handle_text(&control("update_flag", &json!({ "flag": "Yellow" })));
    assert_eq!(reply, None);

    for connection in [&mut admin, &mut viewer] {
        let frames = drain_json(connection);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "sync_race_state");
        assert_eq!(frames[0]["data"]["flag"], "Yellow");
    }
    assert_eq!(hub.race_state.get().flag, Flag::Yellow);
}

#[test]
fn test_caution_slows_the_field() {
    let mut hub = TestHub::new();
    let mut viewer = hub.connect(false);
    let admin = hub.connect(true);

    hub.tick();
    admin.handle_text(&control("update_flag", &json!({ "flag": "Yellow" })));
    hub.tick();

    let all = drain_json(&mut viewer);
    let telemetry = frames(&all, "telemetry");
    assert_eq!(telemetry.len(), 8);

    // Green tick holds 185; first caution tick moves 10% toward 55.
    assert_eq!(telemetry[0]["data"]["telemetry"]["speed"], 185.0);
    assert_eq!(telemetry[4]["data"]["telemetry"]["speed"], 172.0);
    assert_eq!(telemetry[4]["data"]["telemetry"]["throttle"], 70.0);
    assert_eq!(telemetry[4]["data"]["telemetry"]["brake"], 0.0);

    hub.ticks(200);
    let speed = hub.simulator.telemetry("driver-1").unwrap().speed;
    assert!((speed - 55.0).abs() < 1e-6);
}

#[test]
fn test_green_after_caution_recovers() {
    let mut hub = TestHub::new();
    let admin = hub.connect(true);

    admin.handle_text(&control("update_flag", &json!({ "flag": "Red" })));
    hub.ticks(100);
    admin.handle_text(&control("update_flag", &json!({ "flag": "Green" })));
    hub.ticks(300);

    for (_, car) in hub.simulator.cars() {
        assert!((car.speed - 185.0).abs() < 1e-6);
    }
}

#[test]
fn test_every_flag_is_accepted() {
    let hub = TestHub::new();
    let admin = hub.connect(true);
    for flag in ["Green", "Yellow", "Red", "Checkered"] {
        let state = admin
            .handle_control_text(&control("update_flag", &json!({ "flag": flag })))
            .unwrap();
        assert_eq!(
            serde_json::to_value(state.flag).unwrap(),
            serde_json::Value::from(flag)
        );
    }
}
