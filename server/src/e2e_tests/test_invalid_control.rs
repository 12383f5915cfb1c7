//! Test that rejected control messages change nothing and are answered to
//! the sender only.

use serde_json::json;

use crate::e2e_tests::helpers::*;
use crate::race_state::RaceSessionState;

fn assert_rejected(text: &str, expected_message: &str) {
    let hub = TestHub::new();
    let mut sender = hub.connect(true);
    let mut other = hub.connect(true);
    drain_json(&mut sender);
    drain_json(&mut other);

    let reply = sender.handle_text(text).expect("rejection is answered");
    assert_eq!(
        to_json(&reply),
        json!({ "event": "control_error", "data": { "message": expected_message } })
    );
    assert_eq!(hub.race_state.get(), RaceSessionState::default());
    assert!(drain_json(&mut sender).is_empty());
    assert!(drain_json(&mut other).is_empty());
}

#[test]
fn test_unknown_flag() {
    assert_rejected(
        &control("update_flag", &json!({ "flag": "Purple" })),
        "invalid flag: Purple",
    );
}

#[test]
fn test_flag_is_case_sensitive() {
    assert_rejected(
        &control("update_flag", &json!({ "flag": "yellow" })),
        "invalid flag: yellow",
    );
}

#[test]
fn test_missing_flag() {
    assert_rejected(
        &control("update_flag", &json!({})),
        "invalid flag: expected a string",
    );
}

#[test]
fn test_maintenance_value_must_be_boolean() {
    assert_rejected(
        &control("toggle_maintenance", &json!({ "value": "yes" })),
        "invalid value: expected a boolean",
    );
}

#[test]
fn test_lap_beyond_race_length() {
    assert_rejected(
        &control("set_lap", &json!({ "lap": 101 })),
        "invalid lap: 101 exceeds total laps 100",
    );
}

#[test]
fn test_zero_race_length() {
    assert_rejected(
        &control("set_lap", &json!({ "lap": 0, "totalLaps": 0 })),
        "invalid totalLaps: must be greater than zero",
    );
}

#[test]
fn test_unknown_session_status() {
    assert_rejected(
        &control("set_session_status", &json!({ "sessionStatus": "WARMUP" })),
        "invalid session status: WARMUP",
    );
}

#[test]
fn test_blank_stream_id() {
    assert_rejected(
        &control("update_streams", &json!({ "mainStreamId": "  " })),
        "invalid mainStreamId: must not be blank",
    );
}

#[test]
fn test_not_json() {
    let hub = TestHub::new();
    let mut sender = hub.connect(true);
    drain_json(&mut sender);

    let reply = sender.handle_text("{\"event\":").expect("rejection is answered");
    let reply = to_json(&reply);
    assert_eq!(reply["event"], "control_error");
    assert!(
        reply["data"]["message"]
            .as_str()
            .unwrap()
            .starts_with("malformed control message")
    );
    assert_eq!(hub.race_state.get(), RaceSessionState::default());
}

#[test]
fn test_unknown_event_is_silently_ignored() {
    let hub = TestHub::new();
    let mut sender = hub.connect(true);
    drain_json(&mut sender);

    assert_eq!(sender.handle_text(&control("cheer", &json!({ "loud": true }))), None);
    assert!(drain_json(&mut sender).is_empty());
}
