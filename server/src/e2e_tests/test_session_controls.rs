//! Test the lap counter, session status and stream controls.

use serde_json::json;

use crate::e2e_tests::helpers::*;
use crate::race_state::SessionStatus;

#[test]
fn test_set_lap() {
    let hub = TestHub::new();
    let admin = hub.connect(true);
    let mut viewer = hub.connect(false);
    drain_json(&mut viewer);

    admin.handle_text(&control("set_lap", &json!({ "lap": 42 })));
    admin.handle_text(&control("set_lap", &json!({ "lap": 3, "totalLaps": 10 })));

    let all = drain_json(&mut viewer);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["data"]["lap"], 42);
    assert_eq!(all[0]["data"]["totalLaps"], 100);
    assert_eq!(all[1]["data"]["lap"], 3);
    assert_eq!(all[1]["data"]["totalLaps"], 10);
}

#[test]
fn test_set_session_status() {
    let hub = TestHub::new();
    let admin = hub.connect(true);

    let state = admin
        .handle_control_text(&control("set_session_status", &json!({ "sessionStatus": "RACE" })))
        .unwrap();
    assert_eq!(state.session_status, SessionStatus::Race);

    let mut viewer = hub.connect(false);
    let all = drain_json(&mut viewer);
    assert_eq!(all[0]["data"]["sessionStatus"], "RACE");
}

#[test]
fn test_update_streams_partial() {
    let hub = TestHub::new();
    let admin = hub.connect(true);
    let mut viewer = hub.connect(false);
    drain_json(&mut viewer);

    admin.handle_text(&control("update_streams", &json!({ "crashCamId": "abc123" })));

    let all = drain_json(&mut viewer);
    let state = last_sync(&all).unwrap();
    assert_eq!(state["crashCamId"], "abc123");
    assert_eq!(state["mainStreamId"], "v8N9SOnX9Yk");
}

#[test]
fn test_update_streams_requires_an_id() {
    let hub = TestHub::new();
    let admin = hub.connect(true);
    let reply = admin.handle_text(&control("update_streams", &json!({})));
    assert!(reply.is_some());
}
