//! Test fan-out across many viewers, including slow and departing ones.

use std::sync::Arc;

use serde_json::json;

use crate::e2e_tests::helpers::*;
use crate::simulation::ScriptedRandom;
use crate::testing::steady_config;

#[test]
fn test_every_viewer_sees_the_same_stream() {
    let mut hub = TestHub::new();
    let mut viewers: Vec<_> = (0..5).map(|_| hub.connect(false)).collect();
    let admin = hub.connect(true);

    hub.ticks(3);
    admin.handle_text(&control("update_flag", &json!({ "flag": "Yellow" })));
    hub.ticks(3);

    let streams: Vec<_> = viewers.iter_mut().map(drain_json).collect();
    assert_eq!(streams[0].len(), 1 + 12 + 1 + 12);
    for stream in &streams[1..] {
        assert_eq!(stream, &streams[0]);
    }
}

#[test]
fn test_departed_viewer_is_forgotten() {
    let mut hub = TestHub::new();
    let staying = hub.connect(false);
    let leaving = hub.connect(false);
    let leaving_id = leaving.id();
    assert_eq!(hub.race_state.broadcaster().subscriber_count(), 2);

    drop(leaving);
    hub.tick();

    let broadcaster = hub.race_state.broadcaster();
    assert_eq!(broadcaster.subscriber_count(), 1);
    assert!(!broadcaster.is_subscribed(leaving_id));
    assert!(broadcaster.is_subscribed(staying.id()));
}

#[test]
fn test_slow_viewer_loses_oldest_frames_only() {
    let mut hub = TestHub::with(steady_config(), ScriptedRandom::constant(0.5), 8);
    let mut slow = hub.connect(false);
    let mut fast = hub.connect(false);
    drain_json(&mut slow);

    let mut fast_frames = drain_json(&mut fast);
    for _ in 0..5 {
        hub.tick();
        fast_frames.extend(drain_json(&mut fast));
    }
    assert_eq!(frames(&fast_frames, "telemetry").len(), 20);

    // A resync, then the newest 8 from the queue: the last two ticks.
    let slow_frames = drain_json(&mut slow);
    assert_eq!(slow_frames.len(), 1 + 8);
    assert_eq!(slow_frames[0]["event"], "sync_race_state");
    assert_eq!(slow_frames[1..], fast_frames[fast_frames.len() - 8..]);
}

#[test]
fn test_lagging_viewer_still_learns_the_flag() {
    let mut hub = TestHub::with(steady_config(), ScriptedRandom::constant(0.5), 8);
    let admin = hub.connect(true);
    let mut viewer = hub.connect(false);
    drain_json(&mut viewer);

    // The flag change is pushed out of the queue by three ticks of telemetry.
    admin.handle_text(&control("update_flag", &json!({ "flag": "Yellow" })));
    hub.ticks(3);

    let all = drain_json(&mut viewer);
    assert_eq!(all[0]["event"], "sync_race_state");
    assert_eq!(frames(&all, "sync_race_state").len(), 1);
    assert_eq!(last_sync(&all).unwrap()["flag"], "Yellow");
    assert_eq!(frames(&all, "telemetry").len(), 8);
}

#[test]
fn test_concurrent_controllers_serialize() {
    let hub = TestHub::new();
    let mut viewer = hub.connect(false);
    drain_json(&mut viewer);

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let race_state = Arc::clone(&hub.race_state);
            scope.spawn(move || {
                let admin = crate::client_connection::ClientConnection::connect(race_state, true);
                for i in 0..10 {
                    let value = (worker + i) % 2 == 0;
                    admin.handle_text(&control("toggle_maintenance", &json!({ "value": value })));
                }
            });
        }
    });

    let syncs = drain_json(&mut viewer);
    assert_eq!(syncs.len(), 40);
    let last = last_sync(&syncs).unwrap();
    assert_eq!(last["isMaintenance"], hub.race_state.get().is_maintenance);
}
