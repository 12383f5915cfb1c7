//! Test that a seeded session produces an identical event stream.

use serde_json::{Value, json};

use crate::config::SimulationConfig;
use crate::e2e_tests::helpers::*;
use crate::simulation::SeededRandom;

fn run_session(seed: u64) -> Vec<Value> {
    let config = SimulationConfig {
        incident_probability: 0.05,
        ..SimulationConfig::default()
    };
    let mut hub = TestHub::with(config, SeededRandom::new(seed), 4096);
    let mut viewer = hub.connect(false);
    let admin = hub.connect(true);

    hub.ticks(50);
    admin.handle_text(&control("update_flag", &json!({ "flag": "Yellow" })));
    hub.ticks(50);
    admin.handle_text(&control("update_flag", &json!({ "flag": "Green" })));
    hub.ticks(50);

    drain_json(&mut viewer)
}

#[test]
fn test_same_seed_same_stream() {
    let run1 = run_session(42);
    let run2 = run_session(42);
    assert_eq!(run1.len(), run2.len());
    for (i, (a, b)) in run1.iter().zip(&run2).enumerate() {
        assert_eq!(a, b, "frame mismatch at {i}");
    }
}

#[test]
fn test_different_seed_different_stream() {
    assert_ne!(run_session(1), run_session(2));
}

#[test]
fn test_seeded_stream_stays_in_bounds() {
    for frame in run_session(7) {
        if frame["event"] != "telemetry" {
            continue;
        }
        let t = &frame["data"]["telemetry"];
        let speed = t["speed"].as_f64().unwrap();
        let fuel = t["fuel"].as_f64().unwrap();
        let lap = t["lapDistPct"].as_f64().unwrap();
        assert!((0.0..=200.0).contains(&speed));
        assert!((0.0..=100.0).contains(&fuel));
        assert!((0.0..1.0).contains(&lap));
    }
}
