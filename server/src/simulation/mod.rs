//! Simulated telemetry feed.
//!
//! Everything that produces per-tick telemetry lives here:
//! - [`RaceSimulator`] models the field of cars
//! - [`spawn_simulation_task`] drives any [`TelemetrySource`] on a fixed period
//! - [`RandomSource`] and [`SimulatedTimeSource`] make runs reproducible
//!
//! # Usage
//!
//! ```ignore
//! let simulator = RaceSimulator::new(&registry, config.simulation.clone(), SeededRandom::new(7), SystemTimeSource);
//! let handle = spawn_simulation_task(simulator, Arc::clone(&race_state), config.simulation.tick_period());
//! // ...
//! let ticks = handle.stop().await;
//! ```

mod engine;
mod random;
mod runner;
mod time;

pub use engine::{RaceSimulator, TelemetrySource};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use runner::{SimulationHandle, spawn_simulation_task};
pub use time::SimulatedTimeSource;
