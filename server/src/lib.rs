// Life of a tick:
// 1. The tick task reads the race session state
// 2. The simulation advances every car and emits telemetry / incident events
// 3. The broadcaster fans them out to every viewer's queue
//
// Life of a control message:
// 1. Text frame comes in on a viewer's socket
// 2. Parse and validate into a control message
// 3. Apply to the race session state under its lock
// 4. Broadcast the new state to every viewer, sender included
//
// System components:
//  - Race session state manager
//  - Telemetry simulation and tick task
//  - Pub-sub component

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods))]

pub mod broadcast;
pub mod client_connection;
pub mod config;
pub mod drivers;
pub mod protocol;
pub mod race_state;
pub mod server;
pub mod simulation;
pub mod telemetry;
pub mod time;

#[cfg(test)]
mod e2e_tests;

pub use client_connection::ClientConnection;
