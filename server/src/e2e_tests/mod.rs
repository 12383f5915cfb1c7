//! End-to-end tests at the event level.
//!
//! Each test file covers a specific scenario: viewers connect through
//! `ClientConnection`, the simulation is ticked by hand, and assertions are
//! made on the JSON frames each viewer would receive.

#![cfg(test)]


mod test_control_flag;
mod test_determinism;
mod test_invalid_control;
mod test_multi_connection;
mod test_session_controls;
mod test_telemetry_stream;
