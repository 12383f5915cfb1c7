//! Push-channel message catalogue.
//!
//! Every WebSocket text frame carries one JSON object of the form
//! `{"event": "<name>", "data": <payload>}` in both directions.
//!
//! Server to client:
//!
//! - `sync_race_state`: full [`RaceSessionState`] snapshot
//! - `telemetry`: one car's readout, once per driver per tick
//! - `incident_alert`: a car picked up incident points
//! - `control_error`: a control message from this connection was rejected
//!
//! Client to server: `update_flag`, `toggle_maintenance`, `set_lap`,
//! `set_session_status` and `update_streams`, parsed by
//! [`ControlMessage::parse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::drivers::{DriverIdentity, Manufacturer};
use crate::race_state::{Flag, RaceSessionState, SessionStatus};
use crate::telemetry::TelemetryReadout;

/// A message pushed to viewers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[allow(clippy::large_enum_variant)]
pub enum ServerEvent {
    SyncRaceState(RaceSessionState),
    Telemetry(TelemetryMessage),
    IncidentAlert(IncidentAlert),
    /// Sent only to the connection whose control message was rejected.
    ControlError { message: String },
}

impl ServerEvent {
    /// The wire name of this event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SyncRaceState(_) => "sync_race_state",
            Self::Telemetry(_) => "telemetry",
            Self::IncidentAlert(_) => "incident_alert",
            Self::ControlError { .. } => "control_error",
        }
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; none of the payloads can produce one in
    /// practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Payload of a `telemetry` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryMessage {
    pub id: String,
    pub driver: String,
    pub car: String,
    pub manufacturer: Manufacturer,
    pub color: String,
    pub telemetry: TelemetryReadout,
}

impl TelemetryMessage {
    #[must_use]
    pub fn new(identity: &DriverIdentity, telemetry: TelemetryReadout) -> Self {
        Self {
            id: identity.id.clone(),
            driver: identity.display_name.clone(),
            car: identity.car_number.clone(),
            manufacturer: identity.manufacturer,
            color: identity.color.clone(),
            telemetry,
        }
    }
}

/// Payload of an `incident_alert` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentAlert {
    pub driver: String,
    pub id: String,
    pub car: String,
    pub points: u32,
    /// UTC time of day, `HH:MM:SS`.
    pub timestamp: String,
}

impl IncidentAlert {
    #[must_use]
    pub fn new(identity: &DriverIdentity, points: u32, timestamp: String) -> Self {
        Self {
            driver: identity.display_name.clone(),
            id: identity.id.clone(),
            car: identity.car_number.clone(),
            points,
            timestamp,
        }
    }
}

/// A request from a viewer to change the race session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    UpdateFlag(Flag),
    ToggleMaintenance(bool),
    SetLap {
        lap: u32,
        total_laps: Option<u32>,
    },
    SetSessionStatus(SessionStatus),
    UpdateStreams {
        main_stream_id: Option<String>,
        crash_cam_id: Option<String>,
    },
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ControlMessage {
    /// Parse and validate a client text frame.
    ///
    /// # Errors
    ///
    /// - `ControlError::Malformed` if the frame is not an event envelope
    /// - `ControlError::UnknownEvent` for events this server does not handle
    /// - a validation error if a recognized event carries a bad payload
    pub fn parse(text: &str) -> Result<Self, ControlError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| ControlError::Malformed(e.to_string()))?;
        let data = &envelope.data;

        match envelope.event.as_str() {
            "update_flag" => {
                let raw = required_str(data, "flag")?;
                Flag::parse(raw)
                    .map(Self::UpdateFlag)
                    .ok_or_else(|| ControlError::InvalidFlag(raw.to_string()))
            }
            "toggle_maintenance" => data
                .get("value")
                .and_then(Value::as_bool)
                .map(Self::ToggleMaintenance)
                .ok_or_else(|| invalid_value("value", "expected a boolean")),
            "set_lap" => {
                let lap = required_u32(data, "lap")?;
                let total_laps = match data.get("totalLaps") {
                    None | Some(Value::Null) => None,
                    Some(_) => Some(required_u32(data, "totalLaps")?),
                };
                Ok(Self::SetLap { lap, total_laps })
            }
            "set_session_status" => {
                let raw = required_str(data, "sessionStatus")?;
                SessionStatus::parse(raw)
                    .map(Self::SetSessionStatus)
                    .ok_or_else(|| ControlError::InvalidSessionStatus(raw.to_string()))
            }
            "update_streams" => Ok(Self::UpdateStreams {
                main_stream_id: optional_string(data, "mainStreamId")?,
                crash_cam_id: optional_string(data, "crashCamId")?,
            }),
            other => Err(ControlError::UnknownEvent(other.to_string())),
        }
    }
}

fn invalid_value(field: &str, message: &str) -> ControlError {
    ControlError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn required_str<'a>(data: &'a Value, field: &str) -> Result<&'a str, ControlError> {
    data.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid_value(field, "expected a string"))
}

fn required_u32(data: &Value, field: &str) -> Result<u32, ControlError> {
    data.get(field)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid_value(field, "expected a non-negative integer"))
}

fn optional_string(data: &Value, field: &str) -> Result<Option<String>, ControlError> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid_value(field, "expected a string")),
    }
}

/// Why a control message was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The frame is not a JSON event envelope.
    Malformed(String),
    /// The event name is not a control message this server handles.
    UnknownEvent(String),
    /// `update_flag` named a flag that does not exist.
    InvalidFlag(String),
    /// `set_session_status` named a status that does not exist.
    InvalidSessionStatus(String),
    /// A payload field is missing, has the wrong type or is out of range.
    InvalidValue { field: String, message: String },
    /// The connection is not allowed to change race state.
    NotPermitted,
}

impl ControlError {
    /// Unknown events are dropped silently instead of answered.
    #[must_use]
    pub const fn is_ignorable(&self) -> bool {
        matches!(self, Self::UnknownEvent(_))
    }
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed control message: {e}"),
            Self::UnknownEvent(name) => write!(f, "unknown event: {name}"),
            Self::InvalidFlag(flag) => write!(f, "invalid flag: {flag}"),
            Self::InvalidSessionStatus(status) => write!(f, "invalid session status: {status}"),
            Self::InvalidValue { field, message } => write!(f, "invalid {field}: {message}"),
            Self::NotPermitted => write!(f, "this connection may not send control messages"),
        }
    }
}

impl std::error::Error for ControlError {}
