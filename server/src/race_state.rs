//! Shared race session state and its mutation protocol.
//!
//! There is exactly one [`RaceSessionState`] per process, owned by the
//! [`RaceStateManager`]. Readers get copies; writers go through one method
//! per control event.
//!
//! # Invariants
//!
//! - A reader never observes a partially applied mutation
//! - Every committed mutation is followed by exactly one `sync_race_state`
//!   broadcast, published while the state lock is still held
//! - A rejected mutation leaves the state untouched and broadcasts nothing
//! - A new subscriber's first message is the snapshot current at the moment
//!   it subscribed, and every later rebroadcast is queued behind it

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::broadcast::{Broadcaster, Subscriber};
use crate::protocol::{ControlError, ControlMessage, ServerEvent};

/// Race flag shown to drivers and viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Flag {
    Green,
    Yellow,
    Red,
    Checkered,
}

impl Flag {
    /// Parse the wire name (`"Green"`, `"Yellow"`, ...). Case-sensitive.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Green" => Some(Self::Green),
            "Yellow" => Some(Self::Yellow),
            "Red" => Some(Self::Red),
            "Checkered" => Some(Self::Checkered),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_green(self) -> bool {
        matches!(self, Self::Green)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Qualifying,
    Race,
    Practice,
}

impl SessionStatus {
    /// Parse the wire name (`"QUALIFYING"`, `"RACE"`, `"PRACTICE"`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "QUALIFYING" => Some(Self::Qualifying),
            "RACE" => Some(Self::Race),
            "PRACTICE" => Some(Self::Practice),
            _ => None,
        }
    }
}

/// Race-wide session state. Values of this type are snapshots; the live
/// record never leaves the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSessionState {
    pub flag: Flag,
    /// Freezes the simulation while true.
    pub is_maintenance: bool,
    /// Video id of the main broadcast feed.
    pub main_stream_id: String,
    /// Video id of the crash camera feed.
    pub crash_cam_id: String,
    pub session_status: SessionStatus,
    pub lap: u32,
    pub total_laps: u32,
}

impl Default for RaceSessionState {
    fn default() -> Self {
        Self {
            flag: Flag::Green,
            is_maintenance: false,
            main_stream_id: "v8N9SOnX9Yk".to_string(),
            crash_cam_id: "7R5A0UIdXN0".to_string(),
            session_status: SessionStatus::Qualifying,
            lap: 1,
            total_laps: 100,
        }
    }
}

/// Owner of the race session state.
///
/// All access is serialized through one mutex. The lock is never held across
/// an `.await`, so cancelling any task that uses the manager cannot leave it
/// locked.
pub struct RaceStateManager {
    state: Mutex<RaceSessionState>,
    broadcaster: Arc<Broadcaster>,
}

impl RaceStateManager {
    #[must_use]
    pub fn new(initial: RaceSessionState, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            state: Mutex::new(initial),
            broadcaster,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RaceSessionState> {
        // Mutations are validated on a copy and committed with a single
        // assignment, so a poisoned lock still guards a consistent record.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state.
    #[must_use]
    pub fn get(&self) -> RaceSessionState {
        self.lock().clone()
    }

    #[must_use]
    pub const fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Register a new subscriber. Its first message is a `sync_race_state`
    /// with the current snapshot.
    #[must_use]
    pub fn subscribe(&self) -> Subscriber {
        let state = self.lock();
        self.broadcaster
            .subscribe_with(ServerEvent::SyncRaceState(state.clone()))
    }

    pub fn set_flag(&self, flag: Flag) -> RaceSessionState {
        self.commit_infallible(|state| state.flag = flag)
    }

    pub fn set_maintenance(&self, is_maintenance: bool) -> RaceSessionState {
        self.commit_infallible(|state| state.is_maintenance = is_maintenance)
    }

    pub fn set_session_status(&self, status: SessionStatus) -> RaceSessionState {
        self.commit_infallible(|state| state.session_status = status)
    }

    /// Set the lap counter and optionally the race length.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidValue` if `total_laps` would be zero or
    /// `lap` would exceed it.
    pub fn set_lap(&self, lap: u32, total_laps: Option<u32>) -> Result<RaceSessionState, ControlError> {
        self.commit(|state| {
            let total_laps = total_laps.unwrap_or(state.total_laps);
            if total_laps == 0 {
                return Err(ControlError::InvalidValue {
                    field: "totalLaps".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
            if lap > total_laps {
                return Err(ControlError::InvalidValue {
                    field: "lap".to_string(),
                    message: format!("{lap} exceeds total laps {total_laps}"),
                });
            }
            state.lap = lap;
            state.total_laps = total_laps;
            Ok(())
        })
    }

    /// Replace one or both video feed ids.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidValue` if neither id is given or a given
    /// id is blank.
    pub fn set_streams(
        &self,
        main_stream_id: Option<String>,
        crash_cam_id: Option<String>,
    ) -> Result<RaceSessionState, ControlError> {
        if main_stream_id.is_none() && crash_cam_id.is_none() {
            return Err(ControlError::InvalidValue {
                field: "streams".to_string(),
                message: "expected mainStreamId or crashCamId".to_string(),
            });
        }
        for (field, value) in [("mainStreamId", &main_stream_id), ("crashCamId", &crash_cam_id)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ControlError::InvalidValue {
                    field: field.to_string(),
                    message: "must not be blank".to_string(),
                });
            }
        }

        self.commit(|state| {
            if let Some(id) = main_stream_id {
                state.main_stream_id = id;
            }
            if let Some(id) = crash_cam_id {
                state.crash_cam_id = id;
            }
            Ok(())
        })
    }

    /// Apply a parsed control message.
    ///
    /// # Errors
    ///
    /// Returns the validation error of the underlying mutation.
    pub fn apply(&self, message: ControlMessage) -> Result<RaceSessionState, ControlError> {
        match message {
            ControlMessage::UpdateFlag(flag) => Ok(self.set_flag(flag)),
            ControlMessage::ToggleMaintenance(value) => Ok(self.set_maintenance(value)),
            ControlMessage::SetSessionStatus(status) => Ok(self.set_session_status(status)),
            ControlMessage::SetLap { lap, total_laps } => self.set_lap(lap, total_laps),
            ControlMessage::UpdateStreams {
                main_stream_id,
                crash_cam_id,
            } => self.set_streams(main_stream_id, crash_cam_id),
        }
    }

    fn commit_infallible(&self, mutate: impl FnOnce(&mut RaceSessionState)) -> RaceSessionState {
        let mut state = self.lock();
        mutate(&mut *state);
        self.broadcaster
            .publish(ServerEvent::SyncRaceState(state.clone()));
        state.clone()
    }

    /// Validate `mutate` against a copy, then commit and rebroadcast under
    /// the same lock.
    fn commit(
        &self,
        mutate: impl FnOnce(&mut RaceSessionState) -> Result<(), ControlError>,
    ) -> Result<RaceSessionState, ControlError> {
        let mut state = self.lock();
        let mut next = state.clone();
        mutate(&mut next)?;
        *state = next;
        self.broadcaster
            .publish(ServerEvent::SyncRaceState(state.clone()));
        Ok(state.clone())
    }
}
