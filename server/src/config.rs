//! Server configuration module.
//!
//! This module provides configuration loading for the race hub from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `RACE_HUB_LISTEN_PORT` (or `PORT`): Port to listen on (default: `10000`)
//! - `RACE_HUB_STATIC_DIRECTORY`: Dashboard assets to serve next to `/ws` (default: none)
//! - `RACE_HUB_CONTROL_HEADER`: Header an upstream gatekeeper sets to `true` on
//!   connections allowed to send control messages (default: none, everyone may)
//! - `RACE_HUB_SUBSCRIBER_QUEUE`: Per-viewer outgoing queue capacity (default: `256`)
//! - `RACE_HUB_SEED`: Fixed random seed for a reproducible session (default: OS entropy)
//! - `RACE_HUB_TICK_PERIOD_MS`, `RACE_HUB_SPEED_MIN`, `RACE_HUB_SPEED_MAX`,
//!   `RACE_HUB_GREEN_SPEED`, `RACE_HUB_CAUTION_SPEED`, `RACE_HUB_PIT_LANE_SPEED`,
//!   `RACE_HUB_CONVERGENCE_RATE`, `RACE_HUB_SPEED_JITTER`, `RACE_HUB_DISTANCE_SCALE`,
//!   `RACE_HUB_FUEL_BURN_RATE`, `RACE_HUB_FUEL_REFUEL_RATE`,
//!   `RACE_HUB_LOW_FUEL_THRESHOLD`, `RACE_HUB_INCIDENT_PROBABILITY`,
//!   `RACE_HUB_INCIDENT_POINTS`, `RACE_HUB_REPORT_FUEL`,
//!   `RACE_HUB_REPORT_PIT_STATUS`: simulation tuning, see [`SimulationConfig`]
//!
//! # Invariants
//!
//! - `listen_port` is always a valid port number
//! - `subscriber_queue_capacity` is at least 1
//! - `simulation` has passed [`SimulationConfig::validate`]

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::telemetry::FULL_FUEL;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on for HTTP and WebSocket connections.
    pub listen_port: u16,
    /// Directory of dashboard assets served on every path other than `/ws`.
    pub static_directory: Option<PathBuf>,
    /// When set, only upgrade requests carrying this header with value `true`
    /// may send control messages.
    pub control_header: Option<String>,
    /// Number of messages buffered per viewer before the oldest are dropped.
    pub subscriber_queue_capacity: usize,
    /// Fixed seed for the simulation's random source.
    pub seed: Option<u64>,
    pub simulation: SimulationConfig,
}

/// Tuning constants for the telemetry simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub tick_period_ms: u64,
    /// Lower physical speed bound in mph.
    pub speed_min: f64,
    /// Upper physical speed bound in mph.
    pub speed_max: f64,
    /// Target speed under the green flag.
    pub green_speed: f64,
    /// Target speed under any other flag.
    pub caution_speed: f64,
    /// Speed a car is pinned to while refueling.
    pub pit_lane_speed: f64,
    /// Fraction of the gap to the target speed closed each tick.
    pub convergence_rate: f64,
    /// Full width of the zero-mean speed jitter range.
    pub speed_jitter: f64,
    /// Track length in speed units per tick.
    pub distance_scale: f64,
    pub fuel_burn_rate: f64,
    pub fuel_refuel_rate: f64,
    pub low_fuel_threshold: f64,
    pub incident_probability: f64,
    pub incident_points: u32,
    /// Include `fuel` in telemetry payloads.
    pub report_fuel: bool,
    /// Include `pitStatus` in telemetry payloads.
    pub report_pit_status: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 100,
            speed_min: 0.0,
            speed_max: 200.0,
            green_speed: 185.0,
            caution_speed: 55.0,
            pit_lane_speed: 45.0,
            convergence_rate: 0.1,
            speed_jitter: 2.0,
            distance_scale: 10_000.0,
            fuel_burn_rate: 0.001,
            fuel_refuel_rate: 2.0,
            low_fuel_threshold: 20.0,
            incident_probability: 0.001,
            incident_points: 4,
            report_fuel: true,
            report_pit_status: true,
        }
    }
}

impl SimulationConfig {
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Check that the constants describe a simulation that stays bounded.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(invalid("tick_period_ms", "must be greater than zero"));
        }

        let finite = [
            ("speed_min", self.speed_min),
            ("speed_max", self.speed_max),
            ("green_speed", self.green_speed),
            ("caution_speed", self.caution_speed),
            ("pit_lane_speed", self.pit_lane_speed),
            ("convergence_rate", self.convergence_rate),
            ("speed_jitter", self.speed_jitter),
            ("distance_scale", self.distance_scale),
            ("fuel_burn_rate", self.fuel_burn_rate),
            ("fuel_refuel_rate", self.fuel_refuel_rate),
            ("low_fuel_threshold", self.low_fuel_threshold),
            ("incident_probability", self.incident_probability),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(invalid(name, "must be a finite number"));
            }
        }

        if self.speed_min < 0.0 {
            return Err(invalid("speed_min", "must not be negative"));
        }
        if self.speed_min > self.speed_max {
            return Err(invalid("speed_min", "must not exceed speed_max"));
        }
        if self.convergence_rate <= 0.0 || self.convergence_rate > 1.0 {
            return Err(invalid("convergence_rate", "must be in (0, 1]"));
        }
        if self.distance_scale <= 0.0 {
            return Err(invalid("distance_scale", "must be greater than zero"));
        }
        for (name, value) in [
            ("speed_jitter", self.speed_jitter),
            ("fuel_burn_rate", self.fuel_burn_rate),
        ] {
            if value < 0.0 {
                return Err(invalid(name, "must not be negative"));
            }
        }
        // A car in the pit stays there until it is refuelled.
        if self.fuel_refuel_rate <= 0.0 {
            return Err(invalid("fuel_refuel_rate", "must be greater than zero"));
        }
        if !(0.0..=FULL_FUEL).contains(&self.low_fuel_threshold) {
            return Err(invalid("low_fuel_threshold", "must be in [0, 100]"));
        }
        if !(0.0..=1.0).contains(&self.incident_probability) {
            return Err(invalid("incident_probability", "must be in [0, 1]"));
        }

        Ok(())
    }

    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            tick_period_ms: load_parsed(lookup, "RACE_HUB_TICK_PERIOD_MS", defaults.tick_period_ms)?,
            speed_min: load_parsed(lookup, "RACE_HUB_SPEED_MIN", defaults.speed_min)?,
            speed_max: load_parsed(lookup, "RACE_HUB_SPEED_MAX", defaults.speed_max)?,
            green_speed: load_parsed(lookup, "RACE_HUB_GREEN_SPEED", defaults.green_speed)?,
            caution_speed: load_parsed(lookup, "RACE_HUB_CAUTION_SPEED", defaults.caution_speed)?,
            pit_lane_speed: load_parsed(lookup, "RACE_HUB_PIT_LANE_SPEED", defaults.pit_lane_speed)?,
            convergence_rate: load_parsed(
                lookup,
                "RACE_HUB_CONVERGENCE_RATE",
                defaults.convergence_rate,
            )?,
            speed_jitter: load_parsed(lookup, "RACE_HUB_SPEED_JITTER", defaults.speed_jitter)?,
            distance_scale: load_parsed(lookup, "RACE_HUB_DISTANCE_SCALE", defaults.distance_scale)?,
            fuel_burn_rate: load_parsed(lookup, "RACE_HUB_FUEL_BURN_RATE", defaults.fuel_burn_rate)?,
            fuel_refuel_rate: load_parsed(
                lookup,
                "RACE_HUB_FUEL_REFUEL_RATE",
                defaults.fuel_refuel_rate,
            )?,
            low_fuel_threshold: load_parsed(
                lookup,
                "RACE_HUB_LOW_FUEL_THRESHOLD",
                defaults.low_fuel_threshold,
            )?,
            incident_probability: load_parsed(
                lookup,
                "RACE_HUB_INCIDENT_PROBABILITY",
                defaults.incident_probability,
            )?,
            incident_points: load_parsed(lookup, "RACE_HUB_INCIDENT_POINTS", defaults.incident_points)?,
            report_fuel: load_parsed(lookup, "RACE_HUB_REPORT_FUEL", defaults.report_fuel)?,
            report_pit_status: load_parsed(
                lookup,
                "RACE_HUB_REPORT_PIT_STATUS",
                defaults.report_pit_status,
            )?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(name: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        message: message.to_string(),
    }
}

/// Parse an optional variable, falling back to `default` when it is unset.
fn load_parsed<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' could not be parsed"),
        }),
        None => Ok(default),
    }
}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 10_000;
    /// Default per-viewer queue capacity.
    pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 256;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set to a value that does not parse
    /// or the simulation constants fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_port = Self::load_listen_port(lookup)?;
        let static_directory = non_empty(lookup("RACE_HUB_STATIC_DIRECTORY")).map(PathBuf::from);
        let control_header = non_empty(lookup("RACE_HUB_CONTROL_HEADER"));
        let subscriber_queue_capacity = load_parsed(
            lookup,
            "RACE_HUB_SUBSCRIBER_QUEUE",
            Self::DEFAULT_SUBSCRIBER_QUEUE,
        )?;
        if subscriber_queue_capacity == 0 {
            return Err(invalid("RACE_HUB_SUBSCRIBER_QUEUE", "must be at least 1"));
        }
        let seed = match lookup("RACE_HUB_SEED") {
            Some(_) => Some(load_parsed(lookup, "RACE_HUB_SEED", 0_u64)?),
            None => None,
        };
        let simulation = SimulationConfig::from_lookup(lookup)?;

        Ok(Self {
            listen_port,
            static_directory,
            control_header,
            subscriber_queue_capacity,
            seed,
            simulation,
        })
    }

    /// Load the listen port. `RACE_HUB_LISTEN_PORT` wins over the
    /// platform-provided `PORT`.
    fn load_listen_port<F>(lookup: &F) -> Result<u16, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in ["RACE_HUB_LISTEN_PORT", "PORT"] {
            if let Some(value) = lookup(name) {
                return match value.trim().parse::<u16>() {
                    Ok(port) if port != 0 => Ok(port),
                    _ => Err(ConfigError::InvalidValue {
                        name: name.to_string(),
                        message: format!("'{value}' is not a valid port number (must be 1-65535)"),
                    }),
                };
            }
        }
        Ok(Self::DEFAULT_PORT)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
