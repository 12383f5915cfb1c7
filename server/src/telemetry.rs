//! Per-driver telemetry state and the readout sent to viewers.
//!
//! [`DriverTelemetry`] is the mutable record the simulation advances every
//! tick. [`TelemetryReadout`] is the display-only projection of it that goes
//! on the wire, with derived fields (rpm, throttle, brake, gear, g-force)
//! computed from speed and target speed.
//!
//! # Invariants
//!
//! - Every number in a readout is finite and rounded for display
//! - `lap_fraction` is in `[0, 1)` and `fuel` is in `[0, 100]` after
//!   [`DriverTelemetry::sanitize`]

use serde::Serialize;

/// Fuel level of a full tank.
pub const FULL_FUEL: f64 = 100.0;

/// Tire temperatures at the green-flag reference speed.
pub const TIRE_BASELINE: TireTemps = TireTemps {
    fl: 210.0,
    fr: 215.0,
    rl: 205.0,
    rr: 208.0,
};

/// Degrees gained per mph above the green-flag reference speed.
pub const TIRE_HEAT_PER_MPH: f64 = 0.1;

const RPM_AT_200_MPH: f64 = 9000.0;
const CORNERING_SPEED: f64 = 150.0;
const TOP_GEAR_SPEED: f64 = 100.0;
const BRAKE_MARGIN: f64 = 5.0;
const LONGITUDINAL_G: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TireTemps {
    pub fl: f64,
    pub fr: f64,
    pub rl: f64,
    pub rr: f64,
}

impl TireTemps {
    /// Shift every corner by the same number of degrees.
    #[must_use]
    pub fn shifted(self, delta: f64) -> Self {
        Self {
            fl: self.fl + delta,
            fr: self.fr + delta,
            rl: self.rl + delta,
            rr: self.rr + delta,
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            fl: f(self.fl),
            fr: f(self.fr),
            rl: f(self.rl),
            rr: f(self.rr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GForce {
    pub lat: f64,
    pub long: f64,
}

/// Simulation variables for one car. Only the simulation mutates these.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverTelemetry {
    /// Speed in mph.
    pub speed: f64,
    /// Position around the current lap in `[0, 1)`.
    pub lap_fraction: f64,
    /// Fuel in `[0, 100]`.
    pub fuel: f64,
    /// True from entering a refuel until the tank is full again.
    pub pit_status: bool,
    pub tire_temps: TireTemps,
    pub incident_count: u32,
}

impl DriverTelemetry {
    /// A car on a full tank at `speed`, `lap_fraction` of the way around the lap.
    #[must_use]
    pub fn new(speed: f64, lap_fraction: f64) -> Self {
        Self {
            speed,
            lap_fraction: wrap_unit(lap_fraction),
            fuel: FULL_FUEL,
            pit_status: false,
            tire_temps: TIRE_BASELINE,
            incident_count: 0,
        }
    }

    /// Replace any non-finite or out-of-range value with a safe one.
    pub fn sanitize(&mut self, speed_min: f64, speed_max: f64) {
        self.speed = clamp_finite(self.speed, speed_min, speed_max);
        self.lap_fraction = wrap_unit(self.lap_fraction);
        self.fuel = clamp_finite(self.fuel, 0.0, FULL_FUEL);
        self.tire_temps = self.tire_temps.map(|t| finite_or(t, 0.0));
    }
}

/// Which optional fields a telemetry payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadoutFields {
    pub fuel: bool,
    pub pit_status: bool,
}

impl Default for ReadoutFields {
    fn default() -> Self {
        Self {
            fuel: true,
            pit_status: true,
        }
    }
}

/// The `telemetry` object inside a telemetry message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReadout {
    pub speed: f64,
    pub rpm: u32,
    pub throttle: f64,
    pub brake: f64,
    pub gear: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel: Option<f64>,
    pub incidents: u32,
    pub lap_dist_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pit_status: Option<bool>,
    pub tires: TireTemps,
    pub g_force: GForce,
}

impl TelemetryReadout {
    /// Project a car's state into its display readout.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // speed is finite and non-negative here
    pub fn derive(state: &DriverTelemetry, target_speed: f64, fields: ReadoutFields) -> Self {
        let speed = finite_or(state.speed, 0.0).max(0.0);
        let target_speed = finite_or(target_speed, speed);

        let throttle = if speed < target_speed { 100.0 } else { 70.0 };
        let brake = if speed > target_speed - BRAKE_MARGIN { 0.0 } else { 40.0 };
        let gear = if speed > TOP_GEAR_SPEED { 4 } else { 2 };
        let lat = if speed > CORNERING_SPEED { 1.2 } else { 0.4 };

        Self {
            speed: round_to(speed, 1),
            rpm: (speed / 200.0 * RPM_AT_200_MPH).round() as u32,
            throttle,
            brake,
            gear,
            fuel: fields
                .fuel
                .then(|| round_to(clamp_finite(state.fuel, 0.0, FULL_FUEL), 1)),
            incidents: state.incident_count,
            lap_dist_pct: round_to(wrap_unit(state.lap_fraction), 4).min(0.9999),
            pit_status: fields.pit_status.then_some(state.pit_status),
            tires: state.tire_temps.map(|t| round_to(finite_or(t, 0.0), 1)),
            g_force: GForce {
                lat,
                long: LONGITUDINAL_G,
            },
        }
    }
}

/// `value` if it is finite, `fallback` otherwise.
#[must_use]
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// Clamp into `[min, max]`, mapping NaN and infinities to `min`.
#[must_use]
pub fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    finite_or(value, min).clamp(min, max)
}

/// Reduce modulo 1 into `[0, 1)`. Non-finite input maps to 0.
#[must_use]
pub fn wrap_unit(value: f64) -> f64 {
    let wrapped = finite_or(value, 0.0).rem_euclid(1.0);
    // rem_euclid rounds up to exactly 1.0 for tiny negative inputs.
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
