//! The telemetry simulation.
//!
//! A stand-in for a live data feed: every tick it moves each car toward the
//! target speed for the current flag, advances it around the lap, burns or
//! refuels fuel, and rolls for an incident.
//!
//! # Per-car tick
//!
//! 1. Target speed: green-flag speed under Green, caution speed otherwise
//! 2. `speed += (target - speed) * convergence_rate + jitter`, clamped
//! 3. `lap_fraction = (lap_fraction + speed / distance_scale) mod 1`
//! 4. Burn fuel; below the low-fuel threshold enter the pit, where speed is
//!    pinned to pit-lane speed and fuel refills until the tank is full
//! 5. Tire temperatures follow speed
//! 6. Incident trial
//!
//! Nothing moves while the session is in maintenance.

use crate::config::SimulationConfig;
use crate::drivers::{DriverIdentity, DriverRegistry};
use crate::protocol::{IncidentAlert, ServerEvent, TelemetryMessage};
use crate::race_state::{Flag, RaceSessionState};
use crate::telemetry::{
    DriverTelemetry, FULL_FUEL, ReadoutFields, TIRE_BASELINE, TIRE_HEAT_PER_MPH, TelemetryReadout,
    clamp_finite, wrap_unit,
};
use crate::time::TimeSource;

use super::random::RandomSource;

/// Anything that turns the current race state into per-tick events.
///
/// The tick task drives a `TelemetrySource` without knowing whether the
/// numbers are simulated or read from a live feed.
pub trait TelemetrySource: Send {
    fn tick(&mut self, race: &RaceSessionState) -> Vec<ServerEvent>;
}

struct Car {
    identity: DriverIdentity,
    telemetry: DriverTelemetry,
}

/// Simulated field of cars. Owns every car's telemetry exclusively.
pub struct RaceSimulator<R, T> {
    config: SimulationConfig,
    fields: ReadoutFields,
    cars: Vec<Car>,
    random: R,
    clock: T,
}

impl<R: RandomSource, T: TimeSource + Send> RaceSimulator<R, T> {
    /// Put every registered driver on track at green-flag speed on a full
    /// tank, spread randomly around the lap.
    #[must_use]
    pub fn new(registry: &DriverRegistry, config: SimulationConfig, mut random: R, clock: T) -> Self {
        let start_speed = clamp_finite(config.green_speed, config.speed_min, config.speed_max);
        let cars = registry
            .iter()
            .map(|identity| Car {
                identity: identity.clone(),
                telemetry: DriverTelemetry::new(start_speed, random.next_unit()),
            })
            .collect();
        let fields = ReadoutFields {
            fuel: config.report_fuel,
            pit_status: config.report_pit_status,
        };

        Self {
            config,
            fields,
            cars,
            random,
            clock,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current telemetry of the driver with id `driver_id`.
    #[must_use]
    pub fn telemetry(&self, driver_id: &str) -> Option<&DriverTelemetry> {
        self.cars
            .iter()
            .find(|car| car.identity.id == driver_id)
            .map(|car| &car.telemetry)
    }

    /// Mutable access for placing a car in a given state.
    #[cfg(test)]
    fn telemetry_mut(&mut self, driver_id: &str) -> Option<&mut DriverTelemetry> {
        self.cars
            .iter_mut()
            .find(|car| car.identity.id == driver_id)
            .map(|car| &mut car.telemetry)
    }

    /// Every car in registry order.
    pub fn cars(&self) -> impl Iterator<Item = (&DriverIdentity, &DriverTelemetry)> {
        self.cars.iter().map(|car| (&car.identity, &car.telemetry))
    }

    /// Speed cars converge toward under `flag`.
    #[must_use]
    pub fn target_speed(&self, flag: Flag) -> f64 {
        let target = if flag.is_green() {
            self.config.green_speed
        } else {
            self.config.caution_speed
        };
        clamp_finite(target, self.config.speed_min, self.config.speed_max)
    }

    /// Advance every car by one tick.
    ///
    /// Returns, per car in registry order, an optional `incident_alert`
    /// followed by its `telemetry` message. Returns nothing during
    /// maintenance.
    pub fn step(&mut self, race: &RaceSessionState) -> Vec<ServerEvent> {
        if race.is_maintenance {
            return Vec::new();
        }

        let target = self.target_speed(race.flag);
        let mut events = Vec::with_capacity(self.cars.len());
        for car in &mut self.cars {
            let incident = advance(&mut car.telemetry, target, &self.config, &mut self.random);
            if incident {
                tracing::debug!(driver = %car.identity.id, "incident");
                events.push(ServerEvent::IncidentAlert(IncidentAlert::new(
                    &car.identity,
                    self.config.incident_points,
                    self.clock.clock_time(),
                )));
            }
            let readout = TelemetryReadout::derive(&car.telemetry, target, self.fields);
            events.push(ServerEvent::Telemetry(TelemetryMessage::new(&car.identity, readout)));
        }
        events
    }
}

impl<R: RandomSource, T: TimeSource + Send> TelemetrySource for RaceSimulator<R, T> {
    fn tick(&mut self, race: &RaceSessionState) -> Vec<ServerEvent> {
        self.step(race)
    }
}

/// Advance one car by one tick. Returns true if the incident trial fired.
fn advance(
    car: &mut DriverTelemetry,
    target: f64,
    config: &SimulationConfig,
    random: &mut impl RandomSource,
) -> bool {
    let jitter = (random.next_unit() - 0.5) * config.speed_jitter;
    let speed = car.speed + (target - car.speed) * config.convergence_rate + jitter;
    car.speed = clamp_finite(speed, config.speed_min, config.speed_max);
    car.lap_fraction = wrap_unit(car.lap_fraction + car.speed / config.distance_scale);

    if !car.pit_status {
        car.fuel = (car.fuel - config.fuel_burn_rate).max(0.0);
        if car.fuel < config.low_fuel_threshold {
            car.pit_status = true;
        }
    }
    if car.pit_status {
        car.speed = clamp_finite(config.pit_lane_speed, config.speed_min, config.speed_max);
        car.fuel = (car.fuel + config.fuel_refuel_rate).min(FULL_FUEL);
        if car.fuel >= FULL_FUEL {
            car.pit_status = false;
        }
    }

    car.tire_temps = TIRE_BASELINE.shifted((car.speed - config.green_speed) * TIRE_HEAT_PER_MPH);
    car.sanitize(config.speed_min, config.speed_max);

    let incident = random.next_unit() < config.incident_probability;
    if incident {
        car.incident_count = car.incident_count.saturating_add(1);
    }
    incident
}
