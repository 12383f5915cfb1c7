//! Static registry of the drivers on track.
//!
//! The registry is built once at startup and never changes afterwards. The
//! simulation walks it in order on every tick, so the order of the list is
//! the order telemetry messages go out in.
//!
//! # Invariants
//!
//! - The registry is never empty
//! - Driver ids are unique
//! - Car numbers are unique

use std::collections::HashSet;

use serde::Serialize;

/// Car manufacturer shown next to the driver on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Manufacturer {
    Ford,
    Chevy,
    Toyota,
    Custom,
}

/// Identity of a single driver. Immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverIdentity {
    /// Stable key, e.g. `driver-1`.
    pub id: String,
    /// Car number as painted on the car. Kept as a string so `"08"` survives.
    pub car_number: String,
    pub display_name: String,
    pub manufacturer: Manufacturer,
    /// CSS color hint for the dashboard.
    pub color: String,
}

impl DriverIdentity {
    #[must_use]
    pub fn new(
        id: &str,
        car_number: &str,
        display_name: &str,
        manufacturer: Manufacturer,
        color: &str,
    ) -> Self {
        Self {
            id: id.to_owned(),
            car_number: car_number.to_owned(),
            display_name: display_name.to_owned(),
            manufacturer,
            color: color.to_owned(),
        }
    }
}

/// Error returned when building a registry from an invalid driver list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The driver list was empty.
    Empty,
    /// Two drivers share the same id.
    DuplicateId(String),
    /// Two drivers share the same car number.
    DuplicateCarNumber(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "driver registry must contain at least one driver"),
            Self::DuplicateId(id) => write!(f, "duplicate driver id: {id}"),
            Self::DuplicateCarNumber(number) => write!(f, "duplicate car number: {number}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Read-only, ordered list of driver identities.
#[derive(Debug, Clone)]
pub struct DriverRegistry {
    drivers: Vec<DriverIdentity>,
}

impl DriverRegistry {
    /// Build a registry, validating that ids and car numbers are unique.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or contains a duplicate id or
    /// car number.
    pub fn new(drivers: Vec<DriverIdentity>) -> Result<Self, RegistryError> {
        if drivers.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut ids = HashSet::with_capacity(drivers.len());
        let mut numbers = HashSet::with_capacity(drivers.len());
        for driver in &drivers {
            if !ids.insert(driver.id.as_str()) {
                return Err(RegistryError::DuplicateId(driver.id.clone()));
            }
            if !numbers.insert(driver.car_number.as_str()) {
                return Err(RegistryError::DuplicateCarNumber(driver.car_number.clone()));
            }
        }

        Ok(Self { drivers })
    }

    /// The field raced on the dashboard out of the box.
    #[must_use]
    pub fn default_field() -> Self {
        Self {
            drivers: vec![
                DriverIdentity::new("driver-1", "22", "JOEY LOGANO", Manufacturer::Ford, "#facc15"),
                DriverIdentity::new("driver-2", "8", "KYLE BUSCH", Manufacturer::Chevy, "#ef4444"),
                DriverIdentity::new("driver-3", "9", "CHASE ELLIOTT", Manufacturer::Chevy, "#3b82f6"),
                DriverIdentity::new("driver-4", "11", "DENNY HAMLIN", Manufacturer::Toyota, "#ffffff"),
            ],
        }
    }

    /// Iterate drivers in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &DriverIdentity> {
        self.drivers.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DriverIdentity> {
        self.drivers.iter().find(|driver| driver.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Always false for a constructed registry; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
