//! Mission configuration
//!
//! Contract constants for the scripted mission and their validation.

use core::fmt;

use crate::energy::EnergyConfig;

/// Default scheduler tick period (milliseconds)
pub const DEFAULT_TICK_PERIOD_MS: u32 = 100;

/// Default arrival tolerance for distance and altitude checks (meters)
pub const DEFAULT_POINT_ZONE_M: f64 = 1.0;

/// Default takeoff altitude above home (meters)
pub const DEFAULT_TAKEOFF_ALTITUDE_M: f64 = 10.0;

/// Default distance from waypoint 2 to the projected destination (meters)
pub const DEFAULT_DESTINATION_DISTANCE_M: f64 = 500.0;

/// Default bearing from waypoint 2 to the projected destination (degrees)
pub const DEFAULT_DESTINATION_BEARING_DEG: f64 = 335.0;

/// Default time spent in the dwell sub-stage (milliseconds)
pub const DEFAULT_DWELL_MS: u32 = 5000;

/// Mission configuration errors
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Tick period must be at least 1 ms
    ZeroTickPeriod,
    /// Point-zone tolerance must be positive and finite
    InvalidTolerance(f64),
    /// Takeoff altitude must exceed the point-zone tolerance
    InvalidTakeoffAltitude(f64),
    /// Destination distance must be non-negative and finite
    InvalidDestinationDistance(f64),
    /// Dwell must last at least one tick
    DwellShorterThanTick { dwell_ms: u32, tick_period_ms: u32 },
    /// Energy constants must be finite and non-negative
    InvalidEnergyConstant(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTickPeriod => write!(f, "tick period must be at least 1 ms"),
            ConfigError::InvalidTolerance(v) => {
                write!(f, "point-zone tolerance must be positive (got {})", v)
            }
            ConfigError::InvalidTakeoffAltitude(v) => write!(
                f,
                "takeoff altitude must exceed the point-zone tolerance (got {})",
                v
            ),
            ConfigError::InvalidDestinationDistance(v) => {
                write!(f, "destination distance must be non-negative (got {})", v)
            }
            ConfigError::DwellShorterThanTick {
                dwell_ms,
                tick_period_ms,
            } => write!(
                f,
                "dwell of {} ms is shorter than one {} ms tick",
                dwell_ms, tick_period_ms
            ),
            ConfigError::InvalidEnergyConstant(name) => {
                write!(f, "energy constant {} must be finite and non-negative", name)
            }
        }
    }
}

/// Mission controller configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionConfig {
    /// Scheduler tick period (milliseconds)
    pub tick_period_ms: u32,
    /// Arrival tolerance (meters)
    pub point_zone_m: f64,
    /// Takeoff target altitude (meters)
    pub takeoff_altitude_m: f64,
    /// Destination distance from waypoint 2 (meters)
    pub destination_distance_m: f64,
    /// Destination bearing from waypoint 2 (degrees)
    pub destination_bearing_deg: f64,
    /// Dwell duration (milliseconds)
    pub dwell_ms: u32,
    /// Energy model constants
    pub energy: EnergyConfig,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            point_zone_m: DEFAULT_POINT_ZONE_M,
            takeoff_altitude_m: DEFAULT_TAKEOFF_ALTITUDE_M,
            destination_distance_m: DEFAULT_DESTINATION_DISTANCE_M,
            destination_bearing_deg: DEFAULT_DESTINATION_BEARING_DEG,
            dwell_ms: DEFAULT_DWELL_MS,
            energy: EnergyConfig::default(),
        }
    }
}

impl MissionConfig {
    /// Number of dwell ticks before landing (`dwell_ms / tick_period_ms`)
    pub fn dwell_target_ticks(&self) -> u32 {
        if self.tick_period_ms == 0 {
            return 0;
        }
        self.dwell_ms / self.tick_period_ms
    }

    /// Nominal tick period in seconds
    pub fn tick_period_s(&self) -> f64 {
        self.tick_period_ms as f64 / 1000.0
    }

    /// Check every field for usable values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if !self.point_zone_m.is_finite() || self.point_zone_m <= 0.0 {
            return Err(ConfigError::InvalidTolerance(self.point_zone_m));
        }
        if !self.takeoff_altitude_m.is_finite() || self.takeoff_altitude_m <= self.point_zone_m {
            return Err(ConfigError::InvalidTakeoffAltitude(self.takeoff_altitude_m));
        }
        if !self.destination_distance_m.is_finite() || self.destination_distance_m < 0.0 {
            return Err(ConfigError::InvalidDestinationDistance(
                self.destination_distance_m,
            ));
        }
        if self.dwell_ms < self.tick_period_ms {
            return Err(ConfigError::DwellShorterThanTick {
                dwell_ms: self.dwell_ms,
                tick_period_ms: self.tick_period_ms,
            });
        }

        let energy = &self.energy;
        for (name, value) in [
            ("effective_capacitance_f", energy.effective_capacitance_f),
            ("clock_frequency_hz", energy.clock_frequency_hz),
            ("low_battery_percent", energy.low_battery_percent),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidEnergyConstant(name));
            }
        }

        Ok(())
    }
}
