use relay_trail_core::geo::GeoCoordinate;
use relay_trail_core::AgentId;

use crate::error::SimulatorError;

/// Default home position (Canberra Model Aircraft Club field).
pub const DEFAULT_HOME: GeoCoordinate = GeoCoordinate::new(-35.363261, 149.165230);

/// Flight mode a freshly spawned vehicle reports.
pub const DEFAULT_INITIAL_MODE: &str = "Stabilize";

/// Configuration for spawning a simulated multicopter.
#[derive(Debug, Clone)]
pub struct SimVehicleConfig {
    /// Vehicle identifier (MAVLink system ID).
    pub id: AgentId,
    /// Takeoff/home position.
    pub home: GeoCoordinate,
    /// Flight mode reported before any mode request.
    pub initial_mode: String,
    /// Whether the vehicle accepts flight mode requests.
    pub flight_mode_set_available: bool,
    /// Vertical speed while climbing in m/s.
    pub climb_rate_ms: f64,
    /// Vertical speed while landing in m/s.
    pub descent_rate_ms: f64,
    /// Horizontal speed while navigating in m/s.
    pub cruise_speed_ms: f64,
    /// Total battery energy in joules.
    pub battery_capacity_j: f64,
    /// Battery percentage at spawn.
    pub initial_battery_percent: f64,
    /// GPS position noise standard deviation in meters.
    pub gps_noise_m: f64,
    /// RNG seed for deterministic noise. None = random.
    pub seed: Option<u64>,
}

impl Default for SimVehicleConfig {
    fn default() -> Self {
        Self {
            id: AgentId(1),
            home: DEFAULT_HOME,
            initial_mode: DEFAULT_INITIAL_MODE.to_string(),
            flight_mode_set_available: true,
            climb_rate_ms: 2.5,
            descent_rate_ms: 1.5,
            cruise_speed_ms: 5.0,
            battery_capacity_j: 1.0,
            initial_battery_percent: 100.0,
            gps_noise_m: 0.0,
            seed: None,
        }
    }
}

impl SimVehicleConfig {
    /// Default configuration for vehicle `id`.
    pub fn new(id: AgentId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Reject rates and battery figures the kinematics cannot use.
    pub fn validate(&self) -> Result<(), SimulatorError> {
        for (name, value) in [
            ("climb_rate_ms", self.climb_rate_ms),
            ("descent_rate_ms", self.descent_rate_ms),
            ("cruise_speed_ms", self.cruise_speed_ms),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimulatorError::InvalidConfig(format!(
                    "{name} must be positive (got {value})"
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.initial_battery_percent) {
            return Err(SimulatorError::InvalidConfig(format!(
                "initial_battery_percent must be within 0-100 (got {})",
                self.initial_battery_percent
            )));
        }
        if !self.gps_noise_m.is_finite() || self.gps_noise_m < 0.0 {
            return Err(SimulatorError::InvalidConfig(format!(
                "gps_noise_m must be non-negative (got {})",
                self.gps_noise_m
            )));
        }
        Ok(())
    }
}
