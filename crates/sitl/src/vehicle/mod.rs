//! Simulated multicopter.
//!
//! Kinematic vehicle with no external dependencies, suitable for CI and for
//! running agents without an autopilot. Climb, descent and cruise happen at
//! constant rates; horizontal motion follows the great-circle bearing to the
//! current target. Commands take effect immediately and state changes are
//! queued as [`VehicleNotification`]s for the runtime to drain.

pub mod config;

pub use config::{SimVehicleConfig, DEFAULT_HOME};

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use relay_trail_core::geo::GeoCoordinate;
use relay_trail_core::vehicle::{
    mode_name, BatteryState, VehicleCommand, VehicleHandle, VehicleNotification,
};
use relay_trail_core::AgentId;
use tracing::debug;

use crate::error::SimulatorError;

/// Flight mode entered when a landing is commanded.
pub const LAND_MODE: &str = "Land";

/// Altitude below which the vehicle counts as on the ground (meters).
const GROUND_ALTITUDE_M: f64 = 0.05;

/// Most recent commands kept in the command log.
pub const COMMAND_LOG_CAPACITY: usize = 256;

/// Snapshot of the values mirrored to a ground station.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleTelemetry {
    pub id: AgentId,
    pub position: GeoCoordinate,
    pub relative_altitude_m: f64,
    pub heading_deg: f64,
    pub armed: bool,
    pub flight_mode: String,
    pub battery_remaining_percent: f64,
}

/// Simulated multicopter implementing [`VehicleHandle`].
pub struct SimVehicle {
    config: SimVehicleConfig,
    armed: bool,
    flight_mode: String,
    position: GeoCoordinate,
    altitude_m: f64,
    heading_deg: f64,
    target_altitude_m: Option<f64>,
    target_position: Option<GeoCoordinate>,
    landing: bool,
    battery_percent: f64,
    /// GPS error applied to reported positions (meters, bearing degrees).
    gps_offset: (f64, f64),
    rng: StdRng,
    sim_time_us: u64,
    commands: Vec<VehicleCommand>,
    notifications: VecDeque<VehicleNotification>,
}

impl SimVehicle {
    /// Spawn a vehicle on the ground at `config.home`, disarmed.
    pub fn new(config: SimVehicleConfig) -> Result<Self, SimulatorError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            armed: false,
            flight_mode: config.initial_mode.clone(),
            position: config.home,
            altitude_m: 0.0,
            heading_deg: 0.0,
            target_altitude_m: None,
            target_position: None,
            landing: false,
            battery_percent: config.initial_battery_percent,
            gps_offset: (0.0, 0.0),
            rng,
            sim_time_us: 0,
            commands: Vec::with_capacity(COMMAND_LOG_CAPACITY),
            notifications: VecDeque::new(),
            config,
        })
    }

    /// Spawn vehicle `id` with default configuration.
    pub fn with_defaults(id: AgentId) -> Result<Self, SimulatorError> {
        Self::new(SimVehicleConfig::new(id))
    }

    pub fn config(&self) -> &SimVehicleConfig {
        &self.config
    }

    /// The last [`COMMAND_LOG_CAPACITY`] commands received, oldest first.
    pub fn commands(&self) -> &[VehicleCommand] {
        &self.commands
    }

    /// Take the queued notifications, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<VehicleNotification> {
        self.notifications.drain(..).collect()
    }

    pub fn sim_time_us(&self) -> u64 {
        self.sim_time_us
    }

    /// Position without GPS noise.
    pub fn true_position(&self) -> GeoCoordinate {
        self.position
    }

    /// Disarm immediately (operator action or failsafe).
    pub fn disarm(&mut self) {
        if self.armed {
            self.set_armed(false);
        }
    }

    /// Change mode as a pilot would from the transmitter, bypassing
    /// `flight_mode_set_available`.
    pub fn force_flight_mode(&mut self, mode: &str) {
        self.change_mode(mode);
    }

    /// Values mirrored to a ground station.
    pub fn telemetry(&self) -> VehicleTelemetry {
        VehicleTelemetry {
            id: self.config.id,
            position: self.position(),
            relative_altitude_m: self.altitude_m,
            heading_deg: self.heading_deg,
            armed: self.armed,
            flight_mode: self.flight_mode.clone(),
            battery_remaining_percent: self.battery_percent,
        }
    }

    /// Advance the kinematics by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        let dt_s = dt_s.max(0.0);
        self.sim_time_us += (dt_s * 1_000_000.0) as u64;

        if self.armed {
            self.integrate_vertical(dt_s);
        }
        if self.armed {
            self.integrate_horizontal(dt_s);
        }

        if self.config.gps_noise_m > 0.0 {
            let distance = self.gaussian_noise(self.config.gps_noise_m).abs();
            let bearing = self.rng.gen_range(0.0..360.0);
            self.gps_offset = (distance, bearing);
        }
    }

    fn integrate_vertical(&mut self, dt_s: f64) {
        if self.landing {
            self.altitude_m = (self.altitude_m - self.config.descent_rate_ms * dt_s).max(0.0);
            if self.altitude_m <= GROUND_ALTITUDE_M {
                self.altitude_m = 0.0;
                self.landing = false;
                debug!(id = %self.config.id, "Touchdown, disarming");
                self.set_armed(false);
            }
            return;
        }

        let Some(target) = self.target_altitude_m else {
            return;
        };
        let delta = target - self.altitude_m;
        let rate = if delta >= 0.0 {
            self.config.climb_rate_ms
        } else {
            self.config.descent_rate_ms
        };
        let max_step = rate * dt_s;
        if delta.abs() <= max_step {
            self.altitude_m = target;
            self.target_altitude_m = None;
        } else {
            self.altitude_m += max_step * delta.signum();
        }
    }

    fn integrate_horizontal(&mut self, dt_s: f64) {
        if self.landing || self.altitude_m <= GROUND_ALTITUDE_M {
            return;
        }
        let Some(target) = self.target_position else {
            return;
        };

        let distance = self.position.distance_to(&target);
        let max_step = self.config.cruise_speed_ms * dt_s;
        if distance <= max_step {
            self.position = target;
            self.target_position = None;
        } else {
            self.heading_deg = self.position.bearing_to(&target);
            self.position = self
                .position
                .at_distance_and_azimuth(max_step, self.heading_deg);
        }
    }

    fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
        if !armed {
            self.target_altitude_m = None;
            self.target_position = None;
            self.landing = false;
        }
        self.notifications
            .push_back(VehicleNotification::ArmedChanged(armed));
    }

    fn change_mode(&mut self, mode: &str) {
        if self.flight_mode != mode {
            self.flight_mode = mode.to_string();
            self.notifications
                .push_back(VehicleNotification::FlightModeChanged(mode_name(mode)));
        }
    }

    fn on_ground(&self) -> bool {
        self.altitude_m <= GROUND_ALTITUDE_M
    }

    /// Generate Gaussian noise using Box-Muller transform.
    fn gaussian_noise(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let u1: f64 = self.rng.gen::<f64>().max(f64::EPSILON);
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        z * stddev
    }
}

impl std::fmt::Debug for SimVehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimVehicle")
            .field("id", &self.config.id)
            .field("armed", &self.armed)
            .field("flight_mode", &self.flight_mode)
            .field("altitude_m", &self.altitude_m)
            .field("sim_time_us", &self.sim_time_us)
            .finish()
    }
}

impl VehicleHandle for SimVehicle {
    fn id(&self) -> AgentId {
        self.config.id
    }

    fn armed(&self) -> bool {
        self.armed
    }

    fn flight_mode(&self) -> &str {
        &self.flight_mode
    }

    fn flight_mode_set_available(&self) -> bool {
        self.config.flight_mode_set_available
    }

    fn relative_altitude_m(&self) -> f64 {
        self.altitude_m
    }

    fn position(&self) -> GeoCoordinate {
        let (distance, bearing) = self.gps_offset;
        if distance == 0.0 {
            return self.position;
        }
        self.position.at_distance_and_azimuth(distance, bearing)
    }

    fn battery(&self) -> BatteryState {
        BatteryState {
            remaining_percent: self.battery_percent,
            capacity_j: self.config.battery_capacity_j,
        }
    }

    fn set_remaining_battery(&mut self, percent: f64) {
        self.battery_percent = percent;
    }

    fn command(&mut self, command: VehicleCommand) {
        if self.commands.len() == COMMAND_LOG_CAPACITY {
            self.commands.remove(0);
        }
        self.commands.push(command);

        match command {
            VehicleCommand::SetFlightMode(mode) => {
                if self.config.flight_mode_set_available {
                    self.change_mode(mode);
                } else {
                    debug!(id = %self.config.id, mode, "Flight mode request ignored");
                }
            }
            VehicleCommand::Arm => {
                if self.armed {
                    return;
                }
                if !self.is_guided() || !self.on_ground() {
                    debug!(
                        id = %self.config.id,
                        mode = %self.flight_mode,
                        altitude_m = self.altitude_m,
                        "Arm refused"
                    );
                    return;
                }
                self.set_armed(true);
            }
            VehicleCommand::Takeoff { altitude_m } => {
                if self.armed && !self.landing {
                    self.target_altitude_m = Some(altitude_m);
                }
            }
            VehicleCommand::GotoLocation(target) => {
                if self.armed && !self.landing {
                    self.target_position = Some(target);
                }
            }
            VehicleCommand::Land => {
                if self.armed {
                    self.landing = true;
                    self.target_altitude_m = None;
                    self.target_position = None;
                    self.change_mode(LAND_MODE);
                }
            }
        }
    }
}
