//! Vehicle contract
//!
//! The telemetry and command surface the mission controller needs from a
//! vehicle. Implementations live outside this crate (the SITL vehicle in
//! `relay_trail_sitl`, or a hardware link).
//!
//! Commands are fire-and-forget: the controller never waits for a
//! confirmation. Confirmations, where a backend produces them, arrive later as
//! [`VehicleNotification`]s.

use crate::geo::GeoCoordinate;
use crate::identity::AgentId;

/// Flight mode required before autonomous commands are accepted
pub const GUIDED_MODE: &str = "Guided";

/// Maximum stored length of a flight mode name
pub const MODE_NAME_LEN: usize = 24;

/// Bounded flight mode name carried in notifications and events
pub type ModeName = heapless::String<MODE_NAME_LEN>;

/// Build a [`ModeName`], truncating names longer than [`MODE_NAME_LEN`]
pub fn mode_name(mode: &str) -> ModeName {
    let mut name = ModeName::new();
    for c in mode.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    name
}

/// Battery state reported by the vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    /// Remaining charge in percent (0.0-100.0)
    pub remaining_percent: f64,
    /// Total battery energy (joules), expected to be > 0
    pub capacity_j: f64,
}

/// Command sent to the vehicle (fire-and-forget)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleCommand {
    /// Request a flight mode change
    SetFlightMode(&'static str),
    /// Request arming
    Arm,
    /// Take off to a relative altitude (meters)
    Takeoff { altitude_m: f64 },
    /// Navigate to a coordinate at the current altitude
    GotoLocation(GeoCoordinate),
    /// Land at the current position
    Land,
}

/// Telemetry change notification delivered asynchronously by the vehicle
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleNotification {
    /// Armed state changed
    ArmedChanged(bool),
    /// Flight mode changed
    FlightModeChanged(ModeName),
}

/// Telemetry and command interface for one vehicle
pub trait VehicleHandle {
    /// Vehicle (MAVLink system) identifier
    fn id(&self) -> AgentId;

    /// Whether the vehicle is armed
    fn armed(&self) -> bool;

    /// Current flight mode name
    fn flight_mode(&self) -> &str;

    /// Whether the vehicle is in guided navigation mode
    fn is_guided(&self) -> bool {
        self.flight_mode() == GUIDED_MODE
    }

    /// Whether the vehicle accepts flight mode change requests
    fn flight_mode_set_available(&self) -> bool {
        true
    }

    /// Altitude above the home position (meters)
    fn relative_altitude_m(&self) -> f64;

    /// Current geographic position
    fn position(&self) -> GeoCoordinate;

    /// Current battery state
    fn battery(&self) -> BatteryState;

    /// Overwrite the remaining battery percentage
    fn set_remaining_battery(&mut self, percent: f64);

    /// Issue a command without waiting for confirmation
    fn command(&mut self, command: VehicleCommand);
}
