//! relay_trail_sitl - Software-in-the-loop backend for relay_trail agents
//!
//! - [`vehicle`]: Kinematic multicopter implementing `VehicleHandle`
//! - [`gcs`]: MAVLink UDP telemetry mirror for a ground station

pub mod error;
pub mod gcs;
pub mod vehicle;

pub use error::SimulatorError;
pub use gcs::GcsLink;
pub use vehicle::{SimVehicle, SimVehicleConfig, VehicleTelemetry};
