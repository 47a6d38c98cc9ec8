//! Mission Types
//!
//! Pure data structures for the scripted mission: the plan supplied at
//! start-up, the coordinates captured during one execution, stage tracking,
//! configuration, and the events the controller reports.
//!
//! # Mission Shape
//!
//! - Takeoff to a fixed altitude
//! - Waypoint 1, then waypoint 2
//! - Destination projected from the position at waypoint 2
//! - Dwell at the destination, then land

pub mod config;
pub mod event;
pub mod state;

pub use config::{ConfigError, MissionConfig};
pub use event::{ArmRejection, ControllerEvent, Events, NavTarget, MAX_CONTROLLER_EVENTS};
pub use state::{MissionProgress, MissionStage, SubStage};

use crate::geo::GeoCoordinate;

/// Mission parameters supplied before arming
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MissionPlan {
    pub waypoint1: GeoCoordinate,
    pub waypoint2: GeoCoordinate,
}

impl MissionPlan {
    pub const fn new(waypoint1: GeoCoordinate, waypoint2: GeoCoordinate) -> Self {
        Self {
            waypoint1,
            waypoint2,
        }
    }
}

/// Coordinates used by one mission execution
///
/// Captured from the plan when the Mission stage begins; `destination` is
/// filled in once the vehicle reaches waypoint 2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoints {
    pub waypoint1: GeoCoordinate,
    pub waypoint2: GeoCoordinate,
    pub destination: Option<GeoCoordinate>,
}

impl From<&MissionPlan> for Waypoints {
    fn from(plan: &MissionPlan) -> Self {
        Self {
            waypoint1: plan.waypoint1,
            waypoint2: plan.waypoint2,
            destination: None,
        }
    }
}
