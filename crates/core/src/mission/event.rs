//! Controller events
//!
//! Every controller operation returns the events it produced. The runtime
//! renders them to the mission log; tests assert on them directly.

use heapless::Vec;

use crate::energy::EnergyReport;
use crate::geo::GeoCoordinate;
use crate::identity::AgentId;
use crate::vehicle::ModeName;

use super::state::{MissionStage, SubStage};

/// Maximum events emitted by one controller operation
pub const MAX_CONTROLLER_EVENTS: usize = 8;

/// Bounded event list returned by controller operations
pub type Events = Vec<ControllerEvent, MAX_CONTROLLER_EVENTS>;

/// Navigation target issued during the Mission stage
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavTarget {
    Waypoint1,
    Waypoint2,
    Destination,
}

/// Reason an arm notification was rejected
#[derive(Clone, Debug, PartialEq)]
pub enum ArmRejection {
    /// Vehicle is above the point-zone tolerance
    Airborne { altitude_m: f64 },
    /// Vehicle is not in guided mode; a guided-mode request was issued
    NotGuided { mode: ModeName },
}

/// Observable outcome of a controller operation
#[derive(Clone, Debug, PartialEq)]
pub enum ControllerEvent {
    /// A vehicle was attached
    VehicleAttached { id: AgentId, flight_mode: ModeName },
    /// Attach ignored because the same vehicle is already attached
    AttachIgnored { id: AgentId },
    /// Guided mode requested after attach
    GuidedModeRequested,
    /// Vehicle does not accept flight mode requests
    FlightModeSetUnavailable,
    /// Attached vehicle was removed
    VehicleDetached { id: AgentId },
    /// Vehicle reported disarmed
    Disarmed,
    /// Vehicle reported a flight mode change
    FlightModeChanged { mode: ModeName, guided: bool },
    /// Top-level stage transition
    StageChanged { from: MissionStage, to: MissionStage },
    /// Mission sub-stage transition
    SubStageChanged { from: SubStage, to: SubStage },
    /// Goto command issued
    NavigatingTo {
        target: NavTarget,
        coordinate: GeoCoordinate,
    },
    /// Arm notification rejected
    ArmRejected(ArmRejection),
    /// Arm accepted, takeoff commanded
    MissionStarted { altitude_m: f64 },
    /// Vehicle touched down after landing
    MissionCompleted { total_energy_j: f64 },
    /// Dwell trigger sent to the next agent
    TriggerSent { destination: AgentId, dwell_tick: u32 },
    /// Peer trigger accepted; arm commanded
    ArmRequestedByPeer { source: AgentId },
    /// Peer message did not come from the expected source or arrived while armed
    PeerMessageIgnored { source: AgentId },
    /// Energy model applied this tick
    EnergyUpdated(EnergyReport),
    /// Energy update skipped for an unusable battery capacity
    EnergySkipped { capacity_j: f64 },
    /// Low battery forced a landing
    EmergencyLanding { remaining_percent: f64 },
}

/// Append an event, dropping it if the list is full
pub(crate) fn emit(events: &mut Events, event: ControllerEvent) {
    let _ = events.push(event);
}
