//! Mission Controller
//!
//! State machine driving one vehicle through takeoff, a two-waypoint route
//! with a projected destination, a dwell that signals the next agent, and
//! landing. The energy model runs first on every tick and can force an
//! emergency landing.
//!
//! The controller owns the attached vehicle (if any) and the send side of the
//! peer channel. All inputs (vehicle attach/detach, vehicle notifications,
//! peer messages, ticks) arrive through `&mut self` methods on a single
//! execution context; every method returns the [`ControllerEvent`]s it
//! produced.
//!
//! # Stage Sequence
//!
//! ```text
//! Idle --arm accepted--> Takeoff --altitude reached--> Mission(0..=4) --dwell done--> Land --touchdown--> Idle
//! ```
//!
//! Disarm or detach returns to Idle from any stage. Low battery forces Land.

use crate::energy::{EnergyFault, EnergyModel, EnergyUpdate};
use crate::geo::GeoCoordinate;
use crate::identity::AgentId;
use crate::mission::event::emit;
use crate::mission::{
    ArmRejection, ControllerEvent, Events, MissionConfig, MissionPlan, MissionProgress,
    MissionStage, NavTarget, SubStage, Waypoints,
};
use crate::peer::{PeerChannel, TRIGGER_PAYLOAD};
use crate::vehicle::{mode_name, VehicleCommand, VehicleHandle, GUIDED_MODE};

/// Mission state machine for a single vehicle
pub struct MissionController<V: VehicleHandle, P: PeerChannel> {
    config: MissionConfig,
    plan: MissionPlan,
    vehicle: Option<V>,
    peer: P,
    stage: MissionStage,
    progress: MissionProgress,
    /// Coordinates of the current (or last) mission execution
    waypoints: Option<Waypoints>,
    energy: EnergyModel,
}

impl<V: VehicleHandle, P: PeerChannel> MissionController<V, P> {
    /// Create an idle controller with no vehicle attached
    pub fn new(config: MissionConfig, plan: MissionPlan, mut peer: P) -> Self {
        peer.set_local_id(AgentId::NONE);
        Self {
            config,
            plan,
            vehicle: None,
            peer,
            stage: MissionStage::Idle,
            progress: MissionProgress::default(),
            waypoints: None,
            energy: EnergyModel::new(config.energy),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn stage(&self) -> MissionStage {
        self.stage
    }

    pub fn progress(&self) -> MissionProgress {
        self.progress
    }

    pub fn waypoints(&self) -> Option<&Waypoints> {
        self.waypoints.as_ref()
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn plan(&self) -> &MissionPlan {
        &self.plan
    }

    /// Replace the plan used by the next mission start
    pub fn set_plan(&mut self, plan: MissionPlan) {
        self.plan = plan;
    }

    /// Identity of the attached vehicle, [`AgentId::NONE`] when detached
    pub fn agent_id(&self) -> AgentId {
        self.vehicle
            .as_ref()
            .map(|v| v.id())
            .unwrap_or(AgentId::NONE)
    }

    pub fn vehicle(&self) -> Option<&V> {
        self.vehicle.as_ref()
    }

    pub fn vehicle_mut(&mut self) -> Option<&mut V> {
        self.vehicle.as_mut()
    }

    pub fn peer(&self) -> &P {
        &self.peer
    }

    pub fn peer_mut(&mut self) -> &mut P {
        &mut self.peer
    }

    pub fn energy(&self) -> &EnergyModel {
        &self.energy
    }

    // ========================================================================
    // Vehicle lifecycle
    // ========================================================================

    /// Attach a vehicle, replacing any other attached vehicle
    ///
    /// Re-attaching the vehicle that is already attached is ignored.
    pub fn attach_vehicle(&mut self, mut vehicle: V) -> Events {
        let mut events = Events::new();
        let id = vehicle.id();

        if let Some(current) = self.vehicle.as_ref() {
            if current.id() == id {
                emit(&mut events, ControllerEvent::AttachIgnored { id });
                return events;
            }
            self.release_vehicle(&mut events);
        }

        self.peer.set_local_id(id);
        emit(
            &mut events,
            ControllerEvent::VehicleAttached {
                id,
                flight_mode: mode_name(vehicle.flight_mode()),
            },
        );

        if vehicle.flight_mode_set_available() {
            vehicle.command(VehicleCommand::SetFlightMode(GUIDED_MODE));
            emit(&mut events, ControllerEvent::GuidedModeRequested);
        } else {
            emit(&mut events, ControllerEvent::FlightModeSetUnavailable);
        }

        self.vehicle = Some(vehicle);
        events
    }

    /// Detach the vehicle with `id`; other IDs are ignored
    pub fn detach_vehicle(&mut self, id: AgentId) -> Events {
        let mut events = Events::new();
        if self.vehicle.as_ref().map(|v| v.id()) == Some(id) {
            self.release_vehicle(&mut events);
        }
        events
    }

    fn release_vehicle(&mut self, events: &mut Events) -> Option<V> {
        let vehicle = self.vehicle.take()?;
        self.peer.set_local_id(AgentId::NONE);
        emit(events, ControllerEvent::VehicleDetached { id: vehicle.id() });
        transition(&mut self.stage, MissionStage::Idle, events);
        self.progress.reset();
        Some(vehicle)
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Handle an armed-state change reported by the vehicle
    pub fn on_armed_changed(&mut self, armed: bool) -> Events {
        let mut events = Events::new();
        let Some(vehicle) = self.vehicle.as_mut() else {
            return events;
        };

        if !armed {
            transition(&mut self.stage, MissionStage::Idle, &mut events);
            emit(&mut events, ControllerEvent::Disarmed);
            return events;
        }

        let altitude_m = vehicle.relative_altitude_m();
        if altitude_m > self.config.point_zone_m {
            emit(
                &mut events,
                ControllerEvent::ArmRejected(ArmRejection::Airborne { altitude_m }),
            );
            return events;
        }

        if !vehicle.is_guided() {
            let mode = mode_name(vehicle.flight_mode());
            vehicle.command(VehicleCommand::SetFlightMode(GUIDED_MODE));
            emit(
                &mut events,
                ControllerEvent::ArmRejected(ArmRejection::NotGuided { mode }),
            );
            return events;
        }

        self.progress.reset();
        self.energy.reset_total();

        let altitude_m = self.config.takeoff_altitude_m;
        vehicle.command(VehicleCommand::Takeoff { altitude_m });
        emit(&mut events, ControllerEvent::MissionStarted { altitude_m });
        transition(&mut self.stage, MissionStage::Takeoff, &mut events);
        events
    }

    /// Handle a flight-mode change reported by the vehicle
    pub fn on_flight_mode_changed(&mut self, mode: &str) -> Events {
        let mut events = Events::new();
        emit(
            &mut events,
            ControllerEvent::FlightModeChanged {
                mode: mode_name(mode),
                guided: mode == GUIDED_MODE,
            },
        );
        events
    }

    /// Handle an inbound peer message
    ///
    /// A message from `id - 1` arms an unarmed vehicle. The payload is not
    /// interpreted.
    pub fn on_peer_message(&mut self, source: AgentId, _payload: &[u8]) -> Events {
        let mut events = Events::new();

        match self.vehicle.as_mut() {
            Some(vehicle) if Some(source) == vehicle.id().previous() && !vehicle.armed() => {
                vehicle.command(VehicleCommand::Arm);
                emit(&mut events, ControllerEvent::ArmRequestedByPeer { source });
            }
            _ => emit(&mut events, ControllerEvent::PeerMessageIgnored { source }),
        }

        events
    }

    /// Command an immediate landing
    pub fn emergency_land(&mut self) -> Events {
        let mut events = Events::new();
        self.land_now(&mut events);
        events
    }

    fn land_now(&mut self, events: &mut Events) {
        let Some(vehicle) = self.vehicle.as_mut() else {
            return;
        };
        vehicle.command(VehicleCommand::Land);
        emit(
            events,
            ControllerEvent::EmergencyLanding {
                remaining_percent: vehicle.battery().remaining_percent,
            },
        );
        transition(&mut self.stage, MissionStage::Land, events);
    }

    // ========================================================================
    // Periodic update
    // ========================================================================

    /// Run one scheduler cycle: energy update, then the current stage
    pub fn tick(&mut self, dt_s: f64) -> Events {
        let mut events = Events::new();
        if self.vehicle.is_none() {
            return events;
        }

        self.update_energy(dt_s, &mut events);

        match self.stage {
            MissionStage::Idle => {}
            MissionStage::Takeoff => self.stage_takeoff(&mut events),
            MissionStage::Mission => self.stage_mission(&mut events),
            MissionStage::Land => self.stage_land(&mut events),
        }

        events
    }

    fn update_energy(&mut self, dt_s: f64, events: &mut Events) {
        let Some(vehicle) = self.vehicle.as_mut() else {
            return;
        };

        match self.energy.update(vehicle.battery(), dt_s) {
            EnergyUpdate::Applied(report) => {
                vehicle.set_remaining_battery(report.remaining_percent);
                emit(events, ControllerEvent::EnergyUpdated(report));

                // Repeats every tick while the battery stays low
                if report.low_battery && self.stage != MissionStage::Idle {
                    self.land_now(events);
                }
            }
            EnergyUpdate::Skipped(EnergyFault::InvalidCapacity { capacity_j }) => {
                emit(events, ControllerEvent::EnergySkipped { capacity_j });
            }
        }
    }

    fn stage_takeoff(&mut self, events: &mut Events) {
        let Some(vehicle) = self.vehicle.as_ref() else {
            return;
        };
        let threshold = self.config.takeoff_altitude_m - self.config.point_zone_m;
        if vehicle.relative_altitude_m() >= threshold {
            self.progress.reset();
            transition(&mut self.stage, MissionStage::Mission, events);
        }
    }

    fn stage_land(&mut self, events: &mut Events) {
        let Some(vehicle) = self.vehicle.as_ref() else {
            return;
        };
        if vehicle.relative_altitude_m() < self.config.point_zone_m {
            transition(&mut self.stage, MissionStage::Idle, events);
            emit(
                events,
                ControllerEvent::MissionCompleted {
                    total_energy_j: self.energy.total_energy_j(),
                },
            );
        }
    }

    fn stage_mission(&mut self, events: &mut Events) {
        let Some(vehicle) = self.vehicle.as_mut() else {
            return;
        };
        let tolerance = self.config.point_zone_m;
        let position = vehicle.position();

        match self.progress.sub_stage {
            SubStage::Start => {
                let waypoints = Waypoints::from(&self.plan);
                self.waypoints = Some(waypoints);
                goto(vehicle, NavTarget::Waypoint1, waypoints.waypoint1, events);
                advance(&mut self.progress, SubStage::ToWaypoint1, events);
            }
            SubStage::ToWaypoint1 => {
                let Some(waypoints) = self.waypoints else {
                    return;
                };
                if position.distance_to(&waypoints.waypoint1) < tolerance {
                    goto(vehicle, NavTarget::Waypoint2, waypoints.waypoint2, events);
                    advance(&mut self.progress, SubStage::ToWaypoint2, events);
                }
            }
            SubStage::ToWaypoint2 => {
                let Some(waypoints) = self.waypoints.as_mut() else {
                    return;
                };
                if position.distance_to(&waypoints.waypoint2) < tolerance {
                    let destination = position.at_distance_and_azimuth(
                        self.config.destination_distance_m,
                        self.config.destination_bearing_deg,
                    );
                    waypoints.destination = Some(destination);
                    goto(vehicle, NavTarget::Destination, destination, events);
                    advance(&mut self.progress, SubStage::ToDestination, events);
                }
            }
            SubStage::ToDestination => {
                let Some(destination) = self.waypoints.and_then(|w| w.destination) else {
                    return;
                };
                if position.distance_to(&destination) < tolerance {
                    advance(&mut self.progress, SubStage::Dwell, events);
                }
            }
            SubStage::Dwell => {
                if self.progress.dwell_ticks < self.config.dwell_target_ticks() {
                    self.progress.dwell_ticks += 1;
                    // No neighbor past the end of the ID space
                    if let Some(next) = vehicle.id().next() {
                        self.peer.send(next, &[TRIGGER_PAYLOAD]);
                        emit(
                            events,
                            ControllerEvent::TriggerSent {
                                destination: next,
                                dwell_tick: self.progress.dwell_ticks,
                            },
                        );
                    }
                } else {
                    vehicle.command(VehicleCommand::Land);
                    transition(&mut self.stage, MissionStage::Land, events);
                }
            }
        }
    }
}

fn transition(stage: &mut MissionStage, to: MissionStage, events: &mut Events) {
    if *stage != to {
        emit(events, ControllerEvent::StageChanged { from: *stage, to });
        *stage = to;
    }
}

fn advance(progress: &mut MissionProgress, to: SubStage, events: &mut Events) {
    emit(
        events,
        ControllerEvent::SubStageChanged {
            from: progress.sub_stage,
            to,
        },
    );
    progress.sub_stage = to;
}

fn goto<V: VehicleHandle>(
    vehicle: &mut V,
    target: NavTarget,
    coordinate: GeoCoordinate,
    events: &mut Events,
) {
    vehicle.command(VehicleCommand::GotoLocation(coordinate));
    emit(events, ControllerEvent::NavigatingTo { target, coordinate });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyReport;
    use crate::peer::RecordingPeer;
    use crate::vehicle::BatteryState;
    use heapless::Vec;

    const HOME: GeoCoordinate = GeoCoordinate::new(-35.363261, 149.165230);
    const WP1: GeoCoordinate = GeoCoordinate::new(-35.362500, 149.165230);
    const WP2: GeoCoordinate = GeoCoordinate::new(-35.362500, 149.166500);

    struct MockVehicle {
        id: AgentId,
        armed: bool,
        mode: &'static str,
        mode_set_available: bool,
        altitude_m: f64,
        position: GeoCoordinate,
        battery: BatteryState,
        commands: Vec<VehicleCommand, 32>,
    }

    impl MockVehicle {
        fn new(id: u8) -> Self {
            Self {
                id: AgentId(id),
                armed: false,
                mode: "Stabilize",
                mode_set_available: true,
                altitude_m: 0.0,
                position: HOME,
                battery: BatteryState {
                    remaining_percent: 100.0,
                    capacity_j: 1000.0,
                },
                commands: Vec::new(),
            }
        }

        fn guided(id: u8) -> Self {
            Self {
                mode: GUIDED_MODE,
                ..Self::new(id)
            }
        }

        fn count(&self, matches: impl Fn(&VehicleCommand) -> bool) -> usize {
            self.commands.iter().filter(|c| matches(*c)).count()
        }
    }

    impl VehicleHandle for MockVehicle {
        fn id(&self) -> AgentId {
            self.id
        }
        fn armed(&self) -> bool {
            self.armed
        }
        fn flight_mode(&self) -> &str {
            self.mode
        }
        fn flight_mode_set_available(&self) -> bool {
            self.mode_set_available
        }
        fn relative_altitude_m(&self) -> f64 {
            self.altitude_m
        }
        fn position(&self) -> GeoCoordinate {
            self.position
        }
        fn battery(&self) -> BatteryState {
            self.battery
        }
        fn set_remaining_battery(&mut self, percent: f64) {
            self.battery.remaining_percent = percent;
        }
        fn command(&mut self, command: VehicleCommand) {
            let _ = self.commands.push(command);
        }
    }

    type Controller = MissionController<MockVehicle, RecordingPeer>;

    fn config() -> MissionConfig {
        MissionConfig {
            dwell_ms: 500,
            ..MissionConfig::default()
        }
    }

    fn controller() -> Controller {
        MissionController::new(config(), MissionPlan::new(WP1, WP2), RecordingPeer::new())
    }

    fn vehicle(c: &mut Controller) -> &mut MockVehicle {
        c.vehicle_mut().unwrap()
    }

    /// Attached guided vehicle, armed and in Takeoff
    fn armed_controller(id: u8) -> Controller {
        let mut c = controller();
        c.attach_vehicle(MockVehicle::guided(id));
        vehicle(&mut c).armed = true;
        c.on_armed_changed(true);
        assert_eq!(c.stage(), MissionStage::Takeoff);
        c
    }

    /// Drive an armed controller into the given Mission sub-stage
    fn controller_at(id: u8, sub_stage: SubStage) -> Controller {
        let mut c = armed_controller(id);
        vehicle(&mut c).altitude_m = 10.0;
        c.tick(0.1);
        while c.progress().sub_stage != sub_stage {
            let target = match c.progress().sub_stage {
                SubStage::Start => None,
                SubStage::ToWaypoint1 => Some(WP1),
                SubStage::ToWaypoint2 => Some(WP2),
                SubStage::ToDestination => c.waypoints().and_then(|w| w.destination),
                SubStage::Dwell => unreachable!(),
            };
            if let Some(target) = target {
                vehicle(&mut c).position = target;
            }
            c.tick(0.1);
        }
        c
    }

    fn has(events: &Events, event: &ControllerEvent) -> bool {
        events.iter().any(|e| e == event)
    }

    // ------------------------------------------------------------------------
    // Attach / detach
    // ------------------------------------------------------------------------

    #[test]
    fn test_new_controller_is_idle_and_detached() {
        let c = controller();
        assert_eq!(c.stage(), MissionStage::Idle);
        assert_eq!(c.agent_id(), AgentId::NONE);
        assert_eq!(c.peer().local_id(), AgentId::NONE);
        assert!(c.waypoints().is_none());
    }

    #[test]
    fn test_attach_sets_identity_and_requests_guided() {
        let mut c = controller();
        let events = c.attach_vehicle(MockVehicle::new(3));

        assert_eq!(c.agent_id(), AgentId(3));
        assert_eq!(c.peer().local_id(), AgentId(3));
        assert!(has(&events, &ControllerEvent::GuidedModeRequested));
        assert!(matches!(
            events[0],
            ControllerEvent::VehicleAttached { id: AgentId(3), .. }
        ));
        assert_eq!(
            c.vehicle().unwrap().commands.as_slice(),
            &[VehicleCommand::SetFlightMode(GUIDED_MODE)]
        );
    }

    #[test]
    fn test_attach_without_mode_setting_issues_no_command() {
        let mut c = controller();
        let mut v = MockVehicle::new(2);
        v.mode_set_available = false;
        let events = c.attach_vehicle(v);

        assert!(has(&events, &ControllerEvent::FlightModeSetUnavailable));
        assert!(c.vehicle().unwrap().commands.is_empty());
    }

    #[test]
    fn test_reattach_same_vehicle_is_ignored() {
        let mut c = controller();
        c.attach_vehicle(MockVehicle::new(2));
        let events = c.attach_vehicle(MockVehicle::new(2));

        assert_eq!(
            events.as_slice(),
            &[ControllerEvent::AttachIgnored { id: AgentId(2) }]
        );
        // Original vehicle kept, still holding its one guided request
        assert_eq!(c.vehicle().unwrap().commands.len(), 1);
    }

    #[test]
    fn test_attach_other_vehicle_replaces_and_resets() {
        let mut c = armed_controller(2);
        let events = c.attach_vehicle(MockVehicle::new(5));

        assert!(has(
            &events,
            &ControllerEvent::VehicleDetached { id: AgentId(2) }
        ));
        assert_eq!(c.stage(), MissionStage::Idle);
        assert_eq!(c.agent_id(), AgentId(5));
        assert_eq!(c.peer().local_id(), AgentId(5));
    }

    #[test]
    fn test_detach_resets_to_idle_and_clears_identity() {
        let mut c = controller_at(2, SubStage::ToWaypoint2);
        let events = c.detach_vehicle(AgentId(2));

        assert!(c.vehicle().is_none());
        assert_eq!(c.stage(), MissionStage::Idle);
        assert_eq!(c.progress(), MissionProgress::default());
        assert_eq!(c.peer().local_id(), AgentId::NONE);
        assert_eq!(
            events.as_slice(),
            &[
                ControllerEvent::VehicleDetached { id: AgentId(2) },
                ControllerEvent::StageChanged {
                    from: MissionStage::Mission,
                    to: MissionStage::Idle
                },
            ]
        );
    }

    #[test]
    fn test_detach_of_other_id_is_ignored() {
        let mut c = armed_controller(2);
        let events = c.detach_vehicle(AgentId(7));
        assert!(events.is_empty());
        assert_eq!(c.agent_id(), AgentId(2));
        assert_eq!(c.stage(), MissionStage::Takeoff);
    }

    // ------------------------------------------------------------------------
    // Arming
    // ------------------------------------------------------------------------

    #[test]
    fn test_arm_while_airborne_is_rejected_without_command() {
        let mut c = controller();
        c.attach_vehicle(MockVehicle::guided(1));
        vehicle(&mut c).commands.clear();
        vehicle(&mut c).altitude_m = 3.0;

        let events = c.on_armed_changed(true);

        assert_eq!(c.stage(), MissionStage::Idle);
        assert!(c.vehicle().unwrap().commands.is_empty());
        assert_eq!(
            events.as_slice(),
            &[ControllerEvent::ArmRejected(ArmRejection::Airborne {
                altitude_m: 3.0
            })]
        );
    }

    #[test]
    fn test_arm_while_not_guided_requests_guided_once() {
        let mut c = controller();
        c.attach_vehicle(MockVehicle::new(1));
        vehicle(&mut c).commands.clear();

        let events = c.on_armed_changed(true);
        assert_eq!(c.stage(), MissionStage::Idle);
        assert!(matches!(
            events[0],
            ControllerEvent::ArmRejected(ArmRejection::NotGuided { .. })
        ));
        assert_eq!(
            c.vehicle().unwrap().commands.as_slice(),
            &[VehicleCommand::SetFlightMode(GUIDED_MODE)]
        );

        // Mode confirmation does not re-arm or re-request
        vehicle(&mut c).mode = GUIDED_MODE;
        let events = c.on_flight_mode_changed(GUIDED_MODE);
        assert_eq!(
            events.as_slice(),
            &[ControllerEvent::FlightModeChanged {
                mode: mode_name(GUIDED_MODE),
                guided: true
            }]
        );
        assert_eq!(c.vehicle().unwrap().commands.len(), 1);
        assert_eq!(c.stage(), MissionStage::Idle);
    }

    #[test]
    fn test_accepted_arm_commands_takeoff() {
        let mut c = controller();
        c.attach_vehicle(MockVehicle::guided(1));
        vehicle(&mut c).commands.clear();

        let events = c.on_armed_changed(true);

        assert_eq!(c.stage(), MissionStage::Takeoff);
        assert_eq!(
            c.vehicle().unwrap().commands.as_slice(),
            &[VehicleCommand::Takeoff { altitude_m: 10.0 }]
        );
        assert_eq!(
            events.as_slice(),
            &[
                ControllerEvent::MissionStarted { altitude_m: 10.0 },
                ControllerEvent::StageChanged {
                    from: MissionStage::Idle,
                    to: MissionStage::Takeoff
                },
            ]
        );
    }

    #[test]
    fn test_arm_without_vehicle_is_ignored() {
        let mut c = controller();
        assert!(c.on_armed_changed(true).is_empty());
        assert_eq!(c.stage(), MissionStage::Idle);
    }

    #[test]
    fn test_disarm_forces_idle_from_every_stage() {
        let mut takeoff = armed_controller(1);
        takeoff.on_armed_changed(false);
        assert_eq!(takeoff.stage(), MissionStage::Idle);

        for sub_stage in [
            SubStage::ToWaypoint1,
            SubStage::ToWaypoint2,
            SubStage::ToDestination,
            SubStage::Dwell,
        ] {
            let mut c = controller_at(1, sub_stage);
            let commands_before = c.vehicle().unwrap().commands.len();
            let events = c.on_armed_changed(false);

            assert_eq!(c.stage(), MissionStage::Idle);
            assert_eq!(c.vehicle().unwrap().commands.len(), commands_before);
            assert!(has(&events, &ControllerEvent::Disarmed));
        }

        let mut landing = controller_at(1, SubStage::Dwell);
        landing.emergency_land();
        assert_eq!(landing.stage(), MissionStage::Land);
        landing.on_armed_changed(false);
        assert_eq!(landing.stage(), MissionStage::Idle);
    }

    // ------------------------------------------------------------------------
    // Mission sequence
    // ------------------------------------------------------------------------

    #[test]
    fn test_nominal_mission_sequence() {
        let mut c = armed_controller(1);

        // Below target - tolerance
        vehicle(&mut c).altitude_m = 8.5;
        c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Takeoff);

        vehicle(&mut c).altitude_m = 9.0;
        let events = c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Mission);
        assert_eq!(c.progress().sub_stage, SubStage::Start);
        assert!(has(
            &events,
            &ControllerEvent::StageChanged {
                from: MissionStage::Takeoff,
                to: MissionStage::Mission
            }
        ));

        // Sub-stage 0 issues waypoint 1
        c.tick(0.1);
        assert_eq!(c.progress().sub_stage, SubStage::ToWaypoint1);
        assert_eq!(c.waypoints().unwrap().waypoint1, WP1);
        assert!(c.waypoints().unwrap().destination.is_none());

        // Still far from waypoint 1
        c.tick(0.1);
        assert_eq!(c.progress().sub_stage, SubStage::ToWaypoint1);

        vehicle(&mut c).position = WP1;
        c.tick(0.1);
        assert_eq!(c.progress().sub_stage, SubStage::ToWaypoint2);

        vehicle(&mut c).position = WP2;
        c.tick(0.1);
        assert_eq!(c.progress().sub_stage, SubStage::ToDestination);
        let destination = WP2.at_distance_and_azimuth(500.0, 335.0);
        assert_eq!(c.waypoints().unwrap().destination, Some(destination));

        vehicle(&mut c).position = destination;
        let events = c.tick(0.1);
        assert_eq!(c.progress().sub_stage, SubStage::Dwell);
        assert!(!events
            .iter()
            .any(|e| matches!(e, ControllerEvent::NavigatingTo { .. })));

        // Dwell: 500 ms / 100 ms = 5 triggers, then land
        for _ in 0..5 {
            c.tick(0.1);
            assert_eq!(c.stage(), MissionStage::Mission);
        }
        assert_eq!(c.progress().dwell_ticks, 5);
        c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Land);

        // Not yet down
        c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Land);

        vehicle(&mut c).altitude_m = 0.5;
        let events = c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Idle);
        assert!(events
            .iter()
            .any(|e| matches!(e, ControllerEvent::MissionCompleted { .. })));

        assert_eq!(
            c.vehicle().unwrap().commands.as_slice(),
            &[
                VehicleCommand::SetFlightMode(GUIDED_MODE),
                VehicleCommand::Takeoff { altitude_m: 10.0 },
                VehicleCommand::GotoLocation(WP1),
                VehicleCommand::GotoLocation(WP2),
                VehicleCommand::GotoLocation(destination),
                VehicleCommand::Land,
            ]
        );

        let sent = c.peer().sent();
        assert_eq!(sent.len(), 5);
        for msg in sent {
            assert_eq!(msg.source, AgentId(1));
            assert_eq!(msg.destination, AgentId(2));
            assert_eq!(msg.payload.as_slice(), &[TRIGGER_PAYLOAD]);
        }
    }

    #[test]
    fn test_destination_projected_from_arrival_position() {
        let mut c = controller_at(1, SubStage::ToWaypoint2);
        // Within tolerance but not exactly on waypoint 2
        let arrival = WP2.at_distance_and_azimuth(0.5, 90.0);
        vehicle(&mut c).position = arrival;
        c.tick(0.1);

        let destination = c.waypoints().unwrap().destination.unwrap();
        assert_eq!(destination, arrival.at_distance_and_azimuth(500.0, 335.0));
        assert!((arrival.distance_to(&destination) - 500.0).abs() < 0.01);
    }

    #[test]
    fn test_default_dwell_sends_fifty_triggers() {
        let mut c = MissionController::new(
            MissionConfig::default(),
            MissionPlan::new(WP1, WP2),
            RecordingPeer::new(),
        );
        c.attach_vehicle(MockVehicle::guided(4));
        c.vehicle_mut().unwrap().armed = true;
        c.on_armed_changed(true);
        c.vehicle_mut().unwrap().altitude_m = 10.0;
        c.tick(0.1);
        c.tick(0.1);
        c.vehicle_mut().unwrap().position = WP1;
        c.tick(0.1);
        c.vehicle_mut().unwrap().position = WP2;
        c.tick(0.1);
        let destination = c.waypoints().unwrap().destination.unwrap();
        c.vehicle_mut().unwrap().position = destination;
        c.tick(0.1);
        assert_eq!(c.progress().sub_stage, SubStage::Dwell);

        for _ in 0..50 {
            c.tick(0.1);
        }
        assert_eq!(c.stage(), MissionStage::Mission);
        assert_eq!(c.peer().sent_count(), 50);
        assert!(c.peer().sent().iter().all(|m| m.destination == AgentId(5)));

        c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Land);
        assert_eq!(c.peer().sent_count(), 50);
    }

    #[test]
    fn test_dwell_at_last_id_sends_nothing() {
        let mut c = controller_at(255, SubStage::Dwell);
        for _ in 0..5 {
            c.tick(0.1);
        }
        assert_eq!(c.peer().sent_count(), 0);
        c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Land);
    }

    #[test]
    fn test_next_mission_resets_progress() {
        let mut c = controller_at(1, SubStage::Dwell);
        for _ in 0..6 {
            c.tick(0.1);
        }
        vehicle(&mut c).altitude_m = 0.0;
        c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Idle);

        vehicle(&mut c).armed = true;
        c.on_armed_changed(true);
        assert_eq!(c.progress(), MissionProgress::default());
        assert_eq!(c.energy().total_energy_j(), 0.0);
    }

    #[test]
    fn test_set_plan_applies_at_next_mission_entry() {
        let mut c = armed_controller(1);
        let new_wp1 = GeoCoordinate::new(-35.36, 149.17);
        c.set_plan(MissionPlan::new(new_wp1, WP2));
        vehicle(&mut c).altitude_m = 10.0;
        c.tick(0.1);
        c.tick(0.1);
        assert_eq!(c.waypoints().unwrap().waypoint1, new_wp1);
    }

    #[test]
    fn test_tick_without_vehicle_does_nothing() {
        let mut c = controller();
        assert!(c.tick(0.1).is_empty());
        assert_eq!(c.stage(), MissionStage::Idle);
        assert_eq!(c.energy().total_energy_j(), 0.0);
    }

    // ------------------------------------------------------------------------
    // Energy and emergency landing
    // ------------------------------------------------------------------------

    #[test]
    fn test_tick_writes_back_remaining_battery() {
        let mut c = controller();
        c.attach_vehicle(MockVehicle::guided(1));
        let events = c.tick(0.1);

        let expected_energy = 1.2e-9 * 1000.0 * 1000.0 * 0.1;
        let expected_percent = expected_energy / 1000.0 * 100.0;
        let expected_remaining = 100.0 - expected_percent;
        assert_eq!(
            events.as_slice(),
            &[ControllerEvent::EnergyUpdated(EnergyReport {
                energy_j: expected_energy,
                percent_consumed: expected_percent,
                remaining_percent: expected_remaining,
                low_battery: false,
            })]
        );
        assert_eq!(
            c.vehicle().unwrap().battery.remaining_percent,
            expected_remaining
        );
    }

    #[test]
    fn test_zero_capacity_skips_energy_update() {
        let mut c = controller();
        let mut v = MockVehicle::guided(1);
        v.battery.capacity_j = 0.0;
        c.attach_vehicle(v);

        let events = c.tick(0.1);
        assert_eq!(
            events.as_slice(),
            &[ControllerEvent::EnergySkipped { capacity_j: 0.0 }]
        );
        assert_eq!(c.vehicle().unwrap().battery.remaining_percent, 100.0);
    }

    #[test]
    fn test_low_battery_lands_in_same_tick_and_repeats() {
        let mut c = armed_controller(1);
        vehicle(&mut c).battery.remaining_percent = 5.0;
        vehicle(&mut c).altitude_m = 4.0;

        let events = c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Land);
        assert!(events
            .iter()
            .any(|e| matches!(e, ControllerEvent::EmergencyLanding { .. })));
        assert_eq!(
            c.vehicle()
                .unwrap()
                .count(|cmd| *cmd == VehicleCommand::Land),
            1
        );

        c.tick(0.1);
        c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Land);
        assert_eq!(
            c.vehicle()
                .unwrap()
                .count(|cmd| *cmd == VehicleCommand::Land),
            3
        );

        // Touchdown completes the mission; no further landings while idle
        vehicle(&mut c).altitude_m = 0.0;
        c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Idle);
        c.tick(0.1);
        assert_eq!(
            c.vehicle()
                .unwrap()
                .count(|cmd| *cmd == VehicleCommand::Land),
            4
        );
    }

    #[test]
    fn test_low_battery_while_idle_does_not_land() {
        let mut c = controller();
        let mut v = MockVehicle::guided(1);
        v.battery.remaining_percent = 1.0;
        c.attach_vehicle(v);

        let events = c.tick(0.1);
        assert_eq!(c.stage(), MissionStage::Idle);
        assert_eq!(
            c.vehicle()
                .unwrap()
                .count(|cmd| *cmd == VehicleCommand::Land),
            0
        );
        assert!(!events
            .iter()
            .any(|e| matches!(e, ControllerEvent::EmergencyLanding { .. })));
    }

    #[test]
    fn test_emergency_land_without_vehicle_is_noop() {
        let mut c = controller();
        assert!(c.emergency_land().is_empty());
        assert_eq!(c.stage(), MissionStage::Idle);
    }

    #[test]
    fn test_mission_completed_reports_total_energy() {
        let mut c = armed_controller(1);
        vehicle(&mut c).battery.remaining_percent = 4.0;
        vehicle(&mut c).altitude_m = 0.0;

        // Emergency landing and touchdown in the same tick
        let events = c.tick(0.1);
        let total = 1.2e-9 * 1000.0 * 1000.0 * 0.1;
        assert_eq!(c.stage(), MissionStage::Idle);
        assert!(has(
            &events,
            &ControllerEvent::MissionCompleted {
                total_energy_j: total
            }
        ));
    }

    // ------------------------------------------------------------------------
    // Peer messages
    // ------------------------------------------------------------------------

    #[test]
    fn test_trigger_from_previous_agent_arms_once() {
        let mut c = controller();
        c.attach_vehicle(MockVehicle::guided(3));
        vehicle(&mut c).commands.clear();

        let events = c.on_peer_message(AgentId(2), &[TRIGGER_PAYLOAD]);
        assert_eq!(
            events.as_slice(),
            &[ControllerEvent::ArmRequestedByPeer { source: AgentId(2) }]
        );
        assert_eq!(
            c.vehicle().unwrap().commands.as_slice(),
            &[VehicleCommand::Arm]
        );
    }

    #[test]
    fn test_trigger_while_armed_is_ignored() {
        let mut c = armed_controller(3);
        let before = c.vehicle().unwrap().commands.len();
        let events = c.on_peer_message(AgentId(2), &[TRIGGER_PAYLOAD]);

        assert_eq!(
            events.as_slice(),
            &[ControllerEvent::PeerMessageIgnored { source: AgentId(2) }]
        );
        assert_eq!(c.vehicle().unwrap().commands.len(), before);
    }

    #[test]
    fn test_trigger_from_other_sources_is_ignored() {
        let mut c = controller();
        c.attach_vehicle(MockVehicle::guided(3));
        vehicle(&mut c).commands.clear();

        for source in [0u8, 1, 3, 4, 200] {
            c.on_peer_message(AgentId(source), &[TRIGGER_PAYLOAD]);
        }
        assert!(c.vehicle().unwrap().commands.is_empty());
    }

    #[test]
    fn test_payload_is_not_interpreted() {
        let mut c = controller();
        c.attach_vehicle(MockVehicle::guided(1));
        vehicle(&mut c).commands.clear();

        c.on_peer_message(AgentId(0), &[0xFF, 0x00, 0x42]);
        assert_eq!(
            c.vehicle().unwrap().commands.as_slice(),
            &[VehicleCommand::Arm]
        );
    }

    #[test]
    fn test_trigger_while_detached_is_ignored() {
        let mut c = controller();
        let events = c.on_peer_message(AgentId(0), &[TRIGGER_PAYLOAD]);
        assert_eq!(
            events.as_slice(),
            &[ControllerEvent::PeerMessageIgnored { source: AgentId(0) }]
        );
    }
}
