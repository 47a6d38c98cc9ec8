//! Agent event loop
//!
//! One agent drives one [`MissionController`]. External inputs arrive on an
//! mpsc queue ([`AgentEvent`]) and are applied before every tick, so a
//! handler never runs concurrently with a tick:
//!
//! ```text
//! vehicle attach/detach ─┐
//! peer forwarder ────────┼─► event queue ─► Agent::run ─► controller
//! scheduler tick ────────┘
//! ```
//!
//! Each tick polls the vehicle link, dispatches its notifications, then runs
//! the controller tick and renders the produced events.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{debug, info};

use relay_trail_core::mission::{ControllerEvent, MissionStage};
use relay_trail_core::peer::PeerChannel;
use relay_trail_core::vehicle::{VehicleCommand, VehicleHandle, VehicleNotification};
use relay_trail_core::{AgentId, MissionController};
use relay_trail_sitl::{GcsLink, SimVehicle};

use crate::diagnostics;
use crate::peer::PeerMessage;
use crate::scheduler::{Scheduler, Tick};

/// Capacity of the agent event queue
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Vehicle connection driven by the agent loop
pub trait VehicleLink: VehicleHandle {
    /// Advance the link by `dt_s` and collect pending notifications
    fn poll(&mut self, dt_s: f64) -> Vec<VehicleNotification>;
}

impl VehicleLink for SimVehicle {
    fn poll(&mut self, dt_s: f64) -> Vec<VehicleNotification> {
        self.step(dt_s);
        self.drain_notifications()
    }
}

/// Publishes vehicle state after every tick
pub trait TelemetryMirror<V>: Send {
    fn publish(&mut self, vehicle: &V);
}

impl TelemetryMirror<SimVehicle> for GcsLink {
    fn publish(&mut self, vehicle: &SimVehicle) {
        self.update(&vehicle.telemetry(), vehicle.sim_time_us());
    }
}

/// Input to the agent loop
#[derive(Debug)]
pub enum AgentEvent<V> {
    /// A vehicle connected
    Attach(V),
    /// The vehicle with this ID disconnected
    Detach(AgentId),
    /// Message from another agent
    Peer(PeerMessage),
}

/// Run limits and launch behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentOptions {
    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
    /// Stop after this many completed missions
    pub max_missions: Option<u32>,
    /// Arm the vehicle once it reports Guided mode
    pub auto_arm: bool,
}

/// Outcome of [`Agent::run`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub missions_completed: u32,
    pub final_stage: MissionStage,
    pub total_energy_j: f64,
}

pub struct Agent<V: VehicleLink, P: PeerChannel> {
    controller: MissionController<V, P>,
    events: mpsc::Receiver<AgentEvent<V>>,
    options: AgentOptions,
    mirror: Option<Box<dyn TelemetryMirror<V>>>,
    auto_arm_pending: bool,
}

impl<V: VehicleLink, P: PeerChannel> Agent<V, P> {
    pub fn new(
        controller: MissionController<V, P>,
        events: mpsc::Receiver<AgentEvent<V>>,
        options: AgentOptions,
    ) -> Self {
        Self {
            controller,
            events,
            options,
            mirror: None,
            auto_arm_pending: options.auto_arm,
        }
    }

    /// Mirror vehicle state to `mirror` after every tick
    pub fn with_mirror(mut self, mirror: Box<dyn TelemetryMirror<V>>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn controller(&self) -> &MissionController<V, P> {
        &self.controller
    }

    pub fn options_mut(&mut self) -> &mut AgentOptions {
        &mut self.options
    }

    /// Run until `shutdown` resolves or a run limit is reached.
    ///
    /// Queued events are always applied before the next tick. Limits count
    /// from the start of this call.
    pub async fn run<S, F>(&mut self, scheduler: &mut S, shutdown: F) -> RunSummary
    where
        S: Scheduler + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticks = 0u64;
        let mut missions_completed = 0u32;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!(agent = %self.controller.agent_id(), "Shutdown requested");
                    break;
                }
                Some(event) = self.events.recv() => self.handle_event(event),
                tick = scheduler.next_tick() => {
                    ticks += 1;
                    if self.on_tick(tick) {
                        missions_completed += 1;
                    }
                    if self.limit_reached(ticks, missions_completed) {
                        break;
                    }
                }
            }
        }

        let summary = RunSummary {
            ticks,
            missions_completed,
            final_stage: self.controller.stage(),
            total_energy_j: self.controller.energy().total_energy_j(),
        };
        info!(
            ticks = summary.ticks,
            missions = summary.missions_completed,
            stage = %summary.final_stage,
            "Agent stopped"
        );
        summary
    }

    fn limit_reached(&self, ticks: u64, missions_completed: u32) -> bool {
        let ticks_done = self.options.max_ticks.is_some_and(|max| ticks >= max);
        let missions_done = self
            .options
            .max_missions
            .is_some_and(|max| missions_completed >= max);
        ticks_done || missions_done
    }

    /// Apply one queued event
    pub fn handle_event(&mut self, event: AgentEvent<V>) {
        let agent = self.controller.agent_id();
        let events = match event {
            AgentEvent::Attach(vehicle) => {
                self.auto_arm_pending = self.options.auto_arm;
                self.controller.attach_vehicle(vehicle)
            }
            AgentEvent::Detach(id) => self.controller.detach_vehicle(id),
            AgentEvent::Peer(message) => {
                debug!(%agent, source = %message.source, "Peer message");
                self.controller
                    .on_peer_message(message.source, &message.payload)
            }
        };
        diagnostics::report(self.controller.agent_id(), &events);
    }

    /// Run one tick; returns true if a mission completed
    fn on_tick(&mut self, tick: Tick) -> bool {
        let notifications = match self.controller.vehicle_mut() {
            Some(vehicle) => vehicle.poll(tick.dt_s),
            None => Vec::new(),
        };
        for notification in notifications {
            let events = match notification {
                VehicleNotification::ArmedChanged(armed) => {
                    self.controller.on_armed_changed(armed)
                }
                VehicleNotification::FlightModeChanged(mode) => {
                    self.controller.on_flight_mode_changed(&mode)
                }
            };
            diagnostics::report(self.controller.agent_id(), &events);
        }

        self.try_auto_arm();

        let events = self.controller.tick(tick.dt_s);
        diagnostics::report(self.controller.agent_id(), &events);

        if let (Some(mirror), Some(vehicle)) = (self.mirror.as_mut(), self.controller.vehicle()) {
            mirror.publish(vehicle);
        }

        events
            .iter()
            .any(|e| matches!(e, ControllerEvent::MissionCompleted { .. }))
    }

    fn try_auto_arm(&mut self) {
        if !self.auto_arm_pending || self.controller.stage() != MissionStage::Idle {
            return;
        }
        let agent = self.controller.agent_id();
        let Some(vehicle) = self.controller.vehicle_mut() else {
            return;
        };
        if vehicle.is_guided() && !vehicle.armed() {
            info!(%agent, "Auto-arm requested");
            vehicle.command(VehicleCommand::Arm);
            self.auto_arm_pending = false;
        }
    }
}
