//! Logging setup and mission log rendering
//!
//! Two sinks:
//! - stderr: structured operator output filtered by `RUST_LOG` (or the
//!   configured default filter)
//! - mission log file: one plain line per record under the
//!   [`MISSION_LOG_TARGET`] target, appended, no timestamps or levels
//!
//! The mission log is consumed by offline tooling that scans for
//! `Total energy consumption: <joules>` lines, so those strings are kept
//! stable.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::{debug, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use relay_trail_core::mission::{ArmRejection, ControllerEvent, NavTarget};
use relay_trail_core::AgentId;

use crate::parameters::LogParams;

/// Target of records written to the mission log file
pub const MISSION_LOG_TARGET: &str = "mission_log";

/// Install the global subscriber.
///
/// Returns the guard of the file writer; dropping it flushes the mission log.
/// A mission log that cannot be opened is reported and skipped.
pub fn init_logging(log: &LogParams, verbose: bool) -> Option<WorkerGuard> {
    let default_filter = if verbose {
        log.filter.replace("=info", "=debug")
    } else {
        log.filter.clone()
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);

    let (file_layer, guard, open_error) = match open_mission_log(&log.file) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .without_time()
                .with_level(false)
                .with_target(false)
                .with_filter(Targets::new().with_target(MISSION_LOG_TARGET, Level::INFO));
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(e) = open_error {
        warn!(path = %log.file.display(), "Mission log unavailable: {}", e);
    }
    guard
}

fn open_mission_log(path: &Path) -> std::io::Result<std::fs::File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn nav_target_name(target: NavTarget) -> &'static str {
    match target {
        NavTarget::Waypoint1 => "waypoint 1",
        NavTarget::Waypoint2 => "waypoint 2",
        NavTarget::Destination => "destination",
    }
}

/// Mission log lines for one controller event
pub fn mission_log_lines(event: &ControllerEvent) -> Vec<String> {
    match event {
        ControllerEvent::VehicleAttached { id, flight_mode } => vec![
            format!("New MAV connected with ID: {id}"),
            format!("Flight Mode: {flight_mode}"),
        ],
        ControllerEvent::AttachIgnored { id } => {
            vec![format!("MAV already connected with ID: {id}")]
        }
        ControllerEvent::GuidedModeRequested => vec!["Requesting Guided mode.".to_string()],
        ControllerEvent::FlightModeSetUnavailable => {
            vec!["Flight mode setting is not available.".to_string()]
        }
        ControllerEvent::VehicleDetached { id } => {
            vec![format!("MAV disconnected with ID: {id}")]
        }
        ControllerEvent::Disarmed => vec!["Drone disarmed.".to_string()],
        ControllerEvent::FlightModeChanged { mode, guided } => {
            let mut lines = vec![format!("Flight mode changed to: {mode}")];
            if *guided {
                lines.push("Drone is now in Guided mode.".to_string());
            }
            lines
        }
        ControllerEvent::StageChanged { from, to } => vec![format!("Stage: {from} -> {to}")],
        ControllerEvent::SubStageChanged { from, to } => {
            vec![format!("Mission sub-stage: {from} -> {to}")]
        }
        ControllerEvent::NavigatingTo { target, coordinate } => vec![format!(
            "Heading to {}: {:.7}, {:.7}",
            nav_target_name(*target),
            coordinate.latitude,
            coordinate.longitude
        )],
        ControllerEvent::ArmRejected(ArmRejection::Airborne { altitude_m }) => vec![format!(
            "The mission can not start while the drone is airborne! (altitude {altitude_m:.2} m)"
        )],
        ControllerEvent::ArmRejected(ArmRejection::NotGuided { mode }) => vec![format!(
            "The mission can not start while the drone is not in Guided mode! (mode {mode})"
        )],
        ControllerEvent::MissionStarted { .. } => vec!["Mission starts...".to_string()],
        ControllerEvent::MissionCompleted { total_energy_j } => vec![
            "Mission ends".to_string(),
            format!("Total energy consumption: {total_energy_j:.6}"),
        ],
        ControllerEvent::TriggerSent {
            destination,
            dwell_tick,
        } => vec![format!(
            "Trigger sent to agent {destination} (dwell tick {dwell_tick})"
        )],
        ControllerEvent::ArmRequestedByPeer { source } => {
            vec![format!("Arm requested by agent {source}")]
        }
        ControllerEvent::PeerMessageIgnored { source } => {
            vec![format!("Ignored message from agent {source}")]
        }
        ControllerEvent::EnergyUpdated(report) => vec![
            format!("Energy consumed: {:.6} joules", report.energy_j),
            format!("Battery percentage consumed: {:.6}%", report.percent_consumed),
            format!("Remaining battery: {:.6}%", report.remaining_percent),
        ],
        ControllerEvent::EnergySkipped { capacity_j } => vec![format!(
            "Energy update skipped: invalid battery capacity {capacity_j} joules"
        )],
        ControllerEvent::EmergencyLanding { .. } => {
            vec!["Battery critical! Initiating emergency landing...".to_string()]
        }
    }
}

/// Write events to the mission log and summarize notable ones on stderr
pub fn report(agent: AgentId, events: &[ControllerEvent]) {
    for event in events {
        for line in mission_log_lines(event) {
            info!(target: MISSION_LOG_TARGET, "{}", line);
        }
        summarize(agent, event);
    }
}

fn summarize(agent: AgentId, event: &ControllerEvent) {
    match event {
        ControllerEvent::VehicleAttached { id, flight_mode } => {
            info!(%agent, vehicle = %id, mode = %flight_mode, "Vehicle attached")
        }
        ControllerEvent::VehicleDetached { id } => info!(%agent, vehicle = %id, "Vehicle detached"),
        ControllerEvent::StageChanged { from, to } => {
            info!(%agent, %from, %to, "Stage changed")
        }
        ControllerEvent::MissionStarted { altitude_m } => {
            info!(%agent, altitude_m, "Mission started")
        }
        ControllerEvent::MissionCompleted { total_energy_j } => {
            info!(%agent, total_energy_j, "Mission completed")
        }
        ControllerEvent::ArmRejected(reason) => warn!(%agent, ?reason, "Arm rejected"),
        ControllerEvent::EmergencyLanding { remaining_percent } => {
            warn!(%agent, remaining_percent, "Battery critical, landing")
        }
        ControllerEvent::FlightModeSetUnavailable => {
            warn!(%agent, "Vehicle does not accept flight mode requests")
        }
        ControllerEvent::ArmRequestedByPeer { source } => {
            info!(%agent, %source, "Arm requested by peer")
        }
        ControllerEvent::TriggerSent {
            destination,
            dwell_tick,
        } if *dwell_tick == 1 => info!(%agent, %destination, "Handing off to next agent"),
        ControllerEvent::SubStageChanged { from, to } => {
            debug!(%agent, %from, %to, "Mission sub-stage changed")
        }
        _ => {}
    }
}
