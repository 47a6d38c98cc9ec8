//! Command line interface for `relay-agent`

use std::path::PathBuf;

use clap::Parser;

use relay_trail_core::geo::GeoCoordinate;

use crate::parameters::AgentParams;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "relay-agent",
    version,
    about = "Cooperative UAV mission agent",
    long_about = "Flies a scripted takeoff, two-waypoint relay and landing, \
                  then hands the mission to the next agent on the peer network."
)]
pub struct Cli {
    /// Agent instance number (selects vehicle link, peer port and agent ID)
    #[arg(short = 'I', long = "instance", default_value_t = 1)]
    pub instance: u8,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// First waypoint as LAT,LON
    #[arg(long, value_name = "LAT,LON", value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub wp1: Option<GeoCoordinate>,

    /// Second waypoint as LAT,LON
    #[arg(long, value_name = "LAT,LON", value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub wp2: Option<GeoCoordinate>,

    /// Run ticks back to back instead of on the wall clock
    #[arg(long)]
    pub lockstep: bool,

    /// Stop after this many ticks
    #[arg(long, value_name = "N")]
    pub max_ticks: Option<u64>,

    /// Stop after this many completed missions
    #[arg(long, value_name = "N")]
    pub max_missions: Option<u32>,

    /// Mission log file (overrides the config file)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Mirror vehicle telemetry to a ground station on this UDP port
    #[arg(long, value_name = "PORT")]
    pub gcs_port: Option<u16>,

    /// Arm the vehicle as soon as it reports Guided mode
    #[arg(long)]
    pub auto_arm: bool,

    /// Verbose stderr output (debug level)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Load the config file and apply command line overrides
    pub fn params(&self) -> crate::error::Result<AgentParams> {
        let mut params = AgentParams::load(self.config.as_deref())?;
        self.apply(&mut params);
        Ok(params)
    }

    /// Apply command line overrides to `params`
    pub fn apply(&self, params: &mut AgentParams) {
        if let Some(wp1) = self.wp1 {
            params.mission.waypoint1 = wp1.into();
        }
        if let Some(wp2) = self.wp2 {
            params.mission.waypoint2 = wp2.into();
        }
        if let Some(file) = &self.log_file {
            params.log.file = file.clone();
        }
    }
}

/// Parse `LAT,LON` in decimal degrees
pub fn parse_coordinate(s: &str) -> Result<GeoCoordinate, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{s}'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {lat} out of range"));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude {lon} out of range"));
    }
    Ok(GeoCoordinate::new(lat, lon))
}
