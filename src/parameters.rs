//! Agent Parameters
//!
//! Runtime configuration loaded from an optional TOML file. Every field has a
//! default, so an empty file (or no file) yields a runnable agent. Command
//! line flags are applied on top by [`crate::cli::Cli::apply`].
//!
//! # File Layout
//!
//! ```toml
//! [mission]
//! tick_period_ms = 100
//! waypoint1 = { lat = -35.362361, lon = 149.165230 }
//!
//! [energy]
//! low_battery_percent = 5.0
//!
//! [peer]
//! host = "127.0.0.1"
//! base_port = 15760
//!
//! [log]
//! file = "mission_log.txt"
//!
//! [sim]
//! battery_capacity_j = 1.0
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use relay_trail_core::energy::{self, EnergyConfig};
use relay_trail_core::geo::GeoCoordinate;
use relay_trail_core::mission::config as mission_defaults;
use relay_trail_core::mission::{MissionConfig, MissionPlan};
use relay_trail_core::AgentId;
use relay_trail_sitl::vehicle::config::DEFAULT_INITIAL_MODE;
use relay_trail_sitl::vehicle::DEFAULT_HOME;
use relay_trail_sitl::SimVehicleConfig;

use crate::error::{AgentError, Result};
use crate::link::{INSTANCE_PORT_STRIDE, NET_PORT_BASE};
use crate::peer::PeerDirectory;

/// Default mission log file
pub const DEFAULT_LOG_FILE: &str = "mission_log.txt";

/// Default stderr filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "relay_trail=info,relay_trail_sitl=info";

/// Latitude/longitude pair as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinateParam {
    pub lat: f64,
    pub lon: f64,
}

impl From<CoordinateParam> for GeoCoordinate {
    fn from(c: CoordinateParam) -> Self {
        GeoCoordinate::new(c.lat, c.lon)
    }
}

impl From<GeoCoordinate> for CoordinateParam {
    fn from(c: GeoCoordinate) -> Self {
        Self {
            lat: c.latitude,
            lon: c.longitude,
        }
    }
}

/// `[mission]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MissionParams {
    pub tick_period_ms: u32,
    pub point_zone_m: f64,
    pub takeoff_altitude_m: f64,
    pub destination_distance_m: f64,
    pub destination_bearing_deg: f64,
    pub dwell_ms: u32,
    pub waypoint1: CoordinateParam,
    pub waypoint2: CoordinateParam,
}

impl Default for MissionParams {
    fn default() -> Self {
        Self {
            tick_period_ms: mission_defaults::DEFAULT_TICK_PERIOD_MS,
            point_zone_m: mission_defaults::DEFAULT_POINT_ZONE_M,
            takeoff_altitude_m: mission_defaults::DEFAULT_TAKEOFF_ALTITUDE_M,
            destination_distance_m: mission_defaults::DEFAULT_DESTINATION_DISTANCE_M,
            destination_bearing_deg: mission_defaults::DEFAULT_DESTINATION_BEARING_DEG,
            dwell_ms: mission_defaults::DEFAULT_DWELL_MS,
            // ~100 m north of home, then ~100 m east
            waypoint1: CoordinateParam {
                lat: -35.362361,
                lon: 149.165230,
            },
            waypoint2: CoordinateParam {
                lat: -35.362361,
                lon: 149.166330,
            },
        }
    }
}

/// `[energy]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnergyParams {
    pub effective_capacitance_f: f64,
    pub clock_frequency_hz: f64,
    pub low_battery_percent: f64,
}

impl Default for EnergyParams {
    fn default() -> Self {
        Self {
            effective_capacitance_f: energy::DEFAULT_EFFECTIVE_CAPACITANCE_F,
            clock_frequency_hz: energy::DEFAULT_CLOCK_FREQUENCY_HZ,
            low_battery_percent: energy::DEFAULT_LOW_BATTERY_PERCENT,
        }
    }
}

/// `[peer]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeerParams {
    /// Host every agent listens on
    pub host: IpAddr,
    /// Port of agent 0
    pub base_port: u16,
    /// Port distance between consecutive agents
    pub stride: u16,
}

impl Default for PeerParams {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: NET_PORT_BASE,
            stride: INSTANCE_PORT_STRIDE,
        }
    }
}

/// `[log]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogParams {
    /// Mission log file (appended)
    pub file: PathBuf,
    /// stderr filter used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_LOG_FILE),
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// `[sim]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimParams {
    pub home: CoordinateParam,
    pub initial_mode: String,
    pub flight_mode_set_available: bool,
    pub climb_rate_ms: f64,
    pub descent_rate_ms: f64,
    pub cruise_speed_ms: f64,
    pub battery_capacity_j: f64,
    pub initial_battery_percent: f64,
    pub gps_noise_m: f64,
    pub seed: Option<u64>,
}

impl Default for SimParams {
    fn default() -> Self {
        let defaults = SimVehicleConfig::default();
        Self {
            home: DEFAULT_HOME.into(),
            initial_mode: DEFAULT_INITIAL_MODE.to_string(),
            flight_mode_set_available: defaults.flight_mode_set_available,
            climb_rate_ms: defaults.climb_rate_ms,
            descent_rate_ms: defaults.descent_rate_ms,
            cruise_speed_ms: defaults.cruise_speed_ms,
            battery_capacity_j: defaults.battery_capacity_j,
            initial_battery_percent: defaults.initial_battery_percent,
            gps_noise_m: defaults.gps_noise_m,
            seed: defaults.seed,
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentParams {
    pub mission: MissionParams,
    pub energy: EnergyParams,
    pub peer: PeerParams,
    pub log: LogParams,
    pub sim: SimParams,
}

impl AgentParams {
    /// Load from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| AgentError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| AgentError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn mission_config(&self) -> MissionConfig {
        MissionConfig {
            tick_period_ms: self.mission.tick_period_ms,
            point_zone_m: self.mission.point_zone_m,
            takeoff_altitude_m: self.mission.takeoff_altitude_m,
            destination_distance_m: self.mission.destination_distance_m,
            destination_bearing_deg: self.mission.destination_bearing_deg,
            dwell_ms: self.mission.dwell_ms,
            energy: EnergyConfig {
                effective_capacitance_f: self.energy.effective_capacitance_f,
                clock_frequency_hz: self.energy.clock_frequency_hz,
                low_battery_percent: self.energy.low_battery_percent,
            },
        }
    }

    pub fn plan(&self) -> MissionPlan {
        MissionPlan::new(self.mission.waypoint1.into(), self.mission.waypoint2.into())
    }

    pub fn peer_directory(&self) -> PeerDirectory {
        PeerDirectory::new(self.peer.host, self.peer.base_port, self.peer.stride)
    }

    /// Simulated vehicle for agent `id`
    pub fn sim_config(&self, id: AgentId) -> SimVehicleConfig {
        SimVehicleConfig {
            id,
            home: self.sim.home.into(),
            initial_mode: self.sim.initial_mode.clone(),
            flight_mode_set_available: self.sim.flight_mode_set_available,
            climb_rate_ms: self.sim.climb_rate_ms,
            descent_rate_ms: self.sim.descent_rate_ms,
            cruise_speed_ms: self.sim.cruise_speed_ms,
            battery_capacity_j: self.sim.battery_capacity_j,
            initial_battery_percent: self.sim.initial_battery_percent,
            gps_noise_m: self.sim.gps_noise_m,
            seed: self.sim.seed,
        }
    }

    /// Check the mission and simulator sections
    pub fn validate(&self) -> Result<()> {
        self.mission_config().validate()?;
        self.sim_config(AgentId(1)).validate()?;
        Ok(())
    }
}
