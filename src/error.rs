use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use relay_trail_core::mission::ConfigError;
use relay_trail_sitl::SimulatorError;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid mission configuration: {0}")]
    InvalidMission(ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to bind peer socket {addr}: {source}")]
    PeerBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Simulator error: {0}")]
    Simulator(#[from] SimulatorError),

    #[error("Event queue closed")]
    QueueClosed,
}

impl From<ConfigError> for AgentError {
    fn from(err: ConfigError) -> Self {
        AgentError::InvalidMission(err)
    }
}
