//! relay_trail - Cooperative UAV mission agent
//!
//! Runtime for the mission controller in `relay_trail_core`:
//!
//! - [`agent`]: event loop tying vehicle, peers and scheduler together
//! - [`peer`]: UDP and in-process peer transports
//! - [`scheduler`]: wall-clock and lockstep tick sources
//! - [`parameters`] / [`cli`]: TOML configuration and command line overrides
//! - [`link`]: instance number to vehicle link and port resolution
//! - [`diagnostics`]: logging setup and mission log rendering

pub mod agent;
pub mod cli;
pub mod diagnostics;
pub mod error;
pub mod link;
pub mod parameters;
pub mod peer;
pub mod scheduler;

pub use agent::{Agent, AgentEvent, AgentOptions, RunSummary, VehicleLink};
pub use error::{AgentError, Result};
