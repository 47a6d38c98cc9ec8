//! relay_trail_core - Pure no_std mission logic for relay_trail agents
//!
//! This crate contains the platform-agnostic mission state machine, energy
//! model and peer protocol, testable on host without any runtime.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies
//! - **Trait abstractions**: Vehicle and peer transport injected via traits
//!
//! # Modules
//!
//! - [`geo`]: Great-circle distance, bearing and projection
//! - [`identity`]: Agent identifiers and neighbor convention
//! - [`vehicle`]: Vehicle telemetry/command contract
//! - [`peer`]: Peer channel trait and datagram framing
//! - [`energy`]: Per-tick battery consumption model
//! - [`mission`]: Mission stages, plan, configuration and events
//! - [`controller`]: Mission state machine

#![no_std]

pub mod controller;
pub mod energy;
pub mod geo;
pub mod identity;
pub mod mission;
pub mod peer;
pub mod vehicle;

pub use controller::MissionController;
pub use identity::AgentId;
