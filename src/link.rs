//! Vehicle link resolution
//!
//! Maps an agent instance number to the vehicle link and peer port it uses.
//! Instance 0 talks to a flight controller over the serial port; instance
//! `n > 0` talks to a SITL autopilot over TCP.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};

/// Serial device used by instance 0
pub const SERIAL_PORT: &str = "/dev/ttyACM0";

/// Serial baud rate used by instance 0
pub const BAUD_RATE: u32 = 57_600;

/// Base TCP port of SITL autopilot instances
pub const SITL_PORT_BASE: u16 = 5760;

/// Base UDP port of the peer network
pub const NET_PORT_BASE: u16 = 15760;

/// Port stride between consecutive instances
pub const INSTANCE_PORT_STRIDE: u16 = 10;

/// Transport to the vehicle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleLinkKind {
    Serial { device: String, baud: u32 },
    Tcp { addr: SocketAddr },
}

impl fmt::Display for VehicleLinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleLinkKind::Serial { device, baud } => write!(f, "serial {device} @ {baud}"),
            VehicleLinkKind::Tcp { addr } => write!(f, "tcp {addr}"),
        }
    }
}

/// Link and peer endpoint for one agent instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub instance: u8,
    pub vehicle: VehicleLinkKind,
    /// UDP port of this instance on the peer network
    pub net_port: u16,
}

impl LinkConfig {
    /// Resolve the link for `instance`
    pub fn for_instance(instance: u8) -> Self {
        let offset = INSTANCE_PORT_STRIDE * instance as u16;
        let vehicle = if instance == 0 {
            VehicleLinkKind::Serial {
                device: SERIAL_PORT.to_string(),
                baud: BAUD_RATE,
            }
        } else {
            VehicleLinkKind::Tcp {
                addr: SocketAddr::from((Ipv4Addr::LOCALHOST, offset + SITL_PORT_BASE + 3)),
            }
        };

        Self {
            instance,
            vehicle,
            net_port: offset + NET_PORT_BASE,
        }
    }
}
