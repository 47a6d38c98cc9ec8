//! GCS (Ground Control Station) telemetry over MAVLink UDP.
//!
//! Mirrors one simulated vehicle to Mission Planner, QGroundControl or any
//! other MAVLink-compatible GCS. The link only reports; inbound messages are
//! used to discover the GCS address and are otherwise discarded.

mod telemetry;

pub use telemetry::{
    build_global_position_int, build_heartbeat, build_sys_status, copter_custom_mode,
};

use std::io::{self, Cursor};
use std::net::{SocketAddr, UdpSocket};

use mavlink::common::MavMessage;
use mavlink::peek_reader::PeekReader;
use mavlink::MavHeader;

use crate::error::SimulatorError;
use crate::vehicle::VehicleTelemetry;

/// Rate intervals in microseconds for each telemetry message type.
const HEARTBEAT_INTERVAL_US: u64 = 1_000_000; // 1 Hz
const POSITION_INTERVAL_US: u64 = 500_000; // 2 Hz
const SYS_STATUS_INTERVAL_US: u64 = 1_000_000; // 1 Hz

/// Per-vehicle MAVLink UDP connection to a ground control station.
pub struct GcsLink {
    socket: UdpSocket,
    system_id: u8,
    component_id: u8,
    sequence: u8,
    gcs_addr: Option<SocketAddr>,
    last_heartbeat_us: Option<u64>,
    last_position_us: Option<u64>,
    last_sys_status_us: Option<u64>,
    recv_buf: Vec<u8>,
}

impl GcsLink {
    /// Create a new GCS link bound to `0.0.0.0:{port}` in non-blocking mode.
    pub fn new(system_id: u8, port: u16) -> Result<Self, SimulatorError> {
        let socket = UdpSocket::bind(format!("0.0.0.0:{port}"))?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            socket,
            system_id,
            component_id: 1, // MAV_COMP_ID_AUTOPILOT1
            sequence: 0,
            gcs_addr: None,
            last_heartbeat_us: None,
            last_position_us: None,
            last_sys_status_us: None,
            recv_buf: vec![0u8; 280],
        })
    }

    /// Local address the link is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Drain incoming datagrams, returning the number of MAVLink messages parsed.
    ///
    /// On the first datagram received, the sender address is stored as the
    /// GCS endpoint for outgoing telemetry.
    pub fn poll_incoming(&mut self) -> usize {
        let mut parsed = 0;
        loop {
            match self.socket.recv_from(&mut self.recv_buf) {
                Ok((len, addr)) => {
                    if self.gcs_addr.is_none() {
                        tracing::info!(system_id = self.system_id, %addr, "GCS discovered");
                        self.gcs_addr = Some(addr);
                    }
                    if parse_datagram(&self.recv_buf[..len]).is_some() {
                        parsed += 1;
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(_) => break,
            }
        }
        parsed
    }

    /// Send a MAVLink v2 message to the discovered GCS address.
    ///
    /// Does nothing if no GCS has been discovered yet.
    pub fn send_message(&mut self, msg: &MavMessage) -> Result<(), SimulatorError> {
        let Some(addr) = self.gcs_addr else {
            return Ok(());
        };

        let header = MavHeader {
            system_id: self.system_id,
            component_id: self.component_id,
            sequence: self.sequence,
        };
        self.sequence = self.sequence.wrapping_add(1);

        let mut buf = Cursor::new(Vec::with_capacity(280));
        mavlink::write_v2_msg(&mut buf, header, msg)
            .map_err(|e| SimulatorError::Encode(format!("{e:?}")))?;

        self.socket.send_to(&buf.into_inner(), addr)?;
        Ok(())
    }

    /// Poll for incoming datagrams and send rate-limited telemetry.
    ///
    /// Call this once per tick. Send failures are dropped.
    pub fn update(&mut self, telemetry: &VehicleTelemetry, sim_time_us: u64) {
        self.poll_incoming();

        if due(&mut self.last_heartbeat_us, sim_time_us, HEARTBEAT_INTERVAL_US) {
            let _ = self.send_message(&build_heartbeat(telemetry));
        }

        if due(&mut self.last_position_us, sim_time_us, POSITION_INTERVAL_US) {
            let time_boot_ms = (sim_time_us / 1000) as u32;
            let _ = self.send_message(&build_global_position_int(telemetry, time_boot_ms));
        }

        if due(
            &mut self.last_sys_status_us,
            sim_time_us,
            SYS_STATUS_INTERVAL_US,
        ) {
            let _ = self.send_message(&build_sys_status(telemetry));
        }
    }

    /// Whether a GCS endpoint has been discovered.
    pub fn is_connected(&self) -> bool {
        self.gcs_addr.is_some()
    }
}

/// Rate limiter: true on the first call and once per `interval_us` after.
fn due(last_us: &mut Option<u64>, now_us: u64, interval_us: u64) -> bool {
    match *last_us {
        Some(last) if now_us.saturating_sub(last) < interval_us => false,
        _ => {
            *last_us = Some(now_us);
            true
        }
    }
}

fn parse_datagram(data: &[u8]) -> Option<(MavHeader, MavMessage)> {
    let cursor = Cursor::new(data);
    let mut reader = PeekReader::new(cursor);
    mavlink::read_v2_msg::<MavMessage, _>(&mut reader).ok()
}
