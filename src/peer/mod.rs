//! Peer network transports
//!
//! Agents exchange small framed datagrams (see `relay_trail_core::peer`).
//! Every transport is split in two halves:
//!
//! - a sending half implementing `PeerChannel`, owned by the mission
//!   controller and called synchronously from its handlers
//! - a receiving half implementing [`PeerTransport`], drained by a background
//!   task that forwards messages into the agent event queue
//!
//! Transports:
//! - [`udp`]: UDP sockets addressed through a [`PeerDirectory`]
//! - [`loopback`]: in-process hub used by tests and multi-agent runs

pub mod loopback;
pub mod udp;

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use relay_trail_core::AgentId;

use crate::agent::AgentEvent;

pub use loopback::{LoopbackHub, LoopbackPeerChannel, LoopbackReceiver};
pub use udp::{UdpPeerChannel, UdpPeerReceiver};

/// Message delivered to an agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMessage {
    pub source: AgentId,
    pub payload: Vec<u8>,
}

/// Receiving half of a peer transport
#[async_trait]
pub trait PeerTransport: Send {
    /// Wait for the next well-formed message addressed to this agent.
    ///
    /// Returns `None` once the transport is closed.
    async fn recv(&mut self) -> Option<PeerMessage>;
}

/// Maps agent IDs to peer network addresses
///
/// Agent `n` listens on `host:(base_port + stride * n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerDirectory {
    host: IpAddr,
    base_port: u16,
    stride: u16,
}

impl PeerDirectory {
    pub const fn new(host: IpAddr, base_port: u16, stride: u16) -> Self {
        Self {
            host,
            base_port,
            stride,
        }
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// Port of agent `id`, or `None` if it falls outside the port range
    pub fn port_of(&self, id: AgentId) -> Option<u16> {
        self.stride
            .checked_mul(id.0 as u16)
            .and_then(|offset| self.base_port.checked_add(offset))
    }

    /// Address of agent `id`
    pub fn addr_of(&self, id: AgentId) -> Option<SocketAddr> {
        self.port_of(id).map(|port| SocketAddr::new(self.host, port))
    }
}

/// Forward messages from `transport` into an agent event queue.
///
/// The task ends when either the transport or the queue closes.
pub fn spawn_forwarder<T, V>(mut transport: T, events: mpsc::Sender<AgentEvent<V>>) -> JoinHandle<()>
where
    T: PeerTransport + 'static,
    V: Send + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = transport.recv().await {
            if events.send(AgentEvent::Peer(message)).await.is_err() {
                debug!("Agent event queue closed, stopping peer forwarder");
                return;
            }
        }
        debug!("Peer transport closed");
    })
}
