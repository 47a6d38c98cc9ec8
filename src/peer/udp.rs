//! UDP peer transport
//!
//! One socket per agent, bound to the agent's port on the peer network.
//! Sends are fire-and-forget (`try_send_to`) so the controller never blocks
//! on the network; a full socket buffer drops the datagram.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use relay_trail_core::peer::{decode_frame, encode_frame, PeerChannel, MAX_FRAME_LEN};
use relay_trail_core::AgentId;

use super::{PeerDirectory, PeerMessage, PeerTransport};
use crate::error::{AgentError, Result};

/// Largest datagram read from the socket; longer frames are rejected by the
/// decoder rather than silently truncated.
const RECV_BUFFER_LEN: usize = 512;

/// Sending half of the UDP transport
#[derive(Debug)]
pub struct UdpPeerChannel {
    socket: Arc<UdpSocket>,
    directory: PeerDirectory,
    local_id: AgentId,
}

/// Receiving half of the UDP transport
#[derive(Debug)]
pub struct UdpPeerReceiver {
    socket: Arc<UdpSocket>,
    instance: AgentId,
    buf: Vec<u8>,
}

impl UdpPeerChannel {
    /// Bind the port of `instance` on all interfaces
    pub async fn bind(
        directory: PeerDirectory,
        instance: AgentId,
    ) -> Result<(Self, UdpPeerReceiver)> {
        let port = directory.port_of(instance).ok_or_else(|| {
            AgentError::InvalidArgument(format!("no peer port for instance {instance}"))
        })?;
        Self::bind_addr(
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            directory,
            instance,
        )
        .await
    }

    /// Bind an explicit local address
    pub async fn bind_addr(
        addr: SocketAddr,
        directory: PeerDirectory,
        instance: AgentId,
    ) -> Result<(Self, UdpPeerReceiver)> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| AgentError::PeerBind { addr, source })?;
        // try_send_to reports WouldBlock until the reactor has seen the
        // socket writable once
        socket
            .writable()
            .await
            .map_err(|source| AgentError::PeerBind { addr, source })?;
        let socket = Arc::new(socket);
        debug!(local = ?socket.local_addr().ok(), %instance, "Peer socket bound");

        Ok((
            Self {
                socket: Arc::clone(&socket),
                directory,
                local_id: AgentId::NONE,
            },
            UdpPeerReceiver {
                socket,
                instance,
                buf: vec![0u8; RECV_BUFFER_LEN],
            },
        ))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl PeerChannel for UdpPeerChannel {
    fn send(&mut self, destination: AgentId, payload: &[u8]) {
        let Some(addr) = self.directory.addr_of(destination) else {
            trace!(%destination, "No peer address, message dropped");
            return;
        };

        let mut frame = [0u8; MAX_FRAME_LEN];
        let len = match encode_frame(self.local_id, destination, payload, &mut frame) {
            Ok(len) => len,
            Err(e) => {
                warn!(%destination, "Peer frame not sent: {}", e);
                return;
            }
        };

        if let Err(e) = self.socket.try_send_to(&frame[..len], addr) {
            trace!(%destination, %addr, "Peer send failed: {}", e);
        }
    }

    fn set_local_id(&mut self, id: AgentId) {
        self.local_id = id;
    }

    fn local_id(&self) -> AgentId {
        self.local_id
    }
}

#[async_trait]
impl PeerTransport for UdpPeerReceiver {
    async fn recv(&mut self) -> Option<PeerMessage> {
        loop {
            let (len, from) = match self.socket.recv_from(&mut self.buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!("Peer socket receive failed: {}", e);
                    return None;
                }
            };

            match decode_frame(&self.buf[..len]) {
                Ok(frame) => {
                    if frame.destination != self.instance {
                        trace!(%from, destination = %frame.destination, "Frame addressed to another agent");
                    }
                    return Some(PeerMessage {
                        source: frame.source,
                        payload: frame.payload.to_vec(),
                    });
                }
                Err(e) => {
                    trace!(%from, "Malformed peer frame dropped: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::time::Duration;

    use relay_trail_core::peer::TRIGGER_PAYLOAD;

    const RECV_TIMEOUT: Duration = Duration::from_secs(2);

    fn localhost() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    async fn receiver(instance: AgentId) -> UdpPeerReceiver {
        let (_, receiver) = UdpPeerChannel::bind_addr(
            localhost(),
            PeerDirectory::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, 0),
            instance,
        )
        .await
        .unwrap();
        receiver
    }

    /// Sender whose directory routes every ID to `port` (stride 0)
    async fn sender_to(port: u16) -> UdpPeerChannel {
        let directory = PeerDirectory::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port, 0);
        let (sender, _) = UdpPeerChannel::bind_addr(localhost(), directory, AgentId(1))
            .await
            .unwrap();
        sender
    }

    async fn next_message(receiver: &mut UdpPeerReceiver) -> PeerMessage {
        tokio::time::timeout(RECV_TIMEOUT, receiver.recv())
            .await
            .expect("datagram lost")
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_send_after_bind_is_delivered() {
        let mut receiver = receiver(AgentId(2)).await;
        let port = receiver.socket.local_addr().unwrap().port();

        // No reactor turn between bind and the first send
        let mut sender = sender_to(port).await;
        sender.set_local_id(AgentId(1));
        sender.send(AgentId(2), &[TRIGGER_PAYLOAD]);

        assert_eq!(
            next_message(&mut receiver).await,
            PeerMessage {
                source: AgentId(1),
                payload: vec![TRIGGER_PAYLOAD],
            }
        );
    }

    #[tokio::test]
    async fn test_every_well_formed_frame_is_surfaced() {
        let mut receiver = receiver(AgentId(2)).await;
        let target = receiver.socket.local_addr().unwrap();

        let raw = UdpSocket::bind(localhost()).await.unwrap();
        raw.send_to(&[1], target).await.unwrap(); // header only
        raw.send_to(&[1, 3, TRIGGER_PAYLOAD], target).await.unwrap(); // addressed to agent 3
        raw.send_to(&[4, 2, TRIGGER_PAYLOAD], target).await.unwrap();

        let foreign = next_message(&mut receiver).await;
        assert_eq!(foreign.source, AgentId(1));
        assert_eq!(foreign.payload, vec![TRIGGER_PAYLOAD]);

        let own = next_message(&mut receiver).await;
        assert_eq!(own.source, AgentId(4));
    }

    #[tokio::test]
    async fn test_send_before_attach_uses_none_source() {
        let mut receiver = receiver(AgentId(2)).await;
        let port = receiver.socket.local_addr().unwrap().port();

        let mut sender = sender_to(port).await;
        assert_eq!(sender.local_id(), AgentId::NONE);
        sender.send(AgentId(2), &[TRIGGER_PAYLOAD]);

        assert_eq!(next_message(&mut receiver).await.source, AgentId::NONE);
    }
}
