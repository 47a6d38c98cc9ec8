//! In-process peer transport
//!
//! A [`LoopbackHub`] routes frames between agents running in the same
//! process. Frames go through the same codec as the UDP transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use relay_trail_core::peer::{decode_frame, encode_frame, PeerChannel, MAX_FRAME_LEN};
use relay_trail_core::AgentId;

use super::{PeerMessage, PeerTransport};

type Routes = HashMap<AgentId, mpsc::UnboundedSender<Vec<u8>>>;

/// Shared routing table
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    routes: Arc<Mutex<Routes>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `instance` and return its transport halves.
    ///
    /// Joining twice with the same instance replaces the earlier route.
    pub fn join(&self, instance: AgentId) -> (LoopbackPeerChannel, LoopbackReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(instance, tx);
        }
        (
            LoopbackPeerChannel {
                hub: self.clone(),
                local_id: AgentId::NONE,
            },
            LoopbackReceiver { instance, rx },
        )
    }

    fn deliver(&self, destination: AgentId, frame: Vec<u8>) {
        let Ok(routes) = self.routes.lock() else {
            return;
        };
        match routes.get(&destination) {
            Some(tx) => {
                if tx.send(frame).is_err() {
                    trace!(%destination, "Loopback receiver closed, message dropped");
                }
            }
            None => trace!(%destination, "No loopback route, message dropped"),
        }
    }
}

/// Sending half of the loopback transport
#[derive(Debug)]
pub struct LoopbackPeerChannel {
    hub: LoopbackHub,
    local_id: AgentId,
}

impl PeerChannel for LoopbackPeerChannel {
    fn send(&mut self, destination: AgentId, payload: &[u8]) {
        let mut frame = [0u8; MAX_FRAME_LEN];
        match encode_frame(self.local_id, destination, payload, &mut frame) {
            Ok(len) => self.hub.deliver(destination, frame[..len].to_vec()),
            Err(e) => trace!(%destination, "Loopback frame not sent: {}", e),
        }
    }

    fn set_local_id(&mut self, id: AgentId) {
        self.local_id = id;
    }

    fn local_id(&self) -> AgentId {
        self.local_id
    }
}

/// Receiving half of the loopback transport
#[derive(Debug)]
pub struct LoopbackReceiver {
    instance: AgentId,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl PeerTransport for LoopbackReceiver {
    async fn recv(&mut self) -> Option<PeerMessage> {
        while let Some(frame) = self.rx.recv().await {
            match decode_frame(&frame) {
                Ok(decoded) => {
                    if decoded.destination != self.instance {
                        trace!(destination = %decoded.destination, "Frame addressed to another agent");
                    }
                    return Some(PeerMessage {
                        source: decoded.source,
                        payload: decoded.payload.to_vec(),
                    });
                }
                Err(e) => trace!("Malformed loopback frame dropped: {}", e),
            }
        }
        None
    }
}
