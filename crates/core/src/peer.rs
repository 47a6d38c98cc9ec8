//! Peer messaging
//!
//! Identity-addressed, best-effort channel between cooperating agents, and
//! the datagram framing shared by every transport.
//!
//! # Frame Format
//!
//! ```text
//! +--------+-------------+----------------------+
//! | source | destination | payload (1..=64 B)   |
//! +--------+-------------+----------------------+
//! ```
//!
//! Receivers surface every well-formed frame regardless of `destination`;
//! only the controller's interpretation is identity-relative.

use core::fmt;

use crate::identity::AgentId;

/// Header length (source + destination)
pub const FRAME_HEADER_LEN: usize = 2;

/// Maximum payload carried by one frame
pub const MAX_PEER_PAYLOAD: usize = 64;

/// Maximum encoded frame length
pub const MAX_FRAME_LEN: usize = FRAME_HEADER_LEN + MAX_PEER_PAYLOAD;

/// Payload byte of the mission-completion trigger (MAV_CMD_NAV_TAKEOFF = 22).
///
/// Receivers do not interpret it; only arrival and source matter.
pub const TRIGGER_PAYLOAD: u8 = 22;

/// Best-effort, identity-addressed send side of the peer channel
///
/// Inbound messages are delivered asynchronously by the runtime and handed
/// to the controller as `(source, payload)` pairs.
pub trait PeerChannel {
    /// Send `payload` to `destination`. No confirmation, no retry; failures
    /// are dropped.
    fn send(&mut self, destination: AgentId, payload: &[u8]);

    /// Change the identity stamped on outgoing frames
    fn set_local_id(&mut self, id: AgentId);

    /// Identity currently stamped on outgoing frames
    fn local_id(&self) -> AgentId;
}

/// Frame encoding/decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Datagram shorter than header plus one payload byte
    Truncated { len: usize },
    /// Payload exceeds [`MAX_PEER_PAYLOAD`]
    PayloadTooLarge { len: usize },
    /// Empty payload on encode
    EmptyPayload,
    /// Output buffer cannot hold the frame
    BufferTooSmall { needed: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Truncated { len } => write!(f, "Frame truncated ({} bytes)", len),
            FrameError::PayloadTooLarge { len } => write!(
                f,
                "Payload of {} bytes exceeds {} byte limit",
                len, MAX_PEER_PAYLOAD
            ),
            FrameError::EmptyPayload => write!(f, "Payload is empty"),
            FrameError::BufferTooSmall { needed } => {
                write!(f, "Output buffer too small ({} bytes needed)", needed)
            }
        }
    }
}

/// Decoded peer frame borrowing its payload from the datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerFrame<'a> {
    pub source: AgentId,
    pub destination: AgentId,
    pub payload: &'a [u8],
}

/// Encode a frame into `buf`, returning the encoded length
pub fn encode_frame(
    source: AgentId,
    destination: AgentId,
    payload: &[u8],
    buf: &mut [u8],
) -> Result<usize, FrameError> {
    if payload.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    if payload.len() > MAX_PEER_PAYLOAD {
        return Err(FrameError::PayloadTooLarge { len: payload.len() });
    }

    let len = FRAME_HEADER_LEN + payload.len();
    if buf.len() < len {
        return Err(FrameError::BufferTooSmall { needed: len });
    }

    buf[0] = source.0;
    buf[1] = destination.0;
    buf[FRAME_HEADER_LEN..len].copy_from_slice(payload);
    Ok(len)
}

/// Decode a received datagram
pub fn decode_frame(data: &[u8]) -> Result<PeerFrame<'_>, FrameError> {
    if data.len() <= FRAME_HEADER_LEN {
        return Err(FrameError::Truncated { len: data.len() });
    }

    let payload = &data[FRAME_HEADER_LEN..];
    if payload.len() > MAX_PEER_PAYLOAD {
        return Err(FrameError::PayloadTooLarge { len: payload.len() });
    }

    Ok(PeerFrame {
        source: AgentId(data[0]),
        destination: AgentId(data[1]),
        payload,
    })
}

// ============================================================================
// Recording Implementation (always available for testing)
// ============================================================================

/// Number of sent messages retained by [`RecordingPeer`]
pub const RECORDING_PEER_CAPACITY: usize = 64;

/// Message captured by [`RecordingPeer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub source: AgentId,
    pub destination: AgentId,
    pub payload: heapless::Vec<u8, MAX_PEER_PAYLOAD>,
}

/// Peer channel that records outgoing messages instead of sending them.
///
/// Keeps the first [`RECORDING_PEER_CAPACITY`] messages; `sent_count` keeps
/// counting past that.
#[derive(Debug, Clone, Default)]
pub struct RecordingPeer {
    local_id: AgentId,
    sent: heapless::Vec<SentMessage, RECORDING_PEER_CAPACITY>,
    sent_count: usize,
}

impl RecordingPeer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retained messages, oldest first
    pub fn sent(&self) -> &[SentMessage] {
        &self.sent
    }

    /// Total number of `send` calls
    pub fn sent_count(&self) -> usize {
        self.sent_count
    }

    pub fn clear(&mut self) {
        self.sent.clear();
        self.sent_count = 0;
    }
}

impl PeerChannel for RecordingPeer {
    fn send(&mut self, destination: AgentId, payload: &[u8]) {
        self.sent_count += 1;
        let mut data = heapless::Vec::new();
        for &b in payload.iter().take(MAX_PEER_PAYLOAD) {
            let _ = data.push(b);
        }
        let _ = self.sent.push(SentMessage {
            source: self.local_id,
            destination,
            payload: data,
        });
    }

    fn set_local_id(&mut self, id: AgentId) {
        self.local_id = id;
    }

    fn local_id(&self) -> AgentId {
        self.local_id
    }
}
