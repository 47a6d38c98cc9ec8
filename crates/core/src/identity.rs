//! Agent identity
//!
//! Agents are numbered contiguously. An agent treats `id - 1` as the peer
//! allowed to trigger its arming and `id + 1` as the peer it signals when its
//! own mission reaches the dwell stage.

use core::fmt;

/// Agent identifier (matches the attached vehicle's MAVLink system ID).
///
/// `AgentId(0)` means no vehicle is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AgentId(pub u8);

impl AgentId {
    /// Identity used while no vehicle is attached
    pub const NONE: AgentId = AgentId(0);

    /// Whether this identity refers to an attached vehicle
    pub fn is_attached(self) -> bool {
        self.0 != 0
    }

    /// Peer expected to send the arm trigger (`id - 1`)
    ///
    /// Returns `None` for [`AgentId::NONE`].
    pub fn previous(self) -> Option<AgentId> {
        if self.is_attached() {
            Some(AgentId(self.0 - 1))
        } else {
            None
        }
    }

    /// Peer that receives the mission-completion trigger (`id + 1`)
    ///
    /// Returns `None` for [`AgentId::NONE`] and when the ID space is exhausted.
    pub fn next(self) -> Option<AgentId> {
        if !self.is_attached() {
            return None;
        }
        self.0.checked_add(1).map(AgentId)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for AgentId {
    fn from(id: u8) -> Self {
        AgentId(id)
    }
}
