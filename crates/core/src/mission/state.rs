//! Mission State Types
//!
//! Stage and sub-stage tracking for one mission execution.

use core::fmt;

/// Top-level mission stage
///
/// Transitions run forward (Idle -> Takeoff -> Mission -> Land -> Idle).
/// Disarm and detach force Idle from any stage; an emergency landing forces
/// Land.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MissionStage {
    /// Waiting for an accepted arm
    #[default]
    Idle,
    /// Climbing to the target altitude
    Takeoff,
    /// Navigating the waypoint sequence
    Mission,
    /// Descending until touchdown
    Land,
}

impl fmt::Display for MissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissionStage::Idle => "Idle",
            MissionStage::Takeoff => "Takeoff",
            MissionStage::Mission => "Mission",
            MissionStage::Land => "Land",
        };
        f.write_str(name)
    }
}

/// Sub-stage within [`MissionStage::Mission`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum SubStage {
    /// Mission entered, no navigation target issued yet
    #[default]
    Start = 0,
    /// Heading to waypoint 1
    ToWaypoint1 = 1,
    /// Heading to waypoint 2
    ToWaypoint2 = 2,
    /// Heading to the projected destination
    ToDestination = 3,
    /// Holding at the destination while signalling the next agent
    Dwell = 4,
}

impl SubStage {
    /// Numeric sub-stage index (0-4)
    pub fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SubStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Progress through the Mission stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MissionProgress {
    /// Current sub-stage (meaningful while stage is Mission)
    pub sub_stage: SubStage,
    /// Ticks spent in the dwell sub-stage
    pub dwell_ticks: u32,
}

impl MissionProgress {
    /// Reset to sub-stage 0 with no dwell ticks
    pub fn reset(&mut self) {
        *self = MissionProgress::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mission_stage_default() {
        assert_eq!(MissionStage::default(), MissionStage::Idle);
    }

    #[test]
    fn test_sub_stage_indices() {
        assert_eq!(SubStage::Start.index(), 0);
        assert_eq!(SubStage::ToWaypoint1.index(), 1);
        assert_eq!(SubStage::ToWaypoint2.index(), 2);
        assert_eq!(SubStage::ToDestination.index(), 3);
        assert_eq!(SubStage::Dwell.index(), 4);
        assert!(SubStage::ToWaypoint2 < SubStage::Dwell);
    }

    #[test]
    fn test_progress_reset() {
        let mut progress = MissionProgress {
            sub_stage: SubStage::Dwell,
            dwell_ticks: 17,
        };
        progress.reset();
        assert_eq!(progress.sub_stage, SubStage::Start);
        assert_eq!(progress.dwell_ticks, 0);
    }
}
