use serde::{Deserialize, Serialize};

/// Access state of the safe, sampled from the tilt switch every cycle.
///
/// The tilt switch is the door-open sensor: `Open` means the door has been
/// tilted off its rest position. Authorization is momentary (a lock pulse),
/// so there is no persistent "unlocked" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafeState {
    Locked,
    Open,
}

impl SafeState {
    pub fn from_tilt(tilted: bool) -> Self {
        if tilted {
            SafeState::Open
        } else {
            SafeState::Locked
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, SafeState::Open)
    }
}

/// Read-only, point-in-time projection of controller status for external
/// consumers. Published through a watch channel; the controller task is the
/// only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub state: SafeState,
    pub cam1_active: bool,
    pub cam2_active: bool,
    /// Unix seconds of the last Locked -> Open transition, 0 if never
    pub last_opened: u64,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: SafeState::Locked,
            cam1_active: false,
            cam2_active: false,
            last_opened: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_tilt() {
        assert_eq!(SafeState::from_tilt(true), SafeState::Open);
        assert_eq!(SafeState::from_tilt(false), SafeState::Locked);
        assert!(SafeState::Open.is_open());
        assert!(!SafeState::Locked.is_open());
    }

    #[test]
    fn test_default_snapshot() {
        let snapshot = StatusSnapshot::default();
        assert_eq!(snapshot.state, SafeState::Locked);
        assert!(!snapshot.cam1_active);
        assert!(!snapshot.cam2_active);
        assert_eq!(snapshot.last_opened, 0);
    }
}
