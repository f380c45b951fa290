//! Lifecycle state of a machine as observed from the backend.

use std::fmt;

/// Current lifecycle state of the machine.
///
/// Never stored: always derived from the backend's live power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// State is unknown or the VM is transitioning
    None,
    /// VM is powered on
    Running,
    /// VM is powered off
    Stopped,
}

impl LifecycleState {
    /// Classify the raw power-state text reported by the backend.
    pub fn from_power_state(raw: &str) -> Self {
        if raw.contains("poweredOn") {
            Self::Running
        } else if raw.contains("poweredOff") {
            Self::Stopped
        } else {
            Self::None
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
