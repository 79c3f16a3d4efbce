//! Canonical presence vocabulary.

use serde::{Deserialize, Serialize};

/// Canonical presence state, used uniformly regardless of the raw telephony
/// vocabulary reported by the device-state authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceState {
    Available,
    Unavailable,
    Talking,
    Ringing,
    Holding,
}

impl PresenceState {
    /// Get the state as a string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Talking => "talking",
            Self::Ringing => "ringing",
            Self::Holding => "holding",
        }
    }

    /// Parse a stored state string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Self::Available),
            "unavailable" => Some(Self::Unavailable),
            "talking" => Some(Self::Talking),
            "ringing" => Some(Self::Ringing),
            "holding" => Some(Self::Holding),
            _ => None,
        }
    }

    /// Map a raw device-telephony state to its canonical presence state.
    ///
    /// Total: any unrecognized raw state (including `UNKNOWN`, `BUSY` and
    /// `INVALID`) maps to `Unavailable`.
    pub fn from_device_state(raw: &str) -> Self {
        match raw {
            "INUSE" => Self::Talking,
            "UNAVAILABLE" => Self::Unavailable,
            "NOT_INUSE" => Self::Available,
            "RINGING" | "RINGINUSE" => Self::Ringing,
            "ONHOLD" => Self::Holding,
            _ => Self::Unavailable,
        }
    }
}

impl std::fmt::Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
