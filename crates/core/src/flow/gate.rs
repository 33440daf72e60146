//! Outcome of submitting an event code at the redemption gate.

use crate::types::Notice;

/// Shown when the backend says the code is not valid.
pub const INVALID_EVENT_CODE: &str = "Invalid event code";

/// Shown when the backend could not be asked at all.
pub const GATE_UNAVAILABLE: &str = "We could not validate your event code right now. Please try again.";

/// Shown when a redemption pass is expired, tampered with, or its flow is gone.
pub const PASS_EXPIRED: &str =
    "Your redemption session has expired. Please enter your event code again.";

/// What happened to a submitted event code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The backend accepted the code; the visitor moves on to verification.
    Accepted,
    /// The backend answered and the code is not valid.
    Rejected,
    /// The backend could not be reached or its answer could not be read.
    Unavailable,
}

impl GateOutcome {
    /// Classify a backend answer.
    #[must_use]
    pub const fn from_is_valid(is_valid: bool) -> Self {
        if is_valid { Self::Accepted } else { Self::Rejected }
    }

    /// The notice to show on the gate page, if the visitor stays there.
    #[must_use]
    pub fn notice(self) -> Option<Notice> {
        match self {
            Self::Accepted => None,
            Self::Rejected => Some(Notice::error(INVALID_EVENT_CODE)),
            Self::Unavailable => Some(Notice::error(GATE_UNAVAILABLE)),
        }
    }
}
