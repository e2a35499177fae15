//! Abnormal-movement confirmation and escalation throttling.
//!
//! ```text
//! NORMAL ──abnormal──▶ ABNORMAL_PENDING ──≥ threshold──▶ ABNORMAL_CONFIRMED
//!    ▲                        │                                   │ gate open
//!    └───────normal───────────┘                                   ▼
//!                                         COOLDOWN ◀──────── ESCALATING
//! ```

mod abnormal;
mod cooldown;

pub use abnormal::{AbnormalState, AbnormalityTracker, DEFAULT_CONFIRM_THRESHOLD};
pub use cooldown::{CooldownGate, DEFAULT_COOLDOWN};

use serde::Serialize;
use std::fmt;

/// Where the pipeline stands after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorPhase {
    /// Latest verdict was normal
    Normal,
    /// Abnormal, duration still accumulating
    AbnormalPending,
    /// Abnormal past the threshold but the trigger was not offered
    AbnormalConfirmed,
    /// This tick opened the gate and started an escalation
    Escalating,
    /// A trigger was offered and suppressed by the cooldown
    Cooldown,
}

impl MonitorPhase {
    /// Derive the phase from the tracker state and the gate decision
    pub fn derive(state: &AbnormalState, offered: bool, escalated: bool) -> Self {
        match (state.is_abnormal, state.confirmed, offered, escalated) {
            (_, _, true, true) => MonitorPhase::Escalating,
            (_, _, true, false) => MonitorPhase::Cooldown,
            (false, _, _, _) => MonitorPhase::Normal,
            (true, false, _, _) => MonitorPhase::AbnormalPending,
            (true, true, _, _) => MonitorPhase::AbnormalConfirmed,
        }
    }
}

impl fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorPhase::Normal => write!(f, "NORMAL"),
            MonitorPhase::AbnormalPending => write!(f, "ABNORMAL_PENDING"),
            MonitorPhase::AbnormalConfirmed => write!(f, "ABNORMAL_CONFIRMED"),
            MonitorPhase::Escalating => write!(f, "ESCALATING"),
            MonitorPhase::Cooldown => write!(f, "COOLDOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    fn state(is_abnormal: bool, confirmed: bool) -> AbnormalState {
        AbnormalState {
            is_abnormal,
            started_at: is_abnormal.then(Instant::now),
            duration: Duration::ZERO,
            confirmed,
        }
    }

    #[test]
    fn phase_follows_tracker_and_gate() {
        assert_eq!(MonitorPhase::derive(&state(false, false), false, false), MonitorPhase::Normal);
        assert_eq!(
            MonitorPhase::derive(&state(true, false), false, false),
            MonitorPhase::AbnormalPending
        );
        assert_eq!(
            MonitorPhase::derive(&state(true, true), false, false),
            MonitorPhase::AbnormalConfirmed
        );
        assert_eq!(MonitorPhase::derive(&state(true, true), true, true), MonitorPhase::Escalating);
        assert_eq!(MonitorPhase::derive(&state(true, true), true, false), MonitorPhase::Cooldown);
        assert_eq!(MonitorPhase::Cooldown.to_string(), "COOLDOWN");
    }
}
