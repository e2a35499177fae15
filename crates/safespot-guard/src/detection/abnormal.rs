//! Duration-based confirmation of abnormal movement.
//!
//! A verdict only counts as confirmed once the classification service has
//! reported abnormal movement continuously for the confirmation threshold.
//! Any single normal verdict clears the accumulated duration immediately:
//! the reset is strict, there is no decay or hysteresis.

use std::time::Duration;
use tokio::time::Instant;

/// Default continuous abnormal duration required for confirmation
pub const DEFAULT_CONFIRM_THRESHOLD: Duration = Duration::from_secs(3 * 60);

/// Snapshot of the tracker after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbnormalState {
    /// Verdict of the latest update
    pub is_abnormal: bool,
    /// When the current abnormal run started
    pub started_at: Option<Instant>,
    /// How long the current run has lasted (zero when not abnormal)
    pub duration: Duration,
    /// Whether the run has reached the confirmation threshold
    pub confirmed: bool,
}

impl AbnormalState {
    /// Duration of the current run in milliseconds
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Tracks how long the abnormal condition has been continuously true
#[derive(Debug, Clone)]
pub struct AbnormalityTracker {
    threshold: Duration,
    started_at: Option<Instant>,
    last_verdict: bool,
}

impl AbnormalityTracker {
    /// Create a tracker with the given confirmation threshold
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            started_at: None,
            last_verdict: false,
        }
    }

    /// Confirmation threshold
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Feed one verdict observed at `now`.
    ///
    /// - abnormal, no run recorded: the run starts at `now`
    /// - abnormal, run in progress: the start is kept
    /// - normal: the run is cleared
    pub fn update(&mut self, is_abnormal: bool, now: Instant) -> AbnormalState {
        if is_abnormal {
            if self.started_at.is_none() {
                self.started_at = Some(now);
            }
        } else {
            self.started_at = None;
        }
        self.last_verdict = is_abnormal;

        self.state(now)
    }

    /// Current state evaluated at `now` without feeding a verdict
    pub fn state(&self, now: Instant) -> AbnormalState {
        let duration = self
            .started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO);

        AbnormalState {
            is_abnormal: self.last_verdict,
            started_at: self.started_at,
            duration,
            confirmed: self.started_at.is_some() && duration >= self.threshold,
        }
    }

    /// Clear any accumulated abnormal run
    pub fn reset(&mut self) {
        self.started_at = None;
        self.last_verdict = false;
    }
}

impl Default for AbnormalityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRM_THRESHOLD)
    }
}
