//! The sampling tick loop.
//!
//! Each tick: read location, snapshot the motion sensors, send the sample
//! for classification, update the abnormality tracker, and offer qualifying
//! state to the cooldown gate, which starts the escalation.
//!
//! Ticks are serialised. If a tick outlasts the interval the missed ticks
//! are skipped rather than queued, so at most one classification request is
//! in flight. Journey posts run beside the tick, never inside it. Any
//! failure inside a tick is logged and the tick is skipped; the loop itself
//! never stops on error.

mod journey;

pub use journey::JourneyRecorder;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::alerting::EscalationDispatcher;
use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;
use crate::detection::{AbnormalState, AbnormalityTracker, CooldownGate, MonitorPhase};
use crate::domain::{ClassificationResult, MotionSample};
use crate::integration::{
    ClassificationService, JourneySink, LocationProvider, MotionFeed, SensorCache, SensorSubscription,
};
use crate::Result;

/// Which abnormal state is offered to the cooldown gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationPolicy {
    /// Only confirmed (sustained) abnormal movement escalates
    #[default]
    Confirmed,
    /// Every abnormal verdict escalates
    Immediate,
}

/// Counters for the monitor's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    /// Ticks that completed
    pub ticks: u64,
    /// Ticks skipped because of an error
    pub skipped_ticks: u64,
    /// Abnormal verdicts received (including forced ones)
    pub abnormal_verdicts: u64,
    /// Escalations started
    pub escalations: u64,
    /// Triggers dropped by the cooldown
    pub suppressed_triggers: u64,
    /// Journey points recorded
    pub journey_points: u64,
}

/// Result of one completed tick
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// Sample that was sent
    pub sample: MotionSample,
    /// Verdict used (forced when the testing override is on)
    pub verdict: ClassificationResult,
    /// Tracker state after the update
    pub state: AbnormalState,
    /// Pipeline phase after the gate decision
    pub phase: MonitorPhase,
    /// Whether this tick started an escalation
    pub escalated: bool,
}

/// External collaborators wired into a monitor
pub struct Collaborators {
    /// Device location
    pub location: Arc<dyn LocationProvider>,
    /// Motion sensor listeners
    pub motion: Arc<dyn MotionFeed>,
    /// Remote classifier
    pub classifier: Arc<dyn ClassificationService>,
    /// SOS delivery
    pub dispatcher: Arc<EscalationDispatcher>,
    /// Journey point storage, used when journey recording is enabled
    pub journey: Option<Arc<dyn JourneySink>>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Wire the required collaborators with the system clock
    pub fn new(
        location: Arc<dyn LocationProvider>,
        motion: Arc<dyn MotionFeed>,
        classifier: Arc<dyn ClassificationService>,
        dispatcher: Arc<EscalationDispatcher>,
    ) -> Self {
        Self {
            location,
            motion,
            classifier,
            dispatcher,
            journey: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Add a journey sink
    pub fn with_journey(mut self, sink: Arc<dyn JourneySink>) -> Self {
        self.journey = Some(sink);
        self
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

struct MonitorCore {
    config: GuardConfig,
    clock: Arc<dyn Clock>,
    location: Arc<dyn LocationProvider>,
    motion: Arc<dyn MotionFeed>,
    classifier: Arc<dyn ClassificationService>,
    dispatcher: Arc<EscalationDispatcher>,
    sensors: Arc<SensorCache>,
    tracker: Mutex<AbnormalityTracker>,
    gate: CooldownGate,
    journey: Option<Arc<JourneyRecorder>>,
    stats: Mutex<MonitorStats>,
}

impl MonitorCore {
    async fn tick(&self) -> Result<TickOutcome> {
        let fix = self.location.current_fix().await?;

        let now = self.clock.now();
        if let Some(journey) = &self.journey {
            if journey.is_due(fix.point, now) && !journey.is_posting() {
                let journey = Arc::clone(journey);
                tokio::spawn(async move {
                    journey.observe(&fix, now).await;
                });
            }
        }

        let snapshot = self.sensors.snapshot(now);
        if snapshot.has_stale(self.config.max_sensor_staleness()) {
            tracing::debug!(
                accel_age = ?snapshot.acceleration.age,
                gyro_age = ?snapshot.angular_velocity.age,
                "Motion readings are stale"
            );
        }

        let sample = MotionSample {
            captured_at: fix.captured_at,
            location: fix,
            acceleration: snapshot.acceleration,
            angular_velocity: snapshot.angular_velocity,
        };

        let reported = self.classifier.classify(&sample).await?;
        let verdict = if self.config.force_abnormal {
            ClassificationResult::forced()
        } else {
            reported
        };

        let state = self.tracker.lock().update(verdict.is_abnormal, now);
        let offered = match self.config.escalation_policy {
            EscalationPolicy::Confirmed => state.confirmed,
            EscalationPolicy::Immediate => verdict.is_abnormal,
        };

        let escalated = offered && {
            let dispatcher = Arc::clone(&self.dispatcher);
            let point = sample.location.point;
            let reason = verdict.escalation_reason();
            self.gate.try_trigger(async move {
                let report = dispatcher.escalate(point, &reason).await;
                tracing::info!(
                    escalation = %report.id,
                    contacts = report.contacts,
                    sent = report.messages_sent,
                    failed = report.messages_failed,
                    called = report.called.is_some(),
                    "Escalation finished"
                );
            })
        };

        {
            let mut stats = self.stats.lock();
            stats.ticks += 1;
            if verdict.is_abnormal {
                stats.abnormal_verdicts += 1;
            }
            if escalated {
                stats.escalations += 1;
            } else if offered {
                stats.suppressed_triggers += 1;
            }
        }

        let phase = MonitorPhase::derive(&state, offered, escalated);
        tracing::debug!(
            intensity = %verdict.intensity,
            abnormal = verdict.is_abnormal,
            abnormal_ms = state.duration_ms(),
            %phase,
            "Tick complete"
        );

        Ok(TickOutcome {
            sample,
            verdict,
            state,
            phase,
            escalated,
        })
    }
}

async fn run_loop(core: Arc<MonitorCore>, mut shutdown_rx: mpsc::Receiver<()>) {
    let mut interval = tokio::time::interval(core.config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::debug!(interval_ms = core.config.tick_interval_ms, "Monitor loop started");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("Monitor shutdown requested");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = core.tick().await {
                    core.stats.lock().skipped_ticks += 1;
                    if e.is_transient() {
                        tracing::warn!(error = %e, "Tick skipped, retrying next tick");
                    } else {
                        tracing::error!(error = %e, "Tick failed");
                    }
                }
            }
        }
    }

    tracing::debug!("Monitor loop ended");
}

struct RunningLoop {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
    subscription: SensorSubscription,
}

/// Client-side sensing-and-escalation pipeline
pub struct SafetyMonitor {
    core: Arc<MonitorCore>,
    running: Option<RunningLoop>,
}

impl SafetyMonitor {
    /// Create a stopped monitor
    pub fn new(config: GuardConfig, collaborators: Collaborators) -> Self {
        let journey = match (&collaborators.journey, config.journey.enabled) {
            (Some(sink), true) => Some(Arc::new(JourneyRecorder::new(
                Arc::clone(sink),
                config.backend.user_id.clone(),
                config.journey.clone(),
            ))),
            _ => None,
        };

        let clock = collaborators.clock;
        let core = MonitorCore {
            location: collaborators.location,
            motion: collaborators.motion,
            classifier: collaborators.classifier,
            dispatcher: collaborators.dispatcher,
            sensors: Arc::new(SensorCache::with_clock(Arc::clone(&clock))),
            tracker: Mutex::new(AbnormalityTracker::new(config.confirm_threshold())),
            gate: CooldownGate::with_clock(config.cooldown(), Arc::clone(&clock)),
            journey,
            stats: Mutex::new(MonitorStats::default()),
            clock,
            config,
        };

        Self {
            core: Arc::new(core),
            running: None,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &GuardConfig {
        &self.core.config
    }

    /// Shared sensor cache (platform listeners may write into it directly)
    pub fn sensors(&self) -> Arc<SensorCache> {
        Arc::clone(&self.core.sensors)
    }

    /// Run one full cycle immediately.
    ///
    /// Errors are returned to the caller; the background loop logs and
    /// skips them instead.
    pub async fn tick(&self) -> Result<TickOutcome> {
        self.core.tick().await
    }

    /// Start sampling in the background.
    ///
    /// Fails with [`crate::GuardError::Config`] when the configuration does
    /// not validate, and with [`crate::GuardError::PermissionDenied`] when
    /// location permission is refused; nothing is started in either case.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        self.core.config.validate()?;
        self.core.location.request_permission().await?;
        let subscription = self.core.motion.attach(Arc::clone(&self.core.sensors))?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(run_loop(Arc::clone(&self.core), shutdown_rx));
        self.core.gate.resume();

        tracing::info!(
            user_id = %self.core.config.backend.user_id,
            feed = self.core.motion.name(),
            interval_ms = self.core.config.tick_interval_ms,
            force_abnormal = self.core.config.force_abnormal,
            "Safety monitor started"
        );

        self.running = Some(RunningLoop {
            shutdown_tx,
            task,
            subscription,
        });
        Ok(())
    }

    /// Stop sampling, detach sensor listeners and cancel the cooldown timer.
    ///
    /// The abnormal run is discarded, since no samples are taken while
    /// stopped. A cooldown in progress keeps its deadline, so restarting
    /// inside the window cannot escalate again.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown_tx.send(()).await;
        let mut task = running.task;
        if tokio::time::timeout(self.core.config.tick_interval(), &mut task)
            .await
            .is_err()
        {
            tracing::warn!("Tick still in flight at shutdown, aborting");
            task.abort();
        }

        running.subscription.detach();
        self.core.sensors.clear();
        self.core.tracker.lock().reset();
        self.core.gate.shutdown();

        tracing::info!(stats = ?self.stats(), "Safety monitor stopped");
    }

    /// Whether the background loop is running
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map_or(false, |r| !r.task.is_finished())
    }

    /// Whether escalations are currently suppressed
    pub fn is_cooling_down(&self) -> bool {
        self.core.gate.is_cooling_down()
    }

    /// Current abnormality state
    pub fn abnormal_state(&self) -> AbnormalState {
        self.core.tracker.lock().state(self.core.clock.now())
    }

    /// Clear the abnormal run (manual "I'm OK")
    pub fn reset_abnormal(&self) {
        self.core.tracker.lock().reset();
        tracing::info!("Abnormal state reset");
    }

    /// Lifetime counters
    pub fn stats(&self) -> MonitorStats {
        let mut stats = *self.core.stats.lock();
        if let Some(journey) = &self.core.journey {
            stats.journey_points = journey.recorded();
        }
        stats
    }
}

impl Drop for SafetyMonitor {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EscalationPolicy::Immediate).unwrap(), "\"immediate\"");
        let policy: EscalationPolicy = serde_json::from_str("\"confirmed\"").unwrap();
        assert_eq!(policy, EscalationPolicy::default());
    }

    #[test]
    fn stats_start_at_zero() {
        let stats = MonitorStats::default();
        assert_eq!(stats.ticks + stats.skipped_ticks + stats.escalations, 0);
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["suppressed_triggers"], 0);
    }
}
