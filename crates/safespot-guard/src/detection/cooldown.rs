//! Cooldown gate around the escalation action.
//!
//! The gate is a single flag plus the deadline at which it reopens. A
//! trigger arriving while the flag is set is dropped, not queued. The
//! deadline is read through the injected [`Clock`], so the gate and the
//! abnormality tracker share one time base. A timer task owned by the gate
//! reopens it on time; if that task is cancelled the gate still reopens
//! lazily the first time it is consulted after the deadline.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::clock::{Clock, SystemClock};

/// Default suppression window after an escalation
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3 * 60);

/// Suppresses repeat escalations within a fixed window
pub struct CooldownGate {
    window: Duration,
    clock: Arc<dyn Clock>,
    active: Arc<AtomicBool>,
    cooling_until: Arc<Mutex<Option<Instant>>>,
    reset_task: Mutex<Option<JoinHandle<()>>>,
}

impl CooldownGate {
    /// Create an open gate on the system clock
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    /// Create an open gate whose deadline is measured on `clock`
    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            active: Arc::new(AtomicBool::new(false)),
            cooling_until: Arc::new(Mutex::new(None)),
            reset_task: Mutex::new(None),
        }
    }

    /// Suppression window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether triggers are currently suppressed
    pub fn is_cooling_down(&self) -> bool {
        let mut until = self.cooling_until.lock();
        reopen_if_elapsed(&self.active, &mut until, self.clock.now());
        self.active.load(Ordering::SeqCst)
    }

    /// Time left before the gate reopens, if it is closed
    pub fn remaining(&self) -> Option<Duration> {
        let now = self.clock.now();
        let mut until = self.cooling_until.lock();
        reopen_if_elapsed(&self.active, &mut until, now);
        until.map(|until| until.saturating_duration_since(now))
    }

    /// Run `action` unless the gate is cooling down.
    ///
    /// On success the action is spawned fire-and-forget (a failure or panic
    /// inside it stays in its own task), the gate closes, and a reset timer
    /// reopens it after the window. Returns `false` without running the
    /// action while closed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn try_trigger<F>(&self, action: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let now = self.clock.now();
        let deadline = now + self.window;
        {
            let mut until = self.cooling_until.lock();
            reopen_if_elapsed(&self.active, &mut until, now);
            if self
                .active
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                let remaining = until.map(|until| until.saturating_duration_since(now));
                drop(until);
                tracing::debug!(?remaining, "Trigger suppressed by cooldown");
                return false;
            }
            *until = Some(deadline);
        }

        tokio::spawn(action);
        self.arm_reset(deadline, self.window);

        tracing::info!(window_secs = self.window.as_secs(), "Escalation triggered, cooldown started");
        true
    }

    /// Cancel the pending reset timer.
    ///
    /// The deadline stays in force: the gate keeps suppressing triggers
    /// until it has passed, then reopens on the next check.
    pub fn shutdown(&self) {
        if let Some(handle) = self.reset_task.lock().take() {
            handle.abort();
        }
        if let Some(remaining) = self.remaining() {
            tracing::debug!(?remaining, "Cooldown timer cancelled, deadline kept");
        }
    }

    /// Re-arm the reset timer for a gate still inside its window
    pub fn resume(&self) {
        let deadline = *self.cooling_until.lock();
        if let (Some(deadline), Some(remaining)) = (deadline, self.remaining()) {
            self.arm_reset(deadline, remaining);
        }
    }

    fn arm_reset(&self, deadline: Instant, after: Duration) {
        let active = Arc::clone(&self.active);
        let cooling_until = Arc::clone(&self.cooling_until);
        let clock = Arc::clone(&self.clock);
        let window = self.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let mut until = cooling_until.lock();
            if *until == Some(deadline) && reopen_if_elapsed(&active, &mut until, clock.now()) {
                tracing::info!(window_secs = window.as_secs(), "Escalation cooldown elapsed");
            }
        });

        if let Some(previous) = self.reset_task.lock().replace(handle) {
            previous.abort();
        }
    }
}

/// Open the gate if its deadline has passed. Returns whether it reopened.
fn reopen_if_elapsed(active: &AtomicBool, until: &mut Option<Instant>, now: Instant) -> bool {
    match *until {
        Some(deadline) if now >= deadline => {
            *until = None;
            active.store(false, Ordering::SeqCst);
            true
        }
        _ => false,
    }
}

impl std::fmt::Debug for CooldownGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownGate")
            .field("window", &self.window)
            .field("active", &self.active)
            .field("cooling_until", &self.cooling_until)
            .finish_non_exhaustive()
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl Drop for CooldownGate {
    fn drop(&mut self) {
        if let Some(handle) = self.reset_task.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::AtomicUsize;

    const WINDOW: Duration = Duration::from_secs(180);

    fn counting_action(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_trigger_within_window_is_dropped() {
        let gate = CooldownGate::new(WINDOW);
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(gate.try_trigger(counting_action(&calls)));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!gate.try_trigger(counting_action(&calls)));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(gate.is_cooling_down());
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_after_window_runs_again() {
        let gate = CooldownGate::new(WINDOW);
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(gate.try_trigger(counting_action(&calls)));
        tokio::time::sleep(WINDOW + Duration::from_millis(1)).await;
        assert!(!gate.is_cooling_down());

        assert!(gate.try_trigger(counting_action(&calls)));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn every_call_during_cooldown_returns_false() {
        let gate = CooldownGate::new(WINDOW);
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(gate.try_trigger(counting_action(&calls)));
        for _ in 0..30 {
            tokio::time::sleep(Duration::from_secs(2)).await;
            assert!(!gate.try_trigger(counting_action(&calls)));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let remaining = gate.remaining().unwrap();
        assert!(remaining <= WINDOW - Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_action_does_not_break_the_gate() {
        let gate = CooldownGate::new(Duration::from_secs(1));

        assert!(gate.try_trigger(async { panic!("delivery exploded") }));
        tokio::time::sleep(Duration::from_secs(2)).await;

        let calls = Arc::new(AtomicUsize::new(0));
        assert!(gate.try_trigger(counting_action(&calls)));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_timer_but_keeps_deadline() {
        let gate = CooldownGate::new(WINDOW);
        let calls = Arc::new(AtomicUsize::new(0));
        assert!(gate.try_trigger(counting_action(&calls)));

        gate.shutdown();
        assert!(gate.reset_task.lock().is_none());
        assert!(gate.is_cooling_down());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!gate.try_trigger(counting_action(&calls)));
        assert!(gate.remaining().unwrap() <= WINDOW - Duration::from_secs(60));

        // no timer is left, the deadline alone reopens the gate
        tokio::time::sleep(WINDOW).await;
        assert!(!gate.is_cooling_down());
        assert!(gate.try_trigger(counting_action(&calls)));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_rearms_the_reset_timer() {
        let gate = CooldownGate::new(WINDOW);
        assert!(gate.try_trigger(async {}));
        gate.shutdown();

        tokio::time::sleep(Duration::from_secs(100)).await;
        gate.resume();
        assert!(gate.reset_task.lock().is_some());

        tokio::time::sleep(Duration::from_secs(81)).await;
        assert!(!gate.active.load(Ordering::SeqCst));
        assert!(gate.cooling_until.lock().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_clock_drives_the_deadline() {
        let clock = Arc::new(ManualClock::new());
        let gate = CooldownGate::with_clock(WINDOW, clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(gate.try_trigger(counting_action(&calls)));
        clock.advance(WINDOW - Duration::from_secs(1));
        assert!(!gate.try_trigger(counting_action(&calls)));

        clock.advance(Duration::from_secs(1));
        assert!(gate.try_trigger(counting_action(&calls)));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
