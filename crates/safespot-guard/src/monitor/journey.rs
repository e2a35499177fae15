//! Journey point recording alongside the monitor tick.
//!
//! The monitor runs each post in its own task so a slow journey endpoint
//! never holds up classification. At most one post is in flight; fixes that
//! arrive meanwhile are skipped and the next due fix is posted instead.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::JourneyConfig;
use crate::domain::{haversine_m, GeoPoint, JourneyPoint, LocationFix};
use crate::integration::JourneySink;

/// Posts a journey point when enough time has passed or the device moved far enough
pub struct JourneyRecorder {
    sink: Arc<dyn JourneySink>,
    user_id: String,
    config: JourneyConfig,
    last: Mutex<Option<(Instant, GeoPoint)>>,
    in_flight: AtomicBool,
    recorded: AtomicU64,
}

/// Clears the in-flight flag even if the post is cancelled
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl JourneyRecorder {
    /// Create a recorder posting points for `user_id`
    pub fn new(sink: Arc<dyn JourneySink>, user_id: impl Into<String>, config: JourneyConfig) -> Self {
        Self {
            sink,
            user_id: user_id.into(),
            config,
            last: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            recorded: AtomicU64::new(0),
        }
    }

    /// Whether a fix at `point` observed at `now` should be posted
    pub fn is_due(&self, point: GeoPoint, now: Instant) -> bool {
        match *self.last.lock() {
            None => true,
            Some((at, last_point)) => {
                now.saturating_duration_since(at) >= self.config.min_interval()
                    || haversine_m(last_point, point) >= self.config.min_distance_m
            }
        }
    }

    /// Points successfully posted so far
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::SeqCst)
    }

    /// Whether a post is currently waiting on the sink
    pub fn is_posting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Post `fix` if due. Returns whether a point was recorded.
    ///
    /// Returns `false` straight away while another post is in flight. A
    /// failed post leaves the recorder due so the next tick retries.
    pub async fn observe(&self, fix: &LocationFix, now: Instant) -> bool {
        if !self.is_due(fix.point, now) {
            return false;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::trace!("Journey post already in flight");
            return false;
        }
        let _in_flight = InFlight(&self.in_flight);

        let point = JourneyPoint::from_fix(&self.user_id, fix);
        match self.sink.record(&point).await {
            Ok(()) => {
                *self.last.lock() = Some((now, fix.point));
                self.recorded.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(date_key = %point.date_key, lat = point.lat, lng = point.lng, "Journey point recorded");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Journey point not recorded");
                false
            }
        }
    }

    /// Forget the last posted point
    pub fn reset(&self) {
        *self.last.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GuardError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingSink {
        fail: AtomicBool,
        delay: Mutex<Duration>,
        count: AtomicUsize,
    }

    #[async_trait]
    impl JourneySink for CountingSink {
        async fn record(&self, _point: &JourneyPoint) -> Result<()> {
            let delay = *self.delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(GuardError::Backend {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fix(lat: f64) -> LocationFix {
        LocationFix::at(GeoPoint::new(lat, 78.12))
    }

    #[tokio::test]
    async fn records_first_then_waits_for_interval() {
        let sink = Arc::new(CountingSink::default());
        let recorder = JourneyRecorder::new(sink.clone(), "u", JourneyConfig::default());
        let t0 = Instant::now();

        assert!(recorder.observe(&fix(9.94), t0).await);
        assert!(!recorder.observe(&fix(9.94), t0 + Duration::from_secs(2)).await);
        assert!(recorder.observe(&fix(9.94), t0 + Duration::from_secs(10)).await);
        assert_eq!(sink.count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn movement_forces_a_point() {
        let sink = Arc::new(CountingSink::default());
        let recorder = JourneyRecorder::new(sink.clone(), "u", JourneyConfig::default());
        let t0 = Instant::now();

        assert!(recorder.observe(&fix(9.9400), t0).await);
        // ~22 m north
        assert!(recorder.observe(&fix(9.9402), t0 + Duration::from_secs(2)).await);
        assert_eq!(sink.count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_post_is_retried_next_tick() {
        let sink = Arc::new(CountingSink::default());
        sink.fail.store(true, Ordering::SeqCst);
        let recorder = JourneyRecorder::new(sink.clone(), "u", JourneyConfig::default());
        let t0 = Instant::now();

        assert!(!recorder.observe(&fix(9.94), t0).await);
        assert!(recorder.is_due(GeoPoint::new(9.94, 78.12), t0 + Duration::from_secs(2)));

        sink.fail.store(false, Ordering::SeqCst);
        assert!(recorder.observe(&fix(9.94), t0 + Duration::from_secs(2)).await);

        recorder.reset();
        assert!(recorder.is_due(GeoPoint::new(9.94, 78.12), t0 + Duration::from_secs(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_posts_are_skipped() {
        let sink = Arc::new(CountingSink::default());
        *sink.delay.lock() = Duration::from_secs(10);
        let recorder = Arc::new(JourneyRecorder::new(sink.clone(), "u", JourneyConfig::default()));
        let t0 = Instant::now();

        let first = tokio::spawn({
            let recorder = Arc::clone(&recorder);
            async move { recorder.observe(&fix(9.94), t0).await }
        });
        tokio::task::yield_now().await;
        assert!(recorder.is_posting());

        // ~220 m away, due by distance, but the first post is still waiting
        assert!(!recorder.observe(&fix(9.942), t0 + Duration::from_secs(2)).await);

        assert!(first.await.unwrap());
        assert!(!recorder.is_posting());
        assert_eq!(recorder.recorded(), 1);
        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
    }
}
