//! Last-known motion sensor values.
//!
//! Sensor listeners write asynchronously and independently of the tick; the
//! tick reads whatever is cached. Each field has a single writer.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::domain::{SensorReading, Vector3};

/// Which motion sensor a reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// Accelerometer
    Accelerometer,
    /// Gyroscope
    Gyroscope,
}

#[derive(Debug, Clone, Copy)]
struct Cached {
    value: Vector3,
    at: Instant,
}

/// Readings of both sensors at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    /// Accelerometer reading
    pub acceleration: SensorReading,
    /// Gyroscope reading
    pub angular_velocity: SensorReading,
}

impl SensorSnapshot {
    /// Whether either reading is missing or older than `bound`
    pub fn has_stale(&self, bound: Duration) -> bool {
        self.acceleration.is_stale(bound) || self.angular_velocity.is_stale(bound)
    }
}

/// Shared last-known-value cache for the motion sensors.
///
/// Readings recorded without an explicit instant are stamped by the cache's
/// clock, the same one the monitor ages them against.
pub struct SensorCache {
    clock: Arc<dyn Clock>,
    accel: RwLock<Option<Cached>>,
    gyro: RwLock<Option<Cached>>,
}

impl SensorCache {
    /// Create an empty cache on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty cache stamping readings with `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            accel: RwLock::new(None),
            gyro: RwLock::new(None),
        }
    }

    /// Record a reading observed at `at`
    pub fn record(&self, kind: SensorKind, value: Vector3, at: Instant) {
        let slot = match kind {
            SensorKind::Accelerometer => &self.accel,
            SensorKind::Gyroscope => &self.gyro,
        };
        *slot.write() = Some(Cached { value, at });
    }

    /// Record an accelerometer reading observed now
    pub fn record_acceleration(&self, value: Vector3) {
        self.record(SensorKind::Accelerometer, value, self.clock.now());
    }

    /// Record a gyroscope reading observed now
    pub fn record_angular_velocity(&self, value: Vector3) {
        self.record(SensorKind::Gyroscope, value, self.clock.now());
    }

    /// Read both sensors, aging each reading relative to `now`
    pub fn snapshot(&self, now: Instant) -> SensorSnapshot {
        SensorSnapshot {
            acceleration: read(&self.accel, now),
            angular_velocity: read(&self.gyro, now),
        }
    }

    /// Forget all readings
    pub fn clear(&self) {
        *self.accel.write() = None;
        *self.gyro.write() = None;
    }
}

impl Default for SensorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SensorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorCache")
            .field("accel", &self.accel)
            .field("gyro", &self.gyro)
            .finish_non_exhaustive()
    }
}

fn read(slot: &RwLock<Option<Cached>>, now: Instant) -> SensorReading {
    match *slot.read() {
        Some(cached) => SensorReading {
            value: cached.value,
            age: Some(now.saturating_duration_since(cached.at)),
        },
        None => SensorReading::missing(),
    }
}

/// Handle on a running sensor listener.
///
/// Dropping the subscription detaches the listener.
#[derive(Debug)]
pub struct SensorSubscription {
    name: String,
    task: Option<JoinHandle<()>>,
}

impl SensorSubscription {
    /// Wrap a listener task
    pub fn new(name: impl Into<String>, task: JoinHandle<()>) -> Self {
        Self {
            name: name.into(),
            task: Some(task),
        }
    }

    /// Subscription for a feed that pushes from outside tokio (platform callbacks)
    pub fn external(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task: None,
        }
    }

    /// Listener name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the listener task is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Stop the listener
    pub fn detach(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(feed = %self.name, "Sensor listener detached");
        }
    }
}

impl Drop for SensorSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn empty_cache_reports_missing_readings() {
        let cache = SensorCache::new();
        let snapshot = cache.snapshot(Instant::now());

        assert_eq!(snapshot.acceleration, SensorReading::missing());
        assert_eq!(snapshot.angular_velocity.value, Vector3::default());
        assert!(snapshot.has_stale(Duration::from_secs(5)));
    }

    #[test]
    fn snapshot_ages_each_sensor_independently() {
        let cache = SensorCache::new();
        let t0 = Instant::now();

        cache.record(SensorKind::Accelerometer, Vector3::new(0.1, 0.2, 9.8), t0);
        cache.record(
            SensorKind::Gyroscope,
            Vector3::new(0.0, 0.5, 0.0),
            t0 + Duration::from_millis(400),
        );

        let snapshot = cache.snapshot(t0 + Duration::from_millis(1_000));
        assert_eq!(snapshot.acceleration.value.z, 9.8);
        assert_eq!(snapshot.acceleration.age, Some(Duration::from_millis(1_000)));
        assert_eq!(snapshot.angular_velocity.age, Some(Duration::from_millis(600)));
        assert!(!snapshot.has_stale(Duration::from_secs(5)));

        cache.clear();
        assert!(cache.snapshot(t0).acceleration.age.is_none());
    }

    #[test]
    fn readings_are_stamped_by_the_cache_clock() {
        let clock = Arc::new(ManualClock::new());
        let cache = SensorCache::with_clock(clock.clone());

        cache.record_acceleration(Vector3::new(0.0, 0.0, 9.8));
        clock.advance(Duration::from_secs(3));
        cache.record_angular_velocity(Vector3::new(0.1, 0.0, 0.0));
        clock.advance(Duration::from_secs(1));

        let snapshot = cache.snapshot(clock.now());
        assert_eq!(snapshot.acceleration.age, Some(Duration::from_secs(4)));
        assert_eq!(snapshot.angular_velocity.age, Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn detach_stops_listener() {
        let task = tokio::spawn(async {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });
        let subscription = SensorSubscription::new("test", task);
        assert!(subscription.is_active());
        assert_eq!(subscription.name(), "test");

        subscription.detach();
    }
}
