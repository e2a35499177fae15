//! Stand-ins for device sensors when running off-device.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{LocationProvider, MotionFeed, SensorCache, SensorSubscription};
use crate::domain::{GeoPoint, LocationFix, Vector3};
use crate::{GuardError, Permission, Result};

/// Sensor update interval used by the mobile client
pub const DEFAULT_SENSOR_INTERVAL: Duration = Duration::from_millis(500);

const GRAVITY: f64 = 9.81;

/// Location provider that always reports the same position
#[derive(Debug, Clone)]
pub struct FixedLocation {
    point: GeoPoint,
    speed_mps: Option<f64>,
    accuracy_m: Option<f64>,
    permission_granted: bool,
}

impl FixedLocation {
    /// Report `point` on every read
    pub fn new(point: GeoPoint) -> Self {
        Self {
            point,
            speed_mps: None,
            accuracy_m: Some(15.0),
            permission_granted: true,
        }
    }

    /// Report a constant speed
    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    /// Simulate the user refusing location permission
    pub fn denied(mut self) -> Self {
        self.permission_granted = false;
        self
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> Result<()> {
        if self.permission_granted {
            Ok(())
        } else {
            Err(GuardError::PermissionDenied(Permission::Location))
        }
    }

    async fn current_fix(&self) -> Result<LocationFix> {
        if !self.permission_granted {
            return Err(GuardError::PermissionDenied(Permission::Location));
        }
        Ok(LocationFix::at(self.point)
            .with_speed(self.speed_mps)
            .with_accuracy(self.accuracy_m))
    }
}

/// Shape of the synthetic motion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionPattern {
    /// Device lying flat
    #[default]
    Still,
    /// Gentle periodic sway
    Walking,
    /// Large alternating spikes on every axis
    Shaking,
}

impl MotionPattern {
    /// Accelerometer and gyroscope values for update `step`
    pub fn sample(&self, step: u64) -> (Vector3, Vector3) {
        let phase = step as f64 * 0.5;
        match self {
            MotionPattern::Still => (Vector3::new(0.0, 0.0, GRAVITY), Vector3::default()),
            MotionPattern::Walking => (
                Vector3::new(0.8 * phase.sin(), 0.4 * phase.cos(), GRAVITY + 1.2 * (2.0 * phase).sin()),
                Vector3::new(0.1 * phase.cos(), 0.2 * phase.sin(), 0.05),
            ),
            MotionPattern::Shaking => {
                let sign = if step % 2 == 0 { 1.0 } else { -1.0 };
                (
                    Vector3::new(18.0 * sign, -14.0 * sign, GRAVITY + 20.0 * sign),
                    Vector3::new(4.0 * sign, 3.5 * sign, -5.0 * sign),
                )
            }
        }
    }
}

/// Motion feed that generates a synthetic pattern at a fixed rate
#[derive(Debug, Clone)]
pub struct SimulatedMotionFeed {
    pattern: MotionPattern,
    interval: Duration,
}

impl SimulatedMotionFeed {
    /// Generate `pattern` at the default 500 ms update rate
    pub fn new(pattern: MotionPattern) -> Self {
        Self {
            pattern,
            interval: DEFAULT_SENSOR_INTERVAL,
        }
    }

    /// Override the update interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl MotionFeed for SimulatedMotionFeed {
    fn name(&self) -> &str {
        "simulated"
    }

    fn attach(&self, cache: Arc<SensorCache>) -> Result<SensorSubscription> {
        if self.interval.is_zero() {
            return Err(GuardError::Sensor("sensor update interval must be > 0".into()));
        }

        let pattern = self.pattern;
        let interval = self.interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut step = 0u64;
            loop {
                ticker.tick().await;
                let (accel, gyro) = pattern.sample(step);
                cache.record_acceleration(accel);
                cache.record_angular_velocity(gyro);
                step = step.wrapping_add(1);
            }
        });

        tracing::debug!(pattern = ?self.pattern, interval_ms = interval.as_millis() as u64, "Simulated motion feed attached");
        Ok(SensorSubscription::new(self.name(), task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn fixed_location_respects_permission() {
        let provider = FixedLocation::new(GeoPoint::new(9.94, 78.12)).with_speed(1.5);
        provider.request_permission().await.unwrap();
        let fix = provider.current_fix().await.unwrap();
        assert_eq!(fix.point, GeoPoint::new(9.94, 78.12));
        assert_eq!(fix.speed_mps, 1.5);

        let denied = provider.denied();
        assert!(matches!(
            denied.request_permission().await,
            Err(GuardError::PermissionDenied(Permission::Location))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_feed_fills_cache_until_detached() {
        let cache = Arc::new(SensorCache::new());
        let feed = SimulatedMotionFeed::new(MotionPattern::Shaking);

        let subscription = feed.attach(Arc::clone(&cache)).unwrap();
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let snapshot = cache.snapshot(Instant::now());
        assert!(snapshot.acceleration.value.magnitude() > 20.0);
        assert!(snapshot.acceleration.age.unwrap() <= Duration::from_millis(500));

        subscription.detach();
        cache.clear();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(cache.snapshot(Instant::now()).acceleration.age.is_none());
    }

    #[test]
    fn still_pattern_reports_gravity_only() {
        let (accel, gyro) = MotionPattern::Still.sample(7);
        assert_eq!(accel, Vector3::new(0.0, 0.0, GRAVITY));
        assert_eq!(gyro.magnitude(), 0.0);
    }
}
