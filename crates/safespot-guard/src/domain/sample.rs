//! Motion samples composed once per tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Geographic position in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are finite and within range
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for GeoPoint {
    /// Shortest round-trip formatting, `lat,lng`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// One location read from the location collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    /// Position
    pub point: GeoPoint,
    /// Ground speed in m/s (0 when the platform does not report it)
    pub speed_mps: f64,
    /// Horizontal accuracy radius in meters, if reported
    pub accuracy_m: Option<f64>,
    /// Wall-clock time of the fix
    pub captured_at: DateTime<Utc>,
}

impl LocationFix {
    /// Create a fix captured now with no speed or accuracy information
    pub fn at(point: GeoPoint) -> Self {
        Self {
            point,
            speed_mps: 0.0,
            accuracy_m: None,
            captured_at: Utc::now(),
        }
    }

    /// Set the reported speed (`None` maps to 0)
    pub fn with_speed(mut self, speed_mps: Option<f64>) -> Self {
        self.speed_mps = speed_mps.filter(|s| s.is_finite()).unwrap_or(0.0);
        self
    }

    /// Set the reported accuracy
    pub fn with_accuracy(mut self, accuracy_m: Option<f64>) -> Self {
        self.accuracy_m = accuracy_m;
        self
    }
}

/// Three raw sensor axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    /// X axis
    pub x: f64,
    /// Y axis
    pub y: f64,
    /// Z axis
    pub z: f64,
}

impl Vector3 {
    /// Create a vector
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Last-known value of one sensor together with how old it was when read
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    /// Raw axes (zeros if the sensor never reported)
    pub value: Vector3,
    /// Age of the reading at sample time; `None` if never received
    pub age: Option<Duration>,
}

impl SensorReading {
    /// A reading that has never been received
    pub fn missing() -> Self {
        Self::default()
    }

    /// Whether the reading is older than `bound` (missing counts as stale)
    pub fn is_stale(&self, bound: Duration) -> bool {
        self.age.map_or(true, |age| age > bound)
    }
}

/// One reading cycle: location plus most recent motion sensor values.
///
/// Created fresh each tick, sent once, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    /// Wall-clock time the sample was composed
    pub captured_at: DateTime<Utc>,
    /// Location fix read this tick
    pub location: LocationFix,
    /// Accelerometer axes
    pub acceleration: SensorReading,
    /// Gyroscope axes
    pub angular_velocity: SensorReading,
}

impl MotionSample {
    /// Flattened wire body sent to the classification endpoint
    pub fn to_payload<'a>(&self, user_id: &'a str) -> SamplePayload<'a> {
        let accel = self.acceleration.value;
        let gyro = self.angular_velocity.value;

        SamplePayload {
            user_id,
            latitude: self.location.point.latitude,
            longitude: self.location.point.longitude,
            speed: self.location.speed_mps,
            accel_x: accel.x,
            accel_y: accel.y,
            accel_z: accel.z,
            gyro_x: gyro.x,
            gyro_y: gyro.y,
            gyro_z: gyro.z,
            accel_age_ms: self.acceleration.age.map(duration_ms),
            gyro_age_ms: self.angular_velocity.age.map(duration_ms),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// JSON body of `POST /api/history`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePayload<'a> {
    /// Owner of the sample
    pub user_id: &'a str,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Speed in m/s
    pub speed: f64,
    /// Accelerometer X
    pub accel_x: f64,
    /// Accelerometer Y
    pub accel_y: f64,
    /// Accelerometer Z
    pub accel_z: f64,
    /// Gyroscope X
    pub gyro_x: f64,
    /// Gyroscope Y
    pub gyro_y: f64,
    /// Gyroscope Z
    pub gyro_z: f64,
    /// Accelerometer reading age in ms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accel_age_ms: Option<u64>,
    /// Gyroscope reading age in ms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gyro_age_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MotionSample {
        MotionSample {
            captured_at: Utc::now(),
            location: LocationFix::at(GeoPoint::new(9.94, 78.12)).with_speed(Some(0.5)),
            acceleration: SensorReading {
                value: Vector3::new(5.0, 3.0, 2.0),
                age: Some(Duration::from_millis(120)),
            },
            angular_velocity: SensorReading::missing(),
        }
    }

    #[test]
    fn payload_uses_flattened_backend_names() {
        let json = serde_json::to_value(sample().to_payload("Swetha_01")).unwrap();

        assert_eq!(json["userId"], "Swetha_01");
        assert_eq!(json["latitude"], 9.94);
        assert_eq!(json["longitude"], 78.12);
        assert_eq!(json["speed"], 0.5);
        assert_eq!(json["accelX"], 5.0);
        assert_eq!(json["accelZ"], 2.0);
        assert_eq!(json["gyroY"], 0.0);
        assert_eq!(json["accelAgeMs"], 120);
        assert!(json.get("gyroAgeMs").is_none());
    }

    #[test]
    fn missing_speed_defaults_to_zero() {
        let fix = LocationFix::at(GeoPoint::new(0.0, 0.0)).with_speed(None);
        assert_eq!(fix.speed_mps, 0.0);

        let fix = fix.with_speed(Some(f64::NAN));
        assert_eq!(fix.speed_mps, 0.0);
    }

    #[test]
    fn missing_reading_is_stale() {
        let bound = Duration::from_secs(5);
        assert!(SensorReading::missing().is_stale(bound));

        let fresh = SensorReading {
            value: Vector3::default(),
            age: Some(Duration::from_secs(1)),
        };
        assert!(!fresh.is_stale(bound));
    }

    #[test]
    fn geo_point_display_keeps_precision() {
        assert_eq!(GeoPoint::new(9.94, 78.12).to_string(), "9.94,78.12");
        assert_eq!(GeoPoint::new(-33.8688, 151.2093).to_string(), "-33.8688,151.2093");
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
    }
}
