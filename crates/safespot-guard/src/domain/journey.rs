//! Journey points posted while journey recording is enabled.

use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use serde::Serialize;

use super::sample::{GeoPoint, LocationFix};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// JSON body of `POST /api/journey/point`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyPoint {
    /// Owner of the journey
    pub user_id: String,
    /// Calendar day the point belongs to (`YYYY-MM-DD`, device local time)
    pub date_key: String,
    /// RFC 3339 timestamp of the fix
    pub ts: String,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
    /// Speed in m/s
    pub speed: f64,
    /// Accuracy radius in meters (0 when unknown)
    pub accuracy: f64,
}

impl JourneyPoint {
    /// Build a point from a fix, keyed by the device's local calendar day
    pub fn from_fix(user_id: &str, fix: &LocationFix) -> Self {
        Self::from_fix_in(user_id, fix, &Local)
    }

    /// Build a point keyed by the calendar day in `tz`
    pub fn from_fix_in<Tz: TimeZone>(user_id: &str, fix: &LocationFix, tz: &Tz) -> Self {
        Self {
            user_id: user_id.to_string(),
            date_key: date_key(&fix.captured_at, tz),
            ts: fix.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            lat: fix.point.latitude,
            lng: fix.point.longitude,
            speed: fix.speed_mps,
            accuracy: fix.accuracy_m.unwrap_or(0.0),
        }
    }
}

fn date_key<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> String {
    ts.with_timezone(tz).date_naive().format("%Y-%m-%d").to_string()
}

/// Great-circle distance between two points in meters
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_carries_date_key_and_timestamp() {
        let captured_at = Utc.with_ymd_and_hms(2024, 3, 7, 10, 15, 0).unwrap();
        let fix = LocationFix {
            point: GeoPoint::new(9.94, 78.12),
            speed_mps: 1.2,
            accuracy_m: None,
            captured_at,
        };

        let point = JourneyPoint::from_fix_in("Swetha_01", &fix, &Utc);
        assert_eq!(point.date_key, "2024-03-07");
        assert_eq!(point.ts, "2024-03-07T10:15:00.000Z");
        assert_eq!(point.accuracy, 0.0);

        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["userId"], "Swetha_01");
        assert_eq!(json["dateKey"], "2024-03-07");
        assert_eq!(json["lat"], 9.94);
        assert_eq!(json["lng"], 78.12);
    }

    #[test]
    fn haversine_matches_known_distance() {
        // One thousandth of a degree of latitude is roughly 111 m.
        let a = GeoPoint::new(9.940, 78.12);
        let b = GeoPoint::new(9.941, 78.12);
        let d = haversine_m(a, b);
        assert!((d - 111.19).abs() < 0.5, "distance was {d}");

        assert_eq!(haversine_m(a, a), 0.0);
    }
}
