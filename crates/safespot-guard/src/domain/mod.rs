//! Domain types for the sensing-and-escalation pipeline.
//!
//! Everything here is plain data: samples composed each tick, verdicts
//! returned by the classification service, trusted contacts fetched from the
//! contacts service and journey points.

pub mod classification;
pub mod contact;
pub mod journey;
pub mod sample;

pub use classification::{ClassificationResult, FORCED_INTENSITY};
pub use contact::{normalize_contacts, RawContact, TrustedContact, DEFAULT_CONTACT_NAME};
pub use journey::{haversine_m, JourneyPoint};
pub use sample::{GeoPoint, LocationFix, MotionSample, SamplePayload, SensorReading, Vector3};
