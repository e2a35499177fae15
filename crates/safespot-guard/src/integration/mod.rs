//! Integration layer for the collaborators the pipeline depends on.
//!
//! The monitor only talks to the outside world through the traits defined
//! here:
//!
//! - [`ClassificationService`]: remote verdict per motion sample
//! - [`ContactDirectory`]: trusted contacts of the current user
//! - [`JourneySink`]: journey point storage
//! - [`LocationProvider`]: device location (may suspend)
//! - [`MotionFeed`]: accelerometer / gyroscope listeners feeding a
//!   [`SensorCache`]
//!
//! [`BackendClient`] implements the first three against the SafeSpot HTTP
//! API; [`FixedLocation`] and [`SimulatedMotionFeed`] stand in for device
//! sensors when running off-device.

mod backend;
mod sensors;
mod simulated;

pub use backend::{BackendClient, DEFAULT_BACKEND_URL};
pub use sensors::{SensorCache, SensorKind, SensorSnapshot, SensorSubscription};
pub use simulated::{FixedLocation, MotionPattern, SimulatedMotionFeed};

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{ClassificationResult, JourneyPoint, LocationFix, MotionSample, TrustedContact};
use crate::Result;

/// Remote movement classifier
#[async_trait]
pub trait ClassificationService: Send + Sync {
    /// Send one sample and return the backend's verdict
    async fn classify(&self, sample: &MotionSample) -> Result<ClassificationResult>;
}

/// Source of the user's trusted contacts
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Current list of dialable trusted contacts
    async fn trusted_contacts(&self) -> Result<Vec<TrustedContact>>;
}

/// Destination for journey points
#[async_trait]
pub trait JourneySink: Send + Sync {
    /// Record one journey point
    async fn record(&self, point: &JourneyPoint) -> Result<()>;
}

/// Device location collaborator
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Ask for location permission.
    ///
    /// Returns [`crate::GuardError::PermissionDenied`] when not granted.
    async fn request_permission(&self) -> Result<()> {
        Ok(())
    }

    /// Read the current location
    async fn current_fix(&self) -> Result<LocationFix>;
}

/// Motion sensor listener registration
pub trait MotionFeed: Send + Sync {
    /// Feed name for logging
    fn name(&self) -> &str;

    /// Start pushing readings into `cache` until the subscription is detached
    fn attach(&self, cache: Arc<SensorCache>) -> Result<SensorSubscription>;
}
