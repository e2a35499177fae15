//! # SafeSpot Guard
//!
//! Client-side personal-safety pipeline for the SafeSpot platform.
//!
//! While active, the monitor samples the device location and motion sensors
//! on a fixed tick, asks the backend to classify each sample, tracks how long
//! movement has stayed abnormal and, once that qualifies, escalates an SOS to
//! the user's trusted contacts. A cooldown gate keeps repeated detections
//! from flooding contacts.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      safespot-guard                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌─────────────┐   ┌─────────────────┐   │
//! │  │  Monitor  │──▶│  Detection  │──▶│    Alerting     │   │
//! │  │ tick loop │   │ tracker+gate│   │ SOS dispatcher  │   │
//! │  └─────┬─────┘   └─────────────┘   └────────┬────────┘   │
//! │        └────────────────┬───────────────────┘            │
//! │              ┌──────────▼─────────┐                      │
//! │              │    Integration     │                      │
//! │              │ backend / sensors  │                      │
//! │              └────────────────────┘                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use safespot_guard::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GuardConfig::builder().user_id("Swetha_01").build();
//!     let backend = Arc::new(BackendClient::new(&config.backend, config.min_phone_digits)?);
//!
//!     let mut dispatcher = EscalationDispatcher::new(config.dispatch(), backend.clone());
//!     dispatcher.add_message_channel(Arc::new(ConsoleChannel));
//!
//!     let collaborators = Collaborators::new(
//!         Arc::new(FixedLocation::new(GeoPoint::new(9.94, 78.12))),
//!         Arc::new(SimulatedMotionFeed::new(MotionPattern::Walking)),
//!         backend,
//!         Arc::new(dispatcher),
//!     );
//!
//!     let mut monitor = SafetyMonitor::new(config, collaborators);
//!     monitor.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     monitor.stop().await;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod alerting;
pub mod clock;
pub mod config;
pub mod detection;
pub mod domain;
pub mod integration;
pub mod monitor;

use std::fmt;

// Re-export main types
pub use domain::{
    ClassificationResult, GeoPoint, JourneyPoint, LocationFix, MotionSample, SensorReading,
    TrustedContact, Vector3,
};

pub use detection::{AbnormalState, AbnormalityTracker, CooldownGate, MonitorPhase};

pub use alerting::{
    compose_alert, AlertMessage, CallChannel, ConsoleChannel, DispatchConfig, EscalationDispatcher,
    EscalationReport, MessageChannel, UriChannel,
};

pub use integration::{
    BackendClient, ClassificationService, ContactDirectory, JourneySink, LocationProvider,
    MotionFeed, SensorCache,
};

pub use config::{BackendConfig, GuardConfig, GuardConfigBuilder, JourneyConfig};

pub use monitor::{
    Collaborators, EscalationPolicy, MonitorStats, SafetyMonitor, TickOutcome,
};

pub use clock::{Clock, ManualClock, SystemClock};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Device permission the pipeline depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Foreground location
    Location,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Location => f.write_str("location"),
        }
    }
}

/// Unified error type for guard operations
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// A required device permission was refused
    #[error("Permission denied: {0}")]
    PermissionDenied(Permission),

    /// Transport failure talking to the backend
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("Backend error ({status}): {message}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// The user has no dialable trusted contacts
    #[error("No trusted contacts available")]
    NoContactsAvailable,

    /// A delivery channel failed
    #[error("Channel {channel} failed: {reason}")]
    Channel {
        /// Channel name
        channel: String,
        /// Failure description
        reason: String,
    },

    /// Sensor subscription failure
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed JSON payload
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for GuardError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => GuardError::Backend {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => GuardError::Network(e.to_string()),
        }
    }
}

impl GuardError {
    /// Whether retrying on a later tick may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            GuardError::Network(_) | GuardError::Sensor(_) => true,
            GuardError::Backend { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        GuardConfig, GuardConfigBuilder, GuardError, Result, SafetyMonitor, Collaborators,
        EscalationPolicy,
        // Domain types
        ClassificationResult, GeoPoint, LocationFix, MotionSample, TrustedContact,
        // Detection
        AbnormalState, CooldownGate, MonitorPhase,
        // Alerting
        ConsoleChannel, EscalationDispatcher, EscalationReport,
        // Integration
        BackendClient,
    };
    pub use crate::integration::{FixedLocation, MotionPattern, SimulatedMotionFeed};
}
