//! Monitor configuration.
//!
//! [`GuardConfig`] holds every tunable of the pipeline. It is serializable so
//! a deployment can keep it in a JSON file; the CLI layers flags on top.
//!
//! ```rust
//! use safespot_guard::GuardConfig;
//!
//! let config = GuardConfig::builder()
//!     .user_id("Swetha_01")
//!     .cooldown_ms(120_000)
//!     .build();
//! config.validate().expect("valid config");
//! assert_eq!(config.tick_interval_ms, 2_000);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::alerting::DispatchConfig;
use crate::integration::DEFAULT_BACKEND_URL;
use crate::monitor::EscalationPolicy;
use crate::{GuardError, Result};

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the SafeSpot API
    pub base_url: String,
    /// Identifier sent with every sample and used to look up contacts
    pub user_id: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl BackendConfig {
    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            user_id: "anonymous".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Journey recording settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JourneyConfig {
    /// Post journey points while monitoring
    pub enabled: bool,
    /// Minimum time between points in milliseconds
    pub min_interval_ms: u64,
    /// Movement that forces a point before the interval elapses, in meters
    pub min_distance_m: f64,
}

impl JourneyConfig {
    /// Minimum interval as a [`Duration`]
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_interval_ms: 10_000,
            min_distance_m: 10.0,
        }
    }
}

/// Complete configuration for the safety monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Backend connection
    pub backend: BackendConfig,
    /// Sampling tick interval in milliseconds. Default: **2000**.
    pub tick_interval_ms: u64,
    /// Continuous abnormal duration needed for confirmation. Default: **180000** (3 min).
    pub confirm_threshold_ms: u64,
    /// Suppression window after an escalation. Default: **180000** (3 min).
    pub cooldown_ms: u64,
    /// Delay between starting the message fan-out and placing the call. Default: **2000**.
    pub call_delay_ms: u64,
    /// Minimum digits for a contact number to be dialable. Default: **8**.
    pub min_phone_digits: usize,
    /// Age beyond which a cached sensor reading is reported as stale. Default: **5000**.
    pub max_sensor_staleness_ms: u64,
    /// Treat every classification as abnormal (test / demo trigger)
    pub force_abnormal: bool,
    /// Which verdicts are offered to the cooldown gate
    pub escalation_policy: EscalationPolicy,
    /// Journey recording
    pub journey: JourneyConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            tick_interval_ms: 2_000,
            confirm_threshold_ms: 180_000,
            cooldown_ms: 180_000,
            call_delay_ms: 2_000,
            min_phone_digits: 8,
            max_sensor_staleness_ms: 5_000,
            force_abnormal: false,
            escalation_policy: EscalationPolicy::Confirmed,
            journey: JourneyConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Start a builder from the defaults
    pub fn builder() -> GuardConfigBuilder {
        GuardConfigBuilder::default()
    }

    /// Tick interval
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Confirmation threshold
    pub fn confirm_threshold(&self) -> Duration {
        Duration::from_millis(self.confirm_threshold_ms)
    }

    /// Cooldown window
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Call delay
    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }

    /// Sensor staleness bound
    pub fn max_sensor_staleness(&self) -> Duration {
        Duration::from_millis(self.max_sensor_staleness_ms)
    }

    /// Delivery settings for the escalation dispatcher
    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            call_delay: self.call_delay(),
            min_phone_digits: self.min_phone_digits,
        }
    }

    /// Load and validate a configuration from a JSON file.
    ///
    /// Missing fields take their defaults.
    pub fn from_json(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GuardConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration as pretty-printed JSON
    pub fn to_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Check the configuration is usable, reporting the first problem found
    pub fn validate(&self) -> Result<()> {
        let base = &self.backend.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(GuardError::Config(format!(
                "backend.base_url must start with http:// or https://, got {base:?}"
            )));
        }
        if self.backend.user_id.trim().is_empty() {
            return Err(GuardError::Config("backend.user_id must not be empty".into()));
        }
        if self.backend.request_timeout_ms == 0 {
            return Err(GuardError::Config("backend.request_timeout_ms must be > 0".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(GuardError::Config("tick_interval_ms must be > 0".into()));
        }
        if self.cooldown_ms == 0 {
            return Err(GuardError::Config("cooldown_ms must be > 0".into()));
        }
        if self.journey.min_interval_ms == 0 {
            return Err(GuardError::Config("journey.min_interval_ms must be > 0".into()));
        }
        if !(self.journey.min_distance_m.is_finite() && self.journey.min_distance_m > 0.0) {
            return Err(GuardError::Config("journey.min_distance_m must be > 0".into()));
        }
        Ok(())
    }
}

/// Builder for [`GuardConfig`]
#[derive(Debug, Default)]
pub struct GuardConfigBuilder {
    config: GuardConfig,
}

impl GuardConfigBuilder {
    /// Set the backend base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.backend.base_url = url.into();
        self
    }

    /// Set the user id
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.config.backend.user_id = user_id.into();
        self
    }

    /// Set the request timeout
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.backend.request_timeout_ms = ms;
        self
    }

    /// Set the tick interval
    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.tick_interval_ms = ms;
        self
    }

    /// Set the confirmation threshold
    pub fn confirm_threshold_ms(mut self, ms: u64) -> Self {
        self.config.confirm_threshold_ms = ms;
        self
    }

    /// Set the cooldown window
    pub fn cooldown_ms(mut self, ms: u64) -> Self {
        self.config.cooldown_ms = ms;
        self
    }

    /// Set the call delay
    pub fn call_delay_ms(mut self, ms: u64) -> Self {
        self.config.call_delay_ms = ms;
        self
    }

    /// Set the minimum phone digits
    pub fn min_phone_digits(mut self, digits: usize) -> Self {
        self.config.min_phone_digits = digits;
        self
    }

    /// Set the sensor staleness bound
    pub fn max_sensor_staleness_ms(mut self, ms: u64) -> Self {
        self.config.max_sensor_staleness_ms = ms;
        self
    }

    /// Enable or disable the forced abnormal verdict
    pub fn force_abnormal(mut self, enabled: bool) -> Self {
        self.config.force_abnormal = enabled;
        self
    }

    /// Set the escalation policy
    pub fn escalation_policy(mut self, policy: EscalationPolicy) -> Self {
        self.config.escalation_policy = policy;
        self
    }

    /// Enable or disable journey recording
    pub fn journey_enabled(mut self, enabled: bool) -> Self {
        self.config.journey.enabled = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> GuardConfig {
        self.config
    }
}
