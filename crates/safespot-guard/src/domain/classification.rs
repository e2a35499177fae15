//! Verdicts returned by the remote classification service.

use serde::{Deserialize, Serialize};

/// Intensity label used when the testing override forces a verdict
pub const FORCED_INTENSITY: &str = "Manual test trigger";

/// Opaque per-sample verdict from the classification endpoint.
///
/// The client never computes this itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Whether the backend considers the movement abnormal
    #[serde(rename = "isAbnormal", default)]
    pub is_abnormal: bool,
    /// Free-form intensity label ("Idle", "Walking", "Hard Bump", ...)
    #[serde(default = "default_intensity")]
    pub intensity: String,
}

fn default_intensity() -> String {
    "Idle".to_string()
}

impl ClassificationResult {
    /// Create a verdict
    pub fn new(is_abnormal: bool, intensity: impl Into<String>) -> Self {
        Self {
            is_abnormal,
            intensity: intensity.into(),
        }
    }

    /// Synthetic abnormal verdict substituted by the testing override
    pub fn forced() -> Self {
        Self::new(true, FORCED_INTENSITY)
    }

    /// Reason string embedded in an SOS message for this verdict
    pub fn escalation_reason(&self) -> String {
        if self.intensity == FORCED_INTENSITY {
            FORCED_INTENSITY.to_string()
        } else {
            format!("Abnormal movement detected ({})", self.intensity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_response() {
        let body = r#"{"isAbnormal": true, "intensity": "Hard Bump", "_id": "abc"}"#;
        let result: ClassificationResult = serde_json::from_str(body).unwrap();

        assert!(result.is_abnormal);
        assert_eq!(result.intensity, "Hard Bump");
    }

    #[test]
    fn missing_fields_default_to_normal_idle() {
        let result: ClassificationResult = serde_json::from_str("{}").unwrap();

        assert!(!result.is_abnormal);
        assert_eq!(result.intensity, "Idle");
    }

    #[test]
    fn reason_mentions_intensity() {
        let verdict = ClassificationResult::new(true, "Hard Bump");
        assert_eq!(verdict.escalation_reason(), "Abnormal movement detected (Hard Bump)");
        assert_eq!(ClassificationResult::forced().escalation_reason(), FORCED_INTENSITY);
    }
}
