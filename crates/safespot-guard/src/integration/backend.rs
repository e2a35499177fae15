//! SafeSpot backend HTTP client.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use super::{ClassificationService, ContactDirectory, JourneySink};
use crate::config::BackendConfig;
use crate::domain::{normalize_contacts, ClassificationResult, JourneyPoint, MotionSample, TrustedContact};
use crate::{GuardError, Result};

/// Production backend
pub const DEFAULT_BACKEND_URL: &str = "https://safespot-backend-vx2w.onrender.com";

/// Client for the classification, contacts and journey endpoints
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    user_id: String,
    min_phone_digits: usize,
}

impl BackendClient {
    /// Build a client from configuration
    pub fn new(config: &BackendConfig, min_phone_digits: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("safespot-guard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            min_phone_digits,
        })
    }

    /// User the client reports for
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-2xx response into [`GuardError::Backend`]
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(body);

        Err(GuardError::Backend {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ClassificationService for BackendClient {
    async fn classify(&self, sample: &MotionSample) -> Result<ClassificationResult> {
        let url = self.url("/api/history");
        let response = self
            .client
            .post(&url)
            .json(&sample.to_payload(&self.user_id))
            .send()
            .await?;

        let verdict: ClassificationResult = Self::check(response).await?.json().await?;
        tracing::debug!(
            is_abnormal = verdict.is_abnormal,
            intensity = %verdict.intensity,
            "Classification received"
        );
        Ok(verdict)
    }
}

#[async_trait]
impl ContactDirectory for BackendClient {
    async fn trusted_contacts(&self) -> Result<Vec<TrustedContact>> {
        let url = self.url(&format!("/api/protectors/{}", urlencoding::encode(&self.user_id)));
        let response = self.client.get(&url).send().await?;

        let body: Value = Self::check(response).await?.json().await?;
        let contacts = normalize_contacts(&body, self.min_phone_digits);
        tracing::debug!(count = contacts.len(), "Trusted contacts fetched");
        Ok(contacts)
    }
}

#[async_trait]
impl JourneySink for BackendClient {
    async fn record(&self, point: &JourneyPoint) -> Result<()> {
        let url = self.url("/api/journey/point");
        let response = self.client.post(&url).json(point).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slash_from_base_url() {
        let config = BackendConfig {
            base_url: "http://localhost:3000/".to_string(),
            user_id: "Swetha_01".to_string(),
            request_timeout_ms: 5_000,
        };

        let client = BackendClient::new(&config, 8).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("/api/history"), "http://localhost:3000/api/history");
        assert_eq!(client.user_id(), "Swetha_01");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            user_id: "u".to_string(),
            request_timeout_ms: 500,
        };
        let client = BackendClient::new(&config, 8).unwrap();

        let err = client.trusted_contacts().await.unwrap_err();
        assert!(matches!(err, GuardError::Network(_)), "got {err:?}");
    }
}
