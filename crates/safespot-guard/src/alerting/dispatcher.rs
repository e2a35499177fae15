//! SOS escalation: contact lookup, message fan-out and the follow-up call.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::channels::{CallChannel, MessageChannel};
use super::message::compose_alert;
use crate::domain::{GeoPoint, TrustedContact};
use crate::integration::ContactDirectory;
use crate::{GuardError, Result};

/// Configuration for escalation delivery
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Wait between starting the message fan-out and placing the call
    pub call_delay: Duration,
    /// Minimum digits for a number to be dialable
    pub min_phone_digits: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            call_delay: Duration::from_secs(2),
            min_phone_digits: 8,
        }
    }
}

/// What one escalation attempt achieved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscalationReport {
    /// Correlation id used in the logs
    pub id: Uuid,
    /// Contacts the directory returned after filtering
    pub contacts: usize,
    /// Messages delivered successfully
    pub messages_sent: usize,
    /// Messages that failed
    pub messages_failed: usize,
    /// Contact the call went to, if the call succeeded
    pub called: Option<String>,
    /// Set when no escalation was possible
    pub aborted: Option<String>,
}

/// Notifies trusted contacts when an abnormal condition escalates
pub struct EscalationDispatcher {
    config: DispatchConfig,
    directory: Arc<dyn ContactDirectory>,
    messengers: Vec<Arc<dyn MessageChannel>>,
    callers: Vec<Arc<dyn CallChannel>>,
}

impl EscalationDispatcher {
    /// Create a dispatcher with no delivery channels
    pub fn new(config: DispatchConfig, directory: Arc<dyn ContactDirectory>) -> Self {
        Self {
            config,
            directory,
            messengers: Vec::new(),
            callers: Vec::new(),
        }
    }

    /// Add a messaging channel
    pub fn add_message_channel(&mut self, channel: Arc<dyn MessageChannel>) {
        self.messengers.push(channel);
    }

    /// Add a calling channel
    pub fn add_call_channel(&mut self, channel: Arc<dyn CallChannel>) {
        self.callers.push(channel);
    }

    /// Get configuration
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Alert every trusted contact about `reason` at `point`.
    ///
    /// Never fails: lookup and delivery errors are logged and reflected in
    /// the returned report.
    pub async fn escalate(&self, point: GeoPoint, reason: &str) -> EscalationReport {
        let mut report = EscalationReport {
            id: Uuid::new_v4(),
            ..Default::default()
        };

        let contacts = match self.dialable_contacts().await {
            Ok(contacts) => contacts,
            Err(GuardError::NoContactsAvailable) => {
                tracing::info!(escalation = %report.id, "No trusted contacts, escalation skipped");
                report.aborted = Some(GuardError::NoContactsAvailable.to_string());
                return report;
            }
            Err(e) => {
                tracing::warn!(escalation = %report.id, error = %e, "Contact lookup failed, escalation skipped");
                report.aborted = Some(e.to_string());
                return report;
            }
        };
        report.contacts = contacts.len();

        let alert = compose_alert(reason, point);
        tracing::warn!(
            escalation = %report.id,
            contacts = contacts.len(),
            reason,
            location = %point,
            "Dispatching SOS"
        );

        let (sent, called) = tokio::join!(
            self.fan_out(&report.id, &contacts, &alert.body),
            self.call_first(&report.id, &contacts[0]),
        );

        report.messages_sent = sent;
        report.messages_failed = contacts.len() * self.messengers.len() - sent;
        report.called = called;
        report
    }

    /// Trusted contacts with a dialable number, in directory order.
    ///
    /// Fails with [`GuardError::NoContactsAvailable`] when none remain.
    pub async fn dialable_contacts(&self) -> Result<Vec<TrustedContact>> {
        let contacts: Vec<TrustedContact> = self
            .directory
            .trusted_contacts()
            .await?
            .into_iter()
            .filter(|c| c.is_dialable(self.config.min_phone_digits))
            .collect();

        if contacts.is_empty() {
            return Err(GuardError::NoContactsAvailable);
        }
        Ok(contacts)
    }

    async fn fan_out(&self, id: &Uuid, contacts: &[TrustedContact], body: &str) -> usize {
        let mut sent = 0;
        for contact in contacts {
            for channel in &self.messengers {
                match channel.send(contact, body).await {
                    Ok(()) => {
                        sent += 1;
                        tracing::info!(escalation = %id, channel = channel.name(), contact = %contact.name, "SOS message sent");
                    }
                    Err(e) => {
                        tracing::warn!(
                            escalation = %id,
                            channel = channel.name(),
                            contact = %contact.name,
                            error = %e,
                            "SOS message failed"
                        );
                    }
                }
            }
        }
        sent
    }

    async fn call_first(&self, id: &Uuid, contact: &TrustedContact) -> Option<String> {
        if self.callers.is_empty() {
            return None;
        }
        if !self.config.call_delay.is_zero() {
            tokio::time::sleep(self.config.call_delay).await;
        }

        for channel in &self.callers {
            match channel.call(contact).await {
                Ok(()) => {
                    tracing::info!(escalation = %id, channel = channel.name(), contact = %contact.name, "SOS call placed");
                    return Some(contact.phone.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        escalation = %id,
                        channel = channel.name(),
                        contact = %contact.name,
                        error = %e,
                        "SOS call failed"
                    );
                }
            }
        }
        None
    }
}
