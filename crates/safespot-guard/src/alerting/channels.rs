//! Delivery channels for SOS alerts.
//!
//! Messaging and calling are separate traits so a platform can provide one
//! without the other. Every delivery is best effort: a channel reports
//! failure through its `Result`, the dispatcher logs it and moves on.

use async_trait::async_trait;

use super::message::{tel_uri, whatsapp_uri, whatsapp_web_url};
use crate::domain::TrustedContact;
use crate::{GuardError, Result};

/// Sends a text message to a contact (SMS or equivalent)
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Deliver `body` to `contact`
    async fn send(&self, contact: &TrustedContact, body: &str) -> Result<()>;
}

/// Places or initiates a voice call
#[async_trait]
pub trait CallChannel: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Call `contact`
    async fn call(&self, contact: &TrustedContact) -> Result<()>;
}

/// Console/logging channel
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleChannel;

#[async_trait]
impl MessageChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, contact: &TrustedContact, body: &str) -> Result<()> {
        println!("\n{} SOS to {} <{}> {}", "=".repeat(10), contact.name, contact.phone, "=".repeat(10));
        println!("{body}");
        println!("{}\n", "=".repeat(60));
        Ok(())
    }
}

#[async_trait]
impl CallChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn call(&self, contact: &TrustedContact) -> Result<()> {
        println!("📞 Calling {} ({})", contact.name, tel_uri(&contact.phone));
        Ok(())
    }
}

/// Platform hook that opens a URI (deep link, `tel:`, web page)
#[async_trait]
pub trait UriOpener: Send + Sync {
    /// Whether a handler is installed for the URI's scheme
    async fn can_open(&self, uri: &str) -> bool;

    /// Hand the URI to its handler
    async fn open(&self, uri: &str) -> Result<()>;
}

/// Opens URIs by running an external program (`xdg-open`, `open`, `adb shell am start ...`)
#[derive(Debug, Clone)]
pub struct CommandOpener {
    program: String,
    args: Vec<String>,
    schemes: Vec<String>,
}

impl CommandOpener {
    /// Run `program <args..> <uri>` for URIs whose scheme is in `schemes`
    pub fn new(program: impl Into<String>, schemes: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            schemes: schemes.iter().map(|s| s.to_ascii_lowercase()).collect(),
        }
    }

    /// Extra arguments placed before the URI
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

fn scheme(uri: &str) -> Option<String> {
    uri.split_once(':').map(|(scheme, _)| scheme.to_ascii_lowercase())
}

#[async_trait]
impl UriOpener for CommandOpener {
    async fn can_open(&self, uri: &str) -> bool {
        scheme(uri).map_or(false, |s| self.schemes.contains(&s))
    }

    async fn open(&self, uri: &str) -> Result<()> {
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(uri)
            .status()
            .await
            .map_err(|e| GuardError::Channel {
                channel: self.program.clone(),
                reason: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(GuardError::Channel {
                channel: self.program.clone(),
                reason: format!("opener exited with {status}"),
            })
        }
    }
}

/// Delivers through device URIs: WhatsApp for messages, `tel:` for calls
pub struct UriChannel<O> {
    opener: O,
}

impl<O: UriOpener> UriChannel<O> {
    /// Wrap a platform opener
    pub fn new(opener: O) -> Self {
        Self { opener }
    }
}

#[async_trait]
impl<O: UriOpener> MessageChannel for UriChannel<O> {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, contact: &TrustedContact, body: &str) -> Result<()> {
        let native = whatsapp_uri(&contact.phone, body);
        if self.opener.can_open(&native).await {
            return self.opener.open(&native).await;
        }
        self.opener.open(&whatsapp_web_url(&contact.phone, body)).await
    }
}

#[async_trait]
impl<O: UriOpener> CallChannel for UriChannel<O> {
    fn name(&self) -> &str {
        "tel"
    }

    async fn call(&self, contact: &TrustedContact) -> Result<()> {
        self.opener.open(&tel_uri(&contact.phone)).await
    }
}
