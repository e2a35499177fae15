//! Alerting module for SOS notifications.

mod channels;
mod dispatcher;
mod message;

pub use channels::{CallChannel, CommandOpener, ConsoleChannel, MessageChannel, UriChannel, UriOpener};
pub use dispatcher::{DispatchConfig, EscalationDispatcher, EscalationReport};
pub use message::{compose_alert, map_link, tel_uri, whatsapp_uri, whatsapp_web_url, AlertMessage};
