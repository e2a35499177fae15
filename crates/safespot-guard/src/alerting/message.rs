//! SOS message composition and device action URIs.

use std::fmt;

use crate::domain::GeoPoint;

/// Composed SOS alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    /// Reason embedded in the message
    pub reason: String,
    /// Map link for the reported location
    pub map_link: String,
    /// Full text sent to every contact
    pub body: String,
}

impl fmt::Display for AlertMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body)
    }
}

/// Map link for a location.
///
/// Coordinates use the shortest representation that round-trips, so the
/// values passed in appear unchanged (`9.94,78.12`).
pub fn map_link(point: GeoPoint) -> String {
    format!("https://maps.google.com/?q={point}")
}

/// Build the SOS message for `reason` at `point`
pub fn compose_alert(reason: &str, point: GeoPoint) -> AlertMessage {
    let map_link = map_link(point);
    let body = format!("🚨 EMERGENCY ALERT 🚨\n\n{reason}\n\n📍 Location:\n{map_link}");

    AlertMessage {
        reason: reason.to_string(),
        map_link,
        body,
    }
}

/// `tel:` URI that starts a call to `phone`
pub fn tel_uri(phone: &str) -> String {
    format!("tel:{phone}")
}

/// Native WhatsApp deep link
pub fn whatsapp_uri(phone: &str, text: &str) -> String {
    format!(
        "whatsapp://send?phone={}&text={}",
        urlencoding::encode(phone),
        urlencoding::encode(text)
    )
}

/// Web fallback when the WhatsApp app is not installed
pub fn whatsapp_web_url(phone: &str, text: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("https://wa.me/{digits}?text={}", urlencoding::encode(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_contains_reason_and_exact_coordinates() {
        let alert = compose_alert("Abnormal movement detected (Hard Bump)", GeoPoint::new(9.94, 78.12));

        assert!(alert.body.contains("Abnormal movement detected (Hard Bump)"));
        assert!(alert.body.contains("9.94,78.12"));
        assert_eq!(alert.map_link, "https://maps.google.com/?q=9.94,78.12");
        assert!(alert.body.starts_with("🚨 EMERGENCY ALERT 🚨"));
        assert!(alert.body.ends_with(&alert.map_link));
    }

    #[test]
    fn map_link_preserves_full_precision() {
        let link = map_link(GeoPoint::new(9.939_876_5, -78.123_456_789));
        assert_eq!(link, "https://maps.google.com/?q=9.9398765,-78.123456789");
    }

    #[test]
    fn device_action_uris() {
        assert_eq!(tel_uri("+919876543210"), "tel:+919876543210");

        let native = whatsapp_uri("+919876543210", "help me");
        assert_eq!(native, "whatsapp://send?phone=%2B919876543210&text=help%20me");

        let web = whatsapp_web_url("+91 98765 43210", "a&b");
        assert_eq!(web, "https://wa.me/919876543210?text=a%26b");
    }
}
