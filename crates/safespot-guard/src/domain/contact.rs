//! Trusted contacts ("protectors") eligible to receive SOS alerts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name used when the contacts service returns an empty one
pub const DEFAULT_CONTACT_NAME: &str = "Protector";

/// Contact record as returned by `GET /api/protectors/{userId}`.
///
/// Fields are loosely typed because the backend has returned both numeric
/// and string phone numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawContact {
    /// Backend document id
    #[serde(rename = "_id", default)]
    pub id: Value,
    /// Display name
    #[serde(default)]
    pub name: Value,
    /// Phone number
    #[serde(default)]
    pub phone: Value,
}

/// A validated contact with a dialable phone number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedContact {
    /// Backend document id
    pub id: String,
    /// Display name
    pub name: String,
    /// Phone number with whitespace removed
    pub phone: String,
}

impl TrustedContact {
    /// Create a contact, stripping whitespace from the phone number
    pub fn new(id: impl Into<String>, name: impl Into<String>, phone: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: strip_whitespace(phone),
        }
    }

    /// Normalize a backend record.
    ///
    /// Returns `None` when the phone number has fewer than `min_digits`
    /// digits once whitespace is removed.
    pub fn from_raw(raw: &RawContact, min_digits: usize) -> Option<Self> {
        let phone = strip_whitespace(&value_to_string(&raw.phone));
        if digit_count(&phone) < min_digits {
            return None;
        }

        let name = value_to_string(&raw.name);
        let name = if name.trim().is_empty() {
            DEFAULT_CONTACT_NAME.to_string()
        } else {
            name
        };

        Some(Self {
            id: value_to_string(&raw.id),
            name,
            phone,
        })
    }

    /// Whether the number has at least `min_digits` digits
    pub fn is_dialable(&self, min_digits: usize) -> bool {
        digit_count(&self.phone) >= min_digits
    }
}

/// Normalize a contacts response body.
///
/// Anything that is not a JSON array yields an empty list.
pub fn normalize_contacts(body: &Value, min_digits: usize) -> Vec<TrustedContact> {
    let Some(items) = body.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| serde_json::from_value::<RawContact>(item.clone()).ok())
        .filter_map(|raw| TrustedContact::from_raw(&raw, min_digits))
        .collect()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_whitespace_and_defaults_name() {
        let raw: RawContact = serde_json::from_value(json!({
            "_id": "65f1",
            "name": "",
            "phone": "+91 98765 43210"
        }))
        .unwrap();

        let contact = TrustedContact::from_raw(&raw, 8).unwrap();
        assert_eq!(contact.id, "65f1");
        assert_eq!(contact.name, DEFAULT_CONTACT_NAME);
        assert_eq!(contact.phone, "+919876543210");
    }

    #[test]
    fn rejects_short_numbers() {
        let raw: RawContact = serde_json::from_value(json!({
            "_id": "1",
            "name": "Short",
            "phone": "12 34 5"
        }))
        .unwrap();

        assert!(TrustedContact::from_raw(&raw, 8).is_none());
    }

    #[test]
    fn accepts_numeric_phone_and_id() {
        let raw: RawContact = serde_json::from_value(json!({
            "_id": 42,
            "name": "Amma",
            "phone": 9876543210u64
        }))
        .unwrap();

        let contact = TrustedContact::from_raw(&raw, 8).unwrap();
        assert_eq!(contact.id, "42");
        assert_eq!(contact.phone, "9876543210");
    }

    #[test]
    fn normalizes_arrays_and_ignores_other_shapes() {
        let body = json!([
            { "_id": "a", "name": "Appa", "phone": "98765 43210" },
            { "_id": "b", "name": "NoPhone" },
            { "_id": "c", "name": "Akka", "phone": "0091 44 2345 6789" }
        ]);

        let contacts = normalize_contacts(&body, 8);
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].name, "Appa");
        assert_eq!(contacts[1].phone, "00914423456789");

        assert!(normalize_contacts(&json!({ "message": "not found" }), 8).is_empty());
    }
}
