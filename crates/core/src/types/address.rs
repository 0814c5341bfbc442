//! Shipping address captured at checkout.

use serde::{Deserialize, Deserializer, Serialize};

/// Errors raised when a shipping address is incomplete.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// No address object was supplied at all.
    #[error("Shipping address is required.")]
    Missing,
    /// A required field is absent or empty.
    #[error("Shipping address missing field: {0}")]
    MissingField(&'static str),
}

/// A postal shipping address.
///
/// Every field is a required, free-form string. No
/// postal-code or country validation is applied. Numeric JSON values (a postal code
/// sent as `12345`) are accepted and stored as their decimal text.
///
/// Serialized with camelCase keys, which is also the snapshot format
/// persisted on orders and user records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postal_code: String,
}

impl ShippingAddress {
    /// Checks that every required field is present, in a fixed order so
    /// the first missing field reported is stable.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::MissingField`] naming the first empty field.
    pub fn validate_required(&self) -> Result<(), AddressError> {
        let fields = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
            ("email", &self.email),
        ];

        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(AddressError::MissingField(name)),
            None => Ok(()),
        }
    }

    /// Display name derived from the address, `"{first} {last}"`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete() -> ShippingAddress {
        serde_json::from_value(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "address": "1 Analytical Way",
            "city": "London",
            "postalCode": "N1 9GU"
        }))
        .unwrap()
    }

    #[test]
    fn test_complete_address_validates() {
        assert_eq!(complete().validate_required(), Ok(()));
        assert_eq!(complete().full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut address = complete();
        address.city = String::new();
        assert_eq!(
            address.validate_required(),
            Err(AddressError::MissingField("city"))
        );
        assert_eq!(
            AddressError::MissingField("city").to_string(),
            "Shipping address missing field: city"
        );
    }

    #[test]
    fn test_absent_and_null_fields_deserialize_as_empty() {
        let address: ShippingAddress =
            serde_json::from_value(serde_json::json!({ "firstName": "Ada", "lastName": null }))
                .unwrap();
        assert_eq!(
            address.validate_required(),
            Err(AddressError::MissingField("lastName"))
        );
    }

    #[test]
    fn test_numeric_postal_code_is_accepted() {
        let address: ShippingAddress =
            serde_json::from_value(serde_json::json!({ "postalCode": 75001 })).unwrap();
        assert_eq!(address.postal_code, "75001");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(complete()).unwrap();
        assert_eq!(json["postalCode"], "N1 9GU");
        assert_eq!(json["firstName"], "Ada");
    }
}
