//! Payment intent metadata.
//!
//! The metadata bag is the only channel between intent creation and the
//! webhook, so it carries the full order: the validated line snapshot, the
//! shipping address, and the identity decided before payment.
//!
//! Stripe limits metadata to 50 keys with values of at most 500 characters.
//! Long JSON values are split across `key`, `key_1`, `key_2`, ... and joined
//! again on decode.

use std::collections::{BTreeMap, HashMap};

use secrecy::{ExposeSecret, SecretString};

use aerox_core::{Email, EmailError, OrderLine, ShippingAddress, UserId};

use crate::services::identity::{DeferredIdentity, PendingAccount};

/// Longest value Stripe accepts for one metadata key.
pub const MAX_VALUE_CHARS: usize = 500;

/// Most keys Stripe accepts in one metadata bag.
pub const MAX_KEYS: usize = 50;

const ITEMS: &str = "items";
const SHIPPING_ADDRESS: &str = "shipping_address";
const USER_ID: &str = "user_id";
const HASHED_PASSWORD: &str = "hashed_password";
const ACCOUNT_EMAIL: &str = "account_email";

/// Errors encoding or decoding metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("metadata key missing: {0}")]
    Missing(&'static str),

    #[error("metadata key {key} is not valid JSON: {source}")]
    Malformed {
        key: &'static str,
        source: serde_json::Error,
    },

    #[error("metadata user_id is not an integer: {0}")]
    InvalidUserId(String),

    #[error("metadata account_email is invalid: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("order does not fit in payment metadata ({0} keys)")]
    TooLarge(usize),

    #[error("failed to encode metadata: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Everything needed to write the order once payment succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentMetadata {
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub identity: DeferredIdentity,
}

impl PaymentMetadata {
    /// Flatten into Stripe metadata.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::TooLarge` if the encoded order needs more
    /// keys than Stripe allows.
    pub fn encode(&self) -> Result<BTreeMap<String, String>, MetadataError> {
        let mut map = BTreeMap::new();

        let items = serde_json::to_string(&self.lines).map_err(MetadataError::Encode)?;
        let address =
            serde_json::to_string(&self.shipping_address).map_err(MetadataError::Encode)?;
        put_chunked(&mut map, ITEMS, &items);
        put_chunked(&mut map, SHIPPING_ADDRESS, &address);

        if let Some(user_id) = self.identity.user_id {
            map.insert(USER_ID.to_owned(), user_id.to_string());
        }

        if let Some(account) = &self.identity.account {
            map.insert(
                HASHED_PASSWORD.to_owned(),
                account.password_hash.expose_secret().to_owned(),
            );
            map.insert(ACCOUNT_EMAIL.to_owned(), account.email.to_string());
        }

        if map.len() > MAX_KEYS {
            return Err(MetadataError::TooLarge(map.len()));
        }
        Ok(map)
    }

    /// Rebuild from the metadata on a payment intent.
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing or a value does not parse.
    pub fn decode(map: &HashMap<String, String>) -> Result<Self, MetadataError> {
        let items = get_chunked(map, ITEMS).ok_or(MetadataError::Missing(ITEMS))?;
        let lines = serde_json::from_str(&items)
            .map_err(|source| MetadataError::Malformed { key: ITEMS, source })?;

        let address =
            get_chunked(map, SHIPPING_ADDRESS).ok_or(MetadataError::Missing(SHIPPING_ADDRESS))?;
        let shipping_address =
            serde_json::from_str(&address).map_err(|source| MetadataError::Malformed {
                key: SHIPPING_ADDRESS,
                source,
            })?;

        let user_id = map
            .get(USER_ID)
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<UserId>()
                    .map_err(|_| MetadataError::InvalidUserId(v.clone()))
            })
            .transpose()?;

        let account = match (map.get(HASHED_PASSWORD), map.get(ACCOUNT_EMAIL)) {
            (Some(hash), Some(email)) if !hash.is_empty() && !email.is_empty() => {
                Some(PendingAccount {
                    email: Email::parse(email)?,
                    password_hash: SecretString::from(hash.as_str()),
                })
            }
            _ => None,
        };

        Ok(Self {
            lines,
            shipping_address,
            identity: DeferredIdentity { user_id, account },
        })
    }
}

fn chunk_key(key: &str, index: usize) -> String {
    if index == 0 {
        key.to_owned()
    } else {
        format!("{key}_{index}")
    }
}

fn put_chunked(map: &mut BTreeMap<String, String>, key: &str, value: &str) {
    let chars: Vec<char> = value.chars().collect();
    if chars.is_empty() {
        map.insert(key.to_owned(), String::new());
        return;
    }
    for (index, chunk) in chars.chunks(MAX_VALUE_CHARS).enumerate() {
        map.insert(chunk_key(key, index), chunk.iter().collect());
    }
}

fn get_chunked(map: &HashMap<String, String>, key: &str) -> Option<String> {
    let mut joined = map.get(key)?.clone();
    for index in 1.. {
        match map.get(&chunk_key(key, index)) {
            Some(part) => joined.push_str(part),
            None => break,
        }
    }
    Some(joined)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn line(n: u32) -> OrderLine {
        OrderLine {
            product_id: format!("prod_00{}", n % 6 + 1),
            name: "CAMOUFLAGE ARM SLEEVE".to_owned(),
            unit_price: Decimal::new(37, 0),
            quantity: n + 1,
            selected_size: Some("L".to_owned()),
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Mara".to_owned(),
            last_name: "Quist".to_owned(),
            email: "mara@aero-x.dev".to_owned(),
            address: "4 Track Lane".to_owned(),
            city: "Lyon".to_owned(),
            postal_code: "69001".to_owned(),
        }
    }

    fn to_hash(map: BTreeMap<String, String>) -> HashMap<String, String> {
        map.into_iter().collect()
    }

    #[test]
    fn test_long_items_are_chunked() {
        let metadata = PaymentMetadata {
            lines: (0..20).map(line).collect(),
            shipping_address: address(),
            identity: DeferredIdentity::default(),
        };

        let encoded = metadata.encode().unwrap();
        assert!(encoded.contains_key("items_1"));
        assert!(encoded.values().all(|v| v.chars().count() <= MAX_VALUE_CHARS));
        assert!(!encoded.contains_key(USER_ID));

        let decoded = PaymentMetadata::decode(&to_hash(encoded)).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_identity_keys() {
        let metadata = PaymentMetadata {
            lines: vec![line(0)],
            shipping_address: address(),
            identity: DeferredIdentity {
                user_id: None,
                account: Some(PendingAccount {
                    email: Email::parse("mara@aero-x.dev").unwrap(),
                    password_hash: SecretString::from("$argon2id$v=19$m=19456,t=2,p=1$abc$def"),
                }),
            },
        };

        let encoded = metadata.encode().unwrap();
        assert_eq!(encoded[ACCOUNT_EMAIL], "mara@aero-x.dev");
        assert!(encoded[HASHED_PASSWORD].starts_with("$argon2id$"));

        let decoded = PaymentMetadata::decode(&to_hash(encoded)).unwrap();
        assert_eq!(decoded.identity, metadata.identity);
    }

    #[test]
    fn test_decode_user_id() {
        let mut map = to_hash(
            PaymentMetadata {
                lines: vec![line(0)],
                shipping_address: address(),
                identity: DeferredIdentity::default(),
            }
            .encode()
            .unwrap(),
        );
        map.insert(USER_ID.to_owned(), "12".to_owned());
        let decoded = PaymentMetadata::decode(&map).unwrap();
        assert_eq!(decoded.identity.user_id, Some(UserId::new(12)));

        map.insert(USER_ID.to_owned(), "twelve".to_owned());
        assert!(matches!(
            PaymentMetadata::decode(&map),
            Err(MetadataError::InvalidUserId(_))
        ));
    }

    #[test]
    fn test_decode_missing_and_malformed() {
        let mut map = HashMap::new();
        assert!(matches!(
            PaymentMetadata::decode(&map),
            Err(MetadataError::Missing(ITEMS))
        ));

        map.insert(ITEMS.to_owned(), "[{".to_owned());
        map.insert(SHIPPING_ADDRESS.to_owned(), "{}".to_owned());
        assert!(matches!(
            PaymentMetadata::decode(&map),
            Err(MetadataError::Malformed { key: ITEMS, .. })
        ));
    }

    #[test]
    fn test_oversized_order_rejected() {
        let metadata = PaymentMetadata {
            lines: (0..400).map(line).collect(),
            shipping_address: address(),
            identity: DeferredIdentity::default(),
        };
        assert!(matches!(metadata.encode(), Err(MetadataError::TooLarge(_))));
    }
}
