use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ORDER_ID_PREFIX: &str = "ORD";
const TIMESTAMP_LEN: usize = 14;
const SUFFIX_LEN: usize = 8;

/// Externally visible order identifier.
///
/// Formatted as `ORD` + `YYYYMMDDHHMMSS` (UTC) + 8 uppercase hex characters,
/// e.g. `ORD20251211123456A1B2C3D4`. The suffix comes from a random v4 UUID so
/// two orders created in the same second do not collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Generates a fresh order ID stamped with the given creation time.
    pub fn generate(at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..SUFFIX_LEN].to_uppercase();
        Self(format!(
            "{ORDER_ID_PREFIX}{}{suffix}",
            at.format("%Y%m%d%H%M%S")
        ))
    }

    /// Parses and validates an order ID received from a client.
    pub fn parse(raw: &str) -> Result<Self, ParseOrderIdError> {
        let raw = raw.trim();
        let Some(rest) = raw.strip_prefix(ORDER_ID_PREFIX) else {
            return Err(ParseOrderIdError(raw.to_string()));
        };

        let bytes = rest.as_bytes();
        let well_formed = bytes.len() == TIMESTAMP_LEN + SUFFIX_LEN
            && bytes[..TIMESTAMP_LEN].iter().all(u8::is_ascii_digit)
            && bytes[TIMESTAMP_LEN..]
                .iter()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase());

        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(ParseOrderIdError(raw.to_string()))
        }
    }

    /// Wraps a value loaded from storage without re-validating it.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for OrderId {
    type Err = ParseOrderIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returned when a string is not a well-formed order ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOrderIdError(pub String);

impl std::fmt::Display for ParseOrderIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid order ID: {:?}", self.0)
    }
}

impl std::error::Error for ParseOrderIdError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_ids_embed_creation_time() {
        let at = Utc.with_ymd_and_hms(2025, 12, 11, 12, 34, 56).unwrap();
        let id = OrderId::generate(at);
        assert!(id.as_str().starts_with("ORD20251211123456"));
        assert_eq!(id.as_str().len(), 3 + 14 + 8);
    }

    #[test]
    fn generated_ids_are_unique_within_a_second() {
        let at = Utc::now();
        assert_ne!(OrderId::generate(at), OrderId::generate(at));
    }

    #[test]
    fn generated_ids_parse_back() {
        let id = OrderId::generate(Utc::now());
        assert_eq!(OrderId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        assert!(OrderId::parse("").is_err());
        assert!(OrderId::parse("ORD123").is_err());
        assert!(OrderId::parse("XYZ20251211123456A1B2C3D4").is_err());
        assert!(OrderId::parse("ORD2025121112345XA1B2C3D4").is_err());
        assert!(OrderId::parse("ORD20251211123456a1b2c3d4").is_err());
    }

    #[test]
    fn parse_rejects_multibyte_input_without_panicking() {
        let raw = format!("ORD{}é{}", "1".repeat(13), "A".repeat(7));
        assert_eq!(raw.len(), 3 + 14 + 8);
        assert!(OrderId::parse(&raw).is_err());
        assert!(OrderId::parse("ORD2025121112345éA1B2C3D").is_err());
    }

    #[test]
    fn order_id_serializes_as_plain_string() {
        let id = OrderId::from_stored("ORD20251211123456A1B2C3D4");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ORD20251211123456A1B2C3D4\"");
    }
}
