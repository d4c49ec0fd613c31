use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Namespace used to derive a stable [`DeviceId`] from a device name
const DEVICE_NAMESPACE: Uuid = Uuid::from_u128(0x3b6f_9d2e_41a7_5c08_b2e4_7f19_c6d3_a850);

/// A validated device name taken from the request path
///
/// Only ASCII letters, digits, `_` and `-` are accepted, and the name must not
/// be empty. The name is the partition key for all stored state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceName(String);

impl DeviceName {
    /// Parse a raw path segment, returning `None` if it falls outside the charset
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.is_empty() && raw.chars().all(is_name_char) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which a per-device write token is configured
    pub fn token_key(&self) -> String {
        self.0.to_ascii_uppercase()
    }

    /// Deterministic identity for this name; equal names always map to the same id
    pub fn id(&self) -> DeviceId {
        DeviceId(Uuid::new_v5(&DEVICE_NAMESPACE, self.0.as_bytes()))
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Stable identity of a device, used to key store instances and backend rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(Uuid);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The single stored address for one device
#[derive(Debug, Clone, PartialEq)]
pub struct AddressRecord {
    pub device: String,
    pub ip: String,
    pub updated_at: DateTime<Utc>,
}

impl AddressRecord {
    /// Build a record for an address that has already passed validation
    pub fn new(device: &DeviceName, ip: String) -> Self {
        Self {
            device: device.to_string(),
            ip,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_name_charset() {
        for raw in ["router1", "ROUTER-1", "home_nas", "a", "0-_-9"] {
            assert!(DeviceName::parse(raw).is_some(), "'{}' should be accepted", raw);
        }
    }

    #[test]
    fn test_parse_rejects_other_characters() {
        for raw in ["", "router 1", "router.1", "router/1", "räuter", "a%20b", "name!"] {
            assert!(DeviceName::parse(raw).is_none(), "'{}' should be rejected", raw);
        }
    }

    #[test]
    fn test_token_key_is_upper_cased() {
        let name = DeviceName::parse("router1").unwrap();
        assert_eq!(name.token_key(), "ROUTER1");

        let name = DeviceName::parse("home-nas_2").unwrap();
        assert_eq!(name.token_key(), "HOME-NAS_2");
    }

    #[test]
    fn test_id_is_deterministic() {
        let a = DeviceName::parse("router1").unwrap();
        let b = DeviceName::parse("router1").unwrap();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_id_differs_between_names() {
        let a = DeviceName::parse("router1").unwrap();
        let b = DeviceName::parse("router2").unwrap();
        let upper = DeviceName::parse("ROUTER1").unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), upper.id());
    }
}
