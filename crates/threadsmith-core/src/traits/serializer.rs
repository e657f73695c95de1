//! Pluggable record serialization

use crate::{StoreError, Versioned};
use serde::{Serialize, de::DeserializeOwned};

/// Trait for record encodings
///
/// Records are stored as opaque bytes; the serializer decides the wire form.
pub trait Serializer: Send + Sync + Clone + 'static {
    /// Name of the serializer (for debugging/metrics)
    fn name(&self) -> &str;

    /// Serialize a value to bytes
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, StoreError>;

    /// Deserialize bytes to a value
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, StoreError>;

    /// Deserialize a versioned record, rejecting newer schemas
    fn deserialize_versioned<T>(&self, bytes: &[u8]) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Versioned,
    {
        let record: T = self.deserialize(bytes)?;
        record.check_version()?;
        Ok(record)
    }
}

/// JSON serializer (default)
///
/// Human-readable, so records can be inspected with `redis-cli`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GrantSource, PremiumGrant, RECORD_VERSION};
    use chrono::Utc;

    #[test]
    fn test_json_struct() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct TestStruct {
            name: String,
            value: i32,
        }

        let serializer = JsonSerializer;
        let value = TestStruct {
            name: "test".to_string(),
            value: 42,
        };

        let bytes = serializer.serialize(&value).unwrap();
        let decoded: TestStruct = serializer.deserialize(&bytes).unwrap();

        assert_eq!(value, decoded);
    }

    #[test]
    fn test_garbage_is_deserialization_error() {
        let result: Result<Vec<i32>, _> = JsonSerializer.deserialize(b"not json");
        assert!(matches!(result, Err(StoreError::Deserialization(_))));
    }

    #[test]
    fn test_versioned_rejects_future_schema() {
        let mut grant = PremiumGrant::new("monthly", GrantSource::Ip, Utc::now(), 30);
        grant.version = RECORD_VERSION + 5;
        let bytes = JsonSerializer.serialize(&grant).unwrap();

        let result: Result<PremiumGrant, _> = JsonSerializer.deserialize_versioned(&bytes);
        assert!(matches!(result, Err(StoreError::UnsupportedVersion { .. })));
    }

    #[test]
    fn test_json_serializer_name() {
        assert_eq!(JsonSerializer.name(), "json");
    }
}
