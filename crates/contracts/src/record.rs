//! Record types - the unit of work flowing from sources to the broker
//!
//! A `Record` carries semantic key/value fields; the publish session encodes
//! it into a `WireRecord` according to the configured serializers.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A typed key or value field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// 32-bit signed integer, encoded big-endian on the wire
    Integer(i32),
    /// UTF-8 text
    Text(String),
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A single key/value/topic unit of work, immutable once constructed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Destination topic name
    pub topic: String,
    /// Optional key (records without a key are partitioned round-robin by the broker)
    pub key: Option<FieldValue>,
    /// Value payload
    pub value: FieldValue,
}

impl Record {
    /// Create a keyed record
    pub fn keyed(
        topic: impl Into<String>,
        key: impl Into<FieldValue>,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self {
            topic: topic.into(),
            key: Some(key.into()),
            value: value.into(),
        }
    }

    /// Create a keyless record
    pub fn value_only(topic: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            value: value.into(),
        }
    }
}

/// A record after serialization, ready for the broker link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRecord {
    /// Destination topic name
    pub topic: String,
    /// Encoded key bytes
    pub key: Option<Bytes>,
    /// Encoded value bytes
    pub payload: Bytes,
}

/// Broker acknowledgment for one delivered record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Topic the record landed on
    pub topic: String,
    /// Partition assigned by the broker
    pub partition: i32,
    /// Offset assigned by the broker
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_record() {
        let record = Record::keyed("events", 7, "payload");
        assert_eq!(record.topic, "events");
        assert_eq!(record.key, Some(FieldValue::Integer(7)));
        assert_eq!(record.value, FieldValue::Text("payload".to_string()));
    }

    #[test]
    fn test_value_only_record_has_no_key() {
        let record = Record::value_only("events", "line one");
        assert!(record.key.is_none());
    }
}
