//! Record serialization per the configured serializer selection
//!
//! Integer fields encode as 4-byte big-endian, text fields as raw UTF-8,
//! matching the wire conventions of the common broker serializers.

use bytes::Bytes;
use contracts::{DispatchError, FieldValue, Record, SerializerKind, WireRecord};

/// Encode a record into its wire form
///
/// # Errors
/// A field that does not match its configured serializer kind is a
/// per-record delivery error; it never poisons the session.
pub fn encode(
    record: &Record,
    key_kind: SerializerKind,
    value_kind: SerializerKind,
) -> Result<WireRecord, DispatchError> {
    let key = record
        .key
        .as_ref()
        .map(|k| encode_field(k, key_kind, &record.topic, "key"))
        .transpose()?;
    let payload = encode_field(&record.value, value_kind, &record.topic, "value")?;

    Ok(WireRecord {
        topic: record.topic.clone(),
        key,
        payload,
    })
}

fn encode_field(
    value: &FieldValue,
    kind: SerializerKind,
    topic: &str,
    role: &str,
) -> Result<Bytes, DispatchError> {
    match (kind, value) {
        (SerializerKind::Integer, FieldValue::Integer(i)) => {
            Ok(Bytes::copy_from_slice(&i.to_be_bytes()))
        }
        (SerializerKind::Text, FieldValue::Text(s)) => Ok(Bytes::copy_from_slice(s.as_bytes())),
        (SerializerKind::Integer, FieldValue::Text(_)) => Err(DispatchError::delivery(
            topic,
            format!("{role} serializer expects an integer, got text"),
        )),
        (SerializerKind::Text, FieldValue::Integer(_)) => Err(DispatchError::delivery(
            topic,
            format!("{role} serializer expects text, got an integer"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_key_big_endian() {
        let record = Record::keyed("t", 258, "v");
        let wire = encode(&record, SerializerKind::Integer, SerializerKind::Text).unwrap();
        assert_eq!(wire.key.as_deref(), Some(&[0u8, 0, 1, 2][..]));
        assert_eq!(wire.payload.as_ref(), b"v");
    }

    #[test]
    fn test_keyless_record() {
        let record = Record::value_only("t", "line");
        let wire = encode(&record, SerializerKind::Integer, SerializerKind::Text).unwrap();
        assert!(wire.key.is_none());
        assert_eq!(wire.payload.as_ref(), b"line");
    }

    #[test]
    fn test_kind_mismatch_is_delivery_error() {
        let record = Record::keyed("t", "text-key", "v");
        let result = encode(&record, SerializerKind::Integer, SerializerKind::Text);
        assert!(matches!(
            result,
            Err(DispatchError::Delivery { ref topic, .. }) if topic == "t"
        ));
    }

    #[test]
    fn test_text_value_round_trips_utf8() {
        let record = Record::value_only("t", "héllo");
        let wire = encode(&record, SerializerKind::Text, SerializerKind::Text).unwrap();
        assert_eq!(std::str::from_utf8(wire.payload.as_ref()).unwrap(), "héllo");
    }
}
