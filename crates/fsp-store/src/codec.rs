use fsp_types::{FieldSet, ScopeId};

use crate::error::{StoreError, StoreResult};

/// Byte encoding of a field set for its backing file.
pub trait FieldSetCodec: Send + Sync {
    /// Encode a field set.
    fn encode(&self, fields: &FieldSet) -> StoreResult<Vec<u8>>;

    /// Decode a field set on behalf of `scope`. Codecs that resolve type
    /// names per scope use it; others ignore it.
    fn decode(&self, bytes: &[u8], scope: &ScopeId) -> StoreResult<FieldSet>;
}

/// Pretty-printed JSON codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl FieldSetCodec for JsonCodec {
    fn encode(&self, fields: &FieldSet) -> StoreResult<Vec<u8>> {
        serde_json::to_vec_pretty(fields).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8], _scope: &ScopeId) -> StoreResult<FieldSet> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsp_types::{FieldValue, Record, Uuid};

    #[test]
    fn json_roundtrip_with_nested_values() {
        let fields = FieldSet::typed("Order")
            .with("id", 7)
            .with("lines", FieldValue::List(vec![FieldValue::Object(Record::with_uid(
                Uuid::now_v7(),
                FieldSet::new().with("sku", "A-1").with("qty", 2),
            ))]))
            .with("note", FieldValue::Null);
        let bytes = JsonCodec.encode(&fields).unwrap();
        let decoded = JsonCodec.decode(&bytes, &ScopeId::default()).unwrap();
        assert_eq!(decoded, fields);
    }

    #[test]
    fn decode_garbage_fails() {
        let err = JsonCodec.decode(b"{ not json", &ScopeId::default()).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn decode_empty_input_fails() {
        assert!(JsonCodec.decode(b"", &ScopeId::default()).is_err());
    }
}
