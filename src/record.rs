//! Record instances: positional values bound to a [`RecordSchema`].

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::json;

use crate::error::SchemaError;
use crate::schema::{RecordSchema, TypeTag};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    String(String),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::String(_) => TypeTag::String,
            Value::U8(_) => TypeTag::U8,
            Value::U16(_) => TypeTag::U16,
            Value::U32(_) => TypeTag::U32,
            Value::U64(_) => TypeTag::U64,
            Value::Bool(_) => TypeTag::Bool,
            Value::Bytes(_) => TypeTag::Bytes,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => json!(s),
            Value::U8(v) => json!(v),
            Value::U16(v) => json!(v),
            Value::U32(v) => json!(v),
            Value::U64(v) => json!(v),
            Value::Bool(v) => json!(v),
            Value::Bytes(b) => json!(b),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::U8(v) => serializer.serialize_u8(*v),
            Value::U16(v) => serializer.serialize_u16(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            // Plain number array so text codecs see the same shape as `to_json`.
            Value::Bytes(b) => serializer.collect_seq(b),
        }
    }
}

/// An immutable record. Values are stored in schema field order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    values: Vec<Value>,
}

impl Record {
    pub fn new(schema: Arc<RecordSchema>, values: Vec<Value>) -> Result<Self, SchemaError> {
        if values.len() != schema.len() {
            return Err(SchemaError::ArityMismatch {
                record: schema.type_name().to_string(),
                expected: schema.len(),
                actual: values.len(),
            });
        }
        for (field, value) in schema.fields().iter().zip(&values) {
            if field.tag != value.tag() {
                return Err(SchemaError::TypeMismatch {
                    field: field.name.clone(),
                    expected: field.tag,
                    actual: value.tag(),
                });
            }
        }
        Ok(Self { schema, values })
    }

    /// Build from values already known to follow `schema`, e.g. produced by decoding it.
    pub(crate) fn from_parts(schema: Arc<RecordSchema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    /// Plain structural form, keyed by field name.
    pub fn to_object(&self) -> serde_json::Value {
        let map = self
            .schema
            .fields()
            .iter()
            .zip(&self.values)
            .map(|(field, value)| (field.name.clone(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in self.schema.fields().iter().zip(&self.values) {
            map.serialize_entry(&field.name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Arc<RecordSchema> {
        RecordSchema::builder("Test")
            .field("name", "string")
            .unwrap()
            .field("age", "u32")
            .unwrap()
            .field("blob", "bytes")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_record_validates_against_schema() {
        let ok = Record::new(
            schema(),
            vec![
                Value::String("a".into()),
                Value::U32(1),
                Value::Bytes(vec![1, 2]),
            ],
        );
        assert!(ok.is_ok());

        let short = Record::new(schema(), vec![Value::String("a".into())]).unwrap_err();
        assert!(matches!(
            short,
            SchemaError::ArityMismatch {
                expected: 3,
                actual: 1,
                ..
            }
        ));

        let wrong = Record::new(
            schema(),
            vec![
                Value::String("a".into()),
                Value::U64(1),
                Value::Bytes(vec![]),
            ],
        )
        .unwrap_err();
        assert_eq!(
            wrong,
            SchemaError::TypeMismatch {
                field: "age".to_string(),
                expected: TypeTag::U32,
                actual: TypeTag::U64,
            }
        );
    }

    #[test]
    fn test_to_object_matches_serialized_json() {
        let record = Record::new(
            schema(),
            vec![
                Value::String("name-🍍7".into()),
                Value::U32(42),
                Value::Bytes(vec![0, 255]),
            ],
        )
        .unwrap();

        let text = serde_json::to_string(&record).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, record.to_object());
        assert_eq!(parsed["blob"], json!([0, 255]));
        assert_eq!(record.get("age"), Some(&Value::U32(42)));
    }
}
