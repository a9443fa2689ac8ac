//! Record type declarations.
//!
//! A [`RecordSchema`] is the ordered field table the compact codec lays bytes out by.
//! Schemas are built once through [`SchemaBuilder`] and shared behind an `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BenchError, SchemaError};

/// Primitive type tags a field can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    String,
    U8,
    U16,
    U32,
    U64,
    Bool,
    Bytes,
}

impl TypeTag {
    pub const ALL: [TypeTag; 7] = [
        TypeTag::String,
        TypeTag::U8,
        TypeTag::U16,
        TypeTag::U32,
        TypeTag::U64,
        TypeTag::Bool,
        TypeTag::Bytes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::U8 => "u8",
            TypeTag::U16 => "u16",
            TypeTag::U32 => "u32",
            TypeTag::U64 => "u64",
            TypeTag::Bool => "bool",
            TypeTag::Bytes => "bytes",
        }
    }

    /// Look a tag up by its lowercase name.
    pub fn from_name(name: &str) -> Option<TypeTag> {
        TypeTag::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub tag: TypeTag,
}

/// Ordered field table for one record type. Order is fixed at build time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSchema {
    type_name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordSchema {
    pub fn builder(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

pub struct SchemaBuilder {
    type_name: String,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    /// Declare the next field. `tag` is a lowercase primitive name such as `"u32"`.
    pub fn field(self, name: &str, tag: &str) -> Result<Self, SchemaError> {
        let tag = TypeTag::from_name(tag).ok_or_else(|| SchemaError::UnsupportedType {
            field: name.to_string(),
            tag: tag.to_string(),
        })?;
        self.typed_field(name, tag)
    }

    pub fn typed_field(mut self, name: &str, tag: TypeTag) -> Result<Self, SchemaError> {
        if self.fields.iter().any(|f| f.name == name) {
            return Err(SchemaError::DuplicateField {
                record: self.type_name,
                field: name.to_string(),
            });
        }
        self.fields.push(FieldDescriptor {
            name: name.to_string(),
            tag,
        });
        Ok(self)
    }

    pub fn build(self) -> Result<Arc<RecordSchema>, SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::Empty {
                record: self.type_name,
            });
        }
        Ok(Arc::new(RecordSchema {
            type_name: self.type_name,
            fields: self.fields,
        }))
    }
}

/// Registration table from record type name to its schema.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<RecordSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: Arc<RecordSchema>) -> Result<Arc<RecordSchema>, BenchError> {
        let name = schema.type_name().to_string();
        if self.schemas.contains_key(&name) {
            return Err(BenchError::configuration(format!(
                "record type `{name}` registered twice"
            )));
        }
        self.schemas.insert(name, Arc::clone(&schema));
        Ok(schema)
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<RecordSchema>> {
        self.schemas.get(type_name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_is_declaration_order() {
        let schema = RecordSchema::builder("Test")
            .field("name", "string")
            .unwrap()
            .field("age", "u32")
            .unwrap()
            .field("active", "bool")
            .unwrap()
            .build()
            .unwrap();

        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "age", "active"]);
        assert_eq!(schema.fields()[1].tag, TypeTag::U32);
        assert_eq!(schema.index_of("active"), Some(2));
        assert_eq!(schema.index_of("missing"), None);
    }

    #[test]
    fn test_unsupported_tag_rejected() {
        let err = RecordSchema::builder("Test")
            .field("ratio", "f32")
            .err()
            .unwrap();
        assert_eq!(
            err,
            SchemaError::UnsupportedType {
                field: "ratio".to_string(),
                tag: "f32".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = RecordSchema::builder("Test")
            .field("name", "string")
            .unwrap()
            .field("name", "u8")
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::DuplicateField { field, .. } if field == "name"));
    }

    #[test]
    fn test_empty_schema_rejected() {
        let err = RecordSchema::builder("Nothing").build().unwrap_err();
        assert!(matches!(err, SchemaError::Empty { .. }));
    }

    #[test]
    fn test_tag_names_round_trip() {
        for tag in TypeTag::ALL {
            assert_eq!(TypeTag::from_name(tag.as_str()), Some(tag));
        }
        assert_eq!(TypeTag::from_name("U32"), None);
    }

    #[test]
    fn test_registry_rejects_second_registration() {
        let schema = RecordSchema::builder("Test")
            .field("name", "string")
            .unwrap()
            .build()
            .unwrap();

        let mut registry = SchemaRegistry::new();
        registry.register(Arc::clone(&schema)).unwrap();
        assert!(registry.get("Test").is_some());
        assert!(matches!(
            registry.register(schema),
            Err(BenchError::Configuration { .. })
        ));
        assert_eq!(registry.len(), 1);
    }
}
