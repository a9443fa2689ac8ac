//! Protobuf codec driven by a `.proto` file compiled at startup.
//!
//! The schema file is compiled with protox and the named message type is
//! resolved from the resulting descriptor pool. Every record field is bound to a
//! message field of the same name once, in [`ProtoCodec::load`]; the per-call
//! path only builds, encodes and decodes dynamic messages.

use std::path::Path;
use std::sync::Arc;

use prost::bytes::Bytes;
use prost::Message as _;
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, Value as ProtoValue};
use serde_json::json;
use tracing::debug;

use crate::codec::{Codec, CodecOptions, Decoded};
use crate::error::{BenchError, DecodeError};
use crate::record::{Record, Value};
use crate::schema::{RecordSchema, TypeTag};

const CODEC: &str = "protobuf";

pub const DEFAULT_SCHEMA_PATH: &str = "proto/message.proto";
pub const DEFAULT_MESSAGE: &str = "Message";

#[derive(Debug, Clone)]
struct Binding {
    field: FieldDescriptor,
    tag: TypeTag,
    /// Position in the record schema.
    index: usize,
}

#[derive(Debug, Clone)]
pub struct ProtoCodec {
    descriptor: MessageDescriptor,
    schema: Arc<RecordSchema>,
    bindings: Vec<Binding>,
}

fn compatible(tag: TypeTag, kind: &Kind) -> bool {
    matches!(
        (tag, kind),
        (TypeTag::String, Kind::String)
            | (
                TypeTag::U8 | TypeTag::U16 | TypeTag::U32,
                Kind::Uint32 | Kind::Fixed32
            )
            | (TypeTag::U64, Kind::Uint64 | Kind::Fixed64)
            | (TypeTag::Bool, Kind::Bool)
            | (TypeTag::Bytes, Kind::Bytes)
    )
}

fn to_proto(value: &Value) -> ProtoValue {
    match value {
        Value::String(s) => ProtoValue::String(s.clone()),
        Value::U8(v) => ProtoValue::U32(u32::from(*v)),
        Value::U16(v) => ProtoValue::U32(u32::from(*v)),
        Value::U32(v) => ProtoValue::U32(*v),
        Value::U64(v) => ProtoValue::U64(*v),
        Value::Bool(v) => ProtoValue::Bool(*v),
        Value::Bytes(b) => ProtoValue::Bytes(Bytes::copy_from_slice(b)),
    }
}

impl ProtoCodec {
    /// Compile `path`, look up `message` and bind it to `schema`.
    ///
    /// Every failure here is a configuration error: the file is missing or does
    /// not compile, the message type does not exist, or a record field has no
    /// compatible counterpart in the message.
    pub fn load(
        path: impl AsRef<Path>,
        message: &str,
        schema: &Arc<RecordSchema>,
    ) -> Result<Self, BenchError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(BenchError::configuration(format!(
                "protobuf schema file {} not found",
                path.display()
            )));
        }

        let include = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let compile_err = |e: protox::Error| {
            BenchError::configuration(format!("failed to compile {}: {e}", path.display()))
        };
        let mut compiler = protox::Compiler::new([include]).map_err(compile_err)?;
        compiler.open_file(path).map_err(compile_err)?;
        let pool = compiler.descriptor_pool();

        // Accept either the fully-qualified name or the bare message name.
        let descriptor = pool
            .get_message_by_name(message)
            .or_else(|| pool.all_messages().find(|m| m.name() == message))
            .ok_or_else(|| {
                BenchError::configuration(format!(
                    "message type `{message}` not found in {}",
                    path.display()
                ))
            })?;

        debug!(message = descriptor.full_name(), path = %path.display(), "loaded protobuf schema");
        Self::bind(descriptor, schema)
    }

    /// Bind every field of `schema` to the message field with the same name.
    pub fn bind(
        descriptor: MessageDescriptor,
        schema: &Arc<RecordSchema>,
    ) -> Result<Self, BenchError> {
        let mut bindings = Vec::with_capacity(schema.len());
        for (index, field) in schema.fields().iter().enumerate() {
            let proto_field = descriptor.get_field_by_name(&field.name).ok_or_else(|| {
                BenchError::configuration(format!(
                    "message `{}` has no field `{}`",
                    descriptor.full_name(),
                    field.name
                ))
            })?;

            let kind = proto_field.kind();
            if proto_field.is_list() || proto_field.is_map() || !compatible(field.tag, &kind) {
                return Err(BenchError::configuration(format!(
                    "field `{}` is {} in `{}` but {:?} in `{}`",
                    field.name,
                    field.tag,
                    schema.type_name(),
                    kind,
                    descriptor.full_name()
                )));
            }

            bindings.push(Binding {
                field: proto_field,
                tag: field.tag,
                index,
            });
        }

        Ok(Self {
            descriptor,
            schema: Arc::clone(schema),
            bindings,
        })
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, DecodeError> {
        if !Arc::ptr_eq(record.schema(), &self.schema) && record.schema() != &self.schema {
            return Err(DecodeError::codec(
                CODEC,
                format!(
                    "record type `{}` is not bound to `{}`",
                    record.schema().type_name(),
                    self.descriptor.full_name()
                ),
            ));
        }

        let mut message = DynamicMessage::new(self.descriptor.clone());
        for binding in &self.bindings {
            message
                .try_set_field(&binding.field, to_proto(&record.values()[binding.index]))
                .map_err(|e| DecodeError::codec(CODEC, e))?;
        }
        Ok(message.encode_to_vec())
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicMessage, DecodeError> {
        DynamicMessage::decode(self.descriptor.clone(), bytes)
            .map_err(|e| DecodeError::codec(CODEC, e))
    }

    /// Plain object with every bound field, defaults included.
    pub fn to_object(&self, message: &DynamicMessage) -> Result<serde_json::Value, DecodeError> {
        let mut object = serde_json::Map::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let value = message.get_field(&binding.field);
            let json = match &*value {
                ProtoValue::String(s) => json!(s),
                ProtoValue::U32(v) => json!(v),
                ProtoValue::U64(v) => json!(v),
                ProtoValue::Bool(v) => json!(v),
                ProtoValue::Bytes(b) => json!(&b[..]),
                other => {
                    return Err(DecodeError::mismatch(
                        binding.field.name(),
                        format!("unexpected protobuf value {other:?}"),
                    ))
                }
            };
            object.insert(binding.field.name().to_string(), json);
        }
        Ok(serde_json::Value::Object(object))
    }

    /// Typed record, range-checking fields narrower than their wire type.
    pub fn to_record(&self, message: &DynamicMessage) -> Result<Record, DecodeError> {
        let mut values = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let field = binding.field.name();
            let value = message.get_field(&binding.field);
            let out_of_range = |v: u32| DecodeError::OutOfRange {
                field: field.to_string(),
                value: u64::from(v),
            };
            let converted = match (binding.tag, &*value) {
                (TypeTag::String, ProtoValue::String(s)) => Value::String(s.clone()),
                (TypeTag::U8, ProtoValue::U32(v)) => {
                    Value::U8(u8::try_from(*v).map_err(|_| out_of_range(*v))?)
                }
                (TypeTag::U16, ProtoValue::U32(v)) => {
                    Value::U16(u16::try_from(*v).map_err(|_| out_of_range(*v))?)
                }
                (TypeTag::U32, ProtoValue::U32(v)) => Value::U32(*v),
                (TypeTag::U64, ProtoValue::U64(v)) => Value::U64(*v),
                (TypeTag::Bool, ProtoValue::Bool(v)) => Value::Bool(*v),
                (TypeTag::Bytes, ProtoValue::Bytes(b)) => Value::Bytes(b.to_vec()),
                (tag, other) => {
                    return Err(DecodeError::mismatch(
                        field,
                        format!("expected {tag}, got {other:?}"),
                    ))
                }
            };
            values.push(converted);
        }
        Ok(Record::from_parts(Arc::clone(&self.schema), values))
    }
}

impl Codec for ProtoCodec {
    fn name(&self) -> &str {
        CODEC
    }

    /// encode, decode, then convert to an object (or back into a typed record).
    fn round_trip(&self, record: &Record, options: CodecOptions) -> Result<Decoded, DecodeError> {
        let bytes = self.encode(record)?;
        let message = self.decode(&bytes)?;
        if options.object {
            self.to_object(&message).map(Decoded::Object)
        } else {
            self.to_record(&message).map(Decoded::Record)
        }
    }

    fn encoded_len(&self, record: &Record) -> Result<usize, DecodeError> {
        self.encode(record).map(|b| b.len())
    }
}
