//! Schema-driven compact binary codec.
//!
//! Fields are written back to back in schema order using bincode's fixed-width
//! little-endian encoding: integers at their natural width, `bool` as one byte,
//! strings and byte arrays as a `u64` length followed by the raw bytes. There is
//! no field name or tag on the wire, so decoding needs the same [`RecordSchema`].

use std::sync::Arc;

use bincode::Options;

use crate::codec::{Codec, CodecOptions, Decoded};
use crate::error::DecodeError;
use crate::record::{Record, Value};
use crate::schema::{RecordSchema, TypeTag};

const CODEC: &str = "bincode";

fn encode_value(buf: &mut Vec<u8>, value: &Value) -> bincode::Result<()> {
    match value {
        Value::String(s) => bincode::serialize_into(buf, s),
        Value::U8(v) => bincode::serialize_into(buf, v),
        Value::U16(v) => bincode::serialize_into(buf, v),
        Value::U32(v) => bincode::serialize_into(buf, v),
        Value::U64(v) => bincode::serialize_into(buf, v),
        Value::Bool(v) => bincode::serialize_into(buf, v),
        Value::Bytes(b) => bincode::serialize_into(buf, b),
    }
}

fn decode_value(cursor: &mut &[u8], tag: TypeTag) -> bincode::Result<Value> {
    // A length prefix may not claim more than what is left of the input.
    let opts = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(cursor.len() as u64);
    Ok(match tag {
        TypeTag::String => Value::String(opts.deserialize_from(cursor)?),
        TypeTag::U8 => Value::U8(opts.deserialize_from(cursor)?),
        TypeTag::U16 => Value::U16(opts.deserialize_from(cursor)?),
        TypeTag::U32 => Value::U32(opts.deserialize_from(cursor)?),
        TypeTag::U64 => Value::U64(opts.deserialize_from(cursor)?),
        TypeTag::Bool => Value::Bool(opts.deserialize_from(cursor)?),
        TypeTag::Bytes => Value::Bytes(opts.deserialize_from(cursor)?),
    })
}

pub fn encode(record: &Record) -> Result<Vec<u8>, DecodeError> {
    let mut buf = Vec::with_capacity(64);
    for value in record.values() {
        encode_value(&mut buf, value).map_err(|e| DecodeError::codec(CODEC, e))?;
    }
    Ok(buf)
}

/// Decode one record laid out by `schema`.
///
/// Unless `options.unchecked` is set, bytes left over after the last field are an error.
pub fn decode(
    bytes: &[u8],
    schema: &Arc<RecordSchema>,
    options: CodecOptions,
) -> Result<Decoded, DecodeError> {
    let mut cursor = bytes;
    let mut values = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        let value = decode_value(&mut cursor, field.tag).map_err(|e| DecodeError::Codec {
            codec: CODEC,
            reason: format!("field `{}`: {e}", field.name),
        })?;
        values.push(value);
    }

    if !options.unchecked && !cursor.is_empty() {
        return Err(DecodeError::TrailingBytes {
            remaining: cursor.len(),
        });
    }

    let record = Record::from_parts(Arc::clone(schema), values);
    if options.object {
        Ok(Decoded::Object(record.to_object()))
    } else {
        Ok(Decoded::Record(record))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CompactCodec;

impl Codec for CompactCodec {
    fn name(&self) -> &str {
        CODEC
    }

    fn round_trip(&self, record: &Record, options: CodecOptions) -> Result<Decoded, DecodeError> {
        let bytes = encode(record)?;
        decode(&bytes, record.schema(), options)
    }

    fn encoded_len(&self, record: &Record) -> Result<usize, DecodeError> {
        encode(record).map(|b| b.len())
    }
}
