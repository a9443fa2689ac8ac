//! Codec adapters: one uniform round-trip entry point per serialization strategy.

pub mod compact;
pub mod json;
pub mod proto;

use crate::error::DecodeError;
use crate::record::Record;

pub use compact::CompactCodec;
pub use json::JsonCodec;
pub use proto::ProtoCodec;

/// Decode-side switches. Codecs ignore the ones that mean nothing to them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodecOptions {
    /// Skip post-decode validation.
    pub unchecked: bool,
    /// Return a plain structural value instead of a typed record.
    pub object: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            unchecked: true,
            object: true,
        }
    }
}

/// Result of a round trip.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    Record(Record),
    Object(serde_json::Value),
}

impl Decoded {
    pub fn to_object(&self) -> serde_json::Value {
        match self {
            Decoded::Record(record) => record.to_object(),
            Decoded::Object(value) => value.clone(),
        }
    }
}

pub trait Codec {
    /// Trial name.
    fn name(&self) -> &str;

    /// Encode `record`, then decode the bytes back.
    fn round_trip(&self, record: &Record, options: CodecOptions) -> Result<Decoded, DecodeError>;

    /// Size of the encoded form of `record`.
    fn encoded_len(&self, record: &Record) -> Result<usize, DecodeError>;
}

/// Round trip `record` and check every declared field came back unchanged.
pub fn verify_round_trip(
    codec: &dyn Codec,
    record: &Record,
    options: CodecOptions,
) -> Result<Decoded, DecodeError> {
    let decoded = codec.round_trip(record, options)?;
    let expected = record.to_object();
    let actual = decoded.to_object();

    for field in record.schema().fields() {
        let want = &expected[field.name.as_str()];
        match actual.get(field.name.as_str()) {
            Some(got) if got == want => {}
            Some(got) => {
                return Err(DecodeError::mismatch(
                    &field.name,
                    format!("expected {want}, got {got}"),
                ))
            }
            None => return Err(DecodeError::mismatch(&field.name, "missing after decode")),
        }
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person;
    use crate::CodecKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    /// Hands back a fixed object regardless of input.
    struct Constant(serde_json::Value);

    impl Codec for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn round_trip(&self, _: &Record, _: CodecOptions) -> Result<Decoded, DecodeError> {
            Ok(Decoded::Object(self.0.clone()))
        }

        fn encoded_len(&self, _: &Record) -> Result<usize, DecodeError> {
            Ok(0)
        }
    }

    #[test]
    fn test_verify_detects_changed_field() {
        let schema = person::schema().unwrap();
        let record = person::generate(&schema, &mut ChaCha8Rng::seed_from_u64(1));
        let mut tampered = record.to_object();
        tampered["age"] = json!(9_999);

        let err = verify_round_trip(&Constant(tampered), &record, CodecOptions::default())
            .unwrap_err();
        assert!(matches!(err, DecodeError::Mismatch { field, .. } if field == "age"));
    }

    #[test]
    fn test_verify_detects_missing_field() {
        let schema = person::schema().unwrap();
        let record = person::generate(&schema, &mut ChaCha8Rng::seed_from_u64(1));

        let err = verify_round_trip(&Constant(json!({})), &record, CodecOptions::default())
            .unwrap_err();
        assert!(matches!(err, DecodeError::Mismatch { field, .. } if field == "name"));
    }

    #[test]
    fn test_verify_accepts_exact_copy() {
        let schema = person::schema().unwrap();
        let record = person::generate(&schema, &mut ChaCha8Rng::seed_from_u64(1));
        let copy = Constant(record.to_object());
        assert!(verify_round_trip(&copy, &record, CodecOptions::default()).is_ok());
    }

    #[test]
    fn test_codec_kind_selection() {
        assert!(CodecKind::All.includes(CodecKind::Json));
        assert!(CodecKind::Json.includes(CodecKind::Json));
        assert!(!CodecKind::Json.includes(CodecKind::Protobuf));
    }
}
