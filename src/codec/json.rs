use crate::codec::{Codec, CodecOptions, Decoded};
use crate::error::DecodeError;
use crate::record::Record;

const CODEC: &str = "json";

/// Schema-less text round trip through serde_json. Options are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &str {
        CODEC
    }

    fn round_trip(&self, record: &Record, _options: CodecOptions) -> Result<Decoded, DecodeError> {
        let text = serde_json::to_string(record).map_err(|e| DecodeError::codec(CODEC, e))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| DecodeError::codec(CODEC, e))?;
        Ok(Decoded::Object(value))
    }

    fn encoded_len(&self, record: &Record) -> Result<usize, DecodeError> {
        serde_json::to_vec(record)
            .map(|b| b.len())
            .map_err(|e| DecodeError::codec(CODEC, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::verify_round_trip;
    use crate::person;
    use crate::record::Value;
    use crate::schema::RecordSchema;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    #[test]
    fn test_person_round_trip() {
        let record = Record::new(
            person::schema().unwrap(),
            vec![Value::String("name-🍍12".into()), Value::U32(12)],
        )
        .unwrap();
        let decoded = JsonCodec.round_trip(&record, CodecOptions::default()).unwrap();
        assert_eq!(decoded, Decoded::Object(json!({"name": "name-🍍12", "age": 12})));
    }

    #[test]
    fn test_wide_values_survive_text() {
        let schema = RecordSchema::builder("Wide")
            .field("big", "u64")
            .unwrap()
            .field("blob", "bytes")
            .unwrap()
            .field("flag", "bool")
            .unwrap()
            .build()
            .unwrap();
        let record = Record::new(
            schema,
            vec![
                Value::U64(u64::MAX),
                Value::Bytes(vec![9, 8, 7]),
                Value::Bool(false),
            ],
        )
        .unwrap();

        verify_round_trip(&JsonCodec, &record, CodecOptions::default()).unwrap();
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let schema = person::schema().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        for _ in 0..50 {
            let record = person::generate(&schema, &mut rng);
            let first = verify_round_trip(&JsonCodec, &record, CodecOptions::default()).unwrap();
            let second = JsonCodec.round_trip(&record, CodecOptions::default()).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_encoded_len_counts_utf8_bytes() {
        let record = Record::new(
            person::schema().unwrap(),
            vec![Value::String("🍍".into()), Value::U32(1)],
        )
        .unwrap();
        // {"name":"🍍","age":1}
        assert_eq!(JsonCodec.encoded_len(&record).unwrap(), 23);
    }
}
