//! The default benchmark record: a short unicode name and a small age.

use std::sync::Arc;

use rand::Rng;

use crate::error::SchemaError;
use crate::record::{Record, Value};
use crate::schema::RecordSchema;

pub const TYPE_NAME: &str = "Person";

/// Exclusive upper bound for the random suffix and age.
const MAX_RANDOM: u32 = 254;

pub fn schema() -> Result<Arc<RecordSchema>, SchemaError> {
    RecordSchema::builder(TYPE_NAME)
        .field("name", "string")?
        .field("age", "u32")?
        .build()
}

/// One random person. `schema` must come from [`schema`].
pub fn generate<R: Rng + ?Sized>(schema: &Arc<RecordSchema>, rng: &mut R) -> Record {
    let name = format!("name-🍍{}", rng.gen_range(0..MAX_RANDOM));
    let age = rng.gen_range(0..MAX_RANDOM);
    Record::from_parts(
        Arc::clone(schema),
        vec![Value::String(name), Value::U32(age)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generated_person_follows_schema() {
        let schema = schema().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            let person = generate(&schema, &mut rng);
            // Re-validate through the checked constructor.
            Record::new(Arc::clone(&schema), person.values().to_vec()).unwrap();

            match person.get("age") {
                Some(Value::U32(age)) => assert!(*age < MAX_RANDOM),
                other => panic!("unexpected age {other:?}"),
            }
            match person.get("name") {
                Some(Value::String(name)) => assert!(name.starts_with("name-🍍")),
                other => panic!("unexpected name {other:?}"),
            }
        }
    }
}
