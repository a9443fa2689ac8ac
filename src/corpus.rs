//! Synthetic corpus generation and sampling.
//!
//! A [`Corpus`] is a fixed pool of records built once before any trial runs.
//! Every slot is produced by its own factory call with an RNG derived from the
//! master seed and the slot index, so a given seed always yields the same corpus
//! regardless of how rayon schedules the work.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::codec::compact;
use crate::error::{BenchError, DecodeError};
use crate::record::Record;

/// Default number of records, matching the reference benchmark.
pub const DEFAULT_CORPUS_SIZE: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Corpus {
    records: Vec<Record>,
    seed: u64,
}

fn per_slot_seed(master_seed: u64, index: usize) -> u64 {
    master_seed
        .wrapping_add(index as u64)
        .wrapping_mul(0x517cc1b727220a95)
}

impl Corpus {
    /// Build exactly `count` records, one factory call per slot.
    pub fn generate<F>(count: usize, seed: u64, factory: F) -> Result<Self, BenchError>
    where
        F: Fn(&mut ChaCha8Rng) -> Record + Sync + Send,
    {
        if count == 0 {
            return Err(BenchError::InvalidCorpusSize { count });
        }

        let records: Vec<Record> = (0..count)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(per_slot_seed(seed, i));
                factory(&mut rng)
            })
            .collect();

        info!(count, seed, "generated corpus");
        Ok(Self { records, seed })
    }

    /// Wrap hand-built records, e.g. a fixed regression corpus.
    pub fn from_records(records: Vec<Record>) -> Result<Self, BenchError> {
        if records.is_empty() {
            return Err(BenchError::InvalidCorpusSize { count: 0 });
        }
        Ok(Self { records, seed: 0 })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; a corpus cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Uniform index in `[0, len)`, with replacement.
    pub fn sample_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.records.len())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &Record {
        &self.records[self.sample_index(rng)]
    }

    /// Hex SHA-256 over the compact encoding of every record, in slot order.
    pub fn digest(&self) -> Result<String, DecodeError> {
        let mut hasher = Sha256::new();
        for record in &self.records {
            hasher.update(compact::encode(record)?);
        }
        Ok(hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect())
    }
}
