//! Benchmark runner: registers named trials and times them one after another.
//!
//! A [`Runner`] starts `Idle`, moves to `Registering` on the first trial and is
//! consumed by [`Runner::run`], so a finished session cannot be restarted.
//! Trials never overlap. A trial whose round trip fails is recorded as failed and
//! the run moves on to the next trial.

use std::hint::black_box;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::codec::{verify_round_trip, Codec, CodecOptions};
use crate::corpus::Corpus;
use crate::error::{BenchError, DecodeError};
use crate::harness::{measure_trial, Clock, CyclePolicy, MonotonicClock, Stats, StopReason};
use crate::record::Record;

type RoundTripFn<'a> = Box<dyn FnMut(&Record) -> Result<(), DecodeError> + 'a>;
type CheckFn<'a> = Box<dyn Fn(&Record) -> Result<(), DecodeError> + 'a>;
type SizeFn<'a> = Box<dyn Fn(&Record) -> Result<usize, DecodeError> + 'a>;

/// One named strategy under test.
pub struct Trial<'a> {
    name: String,
    round_trip: RoundTripFn<'a>,
    preflight: Option<CheckFn<'a>>,
    encoded_len: Option<SizeFn<'a>>,
}

impl<'a> Trial<'a> {
    pub fn new<T, F>(name: impl Into<String>, mut round_trip: F) -> Self
    where
        F: FnMut(&Record) -> Result<T, DecodeError> + 'a,
    {
        Self {
            name: name.into(),
            round_trip: Box::new(move |record| {
                round_trip(record).map(|out| {
                    black_box(out);
                })
            }),
            preflight: None,
            encoded_len: None,
        }
    }

    /// Trial named after `codec`, with a fidelity preflight and payload sizing.
    pub fn from_codec(codec: &'a dyn Codec, options: CodecOptions) -> Self {
        Self::new(codec.name(), move |record| codec.round_trip(record, options))
            .with_preflight(move |record| verify_round_trip(codec, record, options).map(drop))
            .with_encoded_len(move |record| codec.encoded_len(record))
    }

    /// Check run over the first corpus slots before timing starts.
    pub fn with_preflight<F>(mut self, check: F) -> Self
    where
        F: Fn(&Record) -> Result<(), DecodeError> + 'a,
    {
        self.preflight = Some(Box::new(check));
        self
    }

    pub fn with_encoded_len<F>(mut self, size: F) -> Self
    where
        F: Fn(&Record) -> Result<usize, DecodeError> + 'a,
    {
        self.encoded_len = Some(Box::new(size));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Registering,
}

pub struct Runner<'a, C: Clock = MonotonicClock> {
    trials: Vec<Trial<'a>>,
    clock: C,
    rng: ChaCha8Rng,
}

impl<'a> Runner<'a, MonotonicClock> {
    /// `seed` drives corpus sampling during the run.
    pub fn new(seed: u64) -> Self {
        Self::with_clock(seed, MonotonicClock::default())
    }
}

impl<'a, C: Clock> Runner<'a, C> {
    pub fn with_clock(seed: u64, clock: C) -> Self {
        Self {
            trials: Vec::new(),
            clock,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> RunnerState {
        if self.trials.is_empty() {
            RunnerState::Idle
        } else {
            RunnerState::Registering
        }
    }

    pub fn trial_names(&self) -> impl Iterator<Item = &str> {
        self.trials.iter().map(|t| t.name())
    }

    /// Add a trial; names must be unique within a runner.
    pub fn try_register(&mut self, trial: Trial<'a>) -> Result<&mut Self, BenchError> {
        if self.trials.iter().any(|t| t.name == trial.name) {
            return Err(BenchError::configuration(format!(
                "trial `{}` registered twice",
                trial.name
            )));
        }
        self.trials.push(trial);
        Ok(self)
    }

    /// Like [`Runner::try_register`], but a duplicate name is logged and skipped.
    pub fn register(&mut self, trial: Trial<'a>) -> &mut Self {
        let name = trial.name.clone();
        if let Err(err) = self.try_register(trial) {
            warn!(trial = %name, %err, "ignoring trial");
        }
        self
    }

    /// Run every registered trial in registration order.
    pub fn run(self, corpus: &Corpus, policy: &CyclePolicy) -> Result<RunReport, BenchError> {
        if self.trials.is_empty() {
            return Err(BenchError::configuration("no trials registered"));
        }

        let Runner {
            trials,
            clock,
            mut rng,
        } = self;

        let outcomes = trials
            .into_iter()
            .map(|trial| run_trial(&clock, &mut rng, trial, corpus, policy))
            .collect();

        Ok(RunReport::from_outcomes(outcomes))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Preflight,
    Timed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrialResult {
    pub name: String,
    pub ops_per_sec: f64,
    pub stats: Stats,
    pub total_ops: u64,
    pub total_ns: u128,
    pub warmup_iters: u64,
    pub stop: StopReason,
    /// Mean encoded size over the preflight slots, when the trial can size payloads.
    pub bytes_per_op: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrialFailure {
    pub name: String,
    pub phase: Phase,
    /// Corpus slot whose round trip failed.
    pub sample_index: usize,
    pub error: DecodeError,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TrialOutcome {
    Completed(TrialResult),
    Failed(TrialFailure),
}

impl TrialOutcome {
    pub fn name(&self) -> &str {
        match self {
            TrialOutcome::Completed(r) => &r.name,
            TrialOutcome::Failed(f) => &f.name,
        }
    }
}

/// Outcomes of one session, in registration order.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    outcomes: Vec<TrialOutcome>,
}

impl RunReport {
    pub(crate) fn from_outcomes(outcomes: Vec<TrialOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[TrialOutcome] {
        &self.outcomes
    }

    pub fn completed(&self) -> impl Iterator<Item = &TrialResult> {
        self.outcomes.iter().filter_map(|o| match o {
            TrialOutcome::Completed(r) => Some(r),
            TrialOutcome::Failed(_) => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = &TrialFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            TrialOutcome::Failed(f) => Some(f),
            TrialOutcome::Completed(_) => None,
        })
    }

    /// Completed trials, fastest first. Ties keep registration order.
    pub fn ranking(&self) -> Vec<&TrialResult> {
        let mut ranked: Vec<&TrialResult> = self.completed().collect();
        ranked.sort_by(|a, b| b.ops_per_sec.total_cmp(&a.ops_per_sec));
        ranked
    }

    pub fn fastest(&self) -> Option<&TrialResult> {
        self.ranking().into_iter().next()
    }
}

fn preflight(
    trial: &Trial<'_>,
    corpus: &Corpus,
    policy: &CyclePolicy,
) -> Result<Option<f64>, TrialFailure> {
    let slots = policy.preflight_samples.min(corpus.len());
    let mut total_bytes = 0usize;

    for (sample_index, record) in corpus.records().iter().take(slots).enumerate() {
        let fail = |error| TrialFailure {
            name: trial.name.clone(),
            phase: Phase::Preflight,
            sample_index,
            error,
        };
        if let Some(check) = &trial.preflight {
            check(record).map_err(fail)?;
        }
        if let Some(size) = &trial.encoded_len {
            total_bytes += size(record).map_err(fail)?;
        }
    }

    Ok(match &trial.encoded_len {
        Some(_) if slots > 0 => Some(total_bytes as f64 / slots as f64),
        _ => None,
    })
}

fn run_trial<C: Clock>(
    clock: &C,
    rng: &mut ChaCha8Rng,
    mut trial: Trial<'_>,
    corpus: &Corpus,
    policy: &CyclePolicy,
) -> TrialOutcome {
    info!(trial = %trial.name, "starting trial");

    let bytes_per_op = match preflight(&trial, corpus, policy) {
        Ok(bytes) => bytes,
        Err(failure) => {
            warn!(
                trial = %failure.name,
                sample_index = failure.sample_index,
                error = %failure.error,
                "trial failed preflight"
            );
            return TrialOutcome::Failed(failure);
        }
    };

    let round_trip = &mut trial.round_trip;
    match measure_trial(clock, policy, corpus, rng, |record| round_trip(record)) {
        Ok(m) => {
            let ops_per_sec = m.stats.ops_per_sec();
            info!(
                trial = %trial.name,
                ops_per_sec,
                samples = m.stats.samples,
                relative_error = m.stats.relative_error,
                "trial complete"
            );
            TrialOutcome::Completed(TrialResult {
                name: trial.name,
                ops_per_sec,
                stats: m.stats,
                total_ops: m.total_ops,
                total_ns: m.total_ns,
                warmup_iters: m.warmup_iters,
                stop: m.stop,
                bytes_per_op,
            })
        }
        Err(failure) => {
            warn!(
                trial = %trial.name,
                sample_index = failure.sample_index,
                error = %failure.error,
                "trial failed"
            );
            TrialOutcome::Failed(TrialFailure {
                name: trial.name,
                phase: Phase::Timed,
                sample_index: failure.sample_index,
                error: failure.error,
            })
        }
    }
}
