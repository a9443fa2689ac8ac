use std::time::{Duration, Instant};

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corpus::Corpus;
use crate::record::Record;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BenchConfig {
    pub profile: Profile,
    pub seed: u64,
}

impl BenchConfig {
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }

    pub fn cycle_policy(&self) -> CyclePolicy {
        match self.profile {
            Profile::Quick => CyclePolicy {
                warmup_iters: 256,
                batch_size: 64,
                min_samples: 20,
                max_relative_error: 0.02,
                max_time: Duration::from_secs(1),
                preflight_samples: 16,
            },
            Profile::Full => CyclePolicy {
                warmup_iters: 4_096,
                batch_size: 256,
                min_samples: 100,
                max_relative_error: 0.01,
                max_time: Duration::from_secs(5),
                preflight_samples: 256,
            },
        }
    }
}

/// Stopping rule for one trial's timing loop.
#[derive(Clone, Debug, PartialEq)]
pub struct CyclePolicy {
    /// Untimed round trips before the first sample.
    pub warmup_iters: u64,
    /// Round trips per timing sample.
    pub batch_size: u64,
    pub min_samples: u64,
    /// Stop once the relative margin of error (95%) drops to this fraction.
    pub max_relative_error: f64,
    /// Hard wall-clock budget per trial, checked after every sample.
    pub max_time: Duration,
    /// Corpus slots checked for round-trip fidelity before timing.
    pub preflight_samples: usize,
}

/// Time source for the timing loop.
pub trait Clock {
    /// Nanoseconds since an arbitrary fixed origin. Must not go backwards.
    fn now_ns(&self) -> u128;
}

#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u128 {
        self.origin.elapsed().as_nanos()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    /// Minimum samples reached with a small enough error.
    Stable,
    /// Time budget ran out first.
    Budget,
}

/// Summary of per-sample ns/op values.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub samples: u64,
    pub mean_ns: f64,
    /// Sample variance, ns².
    pub variance: f64,
    pub std_dev: f64,
    /// 95% margin of error relative to the mean.
    pub relative_error: f64,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self {
                samples: 0,
                mean_ns: 0.0,
                variance: 0.0,
                std_dev: 0.0,
                relative_error: 0.0,
            };
        }

        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n < 2 {
            0.0
        } else {
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        };
        let std_dev = variance.sqrt();
        let sem = std_dev / (n as f64).sqrt();
        let relative_error = if mean > 0.0 { 1.96 * sem / mean } else { 0.0 };

        Self {
            samples: n as u64,
            mean_ns: mean,
            variance,
            std_dev,
            relative_error,
        }
    }

    pub fn ops_per_sec(&self) -> f64 {
        if self.mean_ns > 0.0 {
            1e9 / self.mean_ns
        } else {
            f64::INFINITY
        }
    }
}

/// Welford accumulator so the stop check is O(1) per sample.
#[derive(Clone, Copy, Debug, Default)]
struct RunningStats {
    n: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn push(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Same quantity as [`Stats::relative_error`].
    fn relative_error(&self) -> f64 {
        if self.n < 2 || self.mean <= 0.0 {
            return 0.0;
        }
        let variance = self.m2 / (self.n - 1) as f64;
        let sem = (variance / self.n as f64).sqrt();
        1.96 * sem / self.mean
    }
}

#[derive(Clone, Debug)]
pub struct Measured {
    pub warmup_iters: u64,
    pub total_ops: u64,
    pub total_ns: u128,
    pub stats: Stats,
    pub stop: StopReason,
}

/// A round trip failed on the record at `sample_index`.
#[derive(Debug)]
pub struct SampleFailure<E> {
    pub sample_index: usize,
    pub error: E,
}

/// Time `f` over records sampled from `corpus` until `policy` is satisfied.
///
/// The first error aborts the loop; nothing measured so far is kept.
pub fn measure_trial<C, R, E, F>(
    clock: &C,
    policy: &CyclePolicy,
    corpus: &Corpus,
    rng: &mut R,
    mut f: F,
) -> Result<Measured, SampleFailure<E>>
where
    C: Clock + ?Sized,
    R: Rng + ?Sized,
    F: FnMut(&Record) -> Result<(), E>,
{
    let mut call = |rng: &mut R| {
        let sample_index = corpus.sample_index(rng);
        f(&corpus.records()[sample_index]).map_err(|error| SampleFailure {
            sample_index,
            error,
        })
    };

    for _ in 0..policy.warmup_iters {
        call(&mut *rng)?;
    }

    let batch = policy.batch_size.max(1);
    let budget_ns = policy.max_time.as_nanos();
    let mut samples: Vec<f64> = Vec::with_capacity(policy.min_samples as usize);
    let mut running = RunningStats::default();
    let trial_start = clock.now_ns();

    let stop = loop {
        let start = clock.now_ns();
        for _ in 0..batch {
            call(&mut *rng)?;
        }
        let elapsed = clock.now_ns().saturating_sub(start);
        let ns_per_op = elapsed as f64 / batch as f64;
        samples.push(ns_per_op);
        running.push(ns_per_op);

        if running.n >= policy.min_samples
            && running.relative_error() <= policy.max_relative_error
        {
            break StopReason::Stable;
        }
        if clock.now_ns().saturating_sub(trial_start) >= budget_ns {
            break StopReason::Budget;
        }
    };

    let stats = Stats::from_samples(&samples);
    let total_ops = stats.samples * batch;
    let total_ns = (stats.mean_ns * total_ops as f64) as u128;
    debug!(
        samples = stats.samples,
        relative_error = stats.relative_error,
        ?stop,
        "cycle policy satisfied"
    );

    Ok(Measured {
        warmup_iters: policy.warmup_iters,
        total_ops,
        total_ns,
        stats,
        stop,
    })
}
