//! Report output: human cycle lines for stdout and the JSON report for `--out`.
//!
//! Everything here is a pure function of a finished [`RunReport`].

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::harness::StopReason;
use crate::runner::{Phase, RunReport, TrialFailure, TrialOutcome, TrialResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub profile: String,
    pub seed: u64,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
    pub corpus_size: usize,
    pub corpus_digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub unit: String,

    pub samples: u64,
    pub warmup_iters: u64,
    pub total_ops: u64,
    pub total_ns: u128,

    pub ns_per_op: f64,
    pub ops_per_sec: f64,
    pub variance: f64,
    pub relative_error: f64,
    pub stop_reason: StopReason,

    pub bytes_per_op: Option<f64>,
    pub throughput_bytes_per_s: Option<f64>,

    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub name: String,
    pub phase: String,
    pub sample_index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub run: RunMeta,
    pub measurements: Vec<Measurement>,
    pub failures: Vec<Failure>,
    pub fastest: Option<String>,
}

impl BenchReport {
    pub fn new(run: RunMeta, report: &RunReport) -> Self {
        Self {
            run,
            measurements: report.completed().map(measurement).collect(),
            failures: report.failed().map(failure).collect(),
            fastest: report.fastest().map(|r| r.name.clone()),
        }
    }
}

fn measurement(r: &TrialResult) -> Measurement {
    let throughput_bytes_per_s = r
        .bytes_per_op
        .filter(|_| r.ops_per_sec.is_finite())
        .map(|bytes| bytes * r.ops_per_sec);

    Measurement {
        name: r.name.clone(),
        unit: "ns/op".to_string(),
        samples: r.stats.samples,
        warmup_iters: r.warmup_iters,
        total_ops: r.total_ops,
        total_ns: r.total_ns,
        ns_per_op: r.stats.mean_ns,
        ops_per_sec: r.ops_per_sec,
        variance: r.stats.variance,
        relative_error: r.stats.relative_error,
        stop_reason: r.stop,
        bytes_per_op: r.bytes_per_op,
        throughput_bytes_per_s,
        extra: json!({"std_dev_ns": r.stats.std_dev}),
    }
}

fn failure(f: &TrialFailure) -> Failure {
    Failure {
        name: f.name.clone(),
        phase: match f.phase {
            Phase::Preflight => "preflight",
            Phase::Timed => "timed",
        }
        .to_string(),
        sample_index: f.sample_index,
        error: f.error.to_string(),
    }
}

/// Whole part of `value` with `,` thousands separators.
pub fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let digits = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0.0 && digits != "0" {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// One stdout line per trial.
pub fn format_cycle(outcome: &TrialOutcome) -> String {
    match outcome {
        TrialOutcome::Completed(r) => format!(
            "{} x {} ops/sec ±{:.2}% ({} runs sampled)",
            r.name,
            group_thousands(r.ops_per_sec),
            r.stats.relative_error * 100.0,
            r.stats.samples
        ),
        TrialOutcome::Failed(f) => {
            format!("{}: failed at sample {}: {}", f.name, f.sample_index, f.error)
        }
    }
}

pub fn format_fastest(report: &RunReport) -> String {
    match report.fastest() {
        Some(r) => format!("Fastest is {}", r.name),
        None => "Fastest is <none>".to_string(),
    }
}

/// Every cycle line in registration order, then the fastest line.
pub fn format_human(report: &RunReport) -> Vec<String> {
    report
        .outcomes()
        .iter()
        .map(format_cycle)
        .chain(std::iter::once(format_fastest(report)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::harness::Stats;

    fn completed(name: &str, mean_ns: f64) -> TrialOutcome {
        let stats = Stats {
            samples: 42,
            mean_ns,
            variance: 4.0,
            std_dev: 2.0,
            relative_error: 0.0123,
        };
        TrialOutcome::Completed(TrialResult {
            name: name.to_string(),
            ops_per_sec: stats.ops_per_sec(),
            stats,
            total_ops: 42 * 64,
            total_ns: (mean_ns * 42.0 * 64.0) as u128,
            warmup_iters: 256,
            stop: StopReason::Stable,
            bytes_per_op: Some(13.0),
        })
    }

    fn failed(name: &str) -> TrialOutcome {
        TrialOutcome::Failed(TrialFailure {
            name: name.to_string(),
            phase: Phase::Timed,
            sample_index: 7,
            error: DecodeError::TrailingBytes { remaining: 2 },
        })
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.4), "999");
        assert_eq!(group_thousands(1_000.0), "1,000");
        assert_eq!(group_thousands(12_345_678.9), "12,345,679");
        assert_eq!(group_thousands(-1_234.0), "-1,234");
        assert_eq!(group_thousands(f64::INFINITY), "inf");
    }

    #[test]
    fn test_cycle_lines() {
        assert_eq!(
            format_cycle(&completed("bincode", 250.0)),
            "bincode x 4,000,000 ops/sec ±1.23% (42 runs sampled)"
        );
        assert_eq!(
            format_cycle(&failed("protobuf")),
            "protobuf: failed at sample 7: 2 trailing bytes after last field"
        );
    }

    #[test]
    fn test_human_report_lists_failures_and_fastest() {
        let report = RunReport::from_outcomes(vec![
            completed("json", 500.0),
            failed("broken"),
            completed("bincode", 250.0),
        ]);

        let lines = format_human(&report);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("json x 2,000,000 ops/sec"));
        assert!(lines[1].starts_with("broken: failed"));
        assert_eq!(lines[3], "Fastest is bincode");

        let none = RunReport::from_outcomes(vec![failed("broken")]);
        assert_eq!(format_fastest(&none), "Fastest is <none>");
    }

    #[test]
    fn test_json_report() {
        let report = RunReport::from_outcomes(vec![completed("bincode", 250.0), failed("broken")]);
        let meta = RunMeta {
            schema_version: 1,
            bench_version: "0.1.0".to_string(),
            profile: "quick".to_string(),
            seed: 0,
            timestamp_utc: "unix:0".to_string(),
            git_sha: None,
            corpus_size: 3,
            corpus_digest: "00".to_string(),
        };

        let bench = BenchReport::new(meta, &report);
        assert_eq!(bench.fastest.as_deref(), Some("bincode"));
        assert_eq!(bench.measurements.len(), 1);
        assert_eq!(bench.measurements[0].throughput_bytes_per_s, Some(13.0 * 4e6));
        assert_eq!(bench.failures[0].phase, "timed");

        let value = serde_json::to_value(&bench).unwrap();
        assert_eq!(value["measurements"][0]["stop_reason"], "stable");
        assert_eq!(value["failures"][0]["sample_index"], 7);
    }
}
