use clap::{Parser, ValueEnum};
use codec_bench::codec::{proto, CodecOptions, CompactCodec, JsonCodec, ProtoCodec};
use codec_bench::corpus::{Corpus, DEFAULT_CORPUS_SIZE};
use codec_bench::harness::{BenchConfig, Profile};
use codec_bench::report::{self, BenchReport, RunMeta};
use codec_bench::runner::{Runner, Trial};
use codec_bench::schema::SchemaRegistry;
use codec_bench::{person, CodecKind};
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "codec-bench")]
#[command(about = "Round-trip throughput of bincode, JSON and protobuf over a synthetic corpus")]
struct Args {
    #[arg(long, value_enum, default_value_t = ProfileArg::Quick)]
    profile: ProfileArg,

    /// Seed for corpus generation and sampling.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of records in the corpus.
    #[arg(long, default_value_t = DEFAULT_CORPUS_SIZE)]
    corpus_size: usize,

    /// Protobuf schema file for the protobuf trial.
    #[arg(long, value_name = "FILE", default_value = proto::DEFAULT_SCHEMA_PATH)]
    schema: PathBuf,

    /// Message type looked up in the schema file.
    #[arg(long, default_value = proto::DEFAULT_MESSAGE)]
    message: String,

    /// Which codec trial(s) to run.
    #[arg(long, value_enum, default_value_t = CodecKind::All)]
    codec: CodecKind,

    /// Skip post-decode validation.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    unchecked: bool,

    /// Decode to plain objects instead of typed records.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    object: bool,

    /// Also write the JSON report here.
    #[arg(long)]
    out: Option<PathBuf>,
}

/// Seconds since the Unix epoch, as `unix:<secs>`.
fn now_unix_stamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn git_sha_short() -> Option<String> {
    // Best-effort: read from environment set by CI/build scripts.
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn init_tracing() {
    // stdout carries the report; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let args = Args::parse();
    let cfg = BenchConfig {
        profile: args.profile.into(),
        seed: args.seed,
    };
    let policy = cfg.cycle_policy();
    let options = CodecOptions {
        unchecked: args.unchecked,
        object: args.object,
    };

    let mut registry = SchemaRegistry::new();
    let schema = registry.register(person::schema()?)?;

    // Collaborator setup happens before any trial runs; a failure here ends the session.
    let proto_codec = if args.codec.includes(CodecKind::Protobuf) {
        let codec = ProtoCodec::load(&args.schema, &args.message, &schema)
            .map_err(|e| e.for_trial("protobuf"))?;
        Some(codec)
    } else {
        None
    };

    let corpus = Corpus::generate(args.corpus_size, cfg.seed, |rng| {
        person::generate(&schema, rng)
    })?;
    let corpus_digest = corpus.digest()?;

    let mut runner = Runner::new(cfg.seed);
    if args.codec.includes(CodecKind::Bincode) {
        runner.register(Trial::from_codec(&CompactCodec, options));
    }
    if args.codec.includes(CodecKind::Json) {
        runner.register(Trial::from_codec(&JsonCodec, options));
    }
    if let Some(codec) = &proto_codec {
        runner.register(Trial::from_codec(codec, options));
    }

    info!(
        profile = cfg.profile.as_str(),
        corpus = corpus.len(),
        "running benchmark session"
    );
    let outcome = runner.run(&corpus, &policy)?;

    for line in report::format_human(&outcome) {
        println!("{line}");
    }

    if let Some(out) = &args.out {
        let bench = BenchReport::new(
            RunMeta {
                schema_version: 1,
                bench_version: env!("CARGO_PKG_VERSION").to_string(),
                profile: cfg.profile.as_str().to_string(),
                seed: cfg.seed,
                timestamp_utc: now_unix_stamp(),
                git_sha: git_sha_short(),
                corpus_size: corpus.len(),
                corpus_digest,
            },
            &outcome,
        );
        let json = serde_json::to_string_pretty(&bench)?;
        fs::write(out, json).wrap_err_with(|| format!("writing report to {}", out.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_stamp_format() {
        let stamp = now_unix_stamp();
        let secs: u64 = stamp.strip_prefix("unix:").unwrap().parse().unwrap();
        assert!(secs > 0);
    }
}
