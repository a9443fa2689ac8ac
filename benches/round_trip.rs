//! Codec round-trip benchmarks
//!
//! Per-codec encode/decode cost over a fixed person corpus, criterion-side
//! counterpart of the `codec-bench` binary's cycle lines.

use codec_bench::codec::{Codec, CodecOptions, CompactCodec, JsonCodec, ProtoCodec};
use codec_bench::corpus::Corpus;
use codec_bench::person;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::path::Path;

const CORPUS_SIZE: usize = 1_000;
const SEED: u64 = 0x5eed;

fn bench_round_trip(c: &mut Criterion) {
    let schema = person::schema().expect("person schema");
    let corpus = Corpus::generate(CORPUS_SIZE, SEED, |rng| person::generate(&schema, rng))
        .expect("corpus");
    let proto_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("proto/message.proto");
    let proto = ProtoCodec::load(&proto_path, "Message", &schema).expect("protobuf schema");

    let codecs: [&dyn Codec; 3] = [&CompactCodec, &JsonCodec, &proto];
    let record = corpus.get(0).expect("non-empty corpus");

    for options in [
        CodecOptions::default(),
        CodecOptions {
            unchecked: false,
            object: false,
        },
    ] {
        let label = if options.object { "object" } else { "typed" };
        let mut group = c.benchmark_group(format!("round_trip_{label}"));

        for codec in codecs {
            let bytes = codec.encoded_len(record).expect("encoded_len");
            group.throughput(Throughput::Bytes(bytes as u64));
            group.bench_with_input(
                BenchmarkId::from_parameter(codec.name()),
                record,
                |bencher, record| {
                    bencher.iter(|| black_box(codec.round_trip(black_box(record), options)))
                },
            );
        }

        group.finish();
    }
}

/// Walks the whole corpus per iteration so string-length spread is included.
fn bench_corpus_sweep(c: &mut Criterion) {
    let schema = person::schema().expect("person schema");
    let corpus = Corpus::generate(CORPUS_SIZE, SEED, |rng| person::generate(&schema, rng))
        .expect("corpus");
    let proto_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("proto/message.proto");
    let proto = ProtoCodec::load(&proto_path, "Message", &schema).expect("protobuf schema");

    let mut group = c.benchmark_group("corpus_sweep");
    group.throughput(Throughput::Elements(corpus.len() as u64));

    let codecs: [&dyn Codec; 3] = [&CompactCodec, &JsonCodec, &proto];
    for codec in codecs {
        group.bench_function(codec.name(), |bencher| {
            bencher.iter(|| {
                for record in corpus.records() {
                    black_box(codec.round_trip(record, CodecOptions::default()).ok());
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_round_trip, bench_corpus_sweep);
criterion_main!(benches);
