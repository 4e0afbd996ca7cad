//! Codec benchmarks (Criterion): repository resolution, decode and encode.
//!
//! Run: `cargo bench` or `cargo bench --bench codec`.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use orchestra_fix_codec::{Codec, CodecSettings, Message, ReportingContext, Repository};

const EXECUTION_REPORT: &str = "8=FIXT.1.1\x019=313\x0135=8\x0149=FGW\x0156=DEMO-CONN2\x0134=92\x0152=20220214-12:23:36.900\x0137=54\x0111=3016560\x01453=3\x01448=DEMO-CONN2\x01447=D\x01452=76\x01448=0\x01447=N\x01452=3\x01448=3\x01447=N\x01452=12\x0117=156\x01150=C\x0139=C\x01581=1\x0148=INSTR2\x0122=8\x0154=2\x0138=100\x0140=2\x0144=34\x0159=3\x01528=A\x01151=0\x0114=40\x0160=20220214-12:23:36.798\x0158=The remaining part of simulated order has been expired\x0110=035\x01";

fn repository() -> Repository {
    Repository::from_json_str(include_str!("../tests/fixtures/repository.json")).unwrap()
}

fn codec(inline: bool) -> Codec {
    let settings = CodecSettings {
        inline_components: inline,
        ..Default::default()
    };
    Codec::new(&repository(), settings).unwrap()
}

fn bench_build_codec(c: &mut Criterion) {
    let repository = repository();
    let mut group = c.benchmark_group("codec");
    group.bench_function("build_nested", |b| {
        b.iter(|| Codec::new(&repository, CodecSettings::default()).unwrap())
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    const N: usize = 100;
    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(N as u64));
    for inline in [false, true] {
        let codec = codec(inline);
        let name = if inline { "decode_100_inline" } else { "decode_100_nested" };
        group.bench_function(name, |b| {
            b.iter_batched(
                ReportingContext::new,
                |mut context| {
                    for _ in 0..N {
                        codec.decode_bytes(EXECUTION_REPORT.as_bytes(), &mut context).unwrap();
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    const N: usize = 100;
    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(N as u64));
    for inline in [false, true] {
        let codec = codec(inline);
        let message = codec
            .decode_bytes(EXECUTION_REPORT.as_bytes(), &mut ReportingContext::new())
            .unwrap();
        let name = if inline { "encode_100_inline" } else { "encode_100_nested" };
        group.bench_function(name, |b| {
            b.iter_batched(
                || (message.clone(), ReportingContext::new()),
                |(message, mut context): (Message, ReportingContext)| {
                    for _ in 0..N {
                        codec.encode_to_bytes(&message, &mut context).unwrap();
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_codec, bench_decode, bench_encode);
criterion_main!(benches);
