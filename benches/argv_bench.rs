//! Argument-encoder benchmarks using Criterion.
//!
//! Run with: `cargo bench --bench argv_bench`
//!
//! Compares the runtime-decoder path against the host `mbstowcs` fallback
//! for argument vectors of growing size.

use std::ffi::OsString;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ember::{argv::set_interpreter_argv, fake::FakeRuntime, ApiVersion, RuntimeApi};

fn argv_of(n: usize) -> Vec<OsString> {
    (0..n)
        .map(|i| OsString::from(format!("--option-{i}=some-plausible-value-{i}")))
        .collect()
}

fn bench_decoder_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder_path");
    for n in [1usize, 8, 64] {
        let argv = argv_of(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &argv, |b, argv| {
            let mut rt = FakeRuntime::new();
            rt.initialize(true);
            b.iter(|| set_interpreter_argv(&mut rt, argv, true));
        });
    }
    group.finish();
}

fn bench_host_widening_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_widening_path");
    for n in [1usize, 8, 64] {
        let argv = argv_of(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &argv, |b, argv| {
            let mut rt = FakeRuntime::with_version(ApiVersion::new(2, 6));
            rt.initialize(true);
            b.iter(|| set_interpreter_argv(&mut rt, argv, true));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decoder_path, bench_host_widening_path);
criterion_main!(benches);
