//! Benchmarks for a full render pass.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use vscprom_core::{Counter, pass};

fn snapshot(backends: u64) -> Vec<Counter> {
    let mut counters = vec![
        Counter::uint64("MAIN.uptime", "Child process uptime", 86_400),
        Counter::uint64("MAIN.sess_conn", "Sessions accepted", 1_000),
        Counter::uint64("MAIN.sess_drop", "Sessions dropped", 3),
        Counter::uint64("MAIN.fetch_head", "Fetch no body (HEAD)", 12),
        Counter::uint64("MAIN.fetch_length", "Fetch with Length", 9_000),
        Counter::uint64("MAIN.cache_hit", "Cache hits", 250_000),
        Counter::uint64("MAIN.cache_miss", "Cache misses", 12_000),
        Counter::uint64("SMA.s0.c_bytes", "Bytes allocated", 1 << 30),
        Counter::uint64("SMA.Transient.c_bytes", "Bytes allocated", 1 << 20),
        Counter::uint64("LCK.sma.creat", "Created locks", 2),
        Counter::uint64("LCK.sma.collisions", "Lock collisions", 0),
    ];
    for idx in 0..backends {
        for field in ["happy", "bereq_hdrbytes", "beresp_bodybytes", "conn", "req"] {
            counters.push(Counter::uint64(
                format!("VBE.boot.web{idx}(10.0.0.{},,80).{field}", idx % 255),
                "Backend counter",
                idx,
            ));
        }
    }
    counters
}

fn render_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_pass");
    for backends in &[1_u64, 10, 100, 1_000] {
        let counters = snapshot(*backends);
        group.throughput(Throughput::Elements(counters.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(backends), &counters, |b, counters| {
            b.iter(|| {
                let output = pass::run(black_box(counters)).expect("render failed");
                black_box(output.text.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, render_pass);
criterion_main!(benches);
