use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hybrid_phy::config::SimConfig;
use hybrid_phy::pipeline;

fn bench_runs(c: &mut Criterion) {
    let fm = SimConfig::fm_default();
    c.bench_function("frequency_coupled_run", |b| {
        b.iter(|| pipeline::run(black_box(&fm)).unwrap())
    });

    let am = SimConfig::am_default();
    c.bench_function("amplitude_coupled_run", |b| {
        b.iter(|| pipeline::run(black_box(&am)).unwrap())
    });
}

criterion_group!(benches, bench_runs);
criterion_main!(benches);
