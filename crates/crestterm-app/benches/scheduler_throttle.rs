//! Benchmark: `Scheduler::on_vsync` throughput at the normal ~120Hz rate
//! vs the throttled ~30Hz rate reached after sustained dirty frames.

use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crestterm_app::Scheduler;

fn bench_on_vsync(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_on_vsync");

    group.bench_with_input(BenchmarkId::new("on_vsync", "cold"), &(), |b, _| {
        b.iter(|| {
            let t0 = Instant::now();
            let mut sched = Scheduler::new(t0);
            black_box(sched.on_vsync(t0, true));
        });
    });

    group.bench_with_input(BenchmarkId::new("on_vsync", "sustained_dirty"), &(), |b, _| {
        b.iter(|| {
            let t0 = Instant::now();
            let mut sched = Scheduler::new(t0);
            let mut now = t0;
            for _ in 0..120 {
                now += Duration::from_micros(8_333);
                black_box(sched.on_vsync(now, true));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_on_vsync);
criterion_main!(benches);
