use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use stepplan_core::planner::new_block;
use stepplan_core::{Block, PlannerSettings, lookahead};

// Zig-zag path: alternating diagonal moves so every junction is jerk-limited.
fn zigzag(n: usize, seed: u32, settings: &PlannerSettings) -> Vec<Block> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    let mut blocks = Vec::with_capacity(n);
    for i in 0..n {
        let dx = 50 + (next() % 400) as i32;
        let dy = if i % 2 == 0 { dx } else { -dx };
        let mm = (f64::from(dx).hypot(f64::from(dy))) / 100.0;
        let duration_us = 20_000 + next() % 200_000;
        if let Ok(Some(b)) = new_block([dx, dy, 0], duration_us, mm, settings) {
            blocks.push(b);
        }
    }
    blocks
}

pub fn bench_recalculate(c: &mut Criterion) {
    let mut g = c.benchmark_group("recalculate");
    //   BENCH_SAMPLE_SIZE=10 cargo bench -p stepplan_core --bench recalculate
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(10));
        }
    }

    let settings = PlannerSettings::default();
    for n in [16usize, 64, 256] {
        let blocks = zigzag(n, 0xC0FFEE, &settings);
        g.bench_with_input(BenchmarkId::from_parameter(n), &blocks, |b, blocks| {
            b.iter_batched(
                || blocks.clone(),
                |mut work| {
                    lookahead::recalculate(black_box(&mut work), &settings);
                    work
                },
                BatchSize::SmallInput,
            );
        });
    }
    g.finish();
}

criterion_group!(benches, bench_recalculate);
criterion_main!(benches);
