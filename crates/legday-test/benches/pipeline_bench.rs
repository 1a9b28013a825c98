//! Benchmarks for whole ticks and whole simulated sessions

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use legday_core::{Frame, PixelFormat, TickTime};
use legday_signal::{PipelineConfig, RepPipeline};
use legday_test::scenarios;

fn bench_pipeline_tick(c: &mut Criterion) {
    let config = PipelineConfig::default().with_target(u32::MAX);
    let mut pipeline = RepPipeline::start(config, TickTime::ZERO).unwrap();
    let light = Frame::uniform(640, 480, PixelFormat::Gray8, 160);
    let dark = Frame::uniform(640, 480, PixelFormat::Gray8, 60);
    pipeline.tick(Some(&light), TickTime::ZERO);
    pipeline.tick(Some(&light), TickTime::from_millis(3000));

    c.bench_function("pipeline_tick", |b| {
        let mut t = 3000u64;
        b.iter(|| {
            t += 200;
            let frame = if (t / 1400) % 2 == 0 { &light } else { &dark };
            black_box(pipeline.tick(Some(black_box(frame)), TickTime::from_millis(t)))
        })
    });
}

fn bench_simulated_session(c: &mut Criterion) {
    c.bench_function("simulated_session_10_reps", |b| {
        b.iter(|| {
            let mut sim = scenarios::clean_squats(10, 10).unwrap();
            black_box(sim.run(Duration::from_secs(60)).unwrap())
        })
    });
}

criterion_group!(benches, bench_pipeline_tick, bench_simulated_session);
criterion_main!(benches);
