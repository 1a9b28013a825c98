#![no_main]

use arbitrary::Arbitrary;
use legday_core::{Frame, PixelFormat, TickTime};
use legday_signal::{PipelineConfig, RepPipeline};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Tick {
    gap_ms: u16,
    brightness: Option<u8>,
}

#[derive(Arbitrary, Debug)]
struct Input {
    target: u8,
    ticks: Vec<Tick>,
}

fuzz_target!(|input: Input| {
    let config = PipelineConfig::default().with_target(input.target.max(1) as u32);
    let target = config.target_reps;
    let Ok(mut pipeline) = RepPipeline::start(config, TickTime::ZERO) else {
        return;
    };

    let mut now = TickTime::ZERO;
    let mut last = 0;
    for tick in input.ticks {
        now = now + std::time::Duration::from_millis(tick.gap_ms as u64);
        let frame = tick
            .brightness
            .map(|v| Frame::uniform(8, 8, PixelFormat::Gray8, v));
        pipeline.tick(frame.as_ref(), now);

        let count = pipeline.count();
        assert!(count >= last && count <= target);
        last = count;
    }
});
