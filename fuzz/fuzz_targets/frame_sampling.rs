#![no_main]

use arbitrary::Arbitrary;
use legday_core::{Frame, PixelFormat, TickTime};
use legday_signal::BrightnessSampler;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    width: u16,
    height: u16,
    format: u8,
    stride: u8,
    max_samples: u16,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let format = match input.format % 3 {
        0 => PixelFormat::Gray8,
        1 => PixelFormat::Rgb8,
        _ => PixelFormat::Rgba8,
    };
    let frame = Frame::new(input.width as u32, input.height as u32, format, input.data);
    let sampler = BrightnessSampler::new(input.stride as usize, input.max_samples as usize);

    // Malformed frames must come back as errors
    if let Ok(sample) = sampler.sample(&frame, TickTime::ZERO) {
        assert!(sample.value.is_finite());
        assert!((0.0..=255.0).contains(&sample.value));
    }
});
