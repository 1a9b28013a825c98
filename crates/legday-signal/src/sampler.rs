//! Brightness sampling - one frame in, one scalar out

use legday_core::{Frame, LegDayResult, PixelFormat, TickTime};

/// Read one pixel in every N
pub const DEFAULT_PIXEL_STRIDE: usize = 20;

/// Upper bound on pixels read per frame, whatever the resolution
pub const DEFAULT_MAX_SAMPLES: usize = 32_768;

/// Mean brightness of a frame at a point in time (0.0 ..= 255.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessSample {
    pub value: f64,
    pub at: TickTime,
}

/// Reduces a frame to its mean brightness by reading a fixed-stride subset
#[derive(Debug, Clone)]
pub struct BrightnessSampler {
    stride: usize,
    max_samples: usize,
}

impl BrightnessSampler {
    pub fn new(stride: usize, max_samples: usize) -> Self {
        BrightnessSampler {
            stride: stride.max(1),
            max_samples: max_samples.max(1),
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Stride actually used for a frame, raised so that at most
    /// `max_samples` pixels are read
    pub fn effective_stride(&self, pixel_count: usize) -> usize {
        let min_stride = pixel_count.div_ceil(self.max_samples);
        self.stride.max(min_stride).max(1)
    }

    /// Sample a frame. Malformed or zero-sized frames are errors, never panics.
    pub fn sample(&self, frame: &Frame, at: TickTime) -> LegDayResult<BrightnessSample> {
        frame.validate()?;

        let channels = frame.format.channels();
        // validate() checked the buffer against the dimensions
        let stride = self.effective_stride(frame.data.len() / channels);

        let mut total = 0.0;
        let mut read = 0usize;
        for pixel in frame.data.chunks_exact(channels).step_by(stride) {
            total += pixel_luma(pixel, frame.format);
            read += 1;
        }

        // validate() guarantees at least one pixel
        Ok(BrightnessSample {
            value: total / read as f64,
            at,
        })
    }
}

impl Default for BrightnessSampler {
    fn default() -> Self {
        Self::new(DEFAULT_PIXEL_STRIDE, DEFAULT_MAX_SAMPLES)
    }
}

/// Channel-mean luminance of one pixel
#[inline]
fn pixel_luma(pixel: &[u8], format: PixelFormat) -> f64 {
    match format {
        PixelFormat::Gray8 => pixel[0] as f64,
        PixelFormat::Rgb8 | PixelFormat::Rgba8 => {
            (pixel[0] as f64 + pixel[1] as f64 + pixel[2] as f64) / 3.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legday_core::LegDayError;

    #[test]
    fn test_uniform_frame_brightness() {
        let sampler = BrightnessSampler::default();
        let frame = Frame::solid_rgba(64, 48, [30, 60, 90, 255]);

        let sample = sampler.sample(&frame, TickTime::ZERO).unwrap();
        assert!((sample.value - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_alpha_ignored() {
        let sampler = BrightnessSampler::default();
        let opaque = Frame::solid_rgba(8, 8, [90, 90, 90, 255]);
        let clear = Frame::solid_rgba(8, 8, [90, 90, 90, 0]);

        let a = sampler.sample(&opaque, TickTime::ZERO).unwrap();
        let b = sampler.sample(&clear, TickTime::ZERO).unwrap();
        assert_eq!(a.value, b.value);
    }

    #[test]
    fn test_single_pixel_frame() {
        let sampler = BrightnessSampler::default();
        let frame = Frame::new(1, 1, PixelFormat::Gray8, vec![200]);

        let sample = sampler.sample(&frame, TickTime::from_millis(5)).unwrap();
        assert_eq!(sample.value, 200.0);
        assert_eq!(sample.at, TickTime::from_millis(5));
    }

    #[test]
    fn test_stride_reads_subset() {
        // Every 2nd pixel is bright; stride 2 only ever hits the bright ones
        let mut data = Vec::new();
        for i in 0..10 {
            data.push(if i % 2 == 0 { 250 } else { 0 });
        }
        let frame = Frame::new(10, 1, PixelFormat::Gray8, data);

        let sampler = BrightnessSampler::new(2, DEFAULT_MAX_SAMPLES);
        let sample = sampler.sample(&frame, TickTime::ZERO).unwrap();
        assert_eq!(sample.value, 250.0);
    }

    #[test]
    fn test_effective_stride_bounds_work() {
        let sampler = BrightnessSampler::new(20, 1000);

        // Small frames keep the configured stride
        assert_eq!(sampler.effective_stride(100 * 100), 20);
        // Large frames get a coarser stride
        let stride = sampler.effective_stride(3840 * 2160);
        assert!((3840 * 2160usize).div_ceil(stride) <= 1000);
    }

    #[test]
    fn test_malformed_frames_rejected() {
        let sampler = BrightnessSampler::default();

        let empty = Frame::new(0, 0, PixelFormat::Rgba8, Vec::new());
        assert!(matches!(
            sampler.sample(&empty, TickTime::ZERO),
            Err(LegDayError::EmptyFrame { .. })
        ));

        let short = Frame::new(4, 4, PixelFormat::Rgb8, vec![0; 10]);
        assert!(matches!(
            sampler.sample(&short, TickTime::ZERO),
            Err(LegDayError::FrameSizeMismatch { .. })
        ));

        let huge = Frame::new(u32::MAX, u32::MAX, PixelFormat::Rgba8, vec![0; 4]);
        assert!(matches!(
            sampler.sample(&huge, TickTime::ZERO),
            Err(LegDayError::FrameSizeMismatch { actual: 4, .. })
        ));
    }

    #[test]
    fn test_zero_stride_clamped() {
        let sampler = BrightnessSampler::new(0, 0);
        assert_eq!(sampler.stride(), 1);
        let frame = Frame::uniform(3, 3, PixelFormat::Gray8, 9);
        assert_eq!(sampler.sample(&frame, TickTime::ZERO).unwrap().value, 9.0);
    }
}
