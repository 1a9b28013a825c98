//! Frames - raw pixel buffers handed over by a frame source
//!
//! A frame is read once per tick and dropped afterwards. Nothing downstream
//! keeps a reference to the pixel data.

use crate::{LegDayError, LegDayResult};

/// Pixel layout of a frame buffer (8 bits per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Gray8,
    Rgb8,
    /// Canvas-style RGBA; alpha is ignored for brightness
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A single video frame
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Frame {
            width,
            height,
            format,
            data,
        }
    }

    /// Frame where every channel of every pixel has the same value
    pub fn uniform(width: u32, height: u32, format: PixelFormat, value: u8) -> Self {
        let len = width as usize * height as usize * format.channels();
        Frame::new(width, height, format, vec![value; len])
    }

    /// RGBA frame filled with one color
    pub fn solid_rgba(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Frame::new(width, height, PixelFormat::Rgba8, data)
    }

    /// `None` when the dimensions overflow `usize`
    pub fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Buffer length implied by dimensions and format
    pub fn expected_len(&self) -> Option<usize> {
        self.pixel_count()?.checked_mul(self.format.channels())
    }

    /// Check that the frame is non-empty and its buffer matches its dimensions
    pub fn validate(&self) -> LegDayResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LegDayError::EmptyFrame {
                width: self.width,
                height: self.height,
            });
        }

        match self.expected_len() {
            Some(expected) if expected == self.data.len() => Ok(()),
            expected => Err(LegDayError::FrameSizeMismatch {
                expected: expected.unwrap_or(usize::MAX),
                actual: self.data.len(),
            }),
        }
    }

    /// Channel bytes of the pixel at a linear index
    #[inline]
    pub fn pixel(&self, index: usize) -> Option<&[u8]> {
        let channels = self.format.channels();
        let start = index.checked_mul(channels)?;
        self.data.get(start..start + channels)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_uniform_frame_is_valid() {
        let frame = Frame::uniform(4, 3, PixelFormat::Rgb8, 10);
        assert_eq!(frame.data.len(), 36);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_empty_frame_rejected() {
        let frame = Frame::new(0, 10, PixelFormat::Gray8, Vec::new());
        assert!(matches!(
            frame.validate(),
            Err(LegDayError::EmptyFrame { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let frame = Frame::new(2, 2, PixelFormat::Rgba8, vec![0; 15]);
        assert!(matches!(
            frame.validate(),
            Err(LegDayError::FrameSizeMismatch { expected: 16, actual: 15 })
        ));
    }

    #[test]
    fn test_huge_dimensions_rejected() {
        let frame = Frame::new(u32::MAX, u32::MAX, PixelFormat::Rgba8, vec![0; 4]);
        assert!(matches!(
            frame.validate(),
            Err(LegDayError::FrameSizeMismatch { actual: 4, .. })
        ));
    }

    #[test]
    fn test_pixel_access() {
        let frame = Frame::solid_rgba(2, 1, [1, 2, 3, 255]);
        assert_eq!(frame.pixel(1), Some(&[1u8, 2, 3, 255][..]));
        assert_eq!(frame.pixel(2), None);
    }

    proptest! {
        #[test]
        fn prop_uniform_frames_validate(w in 1u32..64, h in 1u32..64, v in any::<u8>()) {
            for format in [PixelFormat::Gray8, PixelFormat::Rgb8, PixelFormat::Rgba8] {
                let frame = Frame::uniform(w, h, format, v);
                prop_assert!(frame.validate().is_ok());
            }
        }

        #[test]
        fn prop_validate_never_panics(w in 0u32..16, h in 0u32..16, len in 0usize..1200) {
            let frame = Frame::new(w, h, PixelFormat::Rgba8, vec![0; len]);
            let _ = frame.validate();
        }
    }
}
