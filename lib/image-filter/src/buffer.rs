//! Decoded image storage shared by every filter.

use crate::{FilterError, Result};
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ChannelLayout {
    Gray = 1,
    Rgb = 3,
}

impl ChannelLayout {
    pub fn count(&self) -> usize {
        u8::from(*self) as usize
    }
}

/// Row-major interleaved 8-bit samples.
///
/// The sample vector always holds exactly `width * height * channels`
/// entries, and both dimensions are non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: ChannelLayout,
    samples: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, channels: ChannelLayout, samples: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FilterError::InvalidBuffer(format!(
                "dimensions must be non-zero, got {width}x{height}"
            )));
        }

        let expected = width as usize * height as usize * channels.count();
        if samples.len() != expected {
            return Err(FilterError::InvalidBuffer(format!(
                "expected {expected} samples for {width}x{height}x{}, got {}",
                channels.count(),
                samples.len()
            )));
        }

        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    /// Build a buffer where every pixel equals `pixel`.
    pub fn filled(width: u32, height: u32, pixel: &[u8]) -> Result<Self> {
        let channels = u8::try_from(pixel.len())
            .ok()
            .and_then(|n| ChannelLayout::try_from(n).ok())
            .ok_or_else(|| {
                FilterError::InvalidBuffer(format!("unsupported pixel width {}", pixel.len()))
            })?;

        let count = width as usize * height as usize;
        let samples = pixel
            .iter()
            .copied()
            .cycle()
            .take(count * pixel.len())
            .collect();

        Self::new(width, height, channels, samples)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> ChannelLayout {
        self.channels
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    /// Number of samples in one row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels.count()
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let n = self.channels.count();
        let start = y as usize * self.stride() + x as usize * n;
        &self.samples[start..start + n]
    }

    /// Same geometry with new samples. Callers produce exactly
    /// `samples().len()` values.
    pub(crate) fn with_samples(&self, samples: Vec<u8>) -> PixelBuffer {
        debug_assert_eq!(samples.len(), self.samples.len());
        PixelBuffer {
            width: self.width,
            height: self.height,
            channels: self.channels,
            samples,
        }
    }

    /// Replicate a gray buffer into three identical channels. RGB buffers
    /// are returned as a plain copy.
    pub fn to_rgb(&self) -> PixelBuffer {
        match self.channels {
            ChannelLayout::Rgb => self.clone(),
            ChannelLayout::Gray => PixelBuffer {
                width: self.width,
                height: self.height,
                channels: ChannelLayout::Rgb,
                samples: self.samples.iter().flat_map(|&v| [v, v, v]).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_ragged_samples() {
        let result = PixelBuffer::new(2, 2, ChannelLayout::Rgb, vec![0; 11]);
        assert!(matches!(result, Err(FilterError::InvalidBuffer(_))));
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        let result = PixelBuffer::new(0, 4, ChannelLayout::Gray, vec![]);
        assert!(matches!(result, Err(FilterError::InvalidBuffer(_))));
    }

    #[test]
    fn test_filled_and_pixel_access() {
        let buffer = PixelBuffer::filled(3, 2, &[10, 20, 30]).unwrap();
        assert_eq!(buffer.channels(), ChannelLayout::Rgb);
        assert_eq!(buffer.samples().len(), 18);
        assert_eq!(buffer.stride(), 9);
        assert_eq!(buffer.pixel(2, 1), &[10, 20, 30]);
    }

    #[test]
    fn test_filled_rejects_two_channel_pixel() {
        assert!(PixelBuffer::filled(1, 1, &[1, 2]).is_err());
    }

    #[test]
    fn test_gray_to_rgb_broadcast() {
        let gray = PixelBuffer::new(2, 1, ChannelLayout::Gray, vec![7, 200]).unwrap();
        let rgb = gray.to_rgb();
        assert_eq!(rgb.channels(), ChannelLayout::Rgb);
        assert_eq!(rgb.samples(), &[7, 7, 7, 200, 200, 200]);
    }

    #[test]
    fn test_channel_layout_from_primitive() {
        assert_eq!(ChannelLayout::try_from(3u8).unwrap(), ChannelLayout::Rgb);
        assert!(ChannelLayout::try_from(4u8).is_err());
        assert_eq!(ChannelLayout::Gray.count(), 1);
    }
}
