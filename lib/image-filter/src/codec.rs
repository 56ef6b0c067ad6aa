//! Boundary between encoded bytes and [`PixelBuffer`].
//!
//! Sources without color (L, LA and their 16-bit forms) decode to a single
//! channel, everything else to RGB with alpha dropped. Single-channel buffers
//! are always written back as single-channel images.

use crate::{
    FilterError, Result,
    buffer::{ChannelLayout, PixelBuffer},
};
use image::{
    DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

/// Container format of `bytes`, judged from the magic number.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat> {
    image::guess_format(bytes).map_err(|e| FilterError::Decode(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<PixelBuffer> {
    if bytes.is_empty() {
        return Err(FilterError::Decode("empty input".to_string()));
    }

    let image = image::load_from_memory(bytes).map_err(|e| FilterError::Decode(e.to_string()))?;
    from_dynamic(image)
}

pub fn from_dynamic(image: DynamicImage) -> Result<PixelBuffer> {
    let (width, height) = (image.width(), image.height());

    let buffer = if image.color().has_color() {
        PixelBuffer::new(width, height, ChannelLayout::Rgb, image.into_rgb8().into_raw())
    } else {
        PixelBuffer::new(width, height, ChannelLayout::Gray, image.into_luma8().into_raw())
    };

    buffer.map_err(|e| FilterError::Decode(e.to_string()))
}

pub fn encode(buffer: &PixelBuffer, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let color = match buffer.channels() {
        ChannelLayout::Gray => ExtendedColorType::L8,
        ChannelLayout::Rgb => ExtendedColorType::Rgb8,
    };
    let (width, height) = (buffer.width(), buffer.height());

    let mut bytes = Vec::new();
    let written = match format {
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut bytes, jpeg_quality.clamp(1, 100))
            .write_image(buffer.samples(), width, height, color),
        OutputFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(buffer.samples(), width, height, color)
        }
    };
    written.map_err(|e| FilterError::Encode(e.to_string()))?;

    Ok(bytes)
}
