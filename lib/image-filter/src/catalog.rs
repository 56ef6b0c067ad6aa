//! The fixed set of named filters.
//!
//! Each filter is a single [`FilterSpec`] row: a direct pixel map, a
//! spatial kernel run through [`convolution`](crate::convolution), or a
//! per-pixel 3x3 color matrix. The process-wide table is built once and
//! only read afterwards.

use crate::{
    FilterError, Result,
    buffer::{ChannelLayout, PixelBuffer},
    convolution,
    kernel::Kernel,
};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use std::{fmt, str::FromStr};
use strum::VariantArray as _;
use strum_macros::VariantArray;

pub const BLUR_KERNEL_SIZE: usize = 35;

pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

pub const CONTOUR_KERNEL: [[f32; 3]; 3] = [
    [-1.0, -1.0, -1.0],
    [-1.0, 8.0, -1.0],
    [-1.0, -1.0, -1.0],
];

/// Lifts flat regions to white so only boundaries darken.
pub const CONTOUR_BIAS: f32 = 255.0;

pub const EMBOSS_KERNEL: [[f32; 3]; 3] = [
    [0.0, -1.0, -1.0],
    [1.0, 0.0, -1.0],
    [1.0, 1.0, 0.0],
];

pub const SHARPEN_KERNEL: [[f32; 3]; 3] = [
    [-1.0, -1.0, -1.0],
    [-1.0, 9.0, -1.0],
    [-1.0, -1.0, -1.0],
];

/// Rows produce R', G', B' from (R, G, B).
pub const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

static CATALOG: Lazy<FilterCatalog> = Lazy::new(FilterCatalog::standard);

/// The shared, immutable catalog with default settings.
pub fn global() -> &'static FilterCatalog {
    &CATALOG
}

#[derive(VariantArray, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    BlackAndWhite,
    Blur,
    Sketch,
    Emboss,
    Sharpen,
    Sepia,
}

impl FilterKind {
    pub fn all() -> Vec<Self> {
        FilterKind::VARIANTS.to_vec()
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            Self::BlackAndWhite => "black_and_white",
            Self::Blur => "blur",
            Self::Sketch => "sketch",
            Self::Emboss => "emboss",
            Self::Sharpen => "sharpen",
            Self::Sepia => "sepia",
        }
    }

    pub fn try_from_identifier(identifier: &str) -> Option<Self> {
        FilterKind::VARIANTS
            .iter()
            .copied()
            .find(|kind| kind.identifier() == identifier)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for FilterKind {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from_identifier(s).ok_or_else(|| FilterError::UnknownFilter(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub enum FilterOp {
    DirectMap(fn(&PixelBuffer) -> Result<PixelBuffer>),
    Convolution(Kernel),
    ColorMatrix([[f32; 3]; 3]),
}

#[derive(Debug, Clone)]
pub struct FilterSpec {
    kind: FilterKind,
    op: FilterOp,
}

impl FilterSpec {
    pub fn new(kind: FilterKind, op: FilterOp) -> Self {
        Self { kind, op }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn identifier(&self) -> &'static str {
        self.kind.identifier()
    }

    pub fn op(&self) -> &FilterOp {
        &self.op
    }

    /// Color matrices need three channels; everything else works per channel.
    pub fn accepts(&self, layout: ChannelLayout) -> bool {
        match self.op {
            FilterOp::ColorMatrix(_) => layout == ChannelLayout::Rgb,
            FilterOp::DirectMap(_) | FilterOp::Convolution(_) => true,
        }
    }

    pub fn apply(&self, buffer: &PixelBuffer) -> Result<PixelBuffer> {
        if !self.accepts(buffer.channels()) {
            return Err(FilterError::UnsupportedChannelLayout {
                filter: self.identifier(),
                channels: buffer.channels().into(),
            });
        }

        match &self.op {
            FilterOp::DirectMap(map) => map(buffer),
            FilterOp::Convolution(kernel) => Ok(convolution::convolve(buffer, kernel)),
            FilterOp::ColorMatrix(matrix) => Ok(color_matrix(buffer, matrix)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterCatalog {
    specs: Vec<FilterSpec>,
}

impl FilterCatalog {
    pub fn standard() -> Self {
        Self::build(Kernel::gaussian_odd(BLUR_KERNEL_SIZE))
    }

    /// Same table with a different Gaussian size for `blur`.
    pub fn with_blur_size(size: usize) -> Result<Self> {
        Ok(Self::build(Kernel::gaussian(size)?))
    }

    fn build(blur: Kernel) -> Self {
        let specs = FilterKind::all()
            .into_iter()
            .map(|kind| {
                let op = match kind {
                    FilterKind::BlackAndWhite => FilterOp::DirectMap(grayscale),
                    FilterKind::Blur => FilterOp::Convolution(blur.clone()),
                    FilterKind::Sketch => FilterOp::Convolution(
                        Kernel::square3(CONTOUR_KERNEL).with_bias(CONTOUR_BIAS),
                    ),
                    FilterKind::Emboss => FilterOp::Convolution(Kernel::square3(EMBOSS_KERNEL)),
                    FilterKind::Sharpen => FilterOp::Convolution(Kernel::square3(SHARPEN_KERNEL)),
                    FilterKind::Sepia => FilterOp::ColorMatrix(SEPIA_MATRIX),
                };
                FilterSpec::new(kind, op)
            })
            .collect();

        Self { specs }
    }

    pub fn get(&self, identifier: &str) -> Option<&FilterSpec> {
        self.specs.iter().find(|spec| spec.identifier() == identifier)
    }

    pub fn identifiers(&self) -> Vec<&'static str> {
        self.specs.iter().map(FilterSpec::identifier).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterSpec> {
        self.specs.iter()
    }
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Luminance to a single channel. Gray input is already in its final form.
pub fn grayscale(buffer: &PixelBuffer) -> Result<PixelBuffer> {
    match buffer.channels() {
        ChannelLayout::Gray => Ok(buffer.clone()),
        ChannelLayout::Rgb => {
            let samples = buffer
                .samples()
                .par_chunks_exact(3)
                .map(|p| {
                    let gray = LUMA_WEIGHTS[0] * p[0] as f32
                        + LUMA_WEIGHTS[1] * p[1] as f32
                        + LUMA_WEIGHTS[2] * p[2] as f32;
                    gray.round().clamp(0.0, 255.0) as u8
                })
                .collect();

            PixelBuffer::new(buffer.width(), buffer.height(), ChannelLayout::Gray, samples)
        }
    }
}

/// `[R', G', B'] = matrix * [R, G, B]` for every pixel, rounded and clamped.
pub fn color_matrix(buffer: &PixelBuffer, matrix: &[[f32; 3]; 3]) -> PixelBuffer {
    let mut out = buffer.samples().to_vec();
    out.par_chunks_exact_mut(3).for_each(|p| {
        let rgb = [p[0] as f32, p[1] as f32, p[2] as f32];
        for (dst, row) in p.iter_mut().zip(matrix) {
            let v = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
            *dst = v.round().clamp(0.0, 255.0) as u8;
        }
    });

    buffer.with_samples(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_holds_six_filters() {
        assert_eq!(
            global().identifiers(),
            vec!["black_and_white", "blur", "sketch", "emboss", "sharpen", "sepia"]
        );
    }

    #[test]
    fn test_identifier_round_trip() {
        for kind in FilterKind::all() {
            assert_eq!(kind.identifier().parse::<FilterKind>().unwrap(), kind);
        }
        assert!(matches!(
            "contour".parse::<FilterKind>(),
            Err(FilterError::UnknownFilter(_))
        ));
    }

    #[test]
    fn test_grayscale_weights() {
        let buffer = PixelBuffer::new(3, 1, ChannelLayout::Rgb, vec![255, 0, 0, 0, 255, 0, 0, 0, 255])
            .unwrap();
        let gray = grayscale(&buffer).unwrap();

        assert_eq!(gray.channels(), ChannelLayout::Gray);
        // 0.299 * 255 = 76.245, 0.587 * 255 = 149.685, 0.114 * 255 = 29.07
        assert_eq!(gray.samples(), &[76, 150, 29]);
    }

    #[test]
    fn test_sepia_is_per_pixel() {
        let buffer = PixelBuffer::new(2, 1, ChannelLayout::Rgb, vec![0, 0, 0, 100, 50, 20]).unwrap();
        let spec = global().get("sepia").unwrap();
        let out = spec.apply(&buffer).unwrap();

        // A black neighbour must not bleed into the second pixel.
        assert_eq!(out.pixel(0, 0), &[0, 0, 0]);
        // 39.3 + 38.45 + 3.78, 34.9 + 34.3 + 3.36, 27.2 + 26.7 + 2.62
        assert_eq!(out.pixel(1, 0), &[82, 73, 57]);
    }

    #[test]
    fn test_sepia_rejects_gray() {
        let buffer = PixelBuffer::filled(2, 2, &[90]).unwrap();
        let err = global().get("sepia").unwrap().apply(&buffer).unwrap_err();
        assert!(matches!(
            err,
            FilterError::UnsupportedChannelLayout {
                filter: "sepia",
                channels: 1
            }
        ));
    }

    #[test]
    fn test_sketch_flat_is_white() {
        let buffer = PixelBuffer::filled(6, 6, &[40, 90, 200]).unwrap();
        let out = global().get("sketch").unwrap().apply(&buffer).unwrap();
        assert!(out.samples().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_sketch_darkens_boundary() {
        // Dark column on a light background.
        let mut samples = vec![220u8; 25];
        for y in 0..5 {
            samples[y * 5 + 2] = 20;
        }
        let buffer = PixelBuffer::new(5, 5, ChannelLayout::Gray, samples).unwrap();
        let out = global().get("sketch").unwrap().apply(&buffer).unwrap();

        assert_eq!(out.pixel(2, 2), &[0]);
        assert_eq!(out.pixel(0, 2), &[255]);
    }

    #[test]
    fn test_sharpen_keeps_flat_regions() {
        let buffer = PixelBuffer::filled(4, 3, &[12, 130, 250]).unwrap();
        let out = global().get("sharpen").unwrap().apply(&buffer).unwrap();
        assert_eq!(out, buffer);
    }

    #[test]
    fn test_custom_blur_size() {
        let catalog = FilterCatalog::with_blur_size(5).unwrap();
        match catalog.get("blur").unwrap().op() {
            FilterOp::Convolution(kernel) => assert_eq!(kernel.size(), 5),
            other => panic!("unexpected op {other:?}"),
        }
        assert!(FilterCatalog::with_blur_size(6).is_err());
    }
}
