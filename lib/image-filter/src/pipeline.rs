//! Decode, filter, encode.

use crate::{
    Result,
    codec::{self, DEFAULT_JPEG_QUALITY, OutputFormat},
    dispatcher::FilterDispatcher,
};
use derivative::Derivative;
use derive_setters::Setters;

/// Encoded result of one filter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutput {
    pub bytes: Vec<u8>,
    pub filter: &'static str,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct FilterPipeline {
    #[derivative(Default(value = "OutputFormat::Jpeg"))]
    pub output_format: OutputFormat,

    #[derivative(Default(value = "DEFAULT_JPEG_QUALITY"))]
    pub jpeg_quality: u8,

    /// Decode gray sources as three identical channels so color-matrix
    /// filters accept them.
    #[derivative(Default(value = "false"))]
    pub expand_gray: bool,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&self, identifier: &str, bytes: &[u8]) -> Result<FilterOutput> {
        self.run_with(&FilterDispatcher::default(), identifier, bytes)
    }

    pub fn run_with(
        &self,
        dispatcher: &FilterDispatcher<'_>,
        identifier: &str,
        bytes: &[u8],
    ) -> Result<FilterOutput> {
        let mut buffer = codec::decode(bytes)?;
        if self.expand_gray {
            buffer = buffer.to_rgb();
        }

        let result = dispatcher.apply(identifier, &buffer)?;
        let bytes = codec::encode(&result.buffer, self.output_format, self.jpeg_quality)?;

        Ok(FilterOutput {
            bytes,
            filter: result.filter,
            format: self.output_format,
            width: result.buffer.width(),
            height: result.buffer.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FilterError, buffer::PixelBuffer};

    fn gray_png() -> Vec<u8> {
        let buffer = PixelBuffer::filled(4, 4, &[100]).unwrap();
        codec::encode(&buffer, OutputFormat::Png, DEFAULT_JPEG_QUALITY).unwrap()
    }

    #[test]
    fn test_defaults() {
        let pipeline = FilterPipeline::new();
        assert_eq!(pipeline.output_format, OutputFormat::Jpeg);
        assert_eq!(pipeline.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert!(!pipeline.expand_gray);
    }

    #[test]
    fn test_gray_source_rejected_by_sepia() {
        let err = FilterPipeline::new().run("sepia", &gray_png()).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedChannelLayout { .. }));
    }

    #[test]
    fn test_expand_gray_allows_sepia() {
        let output = FilterPipeline::new()
            .with_expand_gray(true)
            .with_output_format(OutputFormat::Png)
            .run("sepia", &gray_png())
            .unwrap();
        let decoded = codec::decode(&output.bytes).unwrap();

        // 100 * (0.393 + 0.769 + 0.189), 100 * 1.203, 100 * 0.937
        assert_eq!(decoded.pixel(1, 1), &[135, 120, 94]);
        assert_eq!(output.filter, "sepia");
    }

    #[test]
    fn test_encode_failure_returns_no_output() {
        // JPEG caps each side at 65535, PNG does not.
        let wide = PixelBuffer::filled(70_000, 1, &[1]).unwrap();
        let png = codec::encode(&wide, OutputFormat::Png, DEFAULT_JPEG_QUALITY).unwrap();

        let err = FilterPipeline::new().run("black_and_white", &png).unwrap_err();
        assert!(matches!(err, FilterError::Encode(_)));

        let output = FilterPipeline::new()
            .with_output_format(OutputFormat::Png)
            .run("black_and_white", &png)
            .unwrap();
        assert_eq!((output.width, output.height), (70_000, 1));
    }

    #[test]
    fn test_engine_types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<crate::FilterCatalog>();
        assert_send_sync::<FilterDispatcher<'static>>();
        assert_send_sync::<FilterPipeline>();
        assert_send_sync::<FilterOutput>();
        assert_send_sync::<PixelBuffer>();
        assert_send_sync::<crate::Kernel>();
    }
}
