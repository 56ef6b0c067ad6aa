pub mod buffer;
pub mod catalog;
pub mod codec;
pub mod convolution;
pub mod dispatcher;
pub mod kernel;
pub mod pipeline;

pub use buffer::{ChannelLayout, PixelBuffer};
pub use catalog::{FilterCatalog, FilterKind, FilterOp, FilterSpec};
pub use codec::OutputFormat;
pub use dispatcher::{FilterDispatcher, FilterResult};
pub use kernel::Kernel;
pub use pipeline::{FilterOutput, FilterPipeline};

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),
    #[error("Filter `{filter}` does not support {channels}-channel images")]
    UnsupportedChannelLayout { filter: &'static str, channels: u8 },
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Invalid pixel buffer: {0}")]
    InvalidBuffer(String),
    #[error("Invalid kernel: {0}")]
    InvalidKernel(String),
}

/// Decode `bytes`, apply the filter named by `identifier` and encode the
/// result as JPEG with the default pipeline settings.
pub fn apply_filter(identifier: &str, bytes: &[u8]) -> Result<FilterOutput> {
    FilterPipeline::new().run(identifier, bytes)
}
