use crate::{
    FilterError, Result,
    buffer::PixelBuffer,
    catalog::{self, FilterCatalog},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub buffer: PixelBuffer,
    pub filter: &'static str,
}

/// Resolves filter identifiers against a catalog and runs them.
#[derive(Debug, Clone, Copy)]
pub struct FilterDispatcher<'a> {
    catalog: &'a FilterCatalog,
}

impl Default for FilterDispatcher<'static> {
    fn default() -> Self {
        Self::new(catalog::global())
    }
}

impl<'a> FilterDispatcher<'a> {
    pub fn new(catalog: &'a FilterCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a FilterCatalog {
        self.catalog
    }

    pub fn apply(&self, identifier: &str, buffer: &PixelBuffer) -> Result<FilterResult> {
        let spec = self.catalog.get(identifier).ok_or_else(|| {
            log::warn!("rejecting unknown filter `{identifier}`");
            FilterError::UnknownFilter(identifier.to_string())
        })?;

        log::debug!(
            "applying `{}` to {}x{}x{}",
            spec.identifier(),
            buffer.width(),
            buffer.height(),
            buffer.channels().count()
        );

        Ok(FilterResult {
            buffer: spec.apply(buffer)?,
            filter: spec.identifier(),
        })
    }
}
