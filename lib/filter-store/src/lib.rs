//! Persistence for uploaded originals and their filtered derivatives.
//!
//! Every artifact is a file under the store root plus a JSON record in
//! `records/`. A filtered record always names the entered image it was
//! derived from and the filter that produced it.

pub mod record;
pub mod store;

pub use record::{EnteredImage, FilteredImage, Record};
pub use store::ArtifactStore;
