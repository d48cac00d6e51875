//! Registry resource decoders
//!
//! One small [`Decoder`](crate::registry::transport::Decoder) type per
//! registry resource, grouped by the part of the API they touch.

pub mod blob_operations;
pub mod manifest_operations;
pub mod repository_operations;

pub use blob_operations::{BlobDeleteDecoder, BlobSizeDecoder};
pub use manifest_operations::{ManifestDecoder, ManifestDeleteDecoder, ManifestRef};
pub use repository_operations::{CatalogDecoder, TagsDecoder};
