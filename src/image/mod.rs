//! Image-level logic
//!
//! - [`manifest`]: schema 1 and schema 2 manifests normalized to one blob list
//! - [`digest`]: content digest validation
//! - [`image_manager`]: size aggregation, safe delete and listing

pub mod digest;
pub mod image_manager;
pub mod manifest;

pub use digest::DigestUtils;
pub use image_manager::{DeleteReport, ImageEntry, ImageManager};
pub use manifest::ImageManifest;
