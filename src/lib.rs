//! Registry Janitor Library
//!
//! Client for the Docker Registry HTTP API v2: repository and tag discovery,
//! manifest resolution for schema 1 and 2, image sizes, and tag deletion that
//! keeps blobs still referenced by sibling tags.

pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod inventory;
pub mod logging;
pub mod registry;

pub use config::{ListOptions, RegistryConfig, TlsConfig};
pub use error::{RegistryError, Result};
pub use image::{DeleteReport, ImageManager};
pub use inventory::Inventory;
pub use logging::Logger;
pub use registry::{ManifestRef, RegistryApi, RegistryClient, RegistryClientBuilder};
