//! Registry module for Docker registry interactions
//!
//! This module provides the client for the Docker Registry HTTP API v2: the
//! version handshake, the transport executor and one decoder per resource.

pub mod client;
pub mod operations;
pub mod transport;

pub use client::{RegistryApi, RegistryClient, RegistryClientBuilder};
pub use operations::ManifestRef;
pub use transport::{Decoder, Transport};
