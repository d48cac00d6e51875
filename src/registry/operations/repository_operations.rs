//! Repository operations for registry client
//!
//! Implements Docker Registry v2 repository-level listings:
//! - Catalog (GET /v2/_catalog)
//! - Tag listing (GET /v2/{name}/tags/list)
//!
//! No pagination: one response is taken as the complete list. Empty and
//! `null` lists decode to an empty `Vec`.

use crate::error::{RegistryError, Result};
use crate::registry::transport::Decoder;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    repositories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Repository names known to the registry
#[derive(Debug, Default)]
pub struct CatalogDecoder;

impl Decoder for CatalogDecoder {
    type Output = Vec<String>;

    fn path(&self) -> String {
        "/v2/_catalog".to_string()
    }

    fn resource(&self) -> String {
        "catalog".to_string()
    }

    fn decode_body(self, body: &[u8]) -> Result<Vec<String>> {
        let catalog: CatalogResponse = serde_json::from_slice(body).map_err(|e| {
            RegistryError::protocol(self.resource(), format!("failed to parse catalog: {}", e))
        })?;
        Ok(catalog.repositories.unwrap_or_default())
    }
}

/// Tag names of one repository
#[derive(Debug)]
pub struct TagsDecoder {
    repository: String,
}

impl TagsDecoder {
    pub fn new(repository: &str) -> Self {
        Self {
            repository: repository.to_string(),
        }
    }
}

impl Decoder for TagsDecoder {
    type Output = Vec<String>;

    fn path(&self) -> String {
        format!("/v2/{}/tags/list", self.repository)
    }

    fn resource(&self) -> String {
        format!("tags of {}", self.repository)
    }

    fn decode_body(self, body: &[u8]) -> Result<Vec<String>> {
        let tags: TagsResponse = serde_json::from_slice(body).map_err(|e| {
            RegistryError::protocol(self.resource(), format!("failed to parse tag list: {}", e))
        })?;
        Ok(tags.tags.unwrap_or_default())
    }
}
