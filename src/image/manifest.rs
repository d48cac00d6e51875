//! Image manifest schema handling
//!
//! Registries serve two incompatible manifest generations:
//! - Schema 1 lists layers under `fsLayers[].blobSum`
//! - Schema 2 lists layers under `layers[].digest`
//!
//! Both are normalized into one ordered list of blob digests. Any other
//! `schemaVersion` is rejected rather than guessed at, since the blob list
//! drives deletion decisions.

use crate::error::{RegistryError, Result};
use serde::Deserialize;

pub const MANIFEST_V2_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MANIFEST_LIST_V2_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

#[derive(Debug, Clone, Deserialize)]
pub struct FsLayer {
    #[serde(rename = "blobSum")]
    pub blob_sum: String,
}

/// Schema 1 manifest; only the fields needed for blob extraction
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaV1Manifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(rename = "fsLayers", default)]
    pub fs_layers: Vec<FsLayer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    #[serde(default)]
    pub size: u64,
    pub digest: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaV2Manifest {
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    pub config: Option<Descriptor>,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

/// Schema 2 manifest list: one child manifest per platform
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestList {
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    pub manifests: Vec<Descriptor>,
}

#[derive(Debug, Clone)]
pub enum ImageManifest {
    V1(SchemaV1Manifest),
    V2(SchemaV2Manifest),
    List(ManifestList),
}

impl ImageManifest {
    /// Parse a manifest body, reading `schemaVersion` before anything else
    pub fn parse(body: &[u8], resource: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
            RegistryError::protocol(resource, format!("manifest is not valid JSON: {}", e))
        })?;

        let version = raw
            .get("schemaVersion")
            .ok_or_else(|| RegistryError::protocol(resource, "manifest has no schemaVersion"))?
            .as_i64()
            .ok_or_else(|| {
                RegistryError::protocol(resource, "manifest schemaVersion is not an integer")
            })?;

        let parsed = match version {
            1 => serde_json::from_value(raw).map(ImageManifest::V1),
            2 if raw.get("manifests").is_some() => {
                serde_json::from_value(raw).map(ImageManifest::List)
            }
            2 => serde_json::from_value(raw).map(ImageManifest::V2),
            version => {
                return Err(RegistryError::UnknownManifestSchema {
                    resource: resource.to_string(),
                    version,
                });
            }
        };

        parsed.map_err(|e| {
            RegistryError::protocol(resource, format!("malformed schema {} manifest: {}", version, e))
        })
    }

    pub fn schema_version(&self) -> i64 {
        match self {
            ImageManifest::V1(_) => 1,
            ImageManifest::V2(_) | ImageManifest::List(_) => 2,
        }
    }

    /// Blob digests in the order the manifest lists them. A manifest list
    /// references no blobs itself; see [`ImageManifest::manifest_digests`]
    pub fn blob_digests(&self) -> Vec<String> {
        match self {
            ImageManifest::V1(manifest) => manifest
                .fs_layers
                .iter()
                .map(|layer| layer.blob_sum.clone())
                .collect(),
            ImageManifest::V2(manifest) => manifest
                .layers
                .iter()
                .map(|layer| layer.digest.clone())
                .collect(),
            ImageManifest::List(_) => Vec::new(),
        }
    }

    /// Child manifest digests of a manifest list
    pub fn manifest_digests(&self) -> Vec<String> {
        match self {
            ImageManifest::List(list) => list
                .manifests
                .iter()
                .map(|child| child.digest.clone())
                .collect(),
            _ => Vec::new(),
        }
    }
}
