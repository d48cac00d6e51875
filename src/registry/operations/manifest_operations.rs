//! Manifest operations for registry client
//!
//! Implements Docker Registry v2 manifest operations:
//! - Manifest resolution (GET /v2/{name}/manifests/{reference})
//! - Manifest deletion (DELETE /v2/{name}/manifests/{digest})
//!
//! The manifest digest always comes from the `Docker-Content-Digest` response
//! header; it is never computed from the body.

use crate::error::{RegistryError, Result};
use crate::image::digest::DigestUtils;
use crate::image::manifest::{ImageManifest, MANIFEST_LIST_V2_MEDIA_TYPE, MANIFEST_V2_MEDIA_TYPE};
use crate::registry::operations::blob_operations::ensure_bodyless;
use crate::registry::transport::Decoder;
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

pub const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

/// A resolved manifest: its digest plus the ordered blob digests it references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRef {
    pub digest: String,
    pub schema_version: i64,
    pub blobs: Vec<String>,
    /// Child manifest digests when this is a manifest list, empty otherwise
    pub manifests: Vec<String>,
}

impl ManifestRef {
    pub fn is_list(&self) -> bool {
        !self.manifests.is_empty()
    }
}

#[derive(Debug)]
pub struct ManifestDecoder {
    repository: String,
    reference: String,
    digest: Option<String>,
}

impl ManifestDecoder {
    /// `reference` is a tag or a digest
    pub fn new(repository: &str, reference: &str) -> Self {
        Self {
            repository: repository.to_string(),
            reference: reference.to_string(),
            digest: None,
        }
    }
}

impl Decoder for ManifestDecoder {
    type Output = ManifestRef;

    fn path(&self) -> String {
        format!("/v2/{}/manifests/{}", self.repository, self.reference)
    }

    fn resource(&self) -> String {
        format!("manifest {}:{}", self.repository, self.reference)
    }

    fn set_headers(&self, headers: &mut HeaderMap) {
        let accept = format!("{}, {}", MANIFEST_V2_MEDIA_TYPE, MANIFEST_LIST_V2_MEDIA_TYPE);
        if let Ok(value) = HeaderValue::from_str(&accept) {
            headers.insert(ACCEPT, value);
        }
    }

    fn extract_headers(&mut self, headers: &HeaderMap) -> Result<()> {
        let digest = headers
            .get(DOCKER_CONTENT_DIGEST)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                RegistryError::protocol(
                    self.resource(),
                    format!("missing {} header", DOCKER_CONTENT_DIGEST),
                )
            })?;

        if !DigestUtils::is_valid_digest(digest) {
            return Err(RegistryError::protocol(
                self.resource(),
                format!("malformed {} header: {}", DOCKER_CONTENT_DIGEST, digest),
            ));
        }

        self.digest = Some(digest.to_string());
        Ok(())
    }

    fn decode_body(self, body: &[u8]) -> Result<ManifestRef> {
        let resource = self.resource();
        let manifest = ImageManifest::parse(body, &resource)?;
        let digest = self.digest.ok_or_else(|| {
            RegistryError::protocol(&resource, format!("missing {} header", DOCKER_CONTENT_DIGEST))
        })?;

        Ok(ManifestRef {
            digest,
            schema_version: manifest.schema_version(),
            blobs: manifest.blob_digests(),
            manifests: manifest.manifest_digests(),
        })
    }
}

/// Removes a manifest; registries key manifest deletion by digest, not tag
#[derive(Debug)]
pub struct ManifestDeleteDecoder {
    repository: String,
    digest: String,
}

impl ManifestDeleteDecoder {
    pub fn new(repository: &str, digest: &str) -> Self {
        Self {
            repository: repository.to_string(),
            digest: digest.to_string(),
        }
    }
}

impl Decoder for ManifestDeleteDecoder {
    type Output = ();

    fn method(&self) -> Method {
        Method::DELETE
    }

    fn path(&self) -> String {
        format!("/v2/{}/manifests/{}", self.repository, self.digest)
    }

    fn resource(&self) -> String {
        format!("manifest {}@{}", self.repository, self.digest)
    }

    fn extract_headers(&mut self, headers: &HeaderMap) -> Result<()> {
        ensure_bodyless(headers, &self.resource())
    }

    fn decode_body(self, _body: &[u8]) -> Result<()> {
        Ok(())
    }
}
