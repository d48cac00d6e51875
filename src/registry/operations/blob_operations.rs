//! Blob operations for registry client
//!
//! Implements Docker Registry v2 blob operations:
//! - Blob size (HEAD /v2/{name}/blobs/{digest}), verified against the requested digest
//! - Blob deletion (DELETE /v2/{name}/blobs/{digest})

use crate::error::{RegistryError, Result};
use crate::registry::operations::manifest_operations::DOCKER_CONTENT_DIGEST;
use crate::registry::transport::Decoder;
use reqwest::Method;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};

/// Delete confirmations carry no body: `Content-Length` must be absent or zero
pub(crate) fn ensure_bodyless(headers: &HeaderMap, resource: &str) -> Result<()> {
    match headers.get(CONTENT_LENGTH).map(|v| v.to_str()) {
        None => Ok(()),
        Some(Ok("0")) => Ok(()),
        Some(Ok(length)) => Err(RegistryError::protocol(
            resource,
            format!("delete confirmation should have no body, got Content-Length {}", length),
        )),
        Some(Err(_)) => Err(RegistryError::protocol(
            resource,
            "delete confirmation has an unreadable Content-Length",
        )),
    }
}

/// Size of one blob as reported by the registry
#[derive(Debug)]
pub struct BlobSizeDecoder {
    repository: String,
    digest: String,
    size: Option<u64>,
}

impl BlobSizeDecoder {
    pub fn new(repository: &str, digest: &str) -> Self {
        Self {
            repository: repository.to_string(),
            digest: digest.to_string(),
            size: None,
        }
    }
}

impl Decoder for BlobSizeDecoder {
    type Output = u64;

    fn method(&self) -> Method {
        Method::HEAD
    }

    fn path(&self) -> String {
        format!("/v2/{}/blobs/{}", self.repository, self.digest)
    }

    fn resource(&self) -> String {
        format!("blob {}@{}", self.repository, self.digest)
    }

    fn extract_headers(&mut self, headers: &HeaderMap) -> Result<()> {
        let returned = headers
            .get(DOCKER_CONTENT_DIGEST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        // A size reported under another identity means nothing
        if returned != self.digest {
            return Err(RegistryError::DigestMismatch {
                resource: self.resource(),
                expected: self.digest.clone(),
                actual: if returned.is_empty() {
                    "(missing)".to_string()
                } else {
                    returned.to_string()
                },
            });
        }

        let length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RegistryError::protocol(self.resource(), "missing Content-Length header"))?;

        let size = length.trim().parse::<u64>().map_err(|e| {
            RegistryError::protocol(
                self.resource(),
                format!("invalid Content-Length {:?}: {}", length, e),
            )
        })?;

        self.size = Some(size);
        Ok(())
    }

    fn decode_body(self, _body: &[u8]) -> Result<u64> {
        self.size
            .ok_or_else(|| RegistryError::protocol(self.resource(), "blob size was not reported"))
    }
}

/// Physically removes one blob. There is no safety here; callers decide what may go
#[derive(Debug)]
pub struct BlobDeleteDecoder {
    repository: String,
    digest: String,
}

impl BlobDeleteDecoder {
    pub fn new(repository: &str, digest: &str) -> Self {
        Self {
            repository: repository.to_string(),
            digest: digest.to_string(),
        }
    }
}

impl Decoder for BlobDeleteDecoder {
    type Output = ();

    fn method(&self) -> Method {
        Method::DELETE
    }

    fn path(&self) -> String {
        format!("/v2/{}/blobs/{}", self.repository, self.digest)
    }

    fn resource(&self) -> String {
        format!("blob {}@{}", self.repository, self.digest)
    }

    fn extract_headers(&mut self, headers: &HeaderMap) -> Result<()> {
        ensure_bodyless(headers, &self.resource())
    }

    fn decode_body(self, _body: &[u8]) -> Result<()> {
        Ok(())
    }
}
