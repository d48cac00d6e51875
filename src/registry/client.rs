// This file contains the RegistryClient, which talks to one Docker registry
// over the HTTP API v2. A client only exists after the version handshake
// succeeded: `RegistryClientBuilder::connect` is the single way to get one.

use crate::config::RegistryConfig;
use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::operations::{
    BlobDeleteDecoder, BlobSizeDecoder, CatalogDecoder, ManifestDecoder, ManifestDeleteDecoder,
    ManifestRef, TagsDecoder,
};
use crate::registry::transport::Transport;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use reqwest::{Certificate, Client, Identity, Method, StatusCode};
use std::path::Path;
use std::time::Duration;

pub const API_VERSION_HEADER: &str = "docker-distribution-api-version";
pub const EXPECTED_API_VERSION: &str = "registry/2.0";

/// The registry calls the inventory, size and delete logic is built on
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn catalog(&self) -> Result<Vec<String>>;

    async fn tags(&self, repository: &str) -> Result<Vec<String>>;

    /// Resolve a tag or digest to its manifest digest and blob list
    async fn manifest(&self, repository: &str, reference: &str) -> Result<ManifestRef>;

    async fn blob_size(&self, repository: &str, digest: &str) -> Result<u64>;

    async fn delete_blob(&self, repository: &str, digest: &str) -> Result<()>;

    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<()>;
}

pub struct RegistryClientBuilder {
    config: RegistryConfig,
    logger: Logger,
}

impl RegistryClientBuilder {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            logger: Logger::default(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    fn build_http_client(&self) -> Result<Client> {
        let tls = &self.config.tls;
        let mut builder = Client::builder().timeout(Duration::from_secs(self.config.timeout));

        if tls.accept_invalid_certs() {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        if let Some(ca_cert) = &tls.ca_cert {
            let pem = read_pem(ca_cert, "CA certificate")?;
            let certificate = Certificate::from_pem(&pem).map_err(|e| {
                RegistryError::config(format!("invalid CA certificate {}: {}", ca_cert.display(), e))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        if let (Some(cert), Some(key)) = (&tls.client_cert, &tls.client_key) {
            let cert_pem = read_pem(cert, "client certificate")?;
            let key_pem = read_pem(key, "client key")?;
            let identity = Identity::from_pkcs8_pem(&cert_pem, &key_pem).map_err(|e| {
                RegistryError::config(format!("invalid client certificate {}: {}", cert.display(), e))
            })?;
            builder = builder.identity(identity);
        }

        builder
            .build()
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "HTTP client setup"))
    }

    /// Build the client and verify the registry speaks the v2 API
    pub async fn connect(self) -> Result<RegistryClient> {
        self.config.validate()?;
        let client = self.build_http_client()?;
        let transport = Transport::new(client, self.config.address.clone(), self.logger.clone());

        check_registry_version(&transport).await?;
        self.logger
            .verbose(&format!("Registry API v2 is available at {}", self.config.address));

        Ok(RegistryClient {
            transport,
            logger: self.logger,
        })
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| RegistryError::config(format!("cannot read {} {}: {}", what, path.display(), e)))
}

/// Version handshake against `/v2/`
async fn check_registry_version(transport: &Transport) -> Result<()> {
    let response = transport
        .send(Method::GET, "/v2/", HeaderMap::new(), "registry version check")
        .await?;
    let address = transport.address().to_string();

    match response.status {
        StatusCode::OK => {}
        StatusCode::UNAUTHORIZED => {
            return Err(RegistryError::AuthenticationRequired {
                resource: format!("{}/v2/", address),
                challenge: response
                    .headers
                    .get(WWW_AUTHENTICATE)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string()),
            });
        }
        StatusCode::NOT_FOUND => {
            return Err(RegistryError::UnsupportedProtocol {
                address,
                reason: "/v2/ endpoint not found".to_string(),
            });
        }
        status => {
            return Err(HttpErrorHandler::handle_status(
                status,
                &response.headers,
                &response.body,
                &format!("{}/v2/", address),
            ));
        }
    }

    match response
        .headers
        .get(API_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(EXPECTED_API_VERSION) => Ok(()),
        Some(other) => Err(RegistryError::UnsupportedProtocol {
            address,
            reason: format!("unexpected API version {:?}", other),
        }),
        None => Err(RegistryError::UnsupportedProtocol {
            address,
            reason: "missing Docker-Distribution-API-Version header".to_string(),
        }),
    }
}

/// Registry deletes answer 404 without an error body too; that is still "not found"
fn not_found_on_404(err: RegistryError) -> RegistryError {
    match err {
        RegistryError::BadStatus { resource, status: 404 } => RegistryError::NotFound {
            resource,
            code: None,
            message: None,
        },
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    transport: Transport,
    logger: Logger,
}

impl RegistryClient {
    pub fn builder(config: RegistryConfig) -> RegistryClientBuilder {
        RegistryClientBuilder::new(config)
    }

    pub fn address(&self) -> &str {
        self.transport.address()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn catalog(&self) -> Result<Vec<String>> {
        self.transport.execute(CatalogDecoder).await
    }

    async fn tags(&self, repository: &str) -> Result<Vec<String>> {
        self.transport.execute(TagsDecoder::new(repository)).await
    }

    async fn manifest(&self, repository: &str, reference: &str) -> Result<ManifestRef> {
        self.transport
            .execute(ManifestDecoder::new(repository, reference))
            .await
    }

    async fn blob_size(&self, repository: &str, digest: &str) -> Result<u64> {
        self.transport
            .execute(BlobSizeDecoder::new(repository, digest))
            .await
    }

    async fn delete_blob(&self, repository: &str, digest: &str) -> Result<()> {
        self.transport
            .execute(BlobDeleteDecoder::new(repository, digest))
            .await
            .map_err(not_found_on_404)
    }

    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<()> {
        self.transport
            .execute(ManifestDeleteDecoder::new(repository, digest))
            .await
            .map_err(not_found_on_404)
    }
}
