//! Configuration for the registry endpoint and the listing output

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_REGISTRY: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// TLS material for the registry connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Use TLS; implied by `verify`
    pub enabled: bool,
    /// Verify the remote certificate
    pub verify: bool,
    /// Trust certs signed only by this CA
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
}

impl TlsConfig {
    pub fn validate(&self) -> Result<()> {
        match (&self.client_cert, &self.client_key) {
            (Some(_), None) => Err(RegistryError::config(
                "TLS client certificate given without a key",
            )),
            (None, Some(_)) => Err(RegistryError::config(
                "TLS client key given without a certificate",
            )),
            _ => Ok(()),
        }
    }

    /// Accept invalid certificates: TLS is on but verification is off
    pub fn accept_invalid_certs(&self) -> bool {
        self.enabled && !self.verify
    }
}

/// Registry endpoint configuration, immutable for one command invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub address: String,
    /// Per-request timeout in seconds
    pub timeout: u64,
    pub tls: TlsConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY.to_string())
    }
}

impl RegistryConfig {
    pub fn new(address: String) -> Self {
        Self {
            address: address.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            tls: TlsConfig::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(RegistryError::config("Registry address cannot be empty"));
        }

        if !self.address.starts_with("http://") && !self.address.starts_with("https://") {
            return Err(RegistryError::config(format!(
                "Invalid registry address: {}. Must start with http:// or https://",
                self.address
            )));
        }

        url::Url::parse(&self.address).map_err(|e| {
            RegistryError::config(format!("Invalid registry address {}: {}", self.address, e))
        })?;

        if self.timeout == 0 {
            return Err(RegistryError::config("Timeout must be greater than 0"));
        }

        if self.tls.enabled && self.address.starts_with("http://") {
            return Err(RegistryError::config(format!(
                "TLS requested but registry address {} is plain http",
                self.address
            )));
        }

        self.tls.validate()
    }

    /// Overlay environment variables on values the caller left at their defaults
    pub fn from_env(self) -> Self {
        self.from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.address == DEFAULT_REGISTRY {
            if let Some(address) = lookup("REGISTRY_JANITOR_REGISTRY") {
                self.address = address.trim_end_matches('/').to_string();
            }
        }
        if self.timeout == DEFAULT_TIMEOUT_SECS {
            if let Some(timeout) = lookup("REGISTRY_JANITOR_TIMEOUT").and_then(|t| t.parse().ok()) {
                self.timeout = timeout;
            }
        }
        if let Some(val) = lookup("REGISTRY_JANITOR_TLS_VERIFY") {
            if val.to_lowercase() == "true" || val == "1" {
                self.tls.enabled = true;
                self.tls.verify = true;
            }
        }
        self
    }
}

/// Display toggles for the image listing
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ListOptions {
    pub size: bool,
    pub digest: bool,
    /// Print sizes in bytes instead of human-readable units
    pub bytes: bool,
}

/// Verbose flag from the environment, used when `--verbose` was not passed
pub fn verbose_from_env() -> bool {
    std::env::var("REGISTRY_JANITOR_VERBOSE")
        .map(|val| val.to_lowercase() == "true" || val == "1")
        .unwrap_or(false)
}
