//! Command-line argument parsing

use crate::config::{DEFAULT_REGISTRY, DEFAULT_TIMEOUT_SECS, ListOptions, RegistryConfig, TlsConfig};
use crate::error::{RegistryError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "registry-janitor")]
#[command(about = "List and safely delete images in a Docker registry (HTTP API v2)")]
#[command(version, author)]
pub struct Args {
    /// Registry base URL
    #[arg(
        long = "registry",
        short = 'r',
        global = true,
        default_value = DEFAULT_REGISTRY,
        help = "Registry URL, e.g. https://registry.example.com:5000"
    )]
    pub registry: String,

    #[arg(long = "tls", global = true, help = "Use TLS")]
    pub tls: bool,

    #[arg(
        long = "tlsverify",
        global = true,
        help = "Use TLS and verify the remote certificate"
    )]
    pub tls_verify: bool,

    #[arg(
        long = "tlscacert",
        global = true,
        help = "Trust certificates signed by this CA only"
    )]
    pub tls_ca_cert: Option<PathBuf>,

    #[arg(long = "tlscert", global = true, help = "Path to the TLS client certificate")]
    pub tls_cert: Option<PathBuf>,

    #[arg(long = "tlskey", global = true, help = "Path to the TLS client key")]
    pub tls_key: Option<PathBuf>,

    /// Timeout in seconds for each registry call
    #[arg(
        long = "timeout",
        short = 't',
        global = true,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Timeout for registry calls in seconds"
    )]
    pub timeout: u64,

    #[arg(long = "verbose", short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long = "quiet",
        short = 'q',
        global = true,
        conflicts_with = "verbose",
        help = "Only print command results"
    )]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List images, optionally filtered by a repository glob
    #[command(visible_alias = "ls")]
    List {
        #[arg(help = "Glob matched against repository names, e.g. 'library/*'")]
        filter: Option<String>,

        #[arg(long = "size", short = 's', help = "Show the total size of each image")]
        size: bool,

        #[arg(long = "digest", short = 'd', help = "Show the manifest digest of each image")]
        digest: bool,

        #[arg(long = "bytes", short = 'b', help = "Show sizes in bytes")]
        bytes: bool,
    },

    /// Delete an image tag and the blobs no other tag uses
    #[command(visible_aliases = ["rm", "remove"])]
    Delete {
        #[arg(help = "Image to delete as repository:tag")]
        image: String,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Registry configuration from the flags, with environment overrides
    /// for the values left at their defaults
    pub fn registry_config(&self) -> RegistryConfig {
        let tls = TlsConfig {
            enabled: self.tls || self.tls_verify,
            verify: self.tls_verify,
            ca_cert: self.tls_ca_cert.clone(),
            client_cert: self.tls_cert.clone(),
            client_key: self.tls_key.clone(),
        };

        RegistryConfig::new(self.registry.clone())
            .with_timeout(self.timeout)
            .with_tls(tls)
            .from_env()
    }

    pub fn list_options(&self) -> ListOptions {
        match &self.command {
            Command::List {
                size, digest, bytes, ..
            } => ListOptions {
                size: *size,
                digest: *digest,
                bytes: *bytes,
            },
            Command::Delete { .. } => ListOptions::default(),
        }
    }
}

/// Split `repository:tag` at the last `:` after the last `/`,
/// so a registry port in the name is not taken for a tag
pub fn parse_reference(reference: &str) -> Result<(String, String)> {
    let name_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    let (repository, tag) = match reference[name_start..].rfind(':') {
        Some(i) => {
            let split = name_start + i;
            (&reference[..split], &reference[split + 1..])
        }
        None => {
            return Err(RegistryError::config(format!(
                "image reference {:?} has no tag, expected repository:tag",
                reference
            )));
        }
    };

    if repository.is_empty() || tag.is_empty() {
        return Err(RegistryError::config(format!(
            "invalid image reference {:?}, expected repository:tag",
            reference
        )));
    }

    Ok((repository.to_string(), tag.to_string()))
}
