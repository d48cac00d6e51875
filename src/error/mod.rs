//! Error types and handlers for registry operations

pub mod handlers;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Registry answered 401; the caller has to act on the challenge
    #[error("authentication required for {resource}{}", challenge_suffix(.challenge))]
    AuthenticationRequired {
        resource: String,
        challenge: Option<String>,
    },

    /// Registry does not implement the v2 API family
    #[error("registry at {address} does not support the v2 API: {reason}")]
    UnsupportedProtocol { address: String, reason: String },

    /// Resource not found, with the registry's error code when it sent one
    #[error("not found: {resource}{}", api_error_suffix(.code, .message))]
    NotFound {
        resource: String,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("unknown manifest schema version {version} for {resource}")]
    UnknownManifestSchema { resource: String, version: i64 },

    /// Registry returned an object under a different identity than requested
    #[error("digest mismatch for {resource}: expected {expected}, got {actual}")]
    DigestMismatch {
        resource: String,
        expected: String,
        actual: String,
    },

    #[error("bad status {status} for {resource}")]
    BadStatus { resource: String, status: u16 },

    /// Response headers or body do not have the expected shape
    #[error("protocol error for {resource}: {reason}")]
    Protocol { resource: String, reason: String },

    /// Network, TLS or timeout failure of a single call
    #[error("transport error during {context}: {message}")]
    Transport { context: String, message: String },

    /// Safe delete stopped before the manifest was removed
    #[error("delete of {image} aborted after removing {} blob(s): {source}", .deleted.len())]
    Aborted {
        image: String,
        deleted: Vec<String>,
        #[source]
        source: Box<RegistryError>,
    },

    #[error("configuration error: {message}")]
    Config { message: String },
}

fn challenge_suffix(challenge: &Option<String>) -> String {
    match challenge {
        Some(challenge) => format!(" (WWW-Authenticate: {})", challenge),
        None => String::new(),
    }
}

fn api_error_suffix(code: &Option<String>, message: &Option<String>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!(": code \"{}\" message \"{}\"", code, message),
        (Some(code), None) => format!(": code \"{}\"", code),
        (None, Some(message)) => format!(": {}", message),
        (None, None) => String::new(),
    }
}

impl RegistryError {
    pub fn protocol(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::Protocol {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        RegistryError::Config {
            message: message.into(),
        }
    }

    /// ProtocolError class of the error taxonomy: unexpected status or shape
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            RegistryError::BadStatus { .. } | RegistryError::Protocol { .. }
        )
    }

    /// Exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            RegistryError::NotFound { .. } => 1,
            RegistryError::Config { .. } => 1,

            RegistryError::AuthenticationRequired { .. } => 2,
            RegistryError::UnsupportedProtocol { .. } => 2,

            RegistryError::DigestMismatch { .. } => 3,
            RegistryError::UnknownManifestSchema { .. } => 3,
            RegistryError::BadStatus { .. } | RegistryError::Protocol { .. } => 3,

            RegistryError::Transport { .. } => 4,

            RegistryError::Aborted { .. } => 5,
        }
    }
}
