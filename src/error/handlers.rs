//! Standardized mapping of HTTP and network failures onto registry errors

use crate::error::RegistryError;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use serde::Deserialize;

/// Error body of the Registry HTTP API v2
#[derive(Debug, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Standard error handler for non-success HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Classify a non-success response; `body` is the already drained response body
    pub fn handle_status(
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
        resource: &str,
    ) -> RegistryError {
        match status {
            StatusCode::UNAUTHORIZED => RegistryError::AuthenticationRequired {
                resource: resource.to_string(),
                challenge: headers
                    .get(WWW_AUTHENTICATE)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string()),
            },
            StatusCode::NOT_FOUND => match Self::single_api_error(body) {
                Some(api_error) => RegistryError::NotFound {
                    resource: resource.to_string(),
                    code: Some(api_error.code),
                    message: Some(api_error.message),
                },
                None => RegistryError::BadStatus {
                    resource: resource.to_string(),
                    status: status.as_u16(),
                },
            },
            _ => RegistryError::BadStatus {
                resource: resource.to_string(),
                status: status.as_u16(),
            },
        }
    }

    /// The registry error entry, only when the body is JSON with exactly one.
    /// Registries are not consistent about `Content-Type`, so only the body counts
    fn single_api_error(body: &[u8]) -> Option<ApiError> {
        if body.is_empty() {
            return None;
        }

        let mut reply: ErrorReply = serde_json::from_slice(body).ok()?;
        if reply.errors.len() == 1 {
            reply.errors.pop()
        } else {
            None
        }
    }
}

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Categorize and format network errors with helpful context
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> RegistryError {
        let message = if error.is_timeout() {
            format!("timeout: {}", error)
        } else if error.is_connect() {
            format!("connection error: {}", error)
        } else if error.to_string().contains("dns") {
            format!("DNS resolution error: {}", error)
        } else if error.to_string().contains("certificate") {
            format!("TLS certificate error: {}", error)
        } else {
            format!("network error: {}", error)
        };

        RegistryError::Transport {
            context: context.to_string(),
            message,
        }
    }
}
