//! Transport executor for the Docker Registry HTTP API v2
//!
//! A [`Decoder`] describes one registry resource: which method to use, which
//! request headers to set, what to pull out of the response headers and how to
//! turn the body into a typed value. [`Transport::execute`] issues the request,
//! drains the body on every path and classifies the status code. It branches on
//! HTTP semantics only; resource semantics live in the decoders.

use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::Result;
use crate::logging::Logger;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};

/// A decodable registry resource
pub trait Decoder {
    type Output;

    fn method(&self) -> Method {
        Method::GET
    }

    /// Path below the registry address, e.g. `/v2/_catalog`
    fn path(&self) -> String;

    /// Resource identity used in logs and errors
    fn resource(&self) -> String;

    fn set_headers(&self, _headers: &mut HeaderMap) {}

    /// Pull metadata out of a successful response's headers
    fn extract_headers(&mut self, _headers: &HeaderMap) -> Result<()> {
        Ok(())
    }

    fn decode_body(self, body: &[u8]) -> Result<Self::Output>;
}

/// A fully drained response
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    address: String,
    logger: Logger,
}

impl Transport {
    pub fn new(client: Client, address: String, logger: Logger) -> Self {
        Self {
            client,
            address,
            logger,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Issue one request and read the whole body so the connection can be reused
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        context: &str,
    ) -> Result<RawResponse> {
        let url = self.url(path);
        self.logger.debug(&format!("{} {}", method, url));

        let response = self
            .client
            .request(method.clone(), &url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, context))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, context))?
            .to_vec();

        self.logger
            .detail(&format!("{} {} -> {} ({} bytes)", method, url, status, body.len()));

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Run a decoder against the registry
    pub async fn execute<D: Decoder>(&self, mut decoder: D) -> Result<D::Output> {
        let resource = decoder.resource();
        let mut headers = HeaderMap::new();
        decoder.set_headers(&mut headers);

        let response = self
            .send(decoder.method(), &decoder.path(), headers, &resource)
            .await?;

        match response.status {
            StatusCode::OK | StatusCode::ACCEPTED => {
                decoder.extract_headers(&response.headers)?;
                decoder.decode_body(&response.body)
            }
            status => Err(HttpErrorHandler::handle_status(
                status,
                &response.headers,
                &response.body,
                &resource,
            )),
        }
    }
}
