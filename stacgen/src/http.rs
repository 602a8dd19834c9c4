//! HTTP client abstraction for testability.
//!
//! The assembler fetches metadata documents and sidecars with [`AsyncHttpClient::get`];
//! the publisher needs the raw status code of POST and PUT requests, so those
//! return an [`HttpResponse`] instead of failing on non-success statuses.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::error::{Classify, ErrorClass};

/// Default User-Agent string for HTTP requests.
const DEFAULT_USER_AGENT: &str = concat!("stacgen/", env!("CARGO_PKG_VERSION"));

/// Errors raised by HTTP clients.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// Connection, timeout or protocol failure before a response arrived
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// A GET returned a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Client construction failed
    #[error("failed to create HTTP client: {0}")]
    Build(String),
}

impl Classify for HttpError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Transport { .. } => ErrorClass::Retryable,
            Self::Status { status, .. } if *status >= 500 => ErrorClass::Retryable,
            Self::Status { .. } => ErrorClass::FatalToJob,
            Self::Build(_) => ErrorClass::FatalToProcess,
        }
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Trait for asynchronous HTTP client operations.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs a GET request and returns the body of a success response.
    ///
    /// Non-success statuses are returned as [`HttpError::Status`].
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;

    /// Performs a POST with a JSON body and returns whatever status came back.
    fn post_json(
        &self,
        url: &str,
        json_body: &str,
    ) -> impl Future<Output = Result<HttpResponse, HttpError>> + Send;

    /// Performs a PUT with a JSON body and returns whatever status came back.
    fn put_json(
        &self,
        url: &str,
        json_body: &str,
    ) -> impl Future<Output = Result<HttpResponse, HttpError>> + Send;
}

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new client with a 30 second timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(30)
    }

    /// Creates a new client with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self { client })
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        json_body: &str,
    ) -> Result<HttpResponse, HttpError> {
        let response = request
            .header("Content-Type", "application/json")
            .body(json_body.to_string())
            .send()
            .await
            .map_err(|e| {
                warn!(url = url, error = %e, is_timeout = e.is_timeout(), "HTTP request failed");
                transport(url, e)
            })?;

        let status = response.status().as_u16();
        debug!(url = url, status = status, "HTTP response received");

        let body = response.bytes().await.map_err(|e| transport(url, e))?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

fn transport(url: &str, e: reqwest::Error) -> HttpError {
    HttpError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(transport(url, e));
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            debug!(url = url, status = status, "HTTP error status");
            return Err(HttpError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(|e| transport(url, e))?;
        trace!(url = url, bytes = bytes.len(), "HTTP response body read");
        Ok(bytes.to_vec())
    }

    async fn post_json(&self, url: &str, json_body: &str) -> Result<HttpResponse, HttpError> {
        self.send_json(self.client.post(url), url, json_body).await
    }

    async fn put_json(&self, url: &str, json_body: &str) -> Result<HttpResponse, HttpError> {
        self.send_json(self.client.put(url), url, json_body).await
    }
}
