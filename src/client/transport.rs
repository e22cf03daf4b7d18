//! Transport abstraction for the runners client.
//!
//! The client builds [`ApiRequest`] values and hands them to an
//! [`HttpTransport`]. The transport returns the status and headers right away
//! and the body as a [`ResponseBody`] that is consumed exactly once, so the
//! body is released on every path out of the parse step.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use url::Url;

use super::error::{ClientError, TransportError};

/// An outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Attach a JSON body and the matching content type.
    pub fn with_json_body(mut self, body: Vec<u8>) -> Self {
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(body);
        self
    }

    /// Set a header, replacing any previous value.
    ///
    /// # Errors
    /// Returns [`ClientError::Editor`] if the name or value contains invalid characters.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), ClientError> {
        let name = name
            .parse::<HeaderName>()
            .map_err(|e| ClientError::Editor(format!("invalid header name '{}': {}", name, e)))?;
        let value = value
            .parse::<HeaderValue>()
            .map_err(|e| ClientError::Editor(format!("invalid header value for '{}': {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(())
    }
}

/// A response body that has not been read yet.
#[async_trait]
pub trait ResponseBody: Send {
    /// Read the whole body into memory, consuming it.
    async fn read_all(self: Box<Self>) -> Result<Bytes, TransportError>;
}

#[async_trait]
impl ResponseBody for Bytes {
    async fn read_all(self: Box<Self>) -> Result<Bytes, TransportError> {
        Ok(*self)
    }
}

/// What a transport hands back for a request.
pub struct TransportResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// The unread body.
    pub body: Box<dyn ResponseBody>,
}

impl TransportResponse {
    /// A response whose body is already in memory.
    pub fn buffered(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: Box::new(body.into()),
        }
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Sends requests over the network.
///
/// Implementations must not retry; the client issues exactly one request per
/// operation.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request and return the response head with its unread body.
    async fn send(&self, request: ApiRequest) -> Result<TransportResponse, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest`.
///
/// Timeouts, proxies and TLS roots are whatever the wrapped
/// [`reqwest::Client`] was built with.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default `reqwest` client.
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured `reqwest` client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

struct ReqwestBody(reqwest::Response);

#[async_trait]
impl ResponseBody for ReqwestBody {
    async fn read_all(self: Box<Self>) -> Result<Bytes, TransportError> {
        self.0.bytes().await.map_err(TransportError::from)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        Ok(TransportResponse {
            status: response.status(),
            headers: response.headers().clone(),
            body: Box::new(ReqwestBody(response)),
        })
    }
}
