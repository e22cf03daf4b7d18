//! Typed client for the peripheral runners API.
//!
//! The client builds one request per operation, runs it through the
//! configured [`RequestEditor`]s, sends it with an [`HttpTransport`] and
//! classifies the response into an [`ApiResponse`]. It holds no mutable state
//! and can be shared freely between tasks.
//!
//! # Example
//!
//! ```ignore
//! use peripheral_provider::client::RunnersClient;
//! use tokio_util::sync::CancellationToken;
//!
//! let client = RunnersClient::builder("https://peripheral.example/api").build()?;
//! let response = client.read(&CancellationToken::new(), "42", &[]).await?;
//! match response.error() {
//!     None => println!("{:?}", response.success()),
//!     Some(err) => eprintln!("{}: {}", response.status_text(), err),
//! }
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

mod editor;
mod error;
mod models;
mod request;
mod response;
mod transport;

pub use editor::RequestEditor;
pub use error::{ClientError, TransportError};
pub use models::{ApiError, ErrorType, GitLabRunner};
pub use request::{
    create_request, delete_request, encode_path_param, list_request, normalize_server,
    operation_url, read_request, update_request, COLLECTION_PATH,
};
pub use response::{
    ApiResponse, CreateResponse, DeleteResponse, ListResponse, OperationSpec, Payload,
    ReadResponse, UpdateResponse, CREATE, DELETE, LIST, READ, UPDATE,
};
pub use transport::{ApiRequest, HttpTransport, ReqwestTransport, ResponseBody, TransportResponse};

/// Builder for [`RunnersClient`].
pub struct ClientBuilder {
    server: String,
    transport: Option<Arc<dyn HttpTransport>>,
    editors: Vec<Arc<dyn RequestEditor>>,
}

impl ClientBuilder {
    /// Use a custom transport instead of the default `reqwest` one.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Add an editor applied to every request, after previously added ones.
    pub fn request_editor(mut self, editor: Arc<dyn RequestEditor>) -> Self {
        self.editors.push(editor);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// Returns an error if the server URL does not parse or the default
    /// transport cannot be created.
    pub fn build(self) -> Result<RunnersClient, ClientError> {
        let server = normalize_server(&self.server)?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        Ok(RunnersClient {
            server,
            transport,
            editors: self.editors,
        })
    }
}

/// Client for the `/gitlab-runners` collection.
#[derive(Clone)]
pub struct RunnersClient {
    server: Url,
    transport: Arc<dyn HttpTransport>,
    editors: Vec<Arc<dyn RequestEditor>>,
}

impl std::fmt::Debug for RunnersClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnersClient")
            .field("server", &self.server.as_str())
            .field("editors", &self.editors.len())
            .finish_non_exhaustive()
    }
}

impl RunnersClient {
    /// Start building a client for the given server URL.
    ///
    /// The URL may carry a path prefix such as `https://host/api`; operation
    /// paths are resolved below it.
    pub fn builder(server: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            server: server.into(),
            transport: None,
            editors: Vec::new(),
        }
    }

    /// The normalized server URL, always ending with `/`.
    pub fn server(&self) -> &Url {
        &self.server
    }

    /// Register a runner.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        body: &GitLabRunner,
        editors: &[&dyn RequestEditor],
    ) -> Result<CreateResponse, ClientError> {
        let request = create_request(&self.server, body)?;
        self.execute(cancel, CREATE, request, editors).await
    }

    /// List runners.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
        editors: &[&dyn RequestEditor],
    ) -> Result<ListResponse, ClientError> {
        let request = list_request(&self.server)?;
        self.execute(cancel, LIST, request, editors).await
    }

    /// Fetch a runner by id.
    pub async fn read(
        &self,
        cancel: &CancellationToken,
        id: &str,
        editors: &[&dyn RequestEditor],
    ) -> Result<ReadResponse, ClientError> {
        let request = read_request(&self.server, id)?;
        self.execute(cancel, READ, request, editors).await
    }

    /// Replace a runner.
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        id: &str,
        body: &GitLabRunner,
        editors: &[&dyn RequestEditor],
    ) -> Result<UpdateResponse, ClientError> {
        let request = update_request(&self.server, id, body)?;
        self.execute(cancel, UPDATE, request, editors).await
    }

    /// Remove a runner.
    pub async fn delete(
        &self,
        cancel: &CancellationToken,
        id: &str,
        editors: &[&dyn RequestEditor],
    ) -> Result<DeleteResponse, ClientError> {
        let request = delete_request(&self.server, id)?;
        self.execute(cancel, DELETE, request, editors).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        operation: OperationSpec,
        mut request: ApiRequest,
        editors: &[&dyn RequestEditor],
    ) -> Result<ApiResponse<T>, ClientError> {
        editor::apply_editors(&mut request, self.editors.iter().map(Arc::as_ref))?;
        editor::apply_editors(&mut request, editors.iter().copied())?;

        debug!(
            operation = operation.name,
            method = %request.method,
            url = %request.url,
            "Sending request"
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            response = self.transport.send(request) => response?,
        };

        let TransportResponse {
            status,
            headers,
            body,
        } = response;
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            body = body.read_all() => body?,
        };

        trace!(
            operation = operation.name,
            status = status.as_u16(),
            bytes = body.len(),
            "Received response"
        );

        ApiResponse::from_parts(operation, status, headers, body)
    }
}
