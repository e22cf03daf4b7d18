//! Testing utilities for provider implementations.
//!
//! [`ProviderTester`] drives a `ProviderService` directly, without a lifecycle
//! host. [`StubTransport`] replays scripted responses to a
//! [`RunnersClient`](crate::client::RunnersClient) so resource code can be
//! exercised without a server.
//!
//! # Example
//!
//! ```ignore
//! use peripheral_provider::testing::{ProviderTester, StubTransport};
//! use peripheral_provider::{PeripheralProvider, ProviderConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_create_runner() {
//!     let stub = Arc::new(StubTransport::new());
//!     stub.push_json(http::StatusCode::CREATED, json!({"id": "1", /* ... */}));
//!
//!     let config = ProviderConfig::new("https://peripheral.example", "secret");
//!     let tester = ProviderTester::new(PeripheralProvider::with_transport(&config, stub)?);
//!
//!     let state = tester.create("peripheral_gitlab_runner", json!({
//!         "url": "https://gitlab.com/",
//!         "token": "glrt-xxxx",
//!         "image": "alpine:latest"
//!     })).await?;
//!
//!     assert_eq!(state["id"], "1");
//! }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::{
    ApiRequest, HttpTransport, ResponseBody, TransportError, TransportResponse,
};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Drives a [`ProviderService`] the way a lifecycle host would.
///
/// Every call uses the tester's own [`CancellationToken`]; cancel it through
/// [`ProviderTester::cancel_token`] to exercise abandoned operations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
    cancel: CancellationToken,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cancel: CancellationToken::new(),
        }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The token passed to every operation.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Schema of the wrapped provider.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Resource type names, in schema order.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    ///
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan with no prior state.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider.plan(resource_type, None, proposed_state).await
    }

    /// Plan from `prior_state` to `proposed_state`.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), proposed_state)
            .await
    }

    /// Plan a destroy of `prior_state`.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null)
            .await
    }

    /// Call `create` with the tester's token.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .create(&self.cancel, resource_type, planned_state)
            .await
    }

    /// Call `read` with the tester's token.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read(&self.cancel, resource_type, current_state)
            .await
    }

    /// Call `update` with the tester's token.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(&self.cancel, resource_type, prior_state, planned_state)
            .await
    }

    /// Call `delete` with the tester's token.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider
            .delete(&self.cancel, resource_type, current_state)
            .await
    }

    /// Call `import_resource`.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Call `upgrade_resource_state`.
    pub async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: u64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .upgrade_resource_state(resource_type, version, state)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan, create, read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan, update, read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read(resource_type, updated_state).await
    }

    /// Run a full delete lifecycle: plan, delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Run an import lifecycle: import, then read the seeded state.
    pub async fn lifecycle_import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Value, ProviderError> {
        let imported = self.import_resource(resource_type, id).await?;
        let seed = imported
            .into_iter()
            .find(|r| r.resource_type == resource_type)
            .map(|r| r.state)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        self.read(resource_type, seed).await
    }

    /// Run a full CRUD lifecycle: create, read, update, read, delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created_state = self.lifecycle_create(resource_type, initial_config).await?;
        let updated_state = self
            .lifecycle_update(resource_type, created_state, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated_state.clone())
            .await?;
        Ok(updated_state)
    }
}

/// Failure of a tester call that reports diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "{} error diagnostic(s):", diags.len())?;
                for diag in diags {
                    writeln!(f, "  [{:?}] {}", diag.severity, diag)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "provider returned an error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Stub Transport
// =========================================================================

enum Scripted {
    Respond {
        status: StatusCode,
        content_type: &'static str,
        body: BodyScript,
    },
    Fail(TransportError),
}

enum BodyScript {
    Ready(Bytes),
    Fail(TransportError),
    Stall,
}

/// Counts bodies that have been dropped, read or not.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct StubBody {
    script: BodyScript,
    _guard: ReleaseGuard,
}

#[async_trait]
impl ResponseBody for StubBody {
    async fn read_all(self: Box<Self>) -> Result<Bytes, TransportError> {
        let StubBody { script, _guard } = *self;
        match script {
            BodyScript::Ready(bytes) => Ok(bytes),
            BodyScript::Fail(error) => Err(error),
            BodyScript::Stall => std::future::pending().await,
        }
    }
}

/// An [`HttpTransport`] that replays scripted outcomes in order and records
/// every request it receives.
///
/// A request arriving after the script is exhausted fails with
/// [`TransportError::Other`].
#[derive(Default)]
pub struct StubTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
    released: Arc<AtomicUsize>,
}

impl StubTransport {
    /// An empty stub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response.
    pub fn push_json(&self, status: StatusCode, body: Value) {
        self.push(Scripted::Respond {
            status,
            content_type: "application/json",
            body: BodyScript::Ready(Bytes::from(body.to_string())),
        });
    }

    /// Queue a plain-text response.
    pub fn push_text(&self, status: StatusCode, body: &str) {
        self.push(Scripted::Respond {
            status,
            content_type: "text/plain",
            body: BodyScript::Ready(Bytes::copy_from_slice(body.as_bytes())),
        });
    }

    /// Queue a transport failure before any response arrives.
    pub fn push_failure(&self, error: TransportError) {
        self.push(Scripted::Fail(error));
    }

    /// Queue a response whose headers arrive but whose body fails to read.
    pub fn push_body_failure(&self, status: StatusCode, error: TransportError) {
        self.push(Scripted::Respond {
            status,
            content_type: "application/json",
            body: BodyScript::Fail(error),
        });
    }

    /// Queue a response whose body never finishes arriving.
    pub fn push_stalled_body(&self, status: StatusCode) {
        self.push(Scripted::Respond {
            status,
            content_type: "application/json",
            body: BodyScript::Stall,
        });
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of response bodies handed out and since dropped.
    pub fn released_bodies(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn push(&self, outcome: Scripted) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }
}

impl std::fmt::Debug for StubTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubTransport")
            .field("requests", &self.requests().len())
            .field("released_bodies", &self.released_bodies())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(&self, request: ApiRequest) -> Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(Scripted::Respond {
                status,
                content_type,
                body,
            }) => {
                let mut headers = HeaderMap::new();
                headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static(content_type),
                );
                Ok(TransportResponse {
                    status,
                    headers,
                    body: Box::new(StubBody {
                        script: body,
                        _guard: ReleaseGuard(Arc::clone(&self.released)),
                    }),
                })
            },
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(TransportError::Other(
                "no scripted response left".to_string(),
            )),
        }
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

fn error_summaries(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.summary.as_str())
        .collect()
}

/// The plan creates: it has changes and no replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        plan.has_changes(),
        "plan for a new resource is empty"
    );
    assert!(
        !plan.requires_replace,
        "plan for a new resource replaces instead of creating"
    );
}

/// The plan is empty.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        !plan.has_changes(),
        "plan has {} unexpected change(s): {:?}",
        plan.changes.len(),
        changed_paths(plan)
    );
}

/// The plan has at least one change.
pub fn assert_plan_has_changes(plan: &PlanResult) {
    assert!(
        plan.has_changes(),
        "plan is empty"
    );
}

/// The plan replaces the resource.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "plan updates in place, expected a replacement"
    );
}

/// The plan updates in place.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "plan replaces the resource, expected an in-place update"
    );
}

/// The plan changes `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "attribute '{}' is not changed by the plan; changed: {:?}",
        path,
        changed_paths(plan)
    );
}

/// The plan leaves `path` alone.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    assert!(
        !plan.changes.iter().any(|c| c.path == path),
        "attribute '{}' is changed by the plan",
        path
    );
}

/// No diagnostic is an error. Warnings pass.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors = error_summaries(diagnostics);
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors
    );
}

/// At least one diagnostic is an error.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error diagnostic");
}

/// Some error diagnostic's summary contains `substring`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(substring)),
        "no error summary contains '{}'; errors: {:?}",
        substring,
        error_summaries(diagnostics)
    );
}

/// Some error diagnostic's detail contains `substring`.
pub fn assert_error_detail_contains(diagnostics: &[Diagnostic], substring: &str) {
    let details: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .filter_map(|d| d.detail.as_deref())
        .collect();
    assert!(
        details.iter().any(|d| d.contains(substring)),
        "Expected an error detail containing '{}', but got: {:?}",
        substring,
        details
    );
}
