//! Host-side state of one managed resource instance.
//!
//! [`ResourceInstance`] plays the part of the lifecycle host for a single
//! resource: it drives a [`ProviderService`], records the persisted state and
//! turns provider errors into diagnostics. The persisted state changes only
//! when an operation succeeds.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::schema::Diagnostic;
use crate::service::ProviderService;

/// Persisted state of an instance.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceState {
    /// The resource does not exist.
    Absent,
    /// The resource exists with the given state.
    Present(Value),
}

/// One resource instance and its persisted state.
#[derive(Debug, Clone)]
pub struct ResourceInstance {
    resource_type: String,
    state: InstanceState,
}

impl ResourceInstance {
    /// An instance that does not exist yet.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            state: InstanceState::Absent,
        }
    }

    /// An instance with previously persisted state.
    pub fn with_state(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state: InstanceState::Present(state),
        }
    }

    /// The resource type name.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// The persisted state.
    pub fn state(&self) -> &InstanceState {
        &self.state
    }

    /// The persisted state, if the resource exists.
    pub fn current(&self) -> Option<&Value> {
        match &self.state {
            InstanceState::Present(state) => Some(state),
            InstanceState::Absent => None,
        }
    }

    /// Create the resource. Requires an absent instance.
    pub async fn create<P: ProviderService + ?Sized>(
        &mut self,
        provider: &P,
        cancel: &CancellationToken,
        planned_state: Value,
    ) -> Vec<Diagnostic> {
        if let Some(diag) = self.expect_absent("create") {
            return vec![diag];
        }
        info!(resource_type = %self.resource_type, "Create called");
        match provider
            .create(cancel, &self.resource_type, planned_state)
            .await
        {
            Ok(state) => {
                info!(resource_type = %self.resource_type, "Create completed successfully");
                self.state = InstanceState::Present(state);
                vec![]
            },
            Err(e) => {
                error!(resource_type = %self.resource_type, error = %e, "Create failed");
                vec![Diagnostic::from(&e)]
            },
        }
    }

    /// Refresh the persisted state. Requires a present instance.
    pub async fn read<P: ProviderService + ?Sized>(
        &mut self,
        provider: &P,
        cancel: &CancellationToken,
    ) -> Vec<Diagnostic> {
        let current = match self.expect_present("read") {
            Ok(state) => state.clone(),
            Err(diag) => return vec![diag],
        };
        debug!(resource_type = %self.resource_type, "Read called");
        match provider.read(cancel, &self.resource_type, current).await {
            Ok(state) => {
                debug!(resource_type = %self.resource_type, "Read completed successfully");
                self.state = InstanceState::Present(state);
                vec![]
            },
            Err(e) => {
                error!(resource_type = %self.resource_type, error = %e, "Read failed");
                vec![Diagnostic::from(&e)]
            },
        }
    }

    /// Apply a planned state. Requires a present instance.
    pub async fn update<P: ProviderService + ?Sized>(
        &mut self,
        provider: &P,
        cancel: &CancellationToken,
        planned_state: Value,
    ) -> Vec<Diagnostic> {
        let prior = match self.expect_present("update") {
            Ok(state) => state.clone(),
            Err(diag) => return vec![diag],
        };
        info!(resource_type = %self.resource_type, "Update called");
        match provider
            .update(cancel, &self.resource_type, prior, planned_state)
            .await
        {
            Ok(state) => {
                info!(resource_type = %self.resource_type, "Update completed successfully");
                self.state = InstanceState::Present(state);
                vec![]
            },
            Err(e) => {
                error!(resource_type = %self.resource_type, error = %e, "Update failed");
                vec![Diagnostic::from(&e)]
            },
        }
    }

    /// Delete the resource. Requires a present instance.
    pub async fn delete<P: ProviderService + ?Sized>(
        &mut self,
        provider: &P,
        cancel: &CancellationToken,
    ) -> Vec<Diagnostic> {
        let current = match self.expect_present("delete") {
            Ok(state) => state.clone(),
            Err(diag) => return vec![diag],
        };
        info!(resource_type = %self.resource_type, "Delete called");
        match provider.delete(cancel, &self.resource_type, current).await {
            Ok(()) => {
                info!(resource_type = %self.resource_type, "Delete completed successfully");
                self.state = InstanceState::Absent;
                vec![]
            },
            Err(e) => {
                error!(resource_type = %self.resource_type, error = %e, "Delete failed");
                vec![Diagnostic::from(&e)]
            },
        }
    }

    /// Adopt an existing resource by id. Requires an absent instance.
    ///
    /// Only the seed state is recorded; call [`ResourceInstance::read`]
    /// afterwards to fill in the rest.
    pub async fn import<P: ProviderService + ?Sized>(
        &mut self,
        provider: &P,
        id: &str,
    ) -> Vec<Diagnostic> {
        if let Some(diag) = self.expect_absent("import") {
            return vec![diag];
        }
        info!(resource_type = %self.resource_type, id = %id, "Import called");
        match provider.import_resource(&self.resource_type, id).await {
            Ok(imported) => {
                match imported
                    .into_iter()
                    .find(|r| r.resource_type == self.resource_type)
                {
                    Some(resource) => {
                        self.state = InstanceState::Present(resource.state);
                        vec![]
                    },
                    None => vec![Diagnostic::error("Import Error").with_detail(format!(
                        "Provider returned no {} for id {}",
                        self.resource_type, id
                    ))],
                }
            },
            Err(e) => {
                error!(resource_type = %self.resource_type, error = %e, "Import failed");
                vec![Diagnostic::from(&e)]
            },
        }
    }

    fn expect_absent(&self, operation: &str) -> Option<Diagnostic> {
        match self.state {
            InstanceState::Absent => None,
            InstanceState::Present(_) => Some(
                Diagnostic::error("Resource Already Exists").with_detail(format!(
                    "Cannot {} {}: the resource is already managed",
                    operation, self.resource_type
                )),
            ),
        }
    }

    fn expect_present(&self, operation: &str) -> Result<&Value, Diagnostic> {
        self.current().ok_or_else(|| {
            Diagnostic::error("Resource Not Found").with_detail(format!(
                "Cannot {} {}: the resource does not exist",
                operation, self.resource_type
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::schema::{Attribute, ProviderSchema, Schema};
    use crate::testing::{assert_error_contains, assert_no_errors};
    use serde_json::json;

    /// Echoes states back, failing any call whose state has `"fail": true`.
    struct EchoProvider;

    fn check(state: &Value) -> Result<(), ProviderError> {
        if state.get("fail") == Some(&json!(true)) {
            Err(ProviderError::Validation("asked to fail".to_string()))
        } else {
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ProviderService for EchoProvider {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new().with_resource(
                "echo",
                Schema::v0().with_attribute("name", Attribute::required_string()),
            )
        }

        async fn create(
            &self,
            _cancel: &CancellationToken,
            _resource_type: &str,
            planned_state: Value,
        ) -> Result<Value, ProviderError> {
            check(&planned_state)?;
            Ok(planned_state)
        }

        async fn read(
            &self,
            _cancel: &CancellationToken,
            _resource_type: &str,
            current_state: Value,
        ) -> Result<Value, ProviderError> {
            check(&current_state)?;
            Ok(current_state)
        }

        async fn update(
            &self,
            _cancel: &CancellationToken,
            _resource_type: &str,
            _prior_state: Value,
            planned_state: Value,
        ) -> Result<Value, ProviderError> {
            check(&planned_state)?;
            Ok(planned_state)
        }

        async fn delete(
            &self,
            _cancel: &CancellationToken,
            _resource_type: &str,
            current_state: Value,
        ) -> Result<(), ProviderError> {
            check(&current_state)
        }
    }

    #[tokio::test]
    async fn test_create_then_delete() {
        let cancel = CancellationToken::new();
        let mut instance = ResourceInstance::new("echo");

        let diags = instance
            .create(&EchoProvider, &cancel, json!({"name": "a"}))
            .await;
        assert_no_errors(&diags);
        assert_eq!(instance.current(), Some(&json!({"name": "a"})));

        let diags = instance.delete(&EchoProvider, &cancel).await;
        assert_no_errors(&diags);
        assert_eq!(*instance.state(), InstanceState::Absent);
    }

    #[tokio::test]
    async fn test_failure_keeps_prior_state() {
        let cancel = CancellationToken::new();
        let mut instance = ResourceInstance::with_state("echo", json!({"name": "a"}));

        let diags = instance
            .update(&EchoProvider, &cancel, json!({"name": "b", "fail": true}))
            .await;
        assert_error_contains(&diags, "Validation Error");
        assert_eq!(instance.current(), Some(&json!({"name": "a"})));

        let mut absent = ResourceInstance::new("echo");
        let diags = absent
            .create(&EchoProvider, &cancel, json!({"fail": true}))
            .await;
        assert_eq!(diags.len(), 1);
        assert_eq!(*absent.state(), InstanceState::Absent);
    }

    #[tokio::test]
    async fn test_wrong_state_is_rejected() {
        let cancel = CancellationToken::new();

        let mut absent = ResourceInstance::new("echo");
        assert_error_contains(&absent.read(&EchoProvider, &cancel).await, "Resource Not Found");
        assert_error_contains(
            &absent.update(&EchoProvider, &cancel, json!({})).await,
            "Resource Not Found",
        );
        assert_error_contains(&absent.delete(&EchoProvider, &cancel).await, "Resource Not Found");

        let mut present = ResourceInstance::with_state("echo", json!({"name": "a"}));
        assert_error_contains(
            &present.create(&EchoProvider, &cancel, json!({})).await,
            "Resource Already Exists",
        );
        assert_error_contains(&present.import(&EchoProvider, "1").await, "Resource Already Exists");
        assert_eq!(present.current(), Some(&json!({"name": "a"})));
    }

    #[tokio::test]
    async fn test_import_unsupported() {
        let mut instance = ResourceInstance::new("echo");
        let diags = instance.import(&EchoProvider, "1").await;
        assert_error_contains(&diags, "Unimplemented");
        assert_eq!(instance.resource_type(), "echo");
        assert_eq!(*instance.state(), InstanceState::Absent);
    }
}
