//! The `ProviderService` trait the lifecycle host drives.
//!
//! The trait uses plain Rust types: states are `serde_json::Value` objects,
//! problems are [`ProviderError`]s or [`Diagnostic`]s. Operations that reach
//! the remote API take a [`CancellationToken`] so the host can abandon them.

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::plan;
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use crate::validation::validate;

/// Trait that provider implementations must implement.
///
/// # Example
///
/// ```ignore
/// use peripheral_provider::{ProviderService, ProviderError, ProviderSchema};
/// use peripheral_provider::schema::{Schema, Attribute};
/// use peripheral_provider::CancellationToken;
///
/// struct MyProvider;
///
/// #[async_trait::async_trait]
/// impl ProviderService for MyProvider {
///     fn schema(&self) -> ProviderSchema {
///         ProviderSchema::new()
///             .with_resource("example_resource", Schema::v0()
///                 .with_attribute("name", Attribute::required_string()))
///     }
///
///     async fn create(
///         &self,
///         cancel: &CancellationToken,
///         resource_type: &str,
///         planned_state: serde_json::Value,
///     ) -> Result<serde_json::Value, ProviderError> {
///         Ok(planned_state)
///     }
///
///     // ... implement other methods
/// }
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.schema().resources.keys().cloned().collect(),
        }
    }

    /// Look up the schema of one resource type.
    fn resource_schema(&self, resource_type: &str) -> Result<Schema, ProviderError> {
        self.schema()
            .resources
            .remove(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        Ok(validate(&schema, &config))
    }

    /// Upgrade resource state from an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: u64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        if version > schema.version {
            return Err(ProviderError::Validation(format!(
                "state version {} is newer than schema version {}",
                version, schema.version
            )));
        }
        // No older versions exist yet; the state is already current.
        Ok(state)
    }

    /// Plan changes for a resource.
    ///
    /// The default compares prior and proposed state attribute by attribute
    /// using the resource schema.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        Ok(plan::diff(&schema, prior_state.as_ref(), &proposed_state))
    }

    /// Create a new resource.
    async fn create(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    async fn read(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }
}
