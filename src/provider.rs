//! The peripheral provider.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::auth::{mint_token, BearerToken};
use crate::client::{HttpTransport, RunnersClient};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resources::gitlab_runner::{self, GitLabRunnerResource, RESOURCE_TYPE};
use crate::schema::ProviderSchema;
use crate::service::ProviderService;
use crate::types::ImportedResource;

/// Provider for GitLab runner registrations.
///
/// Configured once; afterwards it only reads its own fields and can serve
/// concurrent operations.
#[derive(Debug, Clone)]
pub struct PeripheralProvider {
    runners: GitLabRunnerResource,
}

impl PeripheralProvider {
    /// Configure the provider with the default HTTP transport.
    ///
    /// # Errors
    /// Returns [`ProviderError::Configuration`] if the API token cannot be
    /// minted or the client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Self::configure(config, None)
    }

    /// Configure the provider over a custom transport.
    ///
    /// # Errors
    /// Same as [`PeripheralProvider::new`].
    pub fn with_transport(
        config: &ProviderConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ProviderError> {
        Self::configure(config, Some(transport))
    }

    fn configure(
        config: &ProviderConfig,
        transport: Option<Arc<dyn HttpTransport>>,
    ) -> Result<Self, ProviderError> {
        let token = mint_token(&config.token, Utc::now())?;
        let auth = BearerToken::new(&token)?;

        let mut builder =
            RunnersClient::builder(config.endpoint.as_str()).request_editor(Arc::new(auth));
        if let Some(transport) = transport {
            builder = builder.transport(transport);
        }
        let client = builder.build().map_err(|e| {
            error!(error = %e, "Client setup failed");
            ProviderError::Configuration(format!(
                "Client Setup Error: Unable to create client: {}",
                e
            ))
        })?;

        info!(endpoint = %client.server(), "Provider configured");
        Ok(Self {
            runners: GitLabRunnerResource::new(client),
        })
    }

    fn unknown(resource_type: &str) -> ProviderError {
        ProviderError::UnknownResource(resource_type.to_string())
    }
}

#[async_trait::async_trait]
impl ProviderService for PeripheralProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(RESOURCE_TYPE, gitlab_runner::schema())
    }

    #[instrument(skip_all, name = "provider.create", fields(resource_type = %resource_type))]
    async fn create(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        match resource_type {
            RESOURCE_TYPE => self.runners.create(cancel, planned_state).await,
            other => Err(Self::unknown(other)),
        }
    }

    #[instrument(skip_all, name = "provider.read", fields(resource_type = %resource_type))]
    async fn read(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        match resource_type {
            RESOURCE_TYPE => self.runners.read(cancel, current_state).await,
            other => Err(Self::unknown(other)),
        }
    }

    #[instrument(skip_all, name = "provider.update", fields(resource_type = %resource_type))]
    async fn update(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        match resource_type {
            RESOURCE_TYPE => {
                self.runners
                    .update(cancel, prior_state, planned_state)
                    .await
            },
            other => Err(Self::unknown(other)),
        }
    }

    #[instrument(skip_all, name = "provider.delete", fields(resource_type = %resource_type))]
    async fn delete(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        match resource_type {
            RESOURCE_TYPE => self.runners.delete(cancel, current_state).await,
            other => Err(Self::unknown(other)),
        }
    }

    #[instrument(skip_all, name = "provider.import", fields(resource_type = %resource_type, id = %id))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        match resource_type {
            RESOURCE_TYPE => Ok(vec![ImportedResource::new(
                RESOURCE_TYPE,
                self.runners.import(id),
            )]),
            other => Err(Self::unknown(other)),
        }
    }
}
