//! The `peripheral_gitlab_runner` resource.
//!
//! Maps the host's plan and state objects onto [`RunnersClient`] calls. A
//! successful call always replaces the persisted state with what the server
//! returned; a failed call leaves the caller's state alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::client::{ApiResponse, GitLabRunner, RunnersClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::validation::{summarize, validate};

/// Resource type name.
pub const RESOURCE_TYPE: &str = "peripheral_gitlab_runner";

/// Schema of the resource.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("GitLabRunner resource")
        .with_attribute(
            "id",
            Attribute::optional_computed_string()
                .with_force_new()
                .with_description("GitLabRunner ID as provided by GitLab"),
        )
        .with_attribute(
            "url",
            Attribute::required_string().with_description("URL of GitLab instance for GitLabRunner"),
        )
        .with_attribute(
            "token",
            Attribute::required_string()
                .sensitive()
                .with_description("Token for GitLabRunner registration"),
        )
        .with_attribute(
            "token_obtained_at",
            Attribute::computed_string().with_description("When the registration token was obtained"),
        )
        .with_attribute(
            "description",
            Attribute::optional_computed_string().with_description("Description of GitLabRunner"),
        )
        .with_attribute(
            "image",
            Attribute::required_string().with_description("Docker image for GitLabRunner"),
        )
        .with_attribute(
            "tag_list",
            Attribute::optional_computed_string()
                .with_description("Comma-separated list of tags for GitLabRunner"),
        )
        .with_attribute(
            "run_untagged",
            Attribute::optional_computed_bool().with_description("Allow untagged jobs"),
        )
}

/// Persisted state of one runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLabRunnerModel {
    /// Server-assigned id, unset before creation.
    pub id: Option<String>,
    /// Registration URL.
    pub url: String,
    /// Registration token.
    pub token: String,
    /// Set by the server.
    pub token_obtained_at: Option<DateTime<Utc>>,
    /// Free-form description.
    pub description: Option<String>,
    /// Job image.
    pub image: String,
    /// Comma-separated tags.
    pub tag_list: Option<String>,
    /// Whether untagged jobs are picked up.
    pub run_untagged: Option<bool>,
}

impl GitLabRunnerModel {
    /// State for a runner as returned by the API.
    pub fn from_runner(runner: GitLabRunner) -> Self {
        Self {
            id: Some(runner.id),
            url: runner.url,
            token: runner.token,
            token_obtained_at: runner.token_obtained_at,
            description: Some(runner.description),
            image: runner.image,
            tag_list: Some(runner.tag_list),
            run_untagged: Some(runner.run_untagged),
        }
    }

    /// Request body for this state.
    pub fn to_runner(&self) -> GitLabRunner {
        GitLabRunner {
            id: self.id.clone().unwrap_or_default(),
            url: self.url.clone(),
            token: self.token.clone(),
            token_obtained_at: self.token_obtained_at,
            description: self.description.clone().unwrap_or_default(),
            image: self.image.clone(),
            tag_list: self.tag_list.clone().unwrap_or_default(),
            run_untagged: self.run_untagged.unwrap_or_default(),
        }
    }

    /// Validate a planned state against the schema and decode it.
    ///
    /// # Errors
    /// Returns [`ProviderError::Validation`] if the value does not match [`schema`].
    pub fn from_plan(planned: Value) -> Result<Self, ProviderError> {
        let diagnostics = validate(&schema(), &planned);
        if !diagnostics.is_empty() {
            return Err(ProviderError::Validation(summarize(&diagnostics)));
        }
        Ok(serde_json::from_value(planned)?)
    }

    /// Encode as persisted state.
    pub fn into_state(self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// The id recorded in a persisted state, empty if there is none.
fn state_id(state: &Value) -> &str {
    state.get("id").and_then(Value::as_str).unwrap_or_default()
}

/// Turn a response into the runner it carries or an API error.
fn expect_runner(response: ApiResponse<GitLabRunner>) -> Result<GitLabRunner, ProviderError> {
    let operation = response.operation().name;
    let status_text = response.status_text();
    response.into_result().map_err(|error| ProviderError::Api {
        operation,
        status_text,
        error,
    })
}

/// Lifecycle operations of the runner resource.
#[derive(Debug, Clone)]
pub struct GitLabRunnerResource {
    client: RunnersClient,
}

impl GitLabRunnerResource {
    /// Create the resource over a configured client.
    pub fn new(client: RunnersClient) -> Self {
        Self { client }
    }

    /// Register a runner from the planned state.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let model = GitLabRunnerModel::from_plan(planned)?;
        let response = self.client.create(cancel, &model.to_runner(), &[]).await?;
        let runner = expect_runner(response)?;
        trace!(id = %runner.id, "created GitLabRunner");
        GitLabRunnerModel::from_runner(runner).into_state()
    }

    /// Refresh the state from the API.
    pub async fn read(
        &self,
        cancel: &CancellationToken,
        current: Value,
    ) -> Result<Value, ProviderError> {
        let id = state_id(&current);
        let response = self.client.read(cancel, id, &[]).await?;
        let runner = expect_runner(response)?;
        trace!(id = %runner.id, "read GitLabRunner");
        GitLabRunnerModel::from_runner(runner).into_state()
    }

    /// Replace the runner. The id always comes from the prior state.
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let id = state_id(&prior);
        let mut model = GitLabRunnerModel::from_plan(planned)?;
        if model.id.as_deref().is_some_and(|planned_id| planned_id != id) {
            debug!(prior_id = %id, "ignoring id from plan");
        }
        model.id = Some(id.to_string());

        let response = self.client.update(cancel, id, &model.to_runner(), &[]).await?;
        let runner = expect_runner(response)?;
        trace!(id = %id, "updated GitLabRunner");
        GitLabRunnerModel::from_runner(runner).into_state()
    }

    /// Remove the runner.
    pub async fn delete(
        &self,
        cancel: &CancellationToken,
        current: Value,
    ) -> Result<(), ProviderError> {
        let id = state_id(&current);
        let response = self.client.delete(cancel, id, &[]).await?;
        if let Some(error) = response.error() {
            return Err(ProviderError::Api {
                operation: response.operation().name,
                status_text: response.status_text(),
                error,
            });
        }
        trace!(id = %id, "deleted GitLabRunner");
        Ok(())
    }

    /// State to seed an import with. The host reads afterwards.
    pub fn import(&self, id: &str) -> Value {
        serde_json::json!({ "id": id })
    }
}
