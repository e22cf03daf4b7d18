//! Peripheral Provider
//!
//! A provider that manages GitLab runner registrations
//! (`peripheral_gitlab_runner`) through the peripheral REST API. It follows
//! the resource model of
//! [terraform-plugin-framework](https://github.com/hashicorp/terraform-plugin-framework):
//! the lifecycle host plans changes against a schema and the provider carries
//! them out with create, read, update, delete and import.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **Runners client**: A typed REST client for `/gitlab-runners` with
//!   per-status response decoding ([`client`])
//! - **Schema types**: Attribute schemas, validation and attribute-level planning
//! - **ProviderService trait**: The interface a lifecycle host drives
//! - **PeripheralProvider**: The `ProviderService` for the runner resource
//! - **Error types**: Errors that surface to the host as diagnostics
//! - **Logging**: Integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use peripheral_provider::{
//!     CancellationToken, PeripheralProvider, ProviderConfig, ProviderService,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     peripheral_provider::init_logging();
//!
//!     let provider = PeripheralProvider::new(&ProviderConfig::from_env()?)?;
//!     let cancel = CancellationToken::new();
//!
//!     let plan = provider
//!         .plan("peripheral_gitlab_runner", None, json!({
//!             "url": "https://gitlab.com/",
//!             "token": "glrt-xxxx",
//!             "image": "alpine:latest"
//!         }))
//!         .await?;
//!     let state = provider
//!         .create(&cancel, "peripheral_gitlab_runner", plan.planned_state)
//!         .await?;
//!
//!     tracing::info!(id = %state["id"], "runner registered");
//!     Ok(())
//! }
//! ```
//!
//! # Authentication
//!
//! The provider never sends the configured secret itself. It signs a
//! short-lived HS256 token with issuer `peripheral` and attaches it to every
//! request as `Authorization: Bearer <token>`.
//!
//! # Resource Lifecycle
//!
//! - **Create**: `POST /gitlab-runners`, 201 persists the server's runner
//! - **Read**: `GET /gitlab-runners/{id}`, 200 replaces the stored state
//! - **Update**: `PUT /gitlab-runners/{id}`, id taken from prior state
//! - **Delete**: `DELETE /gitlab-runners/{id}`
//! - **Import**: seeds the state with the id; the host reads afterwards
//!
//! A transport failure is reported as a `Client Error` diagnostic. Any
//! other non-success response is an `API Error`: declared error statuses
//! carry the decoded error kind, and anything else carries kind `Other` with
//! the raw response body as its message.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod instance;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::RunnersClient;
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use instance::{InstanceState, ResourceInstance};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::PeripheralProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tokio_util::sync::CancellationToken;
pub use tracing;
