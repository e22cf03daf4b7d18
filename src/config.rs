//! Provider configuration.

use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::validation::{summarize, validate};

/// Environment variable holding the API endpoint.
pub const ENDPOINT_ENV: &str = "PERIPHERAL_ENDPOINT";

/// Environment variable holding the shared API secret.
pub const TOKEN_ENV: &str = "PERIPHERAL_TOKEN";

/// Settings the provider needs to reach the peripheral API.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the peripheral API.
    pub endpoint: String,
    /// Shared secret used to sign API tokens.
    pub token: SecretString,
}

impl ProviderConfig {
    /// Create a configuration from its parts.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: SecretString::from(token.into()),
        }
    }

    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Manages GitLab runner registrations through the peripheral API.")
            .with_attribute(
                "endpoint",
                Attribute::required_string().with_description("Base URL of the peripheral API"),
            )
            .with_attribute(
                "token",
                Attribute::required_string()
                    .sensitive()
                    .with_description("Shared secret used to sign API tokens"),
            )
    }

    /// Decode the host's provider configuration.
    ///
    /// # Errors
    /// Returns [`ProviderError::Configuration`] if the value does not match
    /// [`ProviderConfig::schema`].
    pub fn from_value(config: Value) -> Result<Self, ProviderError> {
        let diagnostics = validate(&Self::schema(), &config);
        if !diagnostics.is_empty() {
            return Err(ProviderError::Configuration(summarize(&diagnostics)));
        }
        Ok(serde_json::from_value(config)?)
    }

    /// Read the configuration from `PERIPHERAL_ENDPOINT` and `PERIPHERAL_TOKEN`.
    ///
    /// # Errors
    /// Returns [`ProviderError::Configuration`] if either variable is unset or empty.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProviderError> {
        let var = |name: &str| {
            lookup(name).filter(|v| !v.is_empty()).ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "Missing required environment variable {}",
                    name
                ))
            })
        };
        Ok(Self::new(var(ENDPOINT_ENV)?, var(TOKEN_ENV)?))
    }
}
