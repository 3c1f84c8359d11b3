//! Provider configuration
//!
//! Values come from the provider block handed over by the host, falling back
//! to `SCP_*` environment variables.

use std::collections::HashMap;
use std::time::Duration;

use cumulus_core::resource::Value;
use serde::Deserialize;

use crate::error::{ScpError, ScpResult};

pub const ENV_ENDPOINT: &str = "SCP_ENDPOINT";
pub const ENV_ACCESS_KEY: &str = "SCP_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "SCP_SECRET_KEY";
pub const ENV_PROJECT_ID: &str = "SCP_PROJECT_ID";
pub const ENV_REGION: &str = "SCP_REGION";

const DEFAULT_USER_AGENT: &str = concat!("cumulus-provider-scp/", env!("CARGO_PKG_VERSION"));

/// Pacing of waits and remote retries, in seconds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    /// Interval between two status polls
    pub poll_interval_secs: u64,
    /// How often a transient failure is retried inside one poll
    pub transient_retries: u32,
    pub retry_pause_secs: u64,
    /// Sleep between an ID-less create and the list-by-name lookup
    pub discovery_delay_secs: u64,
    /// Sleep after a virtual server first reports RUNNING
    pub settle_delay_secs: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            transient_retries: 10,
            retry_pause_secs: 5,
            discovery_delay_secs: 50,
            settle_delay_secs: 30,
        }
    }
}

impl WaitSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_secs(self.retry_pause_secs)
    }

    pub fn discovery_delay(&self) -> Duration {
        Duration::from_secs(self.discovery_delay_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

/// Default operation timeouts of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const DATABASE: Timeouts = Timeouts {
        create: Duration::from_secs(60 * 60),
        update: Duration::from_secs(80 * 60),
        delete: Duration::from_secs(60 * 60),
    };

    pub const VIRTUAL_SERVER: Timeouts = Timeouts {
        create: Duration::from_secs(60 * 60),
        update: Duration::from_secs(60 * 60),
        delete: Duration::from_secs(60 * 60),
    };
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub project_id: String,
    pub region: Option<String>,
    pub user_agent: String,
    pub wait: WaitSettings,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            project_id: String::new(),
            region: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            wait: WaitSettings::default(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("region", &self.region)
            .field("user_agent", &self.user_agent)
            .field("wait", &self.wait)
            .finish()
    }
}

impl ProviderConfig {
    /// Build from the provider block, using the process environment as fallback
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> ScpResult<Self> {
        Self::from_attributes_with(attributes, |key| std::env::var(key).ok())
    }

    /// Build from the provider block with an explicit environment lookup
    pub fn from_attributes_with(
        attributes: &HashMap<String, Value>,
        env: impl Fn(&str) -> Option<String>,
    ) -> ScpResult<Self> {
        let lookup = |name: &str, env_key: &str| -> ScpResult<Option<String>> {
            match attributes.get(name) {
                Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
                Some(Value::String(_)) | None => Ok(env(env_key).filter(|s| !s.is_empty())),
                Some(other) => Err(ScpError::invalid(
                    name,
                    format!("expected a string, got {}", other.type_name()),
                )),
            }
        };

        let mut missing = Vec::new();
        let mut required = |name: &str, env_key: &str| -> ScpResult<String> {
            let value = lookup(name, env_key)?;
            Ok(value.unwrap_or_else(|| {
                missing.push(
                    cumulus_core::diagnostic::Diagnostic::error(format!(
                        "{} is required (or set {})",
                        name, env_key
                    ))
                    .at(name),
                );
                String::new()
            }))
        };

        let endpoint = required("endpoint", ENV_ENDPOINT)?;
        let access_key = required("access_key", ENV_ACCESS_KEY)?;
        let secret_key = required("secret_key", ENV_SECRET_KEY)?;
        let project_id = required("project_id", ENV_PROJECT_ID)?;
        if !missing.is_empty() {
            return Err(ScpError::Validation(missing));
        }

        let mut config = ProviderConfig {
            endpoint,
            access_key,
            secret_key,
            project_id,
            region: lookup("region", ENV_REGION)?,
            ..ProviderConfig::default()
        };
        if let Some(Value::String(agent)) = attributes.get("user_agent") {
            config.user_agent = agent.clone();
        }
        Ok(config)
    }

    /// Build from a JSON document
    pub fn from_json(json: &str) -> ScpResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ScpError::invalid("provider", format!("invalid configuration: {}", e)))
    }
}
