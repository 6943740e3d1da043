use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment keys understood by the satellite worker.
pub mod keys {
    pub const CF_ACCESS_TOKEN: &str = "CF_ACCESS_TOKEN";
    pub const CF_API: &str = "CF_API";
    pub const APP_ID: &str = "APP_ID";
    pub const SPACE_ID: &str = "SPACE_ID";
    pub const ORG_ID: &str = "ORG_ID";
    pub const REGISTRY_USERNAME: &str = "REGISTRY_USERNAME";
    pub const REGISTRY_PASSWORD: &str = "REGISTRY_PASSWORD";
    pub const PROMPT_BASE64: &str = "PROMPT_BASE64";
    pub const CF_SKIP_SSL_VALIDATION: &str = "CF_SKIP_SSL_VALIDATION";
}

/// Errors raised while validating satellite configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("failed to decode PROMPT_BASE64: {0}")]
    InvalidPrompt(String),
}

/// Task parameters handed to the satellite worker as environment variables.
///
/// Field names map to the upper-cased keys in [`keys`], so the struct can be
/// loaded with `envy::from_env()` on the worker side and rendered with
/// [`PrompterConfig::to_env`] on the deploying side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrompterConfig {
    /// Access token without any `bearer ` scheme prefix.
    #[serde(default)]
    pub cf_access_token: String,
    /// API endpoint reachable from inside the platform network.
    #[serde(default)]
    pub cf_api: String,
    /// Guid of the application to revise.
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub registry_username: Option<String>,
    #[serde(default)]
    pub registry_password: Option<String>,
    /// Instruction text, standard base64.
    #[serde(default)]
    pub prompt_base64: String,
    #[serde(default)]
    pub cf_skip_ssl_validation: bool,
    /// Set by the platform for every running app instance.
    #[serde(default, skip_serializing)]
    pub vcap_application: Option<String>,
}

impl PrompterConfig {
    /// Encode instruction text for transport as a single opaque value.
    #[must_use]
    pub fn encode_prompt(prompt: &str) -> String {
        STANDARD.encode(prompt.as_bytes())
    }

    /// Decode the instruction text.
    pub fn prompt(&self) -> Result<String, ConfigError> {
        let bytes = STANDARD
            .decode(self.prompt_base64.trim())
            .map_err(|e| ConfigError::InvalidPrompt(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ConfigError::InvalidPrompt(e.to_string()))
    }

    /// Check that every required parameter is present and the prompt decodes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            (keys::PROMPT_BASE64, &self.prompt_base64),
            (keys::CF_ACCESS_TOKEN, &self.cf_access_token),
            (keys::CF_API, &self.cf_api),
            (keys::APP_ID, &self.app_id),
            (keys::SPACE_ID, &self.space_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(key));
            }
        }
        self.prompt().map(|_| ())
    }

    /// Registry credentials, when both halves are non-empty.
    #[must_use]
    pub fn registry_credentials(&self) -> Option<(&str, &str)> {
        match (
            self.registry_username.as_deref(),
            self.registry_password.as_deref(),
        ) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }

    /// Guid of the app instance this process runs in, from `VCAP_APPLICATION`.
    #[must_use]
    pub fn own_app_guid(&self) -> Option<String> {
        let raw = self.vcap_application.as_deref()?;
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        value
            .get("application_id")
            .and_then(serde_json::Value::as_str)
            .map(String::from)
    }

    /// Render as environment variables for a satellite deployment.
    #[must_use]
    pub fn to_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        let mut put = |k: &str, v: &str| {
            env.insert(k.to_string(), v.to_string());
        };
        put(keys::CF_ACCESS_TOKEN, &self.cf_access_token);
        put(keys::CF_API, &self.cf_api);
        put(keys::APP_ID, &self.app_id);
        put(keys::SPACE_ID, &self.space_id);
        put(keys::ORG_ID, &self.org_id);
        put(
            keys::REGISTRY_USERNAME,
            self.registry_username.as_deref().unwrap_or_default(),
        );
        put(
            keys::REGISTRY_PASSWORD,
            self.registry_password.as_deref().unwrap_or_default(),
        );
        put(keys::PROMPT_BASE64, &self.prompt_base64);
        put(
            keys::CF_SKIP_SSL_VALIDATION,
            if self.cf_skip_ssl_validation { "true" } else { "false" },
        );
        env
    }
}
