//! Resolves the platform [`Target`] from the CF CLI's `config.json`, with
//! explicit overrides taking precedence field by field.

use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::domain::target::strip_token_scheme;
use crate::domain::{PromptError, Target};

/// Subset of `$CF_HOME/.cf/config.json` the CLI needs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CfConfigFile {
    #[serde(default)]
    target: String,
    #[serde(default)]
    access_token: String,
    #[serde(default, rename = "SSLDisabled")]
    ssl_disabled: bool,
    #[serde(default)]
    organization_fields: NamedGuid,
    #[serde(default)]
    space_fields: NamedGuid,
}

#[derive(Debug, Default, Deserialize)]
struct NamedGuid {
    #[serde(default, rename = "GUID")]
    guid: String,
    #[serde(default, rename = "Name")]
    name: String,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct TargetOverrides {
    pub api: Option<String>,
    pub token: Option<String>,
    pub org_guid: Option<String>,
    pub space_guid: Option<String>,
    pub skip_ssl_validation: bool,
}

/// Reads the CF CLI configuration.
pub struct CfConfigStore {
    home: PathBuf,
}

impl CfConfigStore {
    #[must_use]
    pub fn new(home: PathBuf) -> Self {
        Self { home }
    }

    /// Home from `CF_HOME`, else the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if neither is available.
    pub fn from_env() -> Result<Self> {
        if let Some(home) = std::env::var_os("CF_HOME").filter(|h| !h.is_empty()) {
            return Ok(Self::new(PathBuf::from(home)));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::new(home))
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.home.join(".cf").join("config.json")
    }

    fn load_file(&self) -> Result<CfConfigFile> {
        let path = self.path();
        if !path.exists() {
            return Ok(CfConfigFile::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    /// Merge the config file with `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Configuration`] when the endpoint, token or
    /// space is missing from both sources.
    pub fn resolve(&self, overrides: &TargetOverrides) -> Result<Target> {
        let file = self.load_file()?;
        let pick = |over: &Option<String>, fallback: String| {
            over.clone()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(fallback)
        };
        let nonempty = |v: String| (!v.is_empty()).then_some(v);

        let org_overridden = overrides.org_guid.is_some();
        let space_overridden = overrides.space_guid.is_some();
        let target = Target {
            api_endpoint: pick(&overrides.api, file.target),
            access_token: pick(&overrides.token, file.access_token),
            org_guid: pick(&overrides.org_guid, file.organization_fields.guid),
            org_name: if org_overridden { None } else { nonempty(file.organization_fields.name) },
            space_guid: pick(&overrides.space_guid, file.space_fields.guid),
            space_name: if space_overridden { None } else { nonempty(file.space_fields.name) },
            user_name: None,
            skip_ssl_validation: overrides.skip_ssl_validation || file.ssl_disabled,
        };

        if target.api_endpoint.is_empty() {
            return Err(PromptError::configuration(
                "no API endpoint set; run `cf api` or pass --api",
            )
            .into());
        }
        if strip_token_scheme(&target.access_token).is_empty() {
            return Err(
                PromptError::configuration("not logged in; run `cf login` or pass --token").into(),
            );
        }
        if target.space_guid.is_empty() {
            return Err(PromptError::configuration(
                "no space targeted; run `cf target -s SPACE` or pass --space-guid",
            )
            .into());
        }
        Ok(Target {
            user_name: token_user_name(&target.access_token),
            ..target
        })
    }
}

/// `user_name` claim of a JWT access token, if it carries one.
#[must_use]
pub fn token_user_name(token: &str) -> Option<String> {
    let payload = strip_token_scheme(token).split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("user_name")
        .and_then(serde_json::Value::as_str)
        .map(String::from)
}
