//! Satellite worker task model.
//!
//! A satellite is a helper application pushed into the platform that runs
//! the acquire/revise/publish pipeline next to the target app. This module
//! holds its naming rules, task parameters, deployment manifest and the
//! lifecycle state machine the monitor drives.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use cf_prompt_common::PrompterConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::target::{Target, strip_token_scheme};

/// File name of the worker executable inside the bundle.
pub const WORKER_EXECUTABLE: &str = "cf-prompter";

/// Process declaration for the procfile buildpack.
pub const PROCFILE: &str = "web: ./cf-prompter\n";

pub const SATELLITE_BUILDPACK: &str = "paketo-buildpacks/procfile";

/// Output line printed by the worker when the pipeline succeeded.
pub const SUCCESS_SENTINEL: &str = "cf-prompter: task completed successfully";

/// Output line prefix printed by the worker when the pipeline failed.
pub const FAILURE_SENTINEL: &str = "cf-prompter: task failed";

/// How the satellite app is provisioned and torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatelliteLifecycle {
    /// Pushed per run under a fresh name, deleted afterwards.
    Ephemeral,
    /// Provisioned once by `prompt-init`, reconfigured per run, stopped afterwards.
    Persistent,
}

impl SatelliteLifecycle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ephemeral => "ephemeral",
            Self::Persistent => "persistent",
        }
    }
}

#[must_use]
pub fn ephemeral_name(now: DateTime<Utc>) -> String {
    format!("{WORKER_EXECUTABLE}-{}", now.timestamp())
}

#[must_use]
pub fn persistent_name(app_name: &str) -> String {
    format!("{app_name}-prompter")
}

/// Remote task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Deploying,
    Running,
    Stopped,
    Failed,
    TimedOut,
    TornDown,
}

impl TaskState {
    /// Whether moving from `self` to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use TaskState::{Deploying, Failed, Pending, Running, Stopped, TimedOut, TornDown};
        matches!(
            (self, next),
            (Pending, Deploying)
                | (Deploying, Running | Failed)
                | (Running, Stopped | Failed | TimedOut)
                | (Deploying | Running | Stopped | Failed | TimedOut, TornDown)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::TornDown
    }
}

/// Classify a satellite output line against the worker's sentinels.
///
/// `Some(true)` for success, `Some(false)` for failure.
#[must_use]
pub fn sentinel_outcome(line: &str) -> Option<bool> {
    if line.contains(SUCCESS_SENTINEL) {
        Some(true)
    } else if line.contains(FAILURE_SENTINEL) {
        Some(false)
    } else {
        None
    }
}

/// Inputs for building a satellite's task parameters.
pub struct TaskRequest<'a> {
    pub target: &'a Target,
    pub app_guid: &'a str,
    pub prompt: &'a str,
    pub registry_username: Option<&'a str>,
    pub registry_password: Option<&'a str>,
}

/// Build the runtime configuration handed to the satellite.
#[must_use]
pub fn task_config(req: &TaskRequest<'_>) -> PrompterConfig {
    let nonempty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(String::from);
    PrompterConfig {
        cf_access_token: strip_token_scheme(&req.target.access_token).to_string(),
        cf_api: req.target.in_platform_endpoint(),
        app_id: req.app_guid.to_string(),
        space_id: req.target.space_guid.clone(),
        org_id: req.target.org_guid.clone(),
        registry_username: nonempty(req.registry_username),
        registry_password: nonempty(req.registry_password),
        prompt_base64: PrompterConfig::encode_prompt(req.prompt),
        cf_skip_ssl_validation: req.target.skip_ssl_validation,
        vcap_application: None,
    }
}

/// One remote run: which satellite, with what parameters, in which state.
#[derive(Debug, Clone)]
pub struct RemoteWorkerTask {
    pub satellite_name: String,
    pub lifecycle: SatelliteLifecycle,
    pub config: PrompterConfig,
    state: TaskState,
}

impl RemoteWorkerTask {
    #[must_use]
    pub fn new(satellite_name: String, lifecycle: SatelliteLifecycle, config: PrompterConfig) -> Self {
        Self {
            satellite_name,
            lifecycle,
            config,
            state: TaskState::Pending,
        }
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is not in the lifecycle table.
    pub fn advance(&mut self, next: TaskState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            bail!(
                "satellite '{}' cannot move from {:?} to {next:?}",
                self.satellite_name,
                self.state
            );
        }
        self.state = next;
        Ok(())
    }
}

/// `cf push` manifest for a satellite.
#[derive(Debug, Serialize)]
pub struct SatelliteManifest {
    pub applications: Vec<ManifestApp>,
}

#[derive(Debug, Serialize)]
pub struct ManifestApp {
    pub name: String,
    pub memory: String,
    pub disk_quota: String,
    pub instances: u32,
    #[serde(rename = "no-route")]
    pub no_route: bool,
    #[serde(rename = "health-check-type")]
    pub health_check_type: String,
    pub buildpacks: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl SatelliteManifest {
    /// Manifest for a route-less, process-health-checked worker app.
    #[must_use]
    pub fn worker(name: &str, env: BTreeMap<String, String>) -> Self {
        Self {
            applications: vec![ManifestApp {
                name: name.to_string(),
                memory: "1G".to_string(),
                disk_quota: "2G".to_string(),
                instances: 1,
                no_route: true,
                health_check_type: "process".to_string(),
                buildpacks: vec![SATELLITE_BUILDPACK.to_string()],
                env,
            }],
        }
    }
}
