//! Command implementations

pub mod prompt;
pub mod prompt_init;
pub mod prompt_push;
pub mod prompts;
pub mod version;

use std::path::PathBuf;

use anyhow::Result;
use cf_prompt_common::AppResource;
use clap::Args;

use crate::application::ports::PlatformApi;
use crate::infra::satellite::SatelliteBundle;

/// Location of the satellite worker executable.
#[derive(Args, Debug, Default)]
pub struct WorkerArgs {
    /// Path to the `cf-prompter` executable pushed as the satellite
    /// [default: next to this executable]
    #[arg(long, env = "CF_PROMPTER_BINARY", value_name = "PATH")]
    pub worker_binary: Option<PathBuf>,
}

impl WorkerArgs {
    /// Load the worker executable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file is missing or empty.
    pub async fn bundle(&self) -> Result<SatelliteBundle> {
        let path = self
            .worker_binary
            .clone()
            .unwrap_or_else(SatelliteBundle::default_path);
        SatelliteBundle::load(&path).await
    }
}

/// Look up `name` in the targeted space, or take the space's first app.
async fn resolve_app(
    api: &impl PlatformApi,
    space_guid: &str,
    name: Option<&str>,
) -> Result<AppResource> {
    match name {
        Some(name) => api.find_app(name, space_guid).await,
        None => api.first_app(space_guid).await,
    }
}
