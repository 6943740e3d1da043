//! cf-prompter - satellite worker.
//!
//! Runs inside the platform with its task parameters in the environment:
//! revises the target app's latest ready package, prints a sentinel line
//! for the monitoring CLI, then stops its own app so the platform does not
//! restart it.

use std::process::ExitCode;

use anyhow::{Context, Result};
use cf_prompt_common::PrompterConfig;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cf_prompt_cli::application::ports::PlatformApi;
use cf_prompt_cli::application::services::revise::revise_app;
use cf_prompt_cli::domain::Target;
use cf_prompt_cli::domain::satellite::{FAILURE_SENTINEL, SUCCESS_SENTINEL};
use cf_prompt_cli::infra::archive::LocalArtifacts;
use cf_prompt_cli::infra::cf_api::CfApiClient;
use cf_prompt_cli::infra::opencode::OpencodeModifier;
use cf_prompt_cli::infra::registry::RegistryClient;
use cf_prompt_cli::output::reporter::TracingReporter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e:#}");
            println!("{FAILURE_SENTINEL}: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let target = Target {
        api_endpoint: config.cf_api.clone(),
        access_token: config.cf_access_token.clone(),
        org_guid: config.org_id.clone(),
        space_guid: config.space_id.clone(),
        skip_ssl_validation: config.cf_skip_ssl_validation,
        ..Target::default()
    };
    let api = match CfApiClient::new(&target) {
        Ok(api) => api,
        Err(e) => {
            println!("{FAILURE_SENTINEL}: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let code = match run(&api, &config).await {
        Ok(hash) => {
            info!(package = %hash, "Prompter completed successfully");
            println!("{SUCCESS_SENTINEL}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            println!("{FAILURE_SENTINEL}: {e:#}");
            ExitCode::FAILURE
        }
    };

    stop_self(&api, &config).await;
    code
}

fn load_config() -> Result<PrompterConfig> {
    let config: PrompterConfig = envy::from_env().context("reading environment")?;
    config.validate()?;
    Ok(config)
}

/// Revise the target app and return the new package's short id.
async fn run(api: &CfApiClient, config: &PrompterConfig) -> Result<String> {
    let prompt = config.prompt()?;
    let images = RegistryClient::new(config.registry_credentials())?;
    let modifier = OpencodeModifier::default_runner();
    let workdir = tempfile::Builder::new()
        .prefix("cf-prompter-")
        .tempdir()
        .context("failed to create working directory")?;

    info!(app = %config.app_id, "revising app");
    let revision = revise_app(
        api,
        &images,
        &LocalArtifacts,
        &modifier,
        &TracingReporter,
        &config.app_id,
        &prompt,
        workdir.path(),
    )
    .await?;
    Ok(revision.published.short_id())
}

/// Stop this satellite so the platform does not restart the process.
async fn stop_self(api: &CfApiClient, config: &PrompterConfig) {
    let Some(guid) = config.own_app_guid() else {
        warn!("VCAP_APPLICATION not set; not stopping own app");
        return;
    };
    if let Err(e) = api.stop_app(&guid).await {
        warn!("failed to stop own app {guid}: {e:#}");
    }
}
