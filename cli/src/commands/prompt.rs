//! `cf-prompt prompt`: revise an app's sources from an instruction.
//!
//! Locally by default: fetch the latest ready package, run the code
//! modifier on it and publish the result. With `--remote` or `--persistent`
//! the same pipeline runs in a satellite app inside the platform.

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{ProgressReporter, SatelliteDeployer};
use crate::application::services::remote::{MonitorTimings, run_remote};
use crate::application::services::revise::revise_app;
use crate::commands::{WorkerArgs, resolve_app};
use crate::domain::satellite::{TaskRequest, task_config};
use crate::domain::{PromptError, RemoteWorkerTask};
use crate::infra::archive::LocalArtifacts;
use crate::infra::opencode::OpencodeModifier;
use crate::infra::registry::RegistryClient;
use crate::infra::satellite::{EphemeralDeployer, PersistentDeployer, SatelliteBundle};

#[derive(Args, Debug)]
pub struct PromptArgs {
    /// App to revise [default: first app in the targeted space]
    #[arg(value_name = "APP", conflicts_with = "app_flag")]
    pub app: Option<String>,

    /// App to revise (alternative to the positional argument)
    #[arg(long = "app", value_name = "APP")]
    pub app_flag: Option<String>,

    /// Instruction for the code modifier
    #[arg(short, long)]
    pub prompt: String,

    /// Run the revision in a short-lived satellite inside the platform
    #[arg(long)]
    pub remote: bool,

    /// Run the revision in the satellite provisioned by `prompt-init`
    #[arg(long, conflicts_with = "remote")]
    pub persistent: bool,

    /// Registry user for image-backed packages
    #[arg(long, env = "REGISTRY_USERNAME")]
    pub registry_username: Option<String>,

    /// Registry password for image-backed packages
    #[arg(long, env = "REGISTRY_PASSWORD", hide_env_values = true)]
    pub registry_password: Option<String>,

    #[command(flatten)]
    pub worker: WorkerArgs,
}

impl PromptArgs {
    fn app_name(&self) -> Option<&str> {
        self.app.as_deref().or(self.app_flag.as_deref())
    }

    fn registry_credentials(&self) -> Option<(&str, &str)> {
        match (
            self.registry_username.as_deref(),
            self.registry_password.as_deref(),
        ) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

/// Run `cf-prompt prompt`.
///
/// # Errors
///
/// Returns an error if the prompt is empty, the app cannot be resolved, or
/// the local or remote pipeline fails.
pub async fn run(args: &PromptArgs, app: &AppContext) -> Result<()> {
    if args.prompt.trim().is_empty() {
        return Err(PromptError::configuration("prompt text must not be empty").into());
    }
    let bundle = if args.remote {
        Some(args.worker.bundle().await?)
    } else {
        None
    };
    let resource = resolve_app(&app.api, &app.target.space_guid, args.app_name()).await?;
    app.output.line(&format!(
        "Revising app {} in {}...\n",
        resource.name,
        app.target.describe()
    ));

    if args.remote || args.persistent {
        run_on_satellite(args, app, bundle, &resource.guid, &resource.name).await
    } else {
        run_locally(args, app, &resource.guid, &resource.name).await
    }
}

async fn run_locally(args: &PromptArgs, app: &AppContext, app_guid: &str, app_name: &str) -> Result<()> {
    let images = RegistryClient::new(args.registry_credentials())?;
    let modifier = OpencodeModifier::default_runner();
    let workdir = tempfile::Builder::new()
        .prefix("cf-prompt-work-")
        .tempdir()
        .context("cannot create working directory")?;

    let revision = revise_app(
        &app.api,
        &images,
        &LocalArtifacts,
        &modifier,
        &app.terminal_reporter(),
        app_guid,
        &args.prompt,
        workdir.path(),
    )
    .await?;

    let hash = revision.published.short_id();
    if app.is_json() {
        println!(
            "{}",
            serde_json::json!({
                "app": app_name,
                "source": revision.source.short_id(),
                "package": revision.published.guid,
                "hash": hash,
            })
        );
    } else {
        app.output.line(&format!(
            "\nPackage {hash} created. Promote it with: cf-prompt prompt-push {app_name} {hash}"
        ));
    }
    Ok(())
}

/// Ephemeral when a worker `bundle` is given, persistent otherwise.
async fn run_on_satellite(
    args: &PromptArgs,
    app: &AppContext,
    bundle: Option<SatelliteBundle>,
    app_guid: &str,
    app_name: &str,
) -> Result<()> {
    let (username, password) = args.registry_credentials().unzip();
    let config = task_config(&TaskRequest {
        target: &app.target,
        app_guid,
        prompt: &args.prompt,
        registry_username: username,
        registry_password: password,
    });
    let reporter = app.terminal_reporter();
    let sink = app.log_sink();

    let task = if let Some(bundle) = bundle {
        let deployer = EphemeralDeployer::new(&app.api, &app.cf, bundle);
        let mut task = RemoteWorkerTask::new(deployer.satellite_name(app_name), deployer.lifecycle(), config);
        run_remote(&app.api, &deployer, &app.cf, &sink, &reporter, &mut task, MonitorTimings::default())
            .await?;
        task
    } else {
        let deployer = PersistentDeployer::new(&app.api, &app.cf);
        let mut task = RemoteWorkerTask::new(deployer.satellite_name(app_name), deployer.lifecycle(), config);
        run_remote(&app.api, &deployer, &app.cf, &sink, &reporter, &mut task, MonitorTimings::default())
            .await?;
        task
    };

    if app.is_json() {
        println!(
            "{}",
            serde_json::json!({
                "app": app_name,
                "satellite": task.satellite_name,
                "lifecycle": task.lifecycle.as_str(),
            })
        );
    } else {
        reporter.success(&format!("Remote revision of {app_name} finished"));
        app.output
            .line(&format!("  List packages: cf-prompt prompts {app_name}"));
    }
    Ok(())
}
