//! `cf-prompt prompt-init`: provision the persistent satellite for an app.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{PlatformApi, ProgressReporter};
use crate::application::services::staging::{BUILD_POLL_INTERVAL, ensure_current_droplet};
use crate::commands::WorkerArgs;
use crate::infra::satellite::PersistentDeployer;
use crate::output::progress;

#[derive(Args, Debug)]
pub struct PromptInitArgs {
    /// App the satellite will revise
    pub app: String,

    #[command(flatten)]
    pub worker: WorkerArgs,
}

/// Run `cf-prompt prompt-init`.
///
/// # Errors
///
/// Returns an error if the worker executable is unusable, the app does not
/// exist, or the push or staging fails.
pub async fn run(args: &PromptInitArgs, app: &AppContext) -> Result<()> {
    let bundle = args.worker.bundle().await?;
    app.api.find_app(&args.app, &app.target.space_guid).await?;

    let reporter = app.terminal_reporter();
    let deployer = PersistentDeployer::new(&app.api, &app.cf);
    let pb = progress::maybe_spinner(
        app.output.show_progress(),
        &format!("Pushing satellite for {}", args.app),
    );
    let pushed = deployer.provision(&bundle, &args.app).await;
    pb.finish_and_clear();
    let name = pushed?;

    let satellite = app.api.find_app(&name, &app.target.space_guid).await?;
    ensure_current_droplet(&app.api, &reporter, &satellite.guid, BUILD_POLL_INTERVAL).await?;

    if app.is_json() {
        println!("{}", serde_json::json!({"app": args.app, "satellite": name}));
    } else {
        reporter.success(&format!("Satellite {name} ready (stopped)"));
        app.output
            .line(&format!("  Run: cf-prompt prompt {} --persistent -p \"...\"", args.app));
    }
    Ok(())
}
