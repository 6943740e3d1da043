//! `cf-prompt prompt-push`: make a package's droplet the app's current one.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::PlatformApi;
use crate::application::services::staging::{self as service, BUILD_POLL_INTERVAL, Promotion};

#[derive(Args, Debug)]
pub struct PromptPushArgs {
    /// App to update
    pub app: String,
    /// Package hash as shown by `cf-prompt prompts`
    pub hash: String,
}

/// Run `cf-prompt prompt-push`.
///
/// # Errors
///
/// Returns an error if the package is unknown, staging fails, or the
/// droplet cannot be made current.
pub async fn run(args: &PromptPushArgs, app: &AppContext) -> Result<()> {
    app.output.line(&format!(
        "Updating app {} in {}...\n",
        args.app,
        app.target.describe()
    ));

    let resource = app.api.find_app(&args.app, &app.target.space_guid).await?;
    let promotion = service::promote_package(
        &app.api,
        &app.cf,
        &app.log_sink(),
        &app.terminal_reporter(),
        &resource,
        &args.hash,
        BUILD_POLL_INTERVAL,
    )
    .await?;

    if app.is_json() {
        let staged = matches!(promotion, Promotion::Staged { .. });
        println!(
            "{}",
            serde_json::json!({"app": args.app, "droplet": promotion.droplet(), "staged": staged})
        );
    } else {
        app.output.line("OK");
    }
    Ok(())
}
