//! `cf-prompt prompts`: list an app's packages with their prompts.

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::PlatformApi;
use crate::domain::Package;
use crate::output::{json, progress};

#[derive(Args, Debug)]
pub struct PromptsArgs {
    /// App whose packages to list
    pub app: String,
}

/// Run `cf-prompt prompts`.
///
/// # Errors
///
/// Returns an error if the app cannot be found or packages cannot be listed.
pub async fn run(args: &PromptsArgs, app: &AppContext) -> Result<()> {
    app.output.line(&format!(
        "Getting packages for app {} in {}...\n",
        args.app,
        app.target.describe()
    ));

    let pb = progress::maybe_spinner(app.output.show_progress(), "Fetching packages");
    let listing = list(&app.api, &app.target.space_guid, &args.app).await;
    pb.finish_and_clear();
    let (packages, current) = listing?;

    if app.is_json() {
        println!("{}", json::format_packages(&packages, current.as_deref())?);
    } else {
        app.renderer()
            .render_packages(&args.app, &packages, current.as_deref());
    }
    Ok(())
}

async fn list(
    api: &impl PlatformApi,
    space_guid: &str,
    app_name: &str,
) -> Result<(Vec<Package>, Option<String>)> {
    let resource = api.find_app(app_name, space_guid).await?;
    let packages = api
        .list_packages(&resource.guid, &[])
        .await
        .context("listing packages")?
        .into_iter()
        .map(Package::from)
        .collect();
    let current = api
        .current_droplet_package(&resource.guid)
        .await
        .context("reading current droplet")?;
    Ok((packages, current))
}
