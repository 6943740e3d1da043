//! Staging tracker: make a chosen package the app's running revision.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Steps run strictly in sequence; nothing is retried.

use std::time::Duration;

use anyhow::{Context, Result};
use cf_prompt_common::{AppResource, BuildResource, BuildState, DropletState, matches_short_id};

use crate::application::ports::{LineSink, LogRelay, PlatformApi, ProgressReporter};
use crate::domain::PromptError;

/// Default interval between build state polls.
pub const BUILD_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How the promoted droplet was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// The package already had a staged droplet.
    Reused { package: String, droplet: String },
    /// A build was run for the package.
    Staged {
        package: String,
        build: String,
        droplet: String,
    },
}

impl Promotion {
    #[must_use]
    pub fn droplet(&self) -> &str {
        match self {
            Self::Reused { droplet, .. } | Self::Staged { droplet, .. } => droplet,
        }
    }
}

/// Promote the package of `app` whose short id is `short`.
///
/// While a build runs, the app's log stream is relayed into `sink`.
///
/// # Errors
///
/// Returns [`PromptError::NotFound`] if no package matches, and
/// [`PromptError::StagingFailed`] if the build fails.
pub async fn promote_package(
    api: &impl PlatformApi,
    relay: &impl LogRelay,
    sink: &dyn LineSink,
    reporter: &impl ProgressReporter,
    app: &AppResource,
    short: &str,
    poll_interval: Duration,
) -> Result<Promotion> {
    let package = api
        .list_packages(&app.guid, &[])
        .await
        .context("listing packages")?
        .into_iter()
        .find(|p| matches_short_id(&p.guid, short))
        .ok_or_else(|| PromptError::not_found("package", short))?;
    reporter.step(&format!("found package {} ({short})", package.guid));

    let existing = api
        .package_droplets(&package.guid)
        .await
        .context("listing package droplets")?
        .into_iter()
        .find(|d| d.state == DropletState::Staged);

    let promotion = if let Some(droplet) = existing {
        reporter.step(&format!("reusing staged droplet {}", droplet.guid));
        Promotion::Reused {
            package: package.guid,
            droplet: droplet.guid,
        }
    } else {
        let build = stage(api, relay, sink, reporter, &app.name, &package.guid, poll_interval).await?;
        let droplet = build
            .droplet
            .map(|d| d.guid)
            .with_context(|| format!("build {} staged without a droplet", build.guid))?;
        Promotion::Staged {
            package: package.guid,
            build: build.guid,
            droplet,
        }
    };

    api.set_current_droplet(&app.guid, promotion.droplet())
        .await
        .context("setting current droplet")?;
    reporter.success(&format!(
        "droplet {} is now current for {}",
        promotion.droplet(),
        app.name
    ));
    Ok(promotion)
}

/// Give `app_guid` a current droplet, staging its newest ready package when
/// it has none. Returns the droplet guid.
///
/// Apps pushed without starting carry bits but no droplet, and the platform
/// refuses to start them.
///
/// # Errors
///
/// Returns [`PromptError::NotFound`] if the app has no ready package, and
/// [`PromptError::StagingFailed`] if the build fails.
pub async fn ensure_current_droplet(
    api: &impl PlatformApi,
    reporter: &impl ProgressReporter,
    app_guid: &str,
    poll_interval: Duration,
) -> Result<String> {
    if let Some(current) = api
        .current_droplet(app_guid)
        .await
        .context("reading current droplet")?
    {
        return Ok(current.guid);
    }

    let package = api.latest_ready_package(app_guid).await?;
    let existing = api
        .package_droplets(&package.guid)
        .await
        .context("listing package droplets")?
        .into_iter()
        .find(|d| d.state == DropletState::Staged);
    let droplet = if let Some(droplet) = existing {
        droplet.guid
    } else {
        let build = api
            .create_build(&package.guid)
            .await
            .context("creating build")?;
        reporter.step(&format!("staging build {}", build.guid));
        let build = wait_for_build(api, reporter, &build.guid, poll_interval).await?;
        build
            .droplet
            .map(|d| d.guid)
            .with_context(|| format!("build {} staged without a droplet", build.guid))?
    };

    api.set_current_droplet(app_guid, &droplet)
        .await
        .context("setting current droplet")?;
    Ok(droplet)
}

/// Create a build and wait for it to settle, relaying app logs meanwhile.
async fn stage(
    api: &impl PlatformApi,
    relay: &impl LogRelay,
    sink: &dyn LineSink,
    reporter: &impl ProgressReporter,
    app_name: &str,
    package_guid: &str,
    poll_interval: Duration,
) -> Result<BuildResource> {
    let build = api
        .create_build(package_guid)
        .await
        .context("creating build")?;
    reporter.step(&format!("staging build {}", build.guid));

    let logs = async {
        if let Err(e) = relay.relay(app_name, sink).await {
            reporter.warn(&format!("log stream unavailable: {e:#}"));
        }
        std::future::pending::<Result<BuildResource>>().await
    };

    tokio::select! {
        result = wait_for_build(api, reporter, &build.guid, poll_interval) => result,
        result = logs => result,
    }
}

async fn wait_for_build(
    api: &impl PlatformApi,
    reporter: &impl ProgressReporter,
    guid: &str,
    poll_interval: Duration,
) -> Result<BuildResource> {
    let mut last = None;
    loop {
        let build = api.get_build(guid).await.context("polling build")?;
        if last != Some(build.state) {
            reporter.step(&format!("build {guid}: {}", build.state.as_str()));
            last = Some(build.state);
        }
        match build.state {
            BuildState::Staged => return Ok(build),
            BuildState::Failed => {
                return Err(PromptError::StagingFailed {
                    build: guid.to_string(),
                    reason: build.error.unwrap_or_else(|| "unknown error".to_string()),
                }
                .into());
            }
            BuildState::Staging => tokio::time::sleep(poll_interval).await,
        }
    }
}
