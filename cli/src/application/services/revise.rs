//! Local revision pipeline: acquire → modify → publish.
//!
//! Used by `cf-prompt prompt` and, unchanged, by the satellite worker.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{
    ArtifactStore, CodeModifier, ImageFetcher, PlatformApi, ProgressReporter,
};
use crate::application::services::{acquire, publish};
use crate::domain::Package;

/// Result of one revision run.
#[derive(Debug)]
pub struct Revision {
    /// Package the sources were taken from.
    pub source: Package,
    /// Newly published package.
    pub published: Package,
}

/// Revise the latest ready package of `app_guid` with `prompt`.
///
/// `workdir` is an empty directory owned by the caller.
///
/// # Errors
///
/// Returns an error if any stage fails. Nothing is published unless the
/// code modifier succeeded.
#[allow(clippy::too_many_arguments)]
pub async fn revise_app(
    api: &impl PlatformApi,
    images: &impl ImageFetcher,
    store: &impl ArtifactStore,
    modifier: &impl CodeModifier,
    reporter: &impl ProgressReporter,
    app_guid: &str,
    prompt: &str,
    workdir: &Path,
) -> Result<Revision> {
    let source = Package::from(
        api.latest_ready_package(app_guid)
            .await
            .context("finding latest package")?,
    );
    reporter.step(&format!("using package {} ({})", source.short_id(), source.guid));

    let root = acquire::acquire_package(api, images, store, reporter, &source, workdir).await?;

    reporter.step("running code modifier");
    modifier
        .modify(&root, prompt)
        .await
        .context("code modifier failed")?;

    let published =
        publish::publish_directory(api, store, reporter, app_guid, &root, Some(prompt)).await?;
    Ok(Revision { source, published })
}
