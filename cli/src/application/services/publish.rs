//! Artifact publication: turn a local directory into a new package revision.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;

use anyhow::{Context, Result};
use cf_prompt_common::{CreatePackageRequest, PackageState};

use crate::application::ports::{ArtifactStore, PlatformApi, ProgressReporter};
use crate::domain::{Package, PromptError};

/// Create a bits package for `app_guid` from the contents of `src`.
///
/// The package carries `prompt` as its provenance annotation when given.
/// Returns the package as reported after the upload.
///
/// # Errors
///
/// Returns an error if package creation, compression, or the upload fails,
/// or if the platform reports the upload as failed or expired.
/// Upload failures carry the platform's response body.
pub async fn publish_directory(
    api: &impl PlatformApi,
    store: &impl ArtifactStore,
    reporter: &impl ProgressReporter,
    app_guid: &str,
    src: &Path,
    prompt: Option<&str>,
) -> Result<Package> {
    reporter.step("creating package");
    let created = api
        .create_package(&CreatePackageRequest::bits(app_guid, prompt))
        .await
        .context("creating package")?;
    let upload_url = created.link("upload").map(String::from);

    let scratch = store.scratch_dir()?;
    let archive = scratch.path().join("package.zip");
    store
        .pack_zip(src, &archive)
        .await
        .with_context(|| format!("compressing {}", src.display()))?;

    reporter.step(&format!("uploading package {}", created.guid));
    let uploaded = api
        .upload_package(&created.guid, upload_url.as_deref(), &archive)
        .await
        .with_context(|| format!("uploading package {}", created.guid))?;

    let landed = uploaded.state;
    let rejected = landed.is_settled() && landed != PackageState::Ready;
    if rejected || !created.state.can_transition_to(landed) {
        return Err(PromptError::transport(format!(
            "package {} is {} after upload",
            created.guid,
            landed.as_str()
        ))
        .into());
    }

    let package = Package::from(uploaded);
    reporter.success(&format!(
        "package {} uploaded ({})",
        package.short_id(),
        package.state.as_str()
    ));
    Ok(package)
}
