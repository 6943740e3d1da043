//! Artifact acquisition: lay a package's sources out on local disk.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::{ArtifactStore, ImageFetcher, PlatformApi, ProgressReporter};
use crate::domain::{ImageReference, Package, PackagePayload};

/// Download `package` and extract it into `dest`.
///
/// Returns the workspace root: `dest/app` when the payload put sources
/// there, otherwise `dest`. Partial extraction is not rolled back.
///
/// # Errors
///
/// Returns an error if the image reference is invalid, or any download,
/// decompression, or write fails.
pub async fn acquire_package(
    api: &impl PlatformApi,
    images: &impl ImageFetcher,
    store: &impl ArtifactStore,
    reporter: &impl ProgressReporter,
    package: &Package,
    dest: &Path,
) -> Result<PathBuf> {
    match &package.payload {
        PackagePayload::Image { reference } => {
            let image = ImageReference::parse(reference)?;
            reporter.step(&format!("pulling image {image}"));
            images
                .fetch_image(&image, dest)
                .await
                .with_context(|| format!("extracting image {image}"))?;
        }
        PackagePayload::Archive => {
            let scratch = store.scratch_dir()?;
            let archive = scratch.path().join("package.zip");
            reporter.step(&format!("downloading package {}", package.guid));
            api.download_package(&package.guid, &archive)
                .await
                .with_context(|| format!("downloading package {}", package.guid))?;
            store
                .unpack_zip(&archive, dest)
                .await
                .with_context(|| format!("unpacking package {}", package.guid))?;
        }
    }
    reporter.success(&format!("package {} extracted", package.short_id()));
    Ok(store.workspace_root(dest))
}
