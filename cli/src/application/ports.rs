//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared wire types,
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::Result;
use cf_prompt_common::{
    AppResource, BuildResource, CreatePackageRequest, DropletResource, PackageResource,
    PackageState,
};

use crate::domain::{ImageReference, PromptError, RemoteWorkerTask, SatelliteLifecycle};

// ── Platform API Port ─────────────────────────────────────────────────────────

/// Authenticated access to the platform's v3 resource API.
///
/// One call is one request (plus pagination); implementations never retry.
#[allow(async_fn_in_trait)]
pub trait PlatformApi {
    /// Look up an app by name within a space.
    async fn find_app(&self, name: &str, space_guid: &str) -> Result<AppResource>;
    /// First app of a space, ordered by name.
    async fn first_app(&self, space_guid: &str) -> Result<AppResource>;
    async fn get_app(&self, guid: &str) -> Result<AppResource>;
    /// Packages of an app, newest first, across all pages.
    ///
    /// An empty `states` slice means every state.
    async fn list_packages(
        &self,
        app_guid: &str,
        states: &[PackageState],
    ) -> Result<Vec<PackageResource>>;
    /// Stream a package's bits into `dest`.
    async fn download_package(&self, guid: &str, dest: &Path) -> Result<()>;
    async fn create_package(&self, request: &CreatePackageRequest) -> Result<PackageResource>;
    /// Upload a zip to a package. `upload_url` is the package's `upload` link,
    /// when the platform advertised one.
    async fn upload_package(
        &self,
        package_guid: &str,
        upload_url: Option<&str>,
        zip: &Path,
    ) -> Result<PackageResource>;
    async fn package_droplets(&self, package_guid: &str) -> Result<Vec<DropletResource>>;
    async fn create_build(&self, package_guid: &str) -> Result<BuildResource>;
    async fn get_build(&self, guid: &str) -> Result<BuildResource>;
    async fn set_current_droplet(&self, app_guid: &str, droplet_guid: &str) -> Result<()>;
    /// The app's current droplet, `None` when it has none.
    async fn current_droplet(&self, app_guid: &str) -> Result<Option<DropletResource>>;
    async fn start_app(&self, guid: &str) -> Result<AppResource>;
    async fn stop_app(&self, guid: &str) -> Result<AppResource>;
    async fn delete_app(&self, guid: &str) -> Result<()>;
    /// Merge `vars` into the app's user-provided environment.
    async fn update_app_env(&self, guid: &str, vars: &BTreeMap<String, String>) -> Result<()>;

    /// Newest package in `READY` state.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::NotFound`] if the app has no ready package.
    async fn latest_ready_package(&self, app_guid: &str) -> Result<PackageResource> {
        self.list_packages(app_guid, &[PackageState::Ready])
            .await?
            .into_iter()
            .find(|p| p.state == PackageState::Ready)
            .ok_or_else(|| PromptError::not_found("ready package for app", app_guid).into())
    }

    /// Guid of the package behind the app's current droplet.
    async fn current_droplet_package(&self, app_guid: &str) -> Result<Option<String>> {
        Ok(self
            .current_droplet(app_guid)
            .await?
            .and_then(|d| d.package_guid().map(String::from)))
    }
}

// ── Artifact Ports ────────────────────────────────────────────────────────────

/// Pulls a container image and lays its files out on disk.
#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    /// Extract every layer of `image` into `dest`, in order.
    async fn fetch_image(&self, image: &ImageReference, dest: &Path) -> Result<()>;
}

/// Local scratch space and archive codecs.
#[allow(async_fn_in_trait)]
pub trait ArtifactStore {
    /// Fresh temporary directory, removed when the guard drops.
    fn scratch_dir(&self) -> Result<tempfile::TempDir>;
    /// Expand a zip archive into `dest`.
    async fn unpack_zip(&self, archive: &Path, dest: &Path) -> Result<()>;
    /// Compress the contents of `src` into a new zip at `archive`.
    async fn pack_zip(&self, src: &Path, archive: &Path) -> Result<()>;
    /// Directory holding the app sources after extraction into `dest`.
    fn workspace_root(&self, dest: &Path) -> PathBuf;
}

/// External tool that rewrites source code from an instruction.
#[allow(async_fn_in_trait)]
pub trait CodeModifier {
    async fn modify(&self, workdir: &Path, prompt: &str) -> Result<()>;
}

// ── Remote Worker Ports ───────────────────────────────────────────────────────

/// Receives whole log lines. Writers never interleave partial lines.
pub trait LineSink {
    fn line(&self, line: &str);
}

/// Streams an app's log output into a sink until the stream ends.
#[allow(async_fn_in_trait)]
pub trait LogRelay {
    /// Relay logs of `app_name`. Dropping the future must stop the stream.
    async fn relay(&self, app_name: &str, sink: &dyn LineSink) -> Result<()>;
}

/// Provisions and disposes of the satellite app for one remote task.
#[allow(async_fn_in_trait)]
pub trait SatelliteDeployer {
    fn lifecycle(&self) -> SatelliteLifecycle;
    /// Satellite app name to use for a task against `app_name`.
    fn satellite_name(&self, app_name: &str) -> String;
    /// Make the satellite ready to start with the task's parameters.
    ///
    /// Returns the satellite's app guid. The satellite is left stopped.
    async fn prepare(&self, task: &RemoteWorkerTask) -> Result<String>;
    /// Release the satellite. `satellite_guid` is `None` when `prepare`
    /// failed before the guid was known.
    async fn teardown(&self, task: &RemoteWorkerTask, satellite_guid: Option<&str>) -> Result<()>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
    /// Spawn a program with stdout piped, killed when the handle drops.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn spawn(&self, program: &str, args: &[&str]) -> Result<tokio::process::Child>;
    /// Run a program in `dir` with inherited stdio and return its exit status.
    async fn run_status_in(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<std::process::ExitStatus>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait; no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
