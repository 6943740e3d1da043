//! Satellite deployers: the ephemeral and persistent strategies behind the
//! `SatelliteDeployer` port, plus the bundle they push.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tempfile::TempDir;

use crate::application::ports::{CommandRunner, PlatformApi, SatelliteDeployer};
use crate::domain::satellite::{
    PROCFILE, SatelliteManifest, WORKER_EXECUTABLE, ephemeral_name, persistent_name,
};
use crate::domain::{PromptError, RemoteWorkerTask, SatelliteLifecycle};
use crate::infra::cf_cli::CfCli;

const MANIFEST_FILE: &str = "manifest.yml";

/// The worker executable, ready to be laid out as a pushable directory.
#[derive(Clone, Debug)]
pub struct SatelliteBundle {
    worker: Vec<u8>,
}

impl SatelliteBundle {
    /// # Errors
    ///
    /// Returns [`PromptError::Configuration`] if `worker` is empty.
    pub fn new(worker: Vec<u8>) -> Result<Self> {
        if worker.is_empty() {
            return Err(PromptError::configuration("satellite worker executable is empty").into());
        }
        Ok(Self { worker })
    }

    /// Read the worker executable from disk.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Configuration`] if the file is missing or empty.
    pub async fn load(path: &Path) -> Result<Self> {
        let worker = tokio::fs::read(path).await.map_err(|e| {
            PromptError::configuration(format!(
                "cannot read satellite worker at {}: {e} (set --worker-binary)",
                path.display()
            ))
        })?;
        Self::new(worker)
    }

    /// Default worker location: `cf-prompter` next to the running executable.
    #[must_use]
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(WORKER_EXECUTABLE)))
            .unwrap_or_else(|| PathBuf::from(WORKER_EXECUTABLE))
    }

    /// Lay out executable, `Procfile` and manifest in a fresh directory.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be written.
    pub async fn stage(&self, name: &str, env: BTreeMap<String, String>) -> Result<TempDir> {
        let manifest = serde_yaml::to_string(&SatelliteManifest::worker(name, env))
            .context("cannot serialize satellite manifest")?;
        let worker = self.worker.clone();
        tokio::task::spawn_blocking(move || write_bundle(&worker, &manifest))
            .await
            .context("spawn_blocking for write_bundle")?
    }
}

fn write_bundle(worker: &[u8], manifest: &str) -> Result<TempDir> {
    let dir = tempfile::Builder::new()
        .prefix("cf-prompter-bundle-")
        .tempdir()
        .context("cannot create bundle directory")?;
    let exe = dir.path().join(WORKER_EXECUTABLE);
    std::fs::write(&exe, worker).with_context(|| format!("cannot write {}", exe.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("cannot chmod {}", exe.display()))?;
    }
    std::fs::write(dir.path().join("Procfile"), PROCFILE).context("cannot write Procfile")?;
    std::fs::write(dir.path().join(MANIFEST_FILE), manifest)
        .context("cannot write manifest")?;
    Ok(dir)
}

async fn push_bundle<R: CommandRunner>(
    cf: &CfCli<R>,
    bundle: &SatelliteBundle,
    name: &str,
    env: BTreeMap<String, String>,
) -> Result<()> {
    let dir = bundle.stage(name, env).await?;
    cf.push(name, &dir.path().join(MANIFEST_FILE), dir.path())
        .await
}

// ── Ephemeral ─────────────────────────────────────────────────────────────────

/// Pushes a fresh satellite per run and deletes it afterwards.
pub struct EphemeralDeployer<'a, A: PlatformApi, R: CommandRunner> {
    api: &'a A,
    cf: &'a CfCli<R>,
    bundle: SatelliteBundle,
}

impl<'a, A: PlatformApi, R: CommandRunner> EphemeralDeployer<'a, A, R> {
    pub fn new(api: &'a A, cf: &'a CfCli<R>, bundle: SatelliteBundle) -> Self {
        Self { api, cf, bundle }
    }
}

impl<A: PlatformApi, R: CommandRunner> SatelliteDeployer for EphemeralDeployer<'_, A, R> {
    fn lifecycle(&self) -> SatelliteLifecycle {
        SatelliteLifecycle::Ephemeral
    }

    fn satellite_name(&self, _app_name: &str) -> String {
        ephemeral_name(Utc::now())
    }

    async fn prepare(&self, task: &RemoteWorkerTask) -> Result<String> {
        let name = &task.satellite_name;
        push_bundle(self.cf, &self.bundle, name, task.config.to_env()).await?;
        let app = self.api.find_app(name, &task.config.space_id).await?;
        Ok(app.guid)
    }

    async fn teardown(&self, task: &RemoteWorkerTask, satellite_guid: Option<&str>) -> Result<()> {
        if let Some(guid) = satellite_guid {
            self.api.stop_app(guid).await?;
        }
        self.cf.delete(&task.satellite_name).await
    }
}

// ── Persistent ────────────────────────────────────────────────────────────────

/// Reuses the satellite created by `prompt-init`; stops it after each run.
pub struct PersistentDeployer<'a, A: PlatformApi, R: CommandRunner> {
    api: &'a A,
    cf: &'a CfCli<R>,
}

impl<'a, A: PlatformApi, R: CommandRunner> PersistentDeployer<'a, A, R> {
    pub fn new(api: &'a A, cf: &'a CfCli<R>) -> Self {
        Self { api, cf }
    }

    /// Replace any previous satellite for `app_name` with a stopped,
    /// route-less one. Returns its name.
    ///
    /// # Errors
    ///
    /// Returns an error if delete or push fails.
    pub async fn provision(&self, bundle: &SatelliteBundle, app_name: &str) -> Result<String> {
        let name = persistent_name(app_name);
        self.cf.delete(&name).await?;
        push_bundle(self.cf, bundle, &name, BTreeMap::new()).await?;
        Ok(name)
    }
}

impl<A: PlatformApi, R: CommandRunner> SatelliteDeployer for PersistentDeployer<'_, A, R> {
    fn lifecycle(&self) -> SatelliteLifecycle {
        SatelliteLifecycle::Persistent
    }

    fn satellite_name(&self, app_name: &str) -> String {
        persistent_name(app_name)
    }

    async fn prepare(&self, task: &RemoteWorkerTask) -> Result<String> {
        let app = self
            .api
            .find_app(&task.satellite_name, &task.config.space_id)
            .await
            .context("persistent satellite missing; run `cf-prompt prompt-init` first")?;
        self.api.stop_app(&app.guid).await?;
        self.api
            .update_app_env(&app.guid, &task.config.to_env())
            .await?;
        Ok(app.guid)
    }

    async fn teardown(&self, _task: &RemoteWorkerTask, satellite_guid: Option<&str>) -> Result<()> {
        if let Some(guid) = satellite_guid {
            self.api.stop_app(guid).await?;
        }
        Ok(())
    }
}
