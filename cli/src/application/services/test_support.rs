//! Shared test fakes for application service tests.
//!
//! Every fake records what it was asked to do so tests can assert on the
//! sequence of platform calls without a network.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use cf_prompt_common::{
    AppResource, AppState, BuildResource, BuildState, CreatePackageRequest, DropletResource,
    DropletState, GuidRef, Link, PackageResource, PackageState, PrompterConfig,
};

use crate::application::ports::{
    ArtifactStore, CodeModifier, ImageFetcher, LineSink, LogRelay, PlatformApi,
    ProgressReporter, SatelliteDeployer,
};
use crate::domain::{ImageReference, PromptError, RemoteWorkerTask, SatelliteLifecycle};

// ── Builders ──────────────────────────────────────────────────────────────────

pub fn package_resource(guid: &str, data: serde_json::Value) -> PackageResource {
    serde_json::from_value(serde_json::json!({
        "guid": guid,
        "type": "bits",
        "data": data,
        "state": "READY",
        "created_at": "2026-03-01T12:00:00Z",
        "links": {
            "upload": {"href": format!("https://localhost/v3/packages/{guid}/upload"), "method": "POST"}
        }
    }))
    .unwrap()
}

pub fn app_resource(guid: &str, name: &str) -> AppResource {
    AppResource {
        guid: guid.to_string(),
        name: name.to_string(),
        state: AppState::Started,
        relationships: cf_prompt_common::AppRelationships::default(),
    }
}

pub fn droplet(guid: &str, state: DropletState, package_guid: &str) -> DropletResource {
    let mut links = BTreeMap::new();
    links.insert(
        "package".to_string(),
        Link {
            href: format!("https://api.example.com/v3/packages/{package_guid}"),
            method: None,
        },
    );
    DropletResource {
        guid: guid.to_string(),
        state,
        links,
    }
}

pub fn remote_task() -> RemoteWorkerTask {
    let config = PrompterConfig {
        cf_access_token: "tok".to_string(),
        cf_api: "https://api.example.com".to_string(),
        app_id: "app-1".to_string(),
        space_id: "space-1".to_string(),
        org_id: "org-1".to_string(),
        prompt_base64: PrompterConfig::encode_prompt("add a footer"),
        ..PrompterConfig::default()
    };
    RemoteWorkerTask::new("sat".to_string(), SatelliteLifecycle::Ephemeral, config)
}

// ── Reporter and sink ─────────────────────────────────────────────────────────

pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, _: &str) {}
}

#[derive(Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl LineSink for CollectingSink {
    fn line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

// ── Platform ──────────────────────────────────────────────────────────────────

/// In-memory platform. Read calls are not recorded in `calls()`.
#[derive(Default)]
pub struct FakePlatform {
    packages: Mutex<Vec<PackageResource>>,
    droplets: Mutex<BTreeMap<String, Vec<DropletResource>>>,
    builds: Mutex<VecDeque<BuildState>>,
    app_states: Mutex<VecDeque<AppState>>,
    app_poll_failures: Mutex<u32>,
    upload_failure: Mutex<Option<(u16, String)>>,
    upload_state: Mutex<Option<PackageState>>,
    missing_apps: Mutex<Vec<String>>,
    current: Mutex<Option<DropletResource>>,
    calls: Mutex<Vec<String>>,
    app_polls: Mutex<u32>,
    build_polls: Mutex<u32>,
}

/// Pop the next scripted value, repeating the last one forever.
fn next_sticky<T: Copy>(queue: &Mutex<VecDeque<T>>, fallback: T) -> T {
    let mut q = queue.lock().unwrap();
    if q.len() > 1 {
        q.pop_front().unwrap_or(fallback)
    } else {
        q.front().copied().unwrap_or(fallback)
    }
}

impl FakePlatform {
    pub fn add_package(&self, pkg: PackageResource) {
        self.packages.lock().unwrap().push(pkg);
    }

    pub fn add_droplet(&self, package_guid: &str, droplet: DropletResource) {
        self.droplets
            .lock()
            .unwrap()
            .entry(package_guid.to_string())
            .or_default()
            .push(droplet);
    }

    pub fn script_builds(&self, states: &[BuildState]) {
        self.builds.lock().unwrap().extend(states.iter().copied());
    }

    pub fn script_app_states(&self, states: &[AppState]) {
        self.app_states.lock().unwrap().extend(states.iter().copied());
    }

    pub fn fail_next_app_polls(&self, n: u32) {
        *self.app_poll_failures.lock().unwrap() = n;
    }

    pub fn fail_upload_with(&self, status: u16, body: &str) {
        *self.upload_failure.lock().unwrap() = Some((status, body.to_string()));
    }

    /// State reported for packages right after upload. Defaults to processing.
    pub fn upload_lands_in(&self, state: PackageState) {
        *self.upload_state.lock().unwrap() = Some(state);
    }

    /// Make `find_app` answer NotFound for `name`.
    pub fn remove_app(&self, name: &str) {
        self.missing_apps.lock().unwrap().push(name.to_string());
    }

    pub fn set_current(&self, droplet: DropletResource) {
        *self.current.lock().unwrap() = Some(droplet);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn app_polls(&self) -> u32 {
        *self.app_polls.lock().unwrap()
    }

    pub fn build_polls(&self) -> u32 {
        *self.build_polls.lock().unwrap()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PlatformApi for FakePlatform {
    async fn find_app(&self, name: &str, _space_guid: &str) -> Result<AppResource> {
        if self.missing_apps.lock().unwrap().iter().any(|m| m == name) {
            return Err(PromptError::not_found("app", name).into());
        }
        Ok(app_resource(&format!("{name}-guid"), name))
    }

    async fn first_app(&self, _space_guid: &str) -> Result<AppResource> {
        Ok(app_resource("app-1", "web"))
    }

    async fn get_app(&self, guid: &str) -> Result<AppResource> {
        *self.app_polls.lock().unwrap() += 1;
        {
            let mut failures = self.app_poll_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                bail!("connection reset by peer");
            }
        }
        let mut app = app_resource(guid, "sat");
        app.state = next_sticky(&self.app_states, AppState::Started);
        Ok(app)
    }

    async fn list_packages(
        &self,
        _app_guid: &str,
        states: &[PackageState],
    ) -> Result<Vec<PackageResource>> {
        Ok(self
            .packages
            .lock()
            .unwrap()
            .iter()
            .filter(|p| states.is_empty() || states.contains(&p.state))
            .cloned()
            .collect())
    }

    async fn download_package(&self, guid: &str, _dest: &Path) -> Result<()> {
        self.record(format!("download_package {guid}"));
        Ok(())
    }

    async fn create_package(&self, request: &CreatePackageRequest) -> Result<PackageResource> {
        let app = request.relationships.app.guid().unwrap_or_default();
        match request.metadata.original_prompt() {
            Some(p) => self.record(format!("create_package {app} {p}")),
            None => self.record(format!("create_package {app}")),
        }
        let mut pkg = package_resource("pkg-new", serde_json::json!({}));
        pkg.state = PackageState::AwaitingUpload;
        pkg.metadata = request.metadata.clone();
        Ok(pkg)
    }

    async fn upload_package(
        &self,
        package_guid: &str,
        upload_url: Option<&str>,
        _zip: &Path,
    ) -> Result<PackageResource> {
        self.record(format!(
            "upload_package {package_guid} {}",
            upload_url.unwrap_or("-")
        ));
        if let Some((status, body)) = self.upload_failure.lock().unwrap().clone() {
            return Err(PromptError::status("failed to upload package", status, body).into());
        }
        let mut pkg = package_resource(package_guid, serde_json::json!({}));
        pkg.state = self
            .upload_state
            .lock()
            .unwrap()
            .unwrap_or(PackageState::ProcessingUpload);
        Ok(pkg)
    }

    async fn package_droplets(&self, package_guid: &str) -> Result<Vec<DropletResource>> {
        Ok(self
            .droplets
            .lock()
            .unwrap()
            .get(package_guid)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_build(&self, package_guid: &str) -> Result<BuildResource> {
        self.record(format!("create_build {package_guid}"));
        Ok(BuildResource {
            guid: "build-1".to_string(),
            state: BuildState::Staging,
            error: None,
            package: Some(GuidRef::new(package_guid)),
            droplet: None,
        })
    }

    async fn get_build(&self, guid: &str) -> Result<BuildResource> {
        *self.build_polls.lock().unwrap() += 1;
        let state = next_sticky(&self.builds, BuildState::Staged);
        Ok(BuildResource {
            guid: guid.to_string(),
            state,
            error: (state == BuildState::Failed).then(|| "buildpack compile failed".to_string()),
            package: None,
            droplet: (state == BuildState::Staged).then(|| GuidRef::new(format!("droplet-{guid}"))),
        })
    }

    async fn set_current_droplet(&self, app_guid: &str, droplet_guid: &str) -> Result<()> {
        self.record(format!("set_current_droplet {app_guid} {droplet_guid}"));
        *self.current.lock().unwrap() = Some(droplet(droplet_guid, DropletState::Staged, "-"));
        Ok(())
    }

    async fn current_droplet(&self, _app_guid: &str) -> Result<Option<DropletResource>> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn start_app(&self, guid: &str) -> Result<AppResource> {
        self.record(format!("start_app {guid}"));
        Ok(app_resource(guid, "sat"))
    }

    async fn stop_app(&self, guid: &str) -> Result<AppResource> {
        self.record(format!("stop_app {guid}"));
        let mut app = app_resource(guid, "sat");
        app.state = AppState::Stopped;
        Ok(app)
    }

    async fn delete_app(&self, guid: &str) -> Result<()> {
        self.record(format!("delete_app {guid}"));
        Ok(())
    }

    async fn update_app_env(&self, guid: &str, vars: &BTreeMap<String, String>) -> Result<()> {
        self.record(format!("update_app_env {guid} {}", vars.len()));
        Ok(())
    }
}

// ── Artifacts ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    app_dir: bool,
    unpacked: Mutex<Vec<PathBuf>>,
    packed: Mutex<Vec<PathBuf>>,
}

impl MemoryStore {
    /// A store whose extractions produce an `app/` workspace root.
    pub fn with_app_dir() -> Self {
        Self {
            app_dir: true,
            ..Self::default()
        }
    }

    pub fn unpacked(&self) -> Vec<PathBuf> {
        self.unpacked.lock().unwrap().clone()
    }

    pub fn packed(&self) -> Vec<PathBuf> {
        self.packed.lock().unwrap().clone()
    }
}

impl ArtifactStore for MemoryStore {
    fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        tempfile::tempdir().context("creating scratch dir")
    }

    async fn unpack_zip(&self, _archive: &Path, dest: &Path) -> Result<()> {
        self.unpacked.lock().unwrap().push(dest.to_path_buf());
        Ok(())
    }

    async fn pack_zip(&self, src: &Path, _archive: &Path) -> Result<()> {
        self.packed.lock().unwrap().push(src.to_path_buf());
        Ok(())
    }

    fn workspace_root(&self, dest: &Path) -> PathBuf {
        if self.app_dir {
            dest.join("app")
        } else {
            dest.to_path_buf()
        }
    }
}

#[derive(Default)]
pub struct RecordingImages {
    fetched: Mutex<Vec<String>>,
}

impl RecordingImages {
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl ImageFetcher for RecordingImages {
    async fn fetch_image(&self, image: &ImageReference, _dest: &Path) -> Result<()> {
        self.fetched.lock().unwrap().push(image.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingModifier {
    runs: Mutex<Vec<(PathBuf, String)>>,
}

impl RecordingModifier {
    pub fn runs(&self) -> Vec<(PathBuf, String)> {
        self.runs.lock().unwrap().clone()
    }
}

impl CodeModifier for RecordingModifier {
    async fn modify(&self, workdir: &Path, prompt: &str) -> Result<()> {
        self.runs
            .lock()
            .unwrap()
            .push((workdir.to_path_buf(), prompt.to_string()));
        Ok(())
    }
}

pub struct FailingModifier;

impl CodeModifier for FailingModifier {
    async fn modify(&self, _: &Path, _: &str) -> Result<()> {
        bail!("opencode exited with exit status: 1")
    }
}

// ── Log relay ─────────────────────────────────────────────────────────────────

enum RelayEnd {
    Finish,
    Fail,
    Never,
}

/// Emits scripted lines, then finishes, fails, or hangs until dropped.
pub struct ScriptedRelay {
    lines: Vec<String>,
    end: RelayEnd,
    dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ScriptedRelay {
    fn new(lines: &[&str], end: RelayEnd) -> Self {
        Self {
            lines: lines.iter().map(|l| (*l).to_string()).collect(),
            end,
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn lines(lines: &[&str]) -> Self {
        Self::new(lines, RelayEnd::Finish)
    }

    pub fn failing() -> Self {
        Self::new(&[], RelayEnd::Fail)
    }

    pub fn endless() -> Self {
        Self::new(&[], RelayEnd::Never)
    }

    /// Whether an endless relay's future was dropped while still streaming.
    pub fn was_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl LogRelay for ScriptedRelay {
    async fn relay(&self, _app_name: &str, sink: &dyn LineSink) -> Result<()> {
        for line in &self.lines {
            sink.line(line);
        }
        match self.end {
            RelayEnd::Finish => Ok(()),
            RelayEnd::Fail => bail!("cf logs exited with status 1"),
            RelayEnd::Never => {
                let _guard = DropFlag(Arc::clone(&self.dropped));
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

// ── Deployer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDeployer {
    fail_prepare: bool,
    fail_teardown: bool,
    prepares: Mutex<u32>,
    teardowns: Mutex<Vec<Option<String>>>,
}

impl FakeDeployer {
    pub fn failing_prepare() -> Self {
        Self {
            fail_prepare: true,
            ..Self::default()
        }
    }

    pub fn failing_teardown() -> Self {
        Self {
            fail_teardown: true,
            ..Self::default()
        }
    }

    pub fn prepares(&self) -> u32 {
        *self.prepares.lock().unwrap()
    }

    pub fn teardowns(&self) -> Vec<Option<String>> {
        self.teardowns.lock().unwrap().clone()
    }
}

impl SatelliteDeployer for FakeDeployer {
    fn lifecycle(&self) -> SatelliteLifecycle {
        SatelliteLifecycle::Ephemeral
    }

    fn satellite_name(&self, _app_name: &str) -> String {
        "sat".to_string()
    }

    async fn prepare(&self, _task: &RemoteWorkerTask) -> Result<String> {
        *self.prepares.lock().unwrap() += 1;
        if self.fail_prepare {
            bail!("push failed");
        }
        Ok("sat-guid".to_string())
    }

    async fn teardown(&self, _task: &RemoteWorkerTask, satellite_guid: Option<&str>) -> Result<()> {
        self.teardowns
            .lock()
            .unwrap()
            .push(satellite_guid.map(String::from));
        if self.fail_teardown {
            bail!("delete failed");
        }
        Ok(())
    }
}
