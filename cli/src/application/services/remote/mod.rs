//! Remote revision: delegate the pipeline to a satellite inside the platform.
//!
//! prepare → stage → start → monitor, then teardown exactly once whatever happened.

pub mod monitor;

use anyhow::{Context, Result};

use crate::application::ports::{
    LineSink, LogRelay, PlatformApi, ProgressReporter, SatelliteDeployer,
};
use crate::application::services::staging::{BUILD_POLL_INTERVAL, ensure_current_droplet};
use crate::domain::{PromptError, RemoteWorkerTask, TaskState};

pub use monitor::{MonitorTimings, await_completion};

/// Run `task` on a satellite provided by `deployer`.
///
/// The task must be `Pending`. Its parameters are validated before any
/// platform call. Teardown failures are reported as warnings and never
/// mask the run's own outcome.
///
/// # Errors
///
/// Returns [`PromptError::Configuration`] for incomplete task parameters,
/// otherwise whatever the deployment, start, or monitoring step failed with.
pub async fn run_remote(
    api: &impl PlatformApi,
    deployer: &impl SatelliteDeployer,
    relay: &impl LogRelay,
    sink: &dyn LineSink,
    reporter: &impl ProgressReporter,
    task: &mut RemoteWorkerTask,
    timings: MonitorTimings,
) -> Result<()> {
    task.config
        .validate()
        .map_err(|e| PromptError::configuration(e.to_string()))?;

    let mut satellite_guid = None;
    let outcome = drive(api, deployer, relay, sink, reporter, task, timings, &mut satellite_guid).await;

    reporter.step(&format!(
        "tearing down {} satellite {}",
        deployer.lifecycle().as_str(),
        task.satellite_name
    ));
    match deployer.teardown(task, satellite_guid.as_deref()).await {
        Ok(()) => reporter.success(&format!("satellite {} torn down", task.satellite_name)),
        Err(e) => reporter.warn(&format!(
            "failed to tear down satellite {}: {e:#}",
            task.satellite_name
        )),
    }
    if task.state() != TaskState::Pending {
        task.advance(TaskState::TornDown)?;
    }
    outcome
}

#[allow(clippy::too_many_arguments)]
async fn drive(
    api: &impl PlatformApi,
    deployer: &impl SatelliteDeployer,
    relay: &impl LogRelay,
    sink: &dyn LineSink,
    reporter: &impl ProgressReporter,
    task: &mut RemoteWorkerTask,
    timings: MonitorTimings,
    satellite_guid: &mut Option<String>,
) -> Result<()> {
    task.advance(TaskState::Deploying)?;
    reporter.step(&format!("deploying satellite {}", task.satellite_name));
    let guid = match deployer.prepare(task).await {
        Ok(guid) => guid,
        Err(e) => {
            task.advance(TaskState::Failed)?;
            return Err(e.context(format!("deploying satellite {}", task.satellite_name)));
        }
    };
    *satellite_guid = Some(guid.clone());

    if let Err(e) = ensure_current_droplet(api, reporter, &guid, BUILD_POLL_INTERVAL).await {
        task.advance(TaskState::Failed)?;
        return Err(e.context(format!("staging satellite {}", task.satellite_name)));
    }
    if let Err(e) = api.start_app(&guid).await {
        task.advance(TaskState::Failed)?;
        return Err(e).context(format!("starting satellite {}", task.satellite_name));
    }
    task.advance(TaskState::Running)?;
    reporter.success(&format!("satellite {} started", task.satellite_name));

    let result = await_completion(api, relay, sink, reporter, &task.satellite_name, &guid, timings).await;
    let next = match &result {
        Ok(()) => TaskState::Stopped,
        Err(e) if matches!(PromptError::find(e), Some(PromptError::Timeout { .. })) => {
            TaskState::TimedOut
        }
        Err(_) => TaskState::Failed,
    };
    task.advance(next)?;
    if result.is_ok() {
        reporter.success(&format!("satellite {} finished", task.satellite_name));
    }
    result
}
