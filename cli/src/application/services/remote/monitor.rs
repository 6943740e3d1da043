//! Satellite completion detection.
//!
//! Three futures race in one `select!`: the log relay, a lifecycle poll, and
//! a deadline. Only the poll or the deadline decide; the relay ending early
//! just stops contributing lines. Losing futures are dropped, which
//! terminates the relay's subprocess.

use std::cell::RefCell;
use std::time::Duration;

use anyhow::Result;
use cf_prompt_common::AppState;

use crate::application::ports::{LineSink, LogRelay, PlatformApi, ProgressReporter};
use crate::domain::PromptError;
use crate::domain::satellite::sentinel_outcome;

/// Poll interval and deadline for one monitoring run.
#[derive(Debug, Clone, Copy)]
pub struct MonitorTimings {
    pub poll_interval: Duration,
    pub deadline: Duration,
}

impl Default for MonitorTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            deadline: Duration::from_secs(30 * 60),
        }
    }
}

/// Forwards lines and remembers the first failure sentinel.
struct SentinelSink<'a> {
    inner: &'a dyn LineSink,
    failure: RefCell<Option<String>>,
}

impl LineSink for SentinelSink<'_> {
    fn line(&self, line: &str) {
        if sentinel_outcome(line) == Some(false) {
            self.failure
                .borrow_mut()
                .get_or_insert_with(|| line.trim().to_string());
        }
        self.inner.line(line);
    }
}

/// Wait for the satellite `name`/`guid` to stop on its own.
///
/// # Errors
///
/// Returns [`PromptError::Timeout`] when the deadline passes first, and
/// [`PromptError::RemoteTaskFailed`] when the satellite stopped after
/// reporting a failure.
pub async fn await_completion(
    api: &impl PlatformApi,
    relay: &impl LogRelay,
    sink: &dyn LineSink,
    reporter: &impl ProgressReporter,
    name: &str,
    guid: &str,
    timings: MonitorTimings,
) -> Result<()> {
    let watch = SentinelSink {
        inner: sink,
        failure: RefCell::new(None),
    };

    let logs = async {
        if let Err(e) = relay.relay(name, &watch).await {
            reporter.warn(&format!("log stream for {name} ended: {e:#}"));
        }
        std::future::pending::<bool>().await
    };

    let stopped = async {
        let mut ticker = tokio::time::interval(timings.poll_interval);
        loop {
            ticker.tick().await;
            match api.get_app(guid).await {
                Ok(app) if app.state == AppState::Stopped => return true,
                Ok(_) => {}
                Err(e) => reporter.warn(&format!("failed to poll {name} state: {e:#}")),
            }
        }
    };

    let finished = tokio::select! {
        done = stopped => done,
        done = logs => done,
        () = tokio::time::sleep(timings.deadline) => false,
    };

    if !finished {
        return Err(PromptError::Timeout {
            what: format!("satellite {name} to finish"),
            after: timings.deadline,
        }
        .into());
    }
    if let Some(line) = watch.failure.into_inner() {
        return Err(PromptError::RemoteTaskFailed(line).into());
    }
    Ok(())
}
