//! Thin wrapper over the `cf` CLI for the operations the v3 API client does
//! not cover: pushing a bundle directory, deleting by name, and log tailing.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::ports::{CommandRunner, LineSink, LogRelay};

/// Upper bound for `cf push` of a satellite bundle.
pub const PUSH_TIMEOUT: Duration = Duration::from_secs(600);

pub struct CfCli<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> CfCli<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    #[cfg(test)]
    pub(crate) fn runner(&self) -> &R {
        &self.runner
    }

    /// `cf push NAME -f MANIFEST -p DIR --no-start`.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the CLI's stderr on a non-zero exit.
    pub async fn push(&self, name: &str, manifest: &Path, dir: &Path) -> Result<()> {
        let manifest = manifest.to_string_lossy();
        let dir = dir.to_string_lossy();
        let output = self
            .runner
            .run_with_timeout(
                "cf",
                &["push", name, "-f", &manifest, "-p", &dir, "--no-start"],
                PUSH_TIMEOUT,
            )
            .await
            .context("is the cf CLI installed?")?;
        if !output.status.success() {
            bail!(
                "cf push {name} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    /// `cf delete NAME -f`. Deleting an absent app succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the CLI's stderr on a non-zero exit.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let output = self
            .runner
            .run("cf", &["delete", name, "-f"])
            .await
            .context("is the cf CLI installed?")?;
        if !output.status.success() {
            bail!(
                "cf delete {name} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

impl<R: CommandRunner> LogRelay for CfCli<R> {
    async fn relay(&self, app_name: &str, sink: &dyn LineSink) -> Result<()> {
        let mut child = self.runner.spawn("cf", &["logs", app_name])?;
        let stdout = child.stdout.take().context("cf logs has no stdout")?;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await.context("reading cf logs")? {
            sink.line(&line);
        }
        child.wait().await.context("waiting for cf logs")?;
        Ok(())
    }
}
