//! Process execution for the `cf` and `opencode` CLIs.

use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::application::ports::CommandRunner;

/// Default timeout for short `cf` CLI commands.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(60);

/// Tokio-backed [`CommandRunner`].
///
/// Timeouts kill the child explicitly: dropping a `.output()` future is not
/// enough on every platform.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn command(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);
    cmd
}

async fn drain<S: AsyncRead + Unpin>(stream: Option<S>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut s) = stream {
        let _ = s.read_to_end(&mut buf).await;
    }
    buf
}

async fn wait_with_output(child: &mut Child, program: &str) -> Result<Output> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (status, stdout, stderr) = tokio::join!(child.wait(), drain(stdout), drain(stderr));
    Ok(Output {
        status: status.with_context(|| format!("waiting for {program}"))?,
        stdout,
        stderr,
    })
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let mut child = command(program, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        tokio::select! {
            result = wait_with_output(&mut child, program) => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }

    fn spawn(&self, program: &str, args: &[&str]) -> Result<Child> {
        command(program, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))
    }

    async fn run_status_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExitStatus> {
        let mut child = command(program, args)
            .current_dir(dir)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        child
            .wait()
            .await
            .with_context(|| format!("waiting for {program}"))
    }
}
