//! `CodeModifier` backed by the `opencode` CLI.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::application::ports::{CodeModifier, CommandRunner};
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};

/// Environment variable overriding the `opencode` executable.
pub const OPENCODE_BIN_ENV: &str = "OPENCODE_BIN";

/// Runs `opencode run <prompt>` inside the workspace root.
pub struct OpencodeModifier<R: CommandRunner> {
    runner: R,
    binary: String,
}

impl<R: CommandRunner> OpencodeModifier<R> {
    pub fn new(runner: R, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    /// Binary from `OPENCODE_BIN`, else `opencode` on `PATH`.
    pub fn from_env(runner: R) -> Self {
        let binary = std::env::var(OPENCODE_BIN_ENV)
            .ok()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| "opencode".to_string());
        Self::new(runner, binary)
    }
}

impl OpencodeModifier<TokioCommandRunner> {
    /// Production modifier resolved from the environment.
    #[must_use]
    pub fn default_runner() -> Self {
        Self::from_env(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT))
    }
}

impl<R: CommandRunner> CodeModifier for OpencodeModifier<R> {
    async fn modify(&self, workdir: &Path, prompt: &str) -> Result<()> {
        let status = self
            .runner
            .run_status_in(workdir, &self.binary, &["run", prompt])
            .await
            .with_context(|| format!("is {} installed?", self.binary))?;
        if !status.success() {
            bail!("{} exited with {status}", self.binary);
        }
        Ok(())
    }
}
