//! Application context: unified state passed to every command handler.
//!
//! `AppContext` bundles the output context, the resolved platform target and
//! the adapters every platform command needs. Adding a new cross-cutting
//! concern requires only one field change here.

use anyhow::Result;

use crate::domain::Target;
use crate::infra::cf_api::CfApiClient;
use crate::infra::cf_cli::CfCli;
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};
use crate::infra::config::{CfConfigStore, TargetOverrides};
use crate::output::OutputContext;
use crate::output::human::HumanRenderer;
use crate::output::reporter::{StdoutSink, TerminalReporter};

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Explicit target values, overriding the CF CLI config.
    pub target: TargetOverrides,
}

/// Unified application context passed to every platform command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode, JSON mode).
    pub output: OutputContext,
    /// Platform endpoint, credential and space.
    pub target: Target,
    /// v3 API client for `target`.
    pub api: CfApiClient,
    /// `cf` CLI for push, delete and log streaming.
    pub cf: CfCli<TokioCommandRunner>,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::PromptError::Configuration`] when no usable
    /// target can be resolved.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let output = OutputContext::new(flags.output.no_color, flags.output.quiet, flags.output.json);
        let target = CfConfigStore::from_env()?.resolve(&flags.target)?;
        let api = CfApiClient::new(&target)?;
        Ok(Self {
            output,
            target,
            api,
            cf: CfCli::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT)),
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.output.json
    }

    #[must_use]
    pub fn terminal_reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    #[must_use]
    pub fn log_sink(&self) -> StdoutSink<'_> {
        StdoutSink::new(&self.output)
    }

    #[must_use]
    pub fn renderer(&self) -> HumanRenderer<'_> {
        HumanRenderer::new(&self.output)
    }
}
