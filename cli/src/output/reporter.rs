//! Presentation-layer implementations of the reporting ports.
//!
//! `TerminalReporter` and `StdoutSink` wrap `&OutputContext` so application
//! services can emit progress events and relayed log lines without depending
//! on any presentation type directly. `TracingReporter` serves the satellite
//! worker, whose output ends up in the platform's log stream.

use owo_colors::OwoColorize as _;

use crate::application::ports::{LineSink, ProgressReporter};
use crate::output::OutputContext;

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// - `step()` prints `"  → {message}"` (suppressed when `ctx.quiet`)
/// - `success()` prints `"  ✓ {message}"` (suppressed when `ctx.quiet`)
/// - `warn()` prints `"  ! {message}"` to stderr (never suppressed)
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if !self.ctx.quiet {
            println!("  {} {message}", "→".style(self.ctx.styles.step));
        }
    }

    fn success(&self, message: &str) {
        if !self.ctx.quiet {
            println!("  {} {message}", "✓".style(self.ctx.styles.success));
        }
    }

    fn warn(&self, message: &str) {
        eprintln!("  {} {message}", "!".style(self.ctx.styles.warning));
    }
}

/// Prints relayed log lines, indented and dimmed.
///
/// Each line goes out in a single `println!`, so concurrent writers never
/// interleave partial lines.
pub struct StdoutSink<'a> {
    ctx: &'a OutputContext,
}

impl<'a> StdoutSink<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl LineSink for StdoutSink<'_> {
    fn line(&self, line: &str) {
        if !self.ctx.quiet {
            println!("    {}", line.style(self.ctx.styles.dim));
        }
    }
}

/// Reporter for the satellite worker: events become `tracing` records.
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn step(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn success(&self, message: &str) {
        tracing::info!(outcome = "ok", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}
