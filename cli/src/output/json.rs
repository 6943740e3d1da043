//! JSON output helpers for `--json` code paths.

use anyhow::{Context, Result};

use crate::domain::{Package, PromptError};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable error code for an error chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    match PromptError::find(err) {
        Some(PromptError::Configuration(_)) => "CONFIGURATION",
        Some(PromptError::Auth { .. }) => "AUTH",
        Some(PromptError::NotFound { .. }) => "NOT_FOUND",
        Some(PromptError::Transport { .. }) => "TRANSPORT",
        Some(PromptError::StagingFailed { .. }) => "STAGING_FAILED",
        Some(PromptError::Timeout { .. }) => "TIMEOUT",
        Some(PromptError::RemoteTaskFailed(_)) => "REMOTE_TASK_FAILED",
        None => "INTERNAL",
    }
}

/// Format a package listing. The full prompt is kept, not the preview.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_packages(packages: &[Package], current: Option<&str>) -> Result<String> {
    let items: Vec<serde_json::Value> = packages
        .iter()
        .map(|p| {
            serde_json::json!({
                "hash": p.short_id(),
                "guid": p.guid,
                "state": p.state.as_str(),
                "created_at": p.created_at.to_rfc3339(),
                "type": p.kind.as_str(),
                "original_prompt": p.original_prompt,
                "current": current == Some(p.guid.as_str()),
            })
        })
        .collect();
    serde_json::to_string_pretty(&items).context("JSON serialization failed")
}
