//! Typed domain error enum.
//!
//! Errors travel as `anyhow::Error`; callers classify them with
//! [`PromptError::find`].

use std::time::Duration;

use thiserror::Error;

/// Failure taxonomy shared by every pipeline stage.
#[derive(Debug, Error)]
pub enum PromptError {
    /// A required parameter is absent. Raised before any network activity.
    #[error("{0}")]
    Configuration(String),

    #[error("{service} rejected the credentials: {message}")]
    Auth { service: String, message: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{message}{}", status_suffix(*.status, .body.as_deref()))]
    Transport {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    #[error("staging failed for build {build}: {reason}")]
    StagingFailed { build: String, reason: String },

    #[error("timed out after {}s waiting for {what}", .after.as_secs())]
    Timeout { what: String, after: Duration },

    #[error("remote task failed: {0}")]
    RemoteTaskFailed(String),
}

fn status_suffix(status: Option<u16>, body: Option<&str>) -> String {
    match (status, body.map(str::trim).filter(|b| !b.is_empty())) {
        (Some(s), Some(b)) => format!(": status {s}, body: {b}"),
        (Some(s), None) => format!(": status {s}"),
        (None, _) => String::new(),
    }
}

impl PromptError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Transport failure without an HTTP response (connect, TLS, I/O).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Non-success HTTP status, carrying the response body for diagnosis.
    pub fn status(message: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: Some(status),
            body: Some(body.into()),
        }
    }

    /// Locate a `PromptError` anywhere in an error chain.
    #[must_use]
    pub fn find(err: &anyhow::Error) -> Option<&PromptError> {
        err.chain().find_map(|e| e.downcast_ref::<PromptError>())
    }
}
