//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: the platform HTTP client,
//! the registry client, archive codecs, process execution, `cf` CLI calls,
//! satellite deployers and CF CLI config loading.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod archive;
pub mod cf_api;
pub mod cf_cli;
pub mod command_runner;
pub mod config;
pub mod opencode;
pub mod registry;
pub mod satellite;
