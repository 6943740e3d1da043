//! cf-prompt library: shared by the `cf-prompt` CLI and the `cf-prompter`
//! satellite worker, and exposed for integration testing.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod app;
pub mod application;
pub mod cli;
pub mod commands;
pub mod domain;
pub mod infra;
pub mod output;
