//! Integration tests for the cf-prompt CLI
//!
//! These tests spawn the actual binaries and test end-to-end behavior.
//! None of them reach a real platform.

mod cli_tests;
mod prompter_worker;
