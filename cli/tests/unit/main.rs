//! Unit tests for the cf-prompt CLI
//!
//! These tests run fast without external I/O.

mod architecture;
