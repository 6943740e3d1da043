//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod error;
pub mod image_ref;
pub mod package;
pub mod satellite;
pub mod target;

pub use error::PromptError;
pub use image_ref::{ImageReference, RefSpec};
pub use package::{Package, PackagePayload, truncate_for_display};
pub use satellite::{RemoteWorkerTask, SatelliteLifecycle, TaskState};
pub use target::Target;
