//! Portfolio snapshot module - per-minute account value capture.

mod capture_service;
mod snapshot_model;
mod snapshot_traits;

pub use capture_service::{SnapshotCaptureService, DEFAULT_CAPTURE_THROTTLE};
pub use snapshot_model::*;
pub use snapshot_traits::*;
