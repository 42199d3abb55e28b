// THEORY:
// This file is the main entry point for the `motion_sentry` library crate.
// It counts moving objects in a live grayscale video stream: a rolling window of
// recent frames gives every pixel a background level, pixels that deviate from
// it by at least σ are marked as moving, and the resulting mask is cleaned up by
// a morphological opening before its outer contours are counted.
//
// The public surface is deliberately small:
// - `PipelineDriver` + `Session`: run a whole session from a frame source.
// - `SessionConfig`: the knobs, fixed for a session.
// - `collaborators`: the traits a front-end implements to plug in a camera, a
//   preview, or another image library, plus the pure-Rust implementations.
// The per-pixel statistics live in `core_modules` and are public for callers that
// want to drive individual stages.

pub mod collaborators;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod session;

pub use config::{SessionConfig, Strategy};
pub use core_modules::blob_filter::{BlobFilter, BlobReport};
pub use core_modules::frame::{Frame, MotionMask};
pub use error::{MotionError, MotionResult};
pub use pipeline::{FrameAnalysis, FrameOutcome, PipelineDriver, PipelineState, RunSummary, StopReason};
pub use session::Session;
