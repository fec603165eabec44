//! Integration module for driving the counter from a frame source and a detector.
//!
//! This module provides the collaborator traits (frame source, detector,
//! observer), the pausable processing session that ties them together, CSV
//! export of the final counts, and a replay source for precomputed detector
//! output.

mod builder;
mod detector;
mod export;
mod observer;
pub mod replay;
mod session;

pub use builder::DetectionBuilder;
pub use detector::{Detector, FrameSource, IntoDetections};
pub use export::{export_csv, write_csv};
pub use observer::{LogObserver, NullObserver, Observer};
pub use session::{ProcessingSession, Progress, RunSummary, SessionHandle, Snapshot};
