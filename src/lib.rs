//! Streaming deduplication and per-class counting of object detections.
//!
//! Detections produced frame by frame by an external detector are matched
//! against the boxes already accepted for their class. A detection whose IoU
//! with an earlier box of the same class exceeds the configured threshold is
//! a duplicate; everything else is a new distinct object and bumps the count
//! for its class.
//!
//! The [`counter`] module holds the pure algorithm. The [`integration`]
//! module connects it to frame sources, detectors and observers and drives
//! the pausable, cancellable processing loop.

pub mod config;
pub mod counter;
pub mod error;
pub mod integration;

pub use config::CounterConfig;
pub use counter::{
    BoundingBox, ClassCounts, Deduplicator, Detection, DetectionHistory, Outcome, RunState, Tally,
};
pub use error::{CounterError, ExportError};
pub use integration::{
    DetectionBuilder, Detector, FrameSource, IntoDetections, LogObserver, NullObserver, Observer,
    ProcessingSession, Progress, RunSummary, SessionHandle, Snapshot, export_csv, write_csv,
};
