//! Error types.

use thiserror::Error;

use crate::counter::RunState;

/// Failures of configuration, of a run, or of the session control surface.
///
/// Reaching the end of the frame source is not an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CounterError {
    /// Rejected before any run starts.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The frame source failed to open or failed mid-stream.
    #[error("frame source fault: {0}")]
    SourceFault(String),

    /// The detector failed or returned malformed output.
    #[error("detector fault: {0}")]
    DetectorFault(String),

    #[error("a run is already in progress (state: {0})")]
    SessionBusy(RunState),

    #[error("failed to spawn the processing worker: {0}")]
    WorkerSpawn(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no counts to export")]
    Empty,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
