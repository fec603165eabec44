use std::fmt;

use serde::Serialize;

/// Lifecycle of a processing run.
///
/// `Idle -> Loading -> Running <-> Paused -> {Completed | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RunState {
    /// No source attached yet
    #[default]
    Idle,
    /// Source attached, history being reset
    Loading,
    /// Frames are being consumed
    Running,
    /// Frame consumption suspended until resumed or cancelled
    Paused,
    /// Source exhausted
    Completed,
    /// Stopped by the user or by a fault
    Cancelled,
}

impl RunState {
    /// Completed and Cancelled end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// A run owns the session between Loading and a terminal state.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Loading | Self::Running | Self::Paused)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
