//! Event sink for a processing session.

use std::time::Duration;

use crate::counter::{ClassCounts, Detection, Outcome, RunState};
use crate::error::CounterError;
use crate::integration::session::Progress;

/// Receives events from the worker of a processing session.
///
/// Every method defaults to a no-op. Calls happen on the worker thread, in
/// order, and never while the session's internal locks are held, so an
/// observer may call back into a [`SessionHandle`](crate::SessionHandle).
pub trait Observer {
    /// A frame finished processing.
    fn on_progress(&mut self, progress: &Progress) {
        let _ = progress;
    }

    /// The run entered `state`. `reason` is set when a fault ended the run;
    /// a user cancel carries no reason.
    fn on_state_change(&mut self, state: RunState, reason: Option<&CounterError>) {
        let _ = (state, reason);
    }

    /// Every detection of a frame with its outcome, for live display.
    fn on_frame(&mut self, frame_index: u64, outcomes: &[(Detection, Outcome)]) {
        let _ = (frame_index, outcomes);
    }

    /// The source was exhausted.
    fn on_completed(&mut self, counts: &ClassCounts, elapsed: Duration) {
        let _ = (counts, elapsed);
    }
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn on_progress(&mut self, progress: &Progress) {
        (**self).on_progress(progress)
    }

    fn on_state_change(&mut self, state: RunState, reason: Option<&CounterError>) {
        (**self).on_state_change(state, reason)
    }

    fn on_frame(&mut self, frame_index: u64, outcomes: &[(Detection, Outcome)]) {
        (**self).on_frame(frame_index, outcomes)
    }

    fn on_completed(&mut self, counts: &ClassCounts, elapsed: Duration) {
        (**self).on_completed(counts, elapsed)
    }
}

impl<O: Observer + ?Sized> Observer for Box<O> {
    fn on_progress(&mut self, progress: &Progress) {
        (**self).on_progress(progress)
    }

    fn on_state_change(&mut self, state: RunState, reason: Option<&CounterError>) {
        (**self).on_state_change(state, reason)
    }

    fn on_frame(&mut self, frame_index: u64, outcomes: &[(Detection, Outcome)]) {
        (**self).on_frame(frame_index, outcomes)
    }

    fn on_completed(&mut self, counts: &ClassCounts, elapsed: Duration) {
        (**self).on_completed(counts, elapsed)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// Renders session events through the `log` facade.
#[derive(Debug, Clone, Default)]
pub struct LogObserver {
    last: Option<Progress>,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Observer for LogObserver {
    fn on_progress(&mut self, progress: &Progress) {
        match (progress.total_frames, progress.percent()) {
            (Some(total), Some(percent)) => log::info!(
                "Processing frame {}/{} ({:.1}%)",
                progress.frame_index,
                total,
                percent
            ),
            _ => log::info!("Processing frame {}", progress.frame_index),
        }
        self.last = Some(progress.clone());
    }

    fn on_state_change(&mut self, state: RunState, reason: Option<&CounterError>) {
        match (state, reason) {
            (RunState::Cancelled, Some(err)) => log::warn!("Processing stopped: {err}"),
            (RunState::Cancelled, None) => log::info!("Processing cancelled"),
            (state, _) => log::info!("Session {state}"),
        }
    }

    fn on_completed(&mut self, counts: &ClassCounts, elapsed: Duration) {
        let frames = self.last.as_ref().map_or(0, |p| p.frame_index);
        match self.last.as_ref().and_then(Progress::video_duration) {
            Some(video) => log::info!(
                "Done: {} frames in {:.2}s (video: {:.2}s)",
                frames,
                elapsed.as_secs_f64(),
                video.as_secs_f64()
            ),
            None => log::info!("Done: {} frames in {:.2}s", frames, elapsed.as_secs_f64()),
        }
        for (label, count) in counts.iter() {
            log::info!("  {label}: {count}");
        }
    }
}
