//! ProcessingSession: run state machine and the frame loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::CounterConfig;
use crate::counter::{ClassCounts, Deduplicator, Detection, Outcome, RunState, Tally};
use crate::error::CounterError;

use super::{Detector, FrameSource, Observer};

/// Position of a run within its source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Progress {
    /// Frames processed so far; the index of the last processed frame, 1-based
    pub frame_index: u64,
    /// Frame count reported by the source, `None` when unknown
    pub total_frames: Option<u64>,
    /// Wall time since the run started, paused time included
    pub elapsed: Duration,
    /// Frames per second reported by the source
    pub frame_rate: Option<f64>,
}

impl Progress {
    /// Share of the source processed, in percent.
    pub fn percent(&self) -> Option<f64> {
        self.total_frames
            .map(|total| self.frame_index as f64 / total as f64 * 100.0)
    }

    /// Playback length of the source.
    pub fn video_duration(&self) -> Option<Duration> {
        let (total, rate) = (self.total_frames?, self.frame_rate?);
        Duration::try_from_secs_f64(total as f64 / rate).ok()
    }
}

/// Consistent view of a session, readable from any thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub state: RunState,
    pub progress: Progress,
    pub counts: ClassCounts,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// `Completed` or `Cancelled`
    pub state: RunState,
    pub frames_processed: u64,
    pub total_frames: Option<u64>,
    pub elapsed: Duration,
    pub video_duration: Option<Duration>,
    /// Counts accumulated up to the end of the run, also when cancelled
    pub counts: ClassCounts,
    /// Fault that cancelled the run; `None` for completion and user cancel
    pub failure: Option<CounterError>,
}

impl RunSummary {
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }
}

#[derive(Debug, Default)]
struct Control {
    state: RunState,
    pause_requested: bool,
    cancel_requested: bool,
}

#[derive(Debug, Default)]
struct Published {
    progress: Progress,
    counts: ClassCounts,
}

#[derive(Debug, Default)]
struct Shared {
    control: Mutex<Control>,
    wake: Condvar,
    published: Mutex<Published>,
}

impl Shared {
    fn begin(&self) -> Result<(), CounterError> {
        let mut control = self.control.lock();
        if control.state.is_active() {
            return Err(CounterError::SessionBusy(control.state));
        }
        *control = Control {
            state: RunState::Loading,
            ..Control::default()
        };
        drop(control);
        *self.published.lock() = Published::default();
        log::debug!("session loading");
        Ok(())
    }

    /// Move to `state` unless a cancel is pending.
    fn enter(&self, state: RunState) -> bool {
        let mut control = self.control.lock();
        if control.cancel_requested {
            return false;
        }
        control.state = state;
        true
    }

    fn settle(&self, state: RunState) {
        let mut control = self.control.lock();
        control.state = state;
        control.pause_requested = false;
    }

    fn cancel_requested(&self) -> bool {
        self.control.lock().cancel_requested
    }

    fn enter_pause(&self) -> bool {
        let mut control = self.control.lock();
        if control.pause_requested && !control.cancel_requested {
            control.state = RunState::Paused;
            true
        } else {
            false
        }
    }

    /// Block until resumed or cancelled. Returns true on cancel.
    fn wait_for_resume(&self) -> bool {
        let mut control = self.control.lock();
        while control.pause_requested && !control.cancel_requested {
            self.wake.wait(&mut control);
        }
        if control.cancel_requested {
            return true;
        }
        control.state = RunState::Running;
        false
    }

    fn publish(&self, progress: &Progress, counts: Option<&ClassCounts>) {
        let mut published = self.published.lock();
        published.progress.clone_from(progress);
        if let Some(counts) = counts {
            published.counts.clone_from(counts);
        }
    }
}

/// Cloneable control surface of a [`ProcessingSession`].
///
/// All methods are safe to call from any thread at any time. Requests that
/// do not apply to the current state are ignored.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn state(&self) -> RunState {
        self.shared.control.lock().state
    }

    /// Suspend frame consumption after the frame in flight. Only applies
    /// while `Running`.
    pub fn pause(&self) {
        let mut control = self.shared.control.lock();
        if control.state == RunState::Running && !control.pause_requested {
            control.pause_requested = true;
            log::debug!("pause requested");
        } else {
            log::debug!("pause ignored while {}", control.state);
        }
    }

    /// Continue a paused run, or withdraw a pause that has not taken effect.
    pub fn resume(&self) {
        let mut control = self.shared.control.lock();
        if control.pause_requested {
            control.pause_requested = false;
            drop(control);
            self.shared.wake.notify_all();
            log::debug!("resume requested");
        } else {
            log::debug!("resume ignored while {}", control.state);
        }
    }

    /// Stop the run before the next frame is pulled. Counts are kept.
    pub fn cancel(&self) {
        let mut control = self.shared.control.lock();
        if control.state.is_active() && !control.cancel_requested {
            control.cancel_requested = true;
            drop(control);
            self.shared.wake.notify_all();
            log::debug!("cancel requested");
        } else {
            log::debug!("cancel ignored while {}", control.state);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state();
        let published = self.shared.published.lock();
        Snapshot {
            state,
            progress: published.progress.clone(),
            counts: published.counts.clone(),
        }
    }
}

enum Exit {
    Exhausted,
    Cancelled,
    Fault(CounterError),
}

struct Worker<'a, S, D, O> {
    shared: &'a Shared,
    config: &'a CounterConfig,
    tally: Tally,
    progress: Progress,
    reported: u64,
    started: Instant,
    source: S,
    detector: D,
    observer: O,
}

impl<'a, S, D, O> Worker<'a, S, D, O>
where
    S: FrameSource,
    D: Detector<S::Frame>,
    O: Observer,
{
    fn new(
        shared: &'a Shared,
        config: &'a CounterConfig,
        dedup: Deduplicator,
        source: S,
        detector: D,
        observer: O,
    ) -> Self {
        Self {
            shared,
            config,
            tally: Tally::new(dedup),
            progress: Progress::default(),
            reported: 0,
            started: Instant::now(),
            source,
            detector,
            observer,
        }
    }

    fn run(mut self) -> RunSummary {
        let _unwind = UnwindGuard(self.shared);
        self.observer.on_state_change(RunState::Loading, None);
        let exit = self.process();
        self.finish(exit)
    }

    fn process(&mut self) -> Exit {
        match panic::catch_unwind(AssertUnwindSafe(|| self.source.open())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Exit::Fault(CounterError::SourceFault(e.to_string())),
            Err(payload) => return Exit::Fault(CounterError::SourceFault(panic_message(payload))),
        }
        self.progress.total_frames = self.source.total_frame_count().filter(|&n| n > 0);
        self.progress.frame_rate = self
            .source
            .frame_rate()
            .filter(|rate| rate.is_finite() && *rate > 0.0);
        self.shared.publish(&self.progress, None);

        if self.shared.enter(RunState::Running) {
            log::debug!(
                "session running, {} frames at {} fps",
                self.progress
                    .total_frames
                    .map_or("unknown".to_string(), |n| n.to_string()),
                self.progress
                    .frame_rate
                    .map_or("unknown".to_string(), |r| r.to_string()),
            );
            self.observer.on_state_change(RunState::Running, None);
        }

        loop {
            if self.shared.cancel_requested() || self.hold_while_paused() {
                return Exit::Cancelled;
            }

            let frame = match panic::catch_unwind(AssertUnwindSafe(|| self.source.next_frame())) {
                Ok(Ok(Some(frame))) => frame,
                Ok(Ok(None)) => return Exit::Exhausted,
                Ok(Err(e)) => return Exit::Fault(CounterError::SourceFault(e.to_string())),
                Err(payload) => {
                    return Exit::Fault(CounterError::SourceFault(panic_message(payload)));
                }
            };
            let detections = match panic::catch_unwind(AssertUnwindSafe(|| {
                self.detector.detect(&frame)
            })) {
                Ok(Ok(detections)) => detections,
                Ok(Err(e)) => return Exit::Fault(CounterError::DetectorFault(e.to_string())),
                Err(payload) => {
                    return Exit::Fault(CounterError::DetectorFault(panic_message(payload)));
                }
            };
            if let Some(bad) = detections.iter().find(|d| !d.is_well_formed()) {
                return Exit::Fault(CounterError::DetectorFault(format!(
                    "malformed detection for class {:?} in frame {}: box {:?}, confidence {}",
                    bad.label,
                    self.progress.frame_index + 1,
                    bad.bbox.to_tlbr(),
                    bad.confidence
                )));
            }

            self.consume(detections);
        }
    }

    fn consume(&mut self, detections: Vec<Detection>) {
        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|d| self.config.admits(d.confidence))
            .collect();
        let outcomes = self.tally.update(&detections);
        let accepted = outcomes.contains(&Outcome::Accepted);

        self.progress.frame_index += 1;
        self.progress.elapsed = self.started.elapsed();
        self.shared.publish(&self.progress, accepted.then(|| self.tally.counts()));

        let frame_index = self.progress.frame_index;
        let outcomes: Vec<(Detection, Outcome)> = detections.into_iter().zip(outcomes).collect();
        self.observer.on_frame(frame_index, &outcomes);

        if frame_index % self.config.progress_interval == 0
            || Some(frame_index) == self.progress.total_frames
        {
            self.report();
        }
    }

    fn report(&mut self) {
        self.reported = self.progress.frame_index;
        self.observer.on_progress(&self.progress);
    }

    /// Returns true when the run was cancelled while paused.
    fn hold_while_paused(&mut self) -> bool {
        if !self.shared.enter_pause() {
            return false;
        }
        log::debug!("session paused at frame {}", self.progress.frame_index);
        self.observer.on_state_change(RunState::Paused, None);

        if self.shared.wait_for_resume() {
            return true;
        }
        log::debug!("session resumed at frame {}", self.progress.frame_index);
        self.observer.on_state_change(RunState::Running, None);
        false
    }

    fn finish(mut self, exit: Exit) -> RunSummary {
        let (state, failure) = match exit {
            Exit::Exhausted => (RunState::Completed, None),
            Exit::Cancelled => (RunState::Cancelled, None),
            Exit::Fault(err) => (RunState::Cancelled, Some(err)),
        };
        self.progress.elapsed = self.started.elapsed();
        if state == RunState::Completed && self.reported != self.progress.frame_index {
            self.report();
        }
        self.shared.publish(&self.progress, Some(self.tally.counts()));
        self.shared.settle(state);

        let elapsed = self.progress.elapsed;
        match &failure {
            Some(err) => log::warn!(
                "run stopped after {} frames: {err}",
                self.progress.frame_index
            ),
            None => log::info!(
                "run {state} after {} frames in {:.2}s, {} objects counted",
                self.progress.frame_index,
                elapsed.as_secs_f64(),
                self.tally.counts().total()
            ),
        }

        self.observer.on_state_change(state, failure.as_ref());
        if state == RunState::Completed {
            self.observer.on_completed(self.tally.counts(), elapsed);
        }

        RunSummary {
            state,
            frames_processed: self.progress.frame_index,
            total_frames: self.progress.total_frames,
            elapsed,
            video_duration: self.progress.video_duration(),
            counts: self.tally.counts().clone(),
            failure,
        }
    }
}

/// Settles a run as `Cancelled` when its worker unwinds past `finish`, so a
/// panicking observer cannot leave the session stuck in an active state.
struct UnwindGuard<'a>(&'a Shared);

impl Drop for UnwindGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("processing worker panicked, run cancelled");
            self.0.settle(RunState::Cancelled);
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("panicked: {message}")
}

/// Owns the lifecycle of counting runs over video sources.
///
/// A run is started with [`start`](Self::start) on a dedicated worker thread
/// or with [`run`](Self::run) on the calling thread. Each run starts from an
/// empty history. Pause, resume and cancel are cooperative: they take effect
/// between frames, never during a detector call.
///
/// Sessions share nothing with each other.
#[derive(Debug)]
pub struct ProcessingSession {
    config: CounterConfig,
    dedup: Deduplicator,
    handle: SessionHandle,
    worker: Option<JoinHandle<RunSummary>>,
}

impl ProcessingSession {
    /// Validates `config`; an invalid one never reaches a run.
    pub fn new(config: CounterConfig) -> Result<Self, CounterError> {
        config.validate()?;
        let dedup = config.deduplicator()?;
        Ok(Self {
            config,
            dedup,
            handle: SessionHandle::default(),
            worker: None,
        })
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    /// Control surface usable from other threads.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> RunState {
        self.handle.state()
    }

    pub fn pause(&self) {
        self.handle.pause()
    }

    pub fn resume(&self) {
        self.handle.resume()
    }

    pub fn cancel(&self) {
        self.handle.cancel()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.handle.snapshot()
    }

    /// Start a run on a new worker thread.
    ///
    /// Fails with [`CounterError::SessionBusy`] while another run is active.
    pub fn start<S, D, O>(
        &mut self,
        source: S,
        detector: D,
        observer: O,
    ) -> Result<(), CounterError>
    where
        S: FrameSource + Send + 'static,
        D: Detector<S::Frame> + Send + 'static,
        O: Observer + Send + 'static,
    {
        self.handle.shared.begin()?;
        self.reap();

        let shared = Arc::clone(&self.handle.shared);
        let config = self.config.clone();
        let dedup = self.dedup;
        let spawned = thread::Builder::new()
            .name("object-counter".to_string())
            .spawn(move || {
                Worker::new(&shared, &config, dedup, source, detector, observer).run()
            });

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                self.handle.shared.settle(RunState::Idle);
                Err(CounterError::WorkerSpawn(e.to_string()))
            }
        }
    }

    /// Execute a whole run on the calling thread.
    pub fn run<S, D, O>(
        &mut self,
        source: S,
        detector: D,
        observer: O,
    ) -> Result<RunSummary, CounterError>
    where
        S: FrameSource,
        D: Detector<S::Frame>,
        O: Observer,
    {
        self.handle.shared.begin()?;
        self.reap();
        let worker = Worker::new(
            &self.handle.shared,
            &self.config,
            self.dedup,
            source,
            detector,
            observer,
        );
        Ok(worker.run())
    }

    /// Block until the run started with [`start`](Self::start) ends.
    ///
    /// Returns `None` when no worker was started or it panicked.
    pub fn wait(&mut self) -> Option<RunSummary> {
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(summary) => Some(summary),
            Err(_) => {
                log::error!("processing worker panicked");
                self.handle.shared.settle(RunState::Cancelled);
                None
            }
        }
    }

    fn reap(&mut self) {
        if let Some(previous) = self.worker.take() {
            if previous.join().is_err() {
                log::error!("previous processing worker panicked");
            }
        }
    }
}

impl Drop for ProcessingSession {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.handle.cancel();
            self.reap();
        }
    }
}
