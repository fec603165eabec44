//! Traits for the frame source and detection backends driving a session.

use std::fmt::Display;

use crate::counter::Detection;

/// Sequential supplier of video frames.
///
/// # Example
///
/// ```ignore
/// use object_counter::FrameSource;
///
/// struct Frames(std::vec::IntoIter<Vec<u8>>);
///
/// impl FrameSource for Frames {
///     type Frame = Vec<u8>;
///     type Error = std::io::Error;
///
///     fn next_frame(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
///         Ok(self.0.next())
///     }
/// }
/// ```
pub trait FrameSource {
    type Frame;

    /// Error type for source failures.
    type Error: Display;

    /// Prepare the source for reading. Called once per run, before the
    /// first frame is requested.
    fn open(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, Self::Error>;

    /// Total number of frames, when the source knows it.
    fn total_frame_count(&self) -> Option<u64> {
        None
    }

    /// Frames per second, when the source knows it.
    fn frame_rate(&self) -> Option<f64> {
        None
    }
}

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the counter. The
/// call may block for as long as inference takes; no timeout is applied.
pub trait Detector<F> {
    /// Error type for detection failures.
    type Error: Display;

    /// Run inference on one frame and return detections in model order.
    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
///
/// Implement this for your model's output format to enable easy conversion.
pub trait IntoDetections {
    /// Convert the output into a vector of detections.
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}
