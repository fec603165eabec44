//! Replay of precomputed detector output.
//!
//! A replay file is JSON lines: one line per frame, each line an array of
//! detections.
//!
//! ```text
//! [{"label":"car","bbox":[0,0,10,10],"confidence":0.9}]
//! []
//! [{"label":"car","bbox":[1,1,11,11]},{"label":"person","bbox":[40,10,48,30],"confidence":0.7}]
//! ```
//!
//! Boxes are TLBR. Blank lines are skipped. A line that fails to parse is a
//! source fault when the run reaches it.

use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::{DetectionBuilder, Detector, FrameSource, IntoDetections};
use crate::counter::Detection;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read replay input: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Detection as stored in a replay file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDetection {
    pub label: String,
    /// [x1, y1, x2, y2]
    pub bbox: [f32; 4],
    #[serde(default = "full_confidence")]
    pub confidence: f32,
}

fn full_confidence() -> f32 {
    1.0
}

impl IntoDetections for Vec<RawDetection> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter()
            .map(|raw| {
                let [x1, y1, x2, y2] = raw.bbox;
                DetectionBuilder::new(raw.label)
                    .tlbr(x1, y1, x2, y2)
                    .confidence(raw.confidence)
                    .build()
            })
            .collect()
    }
}

/// One replayed frame: its detector output, already decoded.
#[derive(Debug, Clone)]
pub struct ReplayFrame {
    /// 1-based line number in the replay input
    pub line: usize,
    pub detections: Vec<RawDetection>,
}

/// Frame source over the lines of a replay file.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    lines: Vec<(usize, String)>,
    cursor: usize,
    frame_rate: Option<f64>,
}

impl ReplaySource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_text(&text))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ReplayError> {
        let mut lines = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push((i + 1, line));
            }
        }
        Ok(Self {
            lines,
            cursor: 0,
            frame_rate: None,
        })
    }

    pub fn from_text(text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| (i + 1, line.to_string()))
            .collect();
        Self {
            lines,
            cursor: 0,
            frame_rate: None,
        }
    }

    /// Frame rate of the video the detections were taken from.
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = Some(fps);
        self
    }
}

impl FrameSource for ReplaySource {
    type Frame = ReplayFrame;
    type Error = ReplayError;

    fn open(&mut self) -> Result<(), ReplayError> {
        self.cursor = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<ReplayFrame>, ReplayError> {
        let Some((line, text)) = self.lines.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        let detections = serde_json::from_str(text).map_err(|source| ReplayError::Parse {
            line: *line,
            source,
        })?;
        Ok(Some(ReplayFrame {
            line: *line,
            detections,
        }))
    }

    fn total_frame_count(&self) -> Option<u64> {
        Some(self.lines.len() as u64)
    }

    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }
}

/// Detector that hands back the detections stored in each replayed frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayDetector;

impl Detector<ReplayFrame> for ReplayDetector {
    type Error = std::convert::Infallible;

    fn detect(&mut self, frame: &ReplayFrame) -> Result<Vec<Detection>, Self::Error> {
        Ok(frame.detections.clone().into_detections())
    }
}
