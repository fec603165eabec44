//! Counter configuration, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::counter::{DEFAULT_IOU_THRESHOLD, Deduplicator};
use crate::error::CounterError;

/// Tunable policy for a processing session.
///
/// ```toml
/// iou_threshold = 0.5
/// min_confidence = 0.25
/// progress_interval = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CounterConfig {
    /// IoU strictly above which a detection duplicates an accepted box.
    pub iou_threshold: f32,
    /// Detections below this confidence are dropped before deduplication.
    /// Unset keeps every detection whatever its score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f32>,
    /// Report progress every N frames. The last frame is always reported.
    pub progress_interval: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            min_confidence: None,
            progress_interval: 1,
        }
    }
}

impl CounterConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, CounterError> {
        let cfg: Self = toml::from_str(text)
            .map_err(|e| CounterError::InvalidConfiguration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CounterError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CounterError::InvalidConfiguration(format!("{}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    pub fn with_progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames;
        self
    }

    pub fn validate(&self) -> Result<(), CounterError> {
        self.deduplicator()?;
        if let Some(min) = self.min_confidence.filter(|min| !min.is_finite()) {
            return Err(CounterError::InvalidConfiguration(format!(
                "min_confidence must be finite, got {min}"
            )));
        }
        if self.progress_interval == 0 {
            return Err(CounterError::InvalidConfiguration(
                "progress_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a detection with this score passes the confidence filter.
    pub fn admits(&self, confidence: f32) -> bool {
        self.min_confidence.is_none_or(|min| confidence >= min)
    }

    pub(crate) fn deduplicator(&self) -> Result<Deduplicator, CounterError> {
        Deduplicator::new(self.iou_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CounterConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, CounterConfig::default());
        assert_eq!(cfg.iou_threshold, 0.5);
        assert_eq!(cfg.progress_interval, 1);
    }

    #[test]
    fn test_partial_file() {
        let cfg = CounterConfig::from_toml_str("iou_threshold = 0.3\n").unwrap();
        assert_eq!(cfg.iou_threshold, 0.3);
        assert_eq!(cfg.min_confidence, None);
    }

    #[test]
    fn test_unset_min_confidence_admits_any_score() {
        let cfg = CounterConfig::default();
        assert!(cfg.admits(-0.3));
        assert!(cfg.admits(-1e6));
        assert!(cfg.admits(0.0));

        let cfg = CounterConfig::from_toml_str("min_confidence = -2.5\n").unwrap();
        assert!(cfg.admits(-1.0));
        assert!(!cfg.admits(-3.0));
    }

    #[test]
    fn test_rejects_bad_values() {
        for text in [
            "iou_threshold = -0.5",
            "iou_threshold = 1.01",
            "min_confidence = nan",
            "min_confidence = inf",
            "progress_interval = 0",
            "unknown_key = 1",
            "iou_threshold = \"high\"",
        ] {
            let err = CounterConfig::from_toml_str(text).unwrap_err();
            assert!(
                matches!(err, CounterError::InvalidConfiguration(_)),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn test_builder_values_are_validated() {
        let cfg = CounterConfig::default().with_iou_threshold(f32::NAN);
        assert!(cfg.validate().is_err());

        let cfg = CounterConfig::default()
            .with_iou_threshold(0.7)
            .with_min_confidence(0.25)
            .with_progress_interval(10);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.toml");
        std::fs::write(&path, "iou_threshold = 0.6\nprogress_interval = 5\n").unwrap();

        let cfg = CounterConfig::load(&path).unwrap();
        assert_eq!(cfg.iou_threshold, 0.6);
        assert_eq!(cfg.progress_interval, 5);

        assert!(CounterConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
