//! Decides whether a detection is a new distinct object.

use serde::Serialize;

use crate::counter::detection::Detection;
use crate::counter::history::DetectionHistory;
use crate::error::CounterError;

/// IoU above which a detection is folded into an earlier one of its class.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

/// Result of considering one detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// New object; recorded in the history and to be counted
    Accepted,
    /// Overlaps an accepted box of the same class; nothing changed
    Duplicate,
}

/// Greedy single-pass identity check: same class plus IoU strictly above the
/// threshold means the same physical object.
///
/// There is no motion model. An object that moves far enough between frames
/// is counted twice, and a new object landing on the footprint of an old one
/// of the same class is not counted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deduplicator {
    iou_threshold: f32,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

impl Deduplicator {
    /// Rejects thresholds that are NaN or outside [0, 1].
    pub fn new(iou_threshold: f32) -> Result<Self, CounterError> {
        if !(0.0..=1.0).contains(&iou_threshold) {
            return Err(CounterError::InvalidConfiguration(format!(
                "iou_threshold must be within [0, 1], got {iou_threshold}"
            )));
        }
        Ok(Self { iou_threshold })
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    /// Record `detection` in `history` unless it duplicates an accepted box.
    ///
    /// The caller increments the class count on [`Outcome::Accepted`].
    pub fn consider(&self, detection: &Detection, history: &mut DetectionHistory) -> Outcome {
        if history.matches(&detection.label, &detection.bbox, self.iou_threshold) {
            log::trace!(
                "duplicate {} at {:?}",
                detection.label,
                detection.bbox.to_tlbr()
            );
            return Outcome::Duplicate;
        }
        history.record(&detection.label, detection.bbox);
        log::debug!(
            "accepted {} at {:?}",
            detection.label,
            detection.bbox.to_tlbr()
        );
        Outcome::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range_threshold() {
        assert!(Deduplicator::new(-0.1).is_err());
        assert!(Deduplicator::new(1.5).is_err());
        assert!(Deduplicator::new(f32::NAN).is_err());
        assert!(Deduplicator::new(0.0).is_ok());
        assert!(Deduplicator::new(1.0).is_ok());
    }

    #[test]
    fn test_same_detection_twice() {
        let dedup = Deduplicator::default();
        let mut history = DetectionHistory::new();
        let det = Detection::new("car", 0.0, 0.0, 10.0, 10.0, 0.9);

        assert_eq!(dedup.consider(&det, &mut history), Outcome::Accepted);
        assert_eq!(dedup.consider(&det, &mut history), Outcome::Duplicate);
        assert_eq!(history.len("car"), 1);
    }

    #[test]
    fn test_equal_to_threshold_is_accepted() {
        let dedup = Deduplicator::default();
        let mut history = DetectionHistory::new();

        let first = Detection::new("car", 0.0, 0.0, 10.0, 10.0, 0.9);
        let half = Detection::new("car", 0.0, 0.0, 10.0, 5.0, 0.9);
        assert_eq!(first.bbox.iou(&half.bbox), 0.5);

        assert_eq!(dedup.consider(&first, &mut history), Outcome::Accepted);
        assert_eq!(dedup.consider(&half, &mut history), Outcome::Accepted);
    }

    #[test]
    fn test_other_class_is_accepted() {
        let dedup = Deduplicator::default();
        let mut history = DetectionHistory::new();

        let car = Detection::new("car", 0.0, 0.0, 10.0, 10.0, 0.9);
        let truck = Detection::new("truck", 0.0, 0.0, 10.0, 10.0, 0.9);

        assert_eq!(dedup.consider(&car, &mut history), Outcome::Accepted);
        assert_eq!(dedup.consider(&truck, &mut history), Outcome::Accepted);
    }

    #[test]
    fn test_zero_area_boxes_are_never_merged() {
        let dedup = Deduplicator::default();
        let mut history = DetectionHistory::new();
        let point = Detection::new("car", 3.0, 3.0, 3.0, 3.0, 0.9);

        assert_eq!(dedup.consider(&point, &mut history), Outcome::Accepted);
        assert_eq!(dedup.consider(&point, &mut history), Outcome::Accepted);
        assert_eq!(history.len("car"), 2);
    }

    #[test]
    fn test_zero_threshold_merges_any_overlap() {
        let dedup = Deduplicator::new(0.0).unwrap();
        let mut history = DetectionHistory::new();

        let a = Detection::new("car", 0.0, 0.0, 10.0, 10.0, 0.9);
        let b = Detection::new("car", 9.0, 9.0, 19.0, 19.0, 0.9);
        let c = Detection::new("car", 10.0, 0.0, 20.0, 10.0, 0.9);

        assert_eq!(dedup.consider(&a, &mut history), Outcome::Accepted);
        assert_eq!(dedup.consider(&b, &mut history), Outcome::Duplicate);
        // Touching edges have zero IoU, which is not above zero.
        assert_eq!(dedup.consider(&c, &mut history), Outcome::Accepted);
    }
}
