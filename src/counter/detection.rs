//! Detector output consumed by the counter.

use serde::{Deserialize, Serialize};

use crate::counter::rect::BoundingBox;

/// One object reported by the detector for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class name, e.g. "car"
    pub label: String,
    /// Bounding box in TLBR format (x1, y1, x2, y2)
    pub bbox: BoundingBox,
    /// Detection confidence score
    pub confidence: f32,
}

impl Detection {
    pub fn new(
        label: impl Into<String>,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        confidence: f32,
    ) -> Self {
        Self {
            label: label.into(),
            bbox: BoundingBox::from_tlbr(x1, y1, x2, y2),
            confidence,
        }
    }

    pub fn from_bbox(label: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence,
        }
    }

    /// False when the box or the confidence is not a finite number.
    pub fn is_well_formed(&self) -> bool {
        self.bbox.is_finite() && self.confidence.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_new() {
        let det = Detection::new("car", 0.0, 0.0, 10.0, 10.0, 0.9);
        assert_eq!(det.label, "car");
        assert_eq!(det.bbox.to_tlbr(), [0.0, 0.0, 10.0, 10.0]);
        assert!(det.is_well_formed());
    }

    #[test]
    fn test_malformed_detection() {
        let det = Detection::new("car", 0.0, 0.0, f32::INFINITY, 10.0, 0.9);
        assert!(!det.is_well_formed());

        let det = Detection::new("car", 0.0, 0.0, 10.0, 10.0, f32::NAN);
        assert!(!det.is_well_formed());
    }
}
