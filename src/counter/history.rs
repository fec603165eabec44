//! Per-class record of accepted bounding boxes.

use std::collections::HashMap;

use ndarray::Array1;

use crate::counter::rect::{BoundingBox, iou_batch};

#[derive(Debug, Clone, PartialEq)]
struct ClassHistory {
    label: String,
    boxes: Vec<BoundingBox>,
}

/// Boxes accepted so far, grouped by class.
///
/// Classes are kept in the order their first box was recorded and boxes
/// within a class oldest first. Nothing is ever evicted: memory grows with
/// the number of distinct objects accepted during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionHistory {
    classes: Vec<ClassHistory>,
    index: HashMap<String, usize>,
}

impl DetectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// IoU of `candidate` against every box recorded for `label`, oldest first.
    pub fn overlaps(&self, label: &str, candidate: &BoundingBox) -> Array1<f32> {
        let boxes = self.boxes(label);
        iou_batch(std::slice::from_ref(candidate), boxes)
            .row(0)
            .to_owned()
    }

    /// True iff some box recorded for `label` overlaps `candidate` by strictly
    /// more than `threshold`.
    pub fn matches(&self, label: &str, candidate: &BoundingBox, threshold: f32) -> bool {
        self.boxes(label)
            .iter()
            .any(|bbox| bbox.iou(candidate) > threshold)
    }

    /// Append a box to the history of `label`. No matching is done here.
    pub fn record(&mut self, label: &str, bbox: BoundingBox) {
        match self.index.get(label) {
            Some(&slot) => self.classes[slot].boxes.push(bbox),
            None => {
                self.index.insert(label.to_string(), self.classes.len());
                self.classes.push(ClassHistory {
                    label: label.to_string(),
                    boxes: vec![bbox],
                });
            }
        }
    }

    pub fn clear(&mut self) {
        self.classes.clear();
        self.index.clear();
    }

    /// Boxes recorded for `label`, oldest first.
    pub fn boxes(&self, label: &str) -> &[BoundingBox] {
        self.index
            .get(label)
            .map(|&slot| self.classes[slot].boxes.as_slice())
            .unwrap_or(&[])
    }

    /// Number of boxes recorded for `label`.
    pub fn len(&self, label: &str) -> usize {
        self.boxes(label).len()
    }

    /// Number of boxes recorded across all classes.
    pub fn total(&self) -> usize {
        self.classes.iter().map(|c| c.boxes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class labels in the order they were first recorded.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.label.as_str())
    }
}
