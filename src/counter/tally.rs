//! Running deduplicated count over a stream of frames.

use crate::counter::class_counts::ClassCounts;
use crate::counter::dedup::{Deduplicator, Outcome};
use crate::counter::detection::Detection;
use crate::counter::history::DetectionHistory;

/// Owns the history and the counts of one run and keeps them in step:
/// `counts.get(c) == history.len(c)` for every class `c`.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    dedup: Deduplicator,
    history: DetectionHistory,
    counts: ClassCounts,
    frame_id: u64,
}

impl Tally {
    pub fn new(dedup: Deduplicator) -> Self {
        Self {
            dedup,
            history: DetectionHistory::new(),
            counts: ClassCounts::new(),
            frame_id: 0,
        }
    }

    /// Feed the detections of the next frame, in detector order.
    ///
    /// Returns one outcome per detection. Two near-identical boxes of one
    /// class within the same frame count once.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<Outcome> {
        self.frame_id += 1;
        detections
            .iter()
            .map(|det| {
                let outcome = self.dedup.consider(det, &mut self.history);
                if outcome == Outcome::Accepted {
                    self.counts.increment(&det.label);
                }
                outcome
            })
            .collect()
    }

    /// Forget everything seen so far; the threshold is kept.
    pub fn reset(&mut self) {
        self.history.clear();
        self.counts.clear();
        self.frame_id = 0;
    }

    pub fn counts(&self) -> &ClassCounts {
        &self.counts
    }

    pub fn history(&self) -> &DetectionHistory {
        &self.history
    }

    /// Number of frames fed since the last reset.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn deduplicator(&self) -> &Deduplicator {
        &self.dedup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_frame_stream() {
        let mut tally = Tally::default();

        let frames = [
            vec![Detection::new("car", 0.0, 0.0, 10.0, 10.0, 0.9)],
            vec![Detection::new("car", 1.0, 1.0, 11.0, 11.0, 0.9)],
            vec![Detection::new("car", 50.0, 50.0, 60.0, 60.0, 0.9)],
        ];
        let outcomes: Vec<Vec<Outcome>> = frames.iter().map(|f| tally.update(f)).collect();

        assert_eq!(outcomes[0], vec![Outcome::Accepted]);
        assert_eq!(outcomes[1], vec![Outcome::Duplicate]);
        assert_eq!(outcomes[2], vec![Outcome::Accepted]);
        assert_eq!(tally.counts().get("car"), 2);
        assert_eq!(tally.frame_id(), 3);
    }

    #[test]
    fn test_duplicate_within_one_frame() {
        let mut tally = Tally::default();
        let outcomes = tally.update(&[
            Detection::new("person", 0.0, 0.0, 10.0, 20.0, 0.8),
            Detection::new("person", 0.5, 0.0, 10.5, 20.0, 0.7),
        ]);
        assert_eq!(outcomes, vec![Outcome::Accepted, Outcome::Duplicate]);
        assert_eq!(tally.counts().get("person"), 1);
    }

    #[test]
    fn test_counts_agree_with_history() {
        let mut tally = Tally::default();
        let mut x = 0.0;
        for i in 0..40 {
            let label = if i % 3 == 0 { "car" } else { "person" };
            // Every other frame repeats the previous box.
            if i % 2 == 0 {
                x += 7.0;
            }
            tally.update(&[Detection::new(label, x, 0.0, x + 10.0, 10.0, 0.9)]);
        }

        for label in tally.history().labels() {
            assert_eq!(tally.counts().get(label), tally.history().len(label) as u64);
        }
        assert_eq!(tally.counts(), &ClassCounts::from_history(tally.history()));
    }

    #[test]
    fn test_reset() {
        let mut tally = Tally::new(Deduplicator::new(0.3).unwrap());
        tally.update(&[Detection::new("car", 0.0, 0.0, 10.0, 10.0, 0.9)]);
        tally.reset();

        assert!(tally.counts().is_empty());
        assert!(tally.history().is_empty());
        assert_eq!(tally.frame_id(), 0);
        assert_eq!(tally.deduplicator().iou_threshold(), 0.3);
    }
}
