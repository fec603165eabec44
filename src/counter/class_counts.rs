use std::collections::HashMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::counter::history::DetectionHistory;

/// Number of distinct objects accepted per class.
///
/// Iteration follows the order in which each class was first accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCounts {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl ClassCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild counts from a history: one per recorded box.
    pub fn from_history(history: &DetectionHistory) -> Self {
        let mut counts = Self::new();
        for label in history.labels() {
            counts.add(label, history.len(label) as u64);
        }
        counts
    }

    /// Add one to the count of `label` and return the new value.
    pub fn increment(&mut self, label: &str) -> u64 {
        self.add(label, 1)
    }

    fn add(&mut self, label: &str, amount: u64) -> u64 {
        match self.index.get(label) {
            Some(&slot) => {
                self.entries[slot].1 += amount;
                self.entries[slot].1
            }
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), amount));
                amount
            }
        }
    }

    /// Count for `label`, zero when the class was never accepted.
    pub fn get(&self, label: &str) -> u64 {
        self.index
            .get(label)
            .map(|&slot| self.entries[slot].1)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries
            .iter()
            .map(|(label, count)| (label.as_str(), *count))
    }

    /// Number of classes with at least one accepted object.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum over all classes.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn to_vec(&self) -> Vec<(String, u64)> {
        self.entries.clone()
    }
}

/// One `class: count` line per class.
impl fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, count)) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{label}: {count}")?;
        }
        Ok(())
    }
}

impl Serialize for ClassCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, count) in self.iter() {
            map.serialize_entry(label, &count)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::BoundingBox;

    #[test]
    fn test_increment_and_get() {
        let mut counts = ClassCounts::new();
        assert_eq!(counts.increment("car"), 1);
        assert_eq!(counts.increment("car"), 2);
        assert_eq!(counts.increment("person"), 1);

        assert_eq!(counts.get("car"), 2);
        assert_eq!(counts.get("person"), 1);
        assert_eq!(counts.get("bus"), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_first_accepted_order() {
        let mut counts = ClassCounts::new();
        counts.increment("truck");
        counts.increment("car");
        counts.increment("truck");

        assert_eq!(
            counts.to_vec(),
            vec![("truck".to_string(), 2), ("car".to_string(), 1)]
        );
    }

    #[test]
    fn test_display_summary() {
        let mut counts = ClassCounts::new();
        counts.increment("car");
        counts.increment("car");
        counts.increment("person");

        assert_eq!(counts.to_string(), "car: 2\nperson: 1");
        assert_eq!(ClassCounts::new().to_string(), "");
    }

    #[test]
    fn test_serialize_keeps_order() {
        let mut counts = ClassCounts::new();
        counts.increment("zebra");
        counts.increment("apple");

        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"zebra":1,"apple":1}"#);
    }

    #[test]
    fn test_from_history() {
        let mut history = DetectionHistory::new();
        history.record("car", BoundingBox::from_tlbr(0.0, 0.0, 1.0, 1.0));
        history.record("dog", BoundingBox::from_tlbr(0.0, 0.0, 1.0, 1.0));
        history.record("car", BoundingBox::from_tlbr(5.0, 5.0, 6.0, 6.0));

        let counts = ClassCounts::from_history(&history);
        assert_eq!(
            counts.to_vec(),
            vec![("car".to_string(), 2), ("dog".to_string(), 1)]
        );
    }
}
