mod class_counts;
mod dedup;
mod detection;
mod history;
mod rect;
mod run_state;
mod tally;

pub use class_counts::ClassCounts;
pub use dedup::{DEFAULT_IOU_THRESHOLD, Deduplicator, Outcome};
pub use detection::Detection;
pub use history::DetectionHistory;
pub use rect::{BoundingBox, iou_batch};
pub use run_state::RunState;
pub use tally::Tally;
