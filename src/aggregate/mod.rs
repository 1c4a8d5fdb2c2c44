//! Per-frame deduplication and item counting.

mod overlap;

pub use overlap::suppress_overlaps;

use crate::grid::Slot;
use crate::library::RarityTier;
use crate::util::{IconMatchError, IconMatchResult};
use std::collections::BTreeMap;

/// Accepted match for one slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub template_id: String,
    /// Index into the library the detection was made with.
    pub template_index: usize,
    /// Matcher similarity (after any rarity boost).
    pub raw_score: f32,
    /// Calibrated confidence in `[0, 1]`.
    pub confidence: f32,
    pub slot: Slot,
    pub rarity: Option<RarityTier>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateConfig {
    /// Detections below this calibrated confidence are left out of counts.
    pub count_floor: f32,
    /// Detections overlapping a stronger one by more than this IoU are dropped.
    pub overlap_iou: f32,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            count_floor: 0.5,
            overlap_iou: 0.5,
        }
    }
}

impl AggregateConfig {
    pub fn validate(&self) -> IconMatchResult<()> {
        if !(0.0..=1.0).contains(&self.count_floor) || !(0.0..=1.0).contains(&self.overlap_iou) {
            return Err(IconMatchError::config(
                "count_floor and overlap_iou must lie in [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Number of detections per template id at or above `floor`.
pub fn count_items(detections: &[Detection], floor: f32) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for det in detections.iter().filter(|d| d.confidence >= floor) {
        *counts.entry(det.template_id.clone()).or_insert(0) += 1;
    }
    counts
}

/// Restores slot order (rows bottom-up, columns left to right).
pub(crate) fn sort_by_slot(detections: &mut [Detection]) {
    detections.sort_by(|a, b| {
        (a.slot.row, a.slot.col, a.slot.y, a.slot.x).cmp(&(b.slot.row, b.slot.col, b.slot.y, b.slot.x))
    });
}
