//! Individual pipeline stages for custom recognition flows.
//!
//! Most users should go through [`crate::Recognizer`]; these re-exports let
//! harnesses run or calibrate one stage in isolation.

pub use crate::calibrate::{
    calibrate, derive_item_thresholds, validate_frame, FrameSummary, LabeledScore, Validation,
};
pub use crate::candidate::{rank_desc, Scored};
pub use crate::classify::{classify_slot, classify_view, slot_stats};
pub use crate::grid::adaptive::locate_adaptive;
pub use crate::grid::{locate, locate_fixed, ScaledGrid};
pub use crate::image::resample::{center_crop_rect, gray_center_crop, resize_area};
pub use crate::kernel::{ncc_similarity, DefaultKernel, Kernel, NccPlan, ScalarKernel};
pub use crate::matcher::{MatchScratch, SlotMatch, SlotMatcher};
pub use crate::aggregate::{count_items, suppress_overlaps};
