//! Confidence calibration from whole-frame cross-validation signals.
//!
//! Each signal is a weighted boolean predicate over the frame's aggregate
//! detection state and the caller's [`FrameContext`]. Signals whose
//! precondition does not hold (another biome, no biome confidence) are not
//! applicable and drop out of both sums:
//!
//! `validation = Σ weight(passing) / Σ weight(applicable)` (1 if none apply)
//!
//! `calibrated = clamp(raw · (0.5 + 0.5 · validation), min_floor, max_ceiling)`
//!
//! Calibration only rescales confidences; it never adds or removes
//! detections.

mod thresholds;

pub use thresholds::{derive_item_thresholds, LabeledScore};

use crate::context::{Biome, FrameContext};
use crate::library::ItemCategory;
use crate::util::math::clamp_unit;
use crate::util::{IconMatchError, IconMatchResult};
use std::collections::BTreeMap;

/// Condition checked by a [`CrossValidationSignal`].
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Detections of `category` (all detections when `None`) lie in `[min, max]`.
    CountInRange {
        category: Option<ItemCategory>,
        min: usize,
        max: usize,
    },
    /// Frames of `biome` show at least `min` detections.
    BiomeMinItems { biome: Biome, min: usize },
    /// Frames of `biome` show at most `max` detections.
    BiomeMaxItems { biome: Biome, max: usize },
    /// The external biome classification is at least `floor` confident.
    BiomeConfidenceAtLeast { floor: f32 },
}

/// Named, weighted predicate.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossValidationSignal {
    pub name: String,
    pub weight: f32,
    pub predicate: Predicate,
}

impl CrossValidationSignal {
    pub fn new(name: impl Into<String>, weight: f32, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            weight,
            predicate,
        }
    }

    /// `None` when the signal does not apply to this frame.
    pub fn evaluate(&self, summary: &FrameSummary, ctx: &FrameContext) -> Option<bool> {
        match self.predicate {
            Predicate::CountInRange { category, min, max } => {
                let count = match category {
                    Some(category) => summary.count_of(category),
                    None => summary.total,
                };
                Some((min..=max).contains(&count))
            }
            Predicate::BiomeMinItems { biome, min } => {
                (ctx.biome == Some(biome)).then_some(summary.total >= min)
            }
            Predicate::BiomeMaxItems { biome, max } => {
                (ctx.biome == Some(biome)).then_some(summary.total <= max)
            }
            Predicate::BiomeConfidenceAtLeast { floor } => {
                ctx.biome_confidence.map(|c| c >= floor)
            }
        }
    }
}

/// Aggregate detection state the predicates are evaluated against.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameSummary {
    pub total: usize,
    pub by_category: BTreeMap<ItemCategory, usize>,
}

impl FrameSummary {
    pub fn from_categories(categories: impl IntoIterator<Item = Option<ItemCategory>>) -> Self {
        let mut summary = Self::default();
        for category in categories {
            summary.total += 1;
            if let Some(category) = category {
                *summary.by_category.entry(category).or_default() += 1;
            }
        }
        summary
    }

    pub fn count_of(&self, category: ItemCategory) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationConfig {
    pub signals: Vec<CrossValidationSignal>,
    pub min_floor: f32,
    pub max_ceiling: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            signals: vec![
                CrossValidationSignal::new(
                    "weapon_slots",
                    1.0,
                    Predicate::CountInRange {
                        category: Some(ItemCategory::Weapon),
                        min: 0,
                        max: 4,
                    },
                ),
                CrossValidationSignal::new(
                    "hell_item_count",
                    1.0,
                    Predicate::BiomeMinItems {
                        biome: Biome::Hell,
                        min: 15,
                    },
                ),
                CrossValidationSignal::new(
                    "forest_item_count",
                    1.0,
                    Predicate::BiomeMaxItems {
                        biome: Biome::Forest,
                        max: 25,
                    },
                ),
                CrossValidationSignal::new(
                    "biome_color_match",
                    0.5,
                    Predicate::BiomeConfidenceAtLeast { floor: 0.6 },
                ),
            ],
            min_floor: 0.0,
            max_ceiling: 1.0,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> IconMatchResult<()> {
        if self.signals.iter().any(|s| !(s.weight >= 0.0)) {
            return Err(IconMatchError::config("signal weights must be non-negative"));
        }
        if !(0.0 <= self.min_floor && self.min_floor <= self.max_ceiling && self.max_ceiling <= 1.0)
        {
            return Err(IconMatchError::config(
                "calibration bounds must satisfy 0 <= min_floor <= max_ceiling <= 1",
            ));
        }
        Ok(())
    }
}

/// Result of one signal on one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalOutcome {
    pub name: String,
    pub weight: f32,
    /// `None` when not applicable.
    pub passed: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Validation {
    /// Weighted pass rate in `[0, 1]`.
    pub score: f32,
    pub outcomes: Vec<SignalOutcome>,
}

/// Evaluates every configured signal against a frame.
pub fn validate_frame(
    summary: &FrameSummary,
    ctx: &FrameContext,
    cfg: &CalibrationConfig,
) -> Validation {
    let mut passed_weight = 0.0f32;
    let mut applicable_weight = 0.0f32;
    let mut outcomes = Vec::with_capacity(cfg.signals.len());
    for signal in &cfg.signals {
        let passed = signal.evaluate(summary, ctx);
        if let Some(ok) = passed {
            applicable_weight += signal.weight;
            if ok {
                passed_weight += signal.weight;
            }
        }
        outcomes.push(SignalOutcome {
            name: signal.name.clone(),
            weight: signal.weight,
            passed,
        });
    }
    let score = if applicable_weight > 0.0 {
        passed_weight / applicable_weight
    } else {
        1.0
    };
    Validation { score, outcomes }
}

/// Maps a raw score to a calibrated confidence.
pub fn calibrate(raw: f32, validation_score: f32, cfg: &CalibrationConfig) -> f32 {
    let v = clamp_unit(validation_score, 0.0, 1.0);
    clamp_unit(raw * (0.5 + 0.5 * v), cfg.min_floor, cfg.max_ceiling)
}
