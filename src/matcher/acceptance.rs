//! Acceptance policy for the top-ranked candidate.

use crate::candidate::Scored;
use crate::library::TemplateLibrary;
use crate::util::{IconMatchError, IconMatchResult};
use std::collections::HashMap;

/// Global threshold with optional per-item overrides.
#[derive(Clone, Debug, PartialEq)]
pub struct AcceptanceThresholds {
    pub global: f32,
    /// Calibrated thresholds keyed by template id.
    pub per_item: HashMap<String, f32>,
}

impl Default for AcceptanceThresholds {
    fn default() -> Self {
        Self {
            global: 0.80,
            per_item: HashMap::new(),
        }
    }
}

impl AcceptanceThresholds {
    pub fn global(global: f32) -> Self {
        Self {
            global,
            ..Self::default()
        }
    }

    pub fn threshold_for(&self, id: &str) -> f32 {
        self.per_item.get(id).copied().unwrap_or(self.global)
    }

    pub fn validate(&self) -> IconMatchResult<()> {
        let in_range = |t: f32| t > 0.0 && t <= 1.0;
        if !in_range(self.global) || !self.per_item.values().all(|&t| in_range(t)) {
            return Err(IconMatchError::config(
                "acceptance thresholds must lie in (0, 1]",
            ));
        }
        Ok(())
    }
}

/// Whether ambiguous best matches are tolerated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PrecisionMode {
    Standard,
    /// Reject unless `best - second_best >= min_gap`.
    HighPrecision { min_gap: f32 },
}

/// Why a slot produced no accepted match.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The library has no templates to compare against.
    NoTemplates,
    /// The preprocessed slot has no intensity variation.
    FlatSlot,
    BelowThreshold,
    /// Best and second-best are closer than the high-precision gap.
    Ambiguous,
}

/// Applies thresholds and the precision gap to an already ranked list.
pub(crate) fn accept<'a>(
    mut ranked: impl Iterator<Item = &'a Scored>,
    library: &TemplateLibrary,
    thresholds: &AcceptanceThresholds,
    precision: PrecisionMode,
) -> Result<Scored, Rejection> {
    let best = *ranked.next().ok_or(Rejection::NoTemplates)?;
    let id = library
        .templates()
        .get(best.index)
        .map(|t| t.id())
        .ok_or(Rejection::NoTemplates)?;
    if best.score < thresholds.threshold_for(id) {
        return Err(Rejection::BelowThreshold);
    }
    if let PrecisionMode::HighPrecision { min_gap } = precision {
        let second = ranked.next().map_or(0.0, |s| s.score);
        if best.score - second < min_gap {
            return Err(Rejection::Ambiguous);
        }
    }
    Ok(best)
}
