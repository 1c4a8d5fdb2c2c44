//! Ranking library templates against an occupied slot.
//!
//! The slot is center-cropped by the library's margin, area-resampled to the
//! template size and reduced to grayscale, then correlated against every
//! template (an explicit `slots x templates` scan). All intermediate buffers
//! live in a caller-owned [`MatchScratch`], so a worker allocates them once.
//!
//! When the slot's border ring shows a rarity color, templates of that tier
//! get a multiplicative boost and are tried first; if none of them is
//! acceptable the full ranking is used. Ranking and the high-precision gap
//! see the uncapped boosted scores; only reported scores are capped at 1.

mod acceptance;

pub use acceptance::{AcceptanceThresholds, PrecisionMode, Rejection};

use crate::candidate::{rank_desc, Scored};
use crate::image::resample::{gray_center_crop, resize_area};
use crate::image::RgbaView;
use crate::kernel::{DefaultKernel, Kernel, NccPlan};
use crate::library::{RarityPalette, RarityTier, TemplateLibrary};
use crate::trace::trace_span;
use crate::util::{IconMatchError, IconMatchResult};

#[derive(Clone, Debug, PartialEq)]
pub struct MatcherConfig {
    pub acceptance: AcceptanceThresholds,
    pub precision: PrecisionMode,
    /// Restrict to the detected rarity tier first.
    pub rarity_shortlist: bool,
    /// Multiplier applied to same-tier scores. Reported scores are capped at 1.
    pub rarity_boost: f32,
    /// Ring thickness scanned for border color, as a fraction of slot size.
    pub rarity_ring_fraction: f32,
    /// Minimum share of ring pixels a tier needs to count as detected.
    pub rarity_min_fraction: f32,
    /// Ranked candidates kept per slot for review.
    pub review_top_k: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            acceptance: AcceptanceThresholds::default(),
            precision: PrecisionMode::Standard,
            rarity_shortlist: true,
            rarity_boost: 1.15,
            rarity_ring_fraction: 0.08,
            rarity_min_fraction: 0.35,
            review_top_k: 3,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> IconMatchResult<()> {
        self.acceptance.validate()?;
        if let PrecisionMode::HighPrecision { min_gap } = self.precision {
            if !(0.0..=1.0).contains(&min_gap) {
                return Err(IconMatchError::config("min_gap must lie in [0, 1]"));
            }
        }
        if !(self.rarity_boost >= 1.0) {
            return Err(IconMatchError::config("rarity_boost must be at least 1"));
        }
        if !(0.0..0.5).contains(&self.rarity_ring_fraction)
            || !(0.0..=1.0).contains(&self.rarity_min_fraction)
        {
            return Err(IconMatchError::config("rarity ring settings out of range"));
        }
        Ok(())
    }
}

/// Reusable per-worker buffers for slot preprocessing and ranking.
#[derive(Debug, Default)]
pub struct MatchScratch {
    crop: Vec<f32>,
    tmp: Vec<f32>,
    resized: Vec<f32>,
    plan: NccPlan,
    scores: Vec<Scored>,
    pub(crate) gray: Vec<f32>,
}

impl MatchScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full ranking produced by the most recent match call.
    ///
    /// Scores are boosted but not capped, so they may exceed 1.
    pub fn ranking(&self) -> &[Scored] {
        &self.scores
    }

    /// Preprocessed slot from the most recent match call.
    pub fn slot_plan(&self) -> &NccPlan {
        &self.plan
    }
}

/// Matcher output for one slot.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotMatch {
    /// Border tier and its ring share, when detected.
    pub rarity: Option<(RarityTier, f32)>,
    pub accepted: Option<Scored>,
    pub rejection: Option<Rejection>,
    /// True when the accepted match came from the rarity shortlist.
    pub shortlisted: bool,
    /// Best candidates, at most `review_top_k`.
    pub top: Vec<Scored>,
}

/// Borrowing view of the matcher inputs shared by all slots of a frame.
#[derive(Copy, Clone)]
pub struct SlotMatcher<'a> {
    library: &'a TemplateLibrary,
    config: &'a MatcherConfig,
    palette: &'a RarityPalette,
}

impl<'a> SlotMatcher<'a> {
    pub fn new(
        library: &'a TemplateLibrary,
        config: &'a MatcherConfig,
        palette: &'a RarityPalette,
    ) -> Self {
        Self {
            library,
            config,
            palette,
        }
    }

    /// Preprocesses `slot` into `scratch.plan` using the library geometry.
    pub fn prepare(&self, slot: RgbaView<'_>, scratch: &mut MatchScratch) {
        let geometry = self.library.geometry();
        let (w, h) = gray_center_crop(slot, geometry.crop_margin, &mut scratch.crop);
        resize_area(
            &scratch.crop,
            w,
            h,
            &mut scratch.resized,
            geometry.size,
            geometry.size,
            &mut scratch.tmp,
        );
        scratch
            .plan
            .refill(&scratch.resized, geometry.size, geometry.size);
    }

    /// Scores, ranks and accepts with the default kernel.
    pub fn match_slot(&self, slot: RgbaView<'_>, scratch: &mut MatchScratch) -> SlotMatch {
        self.match_slot_with::<DefaultKernel>(slot, scratch)
    }

    pub fn match_slot_with<K: Kernel>(
        &self,
        slot: RgbaView<'_>,
        scratch: &mut MatchScratch,
    ) -> SlotMatch {
        let _span = trace_span!("match_slot", templates = self.library.len()).entered();
        let cfg = self.config;

        let rarity = if cfg.rarity_shortlist {
            self.palette
                .dominant_border_tier(slot, cfg.rarity_ring_fraction, cfg.rarity_min_fraction)
        } else {
            None
        };
        let tier = rarity.map(|(tier, _)| tier);

        self.prepare(slot, scratch);
        scratch.scores.clear();
        for (index, template) in self.library.templates().iter().enumerate() {
            let mut score = K::similarity(&scratch.plan, template.plan());
            if tier.is_some() && template.rarity() == tier {
                score *= cfg.rarity_boost;
            }
            scratch.scores.push(Scored { index, score });
        }
        rank_desc(&mut scratch.scores);

        let top = scratch
            .scores
            .iter()
            .take(cfg.review_top_k)
            .map(|&s| reported(s))
            .collect();

        let mut result = SlotMatch {
            rarity,
            accepted: None,
            rejection: None,
            shortlisted: false,
            top,
        };
        if scratch.plan.is_degenerate() {
            result.rejection = Some(if self.library.is_empty() {
                Rejection::NoTemplates
            } else {
                Rejection::FlatSlot
            });
            return result;
        }

        if let Some(tier) = tier {
            let shortlist = scratch
                .scores
                .iter()
                .filter(|s| self.library.templates()[s.index].rarity() == Some(tier));
            if let Ok(best) =
                acceptance::accept(shortlist, self.library, &cfg.acceptance, cfg.precision)
            {
                result.accepted = Some(reported(best));
                result.shortlisted = true;
                return result;
            }
        }

        match acceptance::accept(
            scratch.scores.iter(),
            self.library,
            &cfg.acceptance,
            cfg.precision,
        ) {
            Ok(best) => result.accepted = Some(reported(best)),
            Err(rejection) => result.rejection = Some(rejection),
        }
        result
    }
}

#[inline]
fn reported(scored: Scored) -> Scored {
    Scored {
        score: scored.score.min(1.0),
        ..scored
    }
}
