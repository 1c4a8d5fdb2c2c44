//! End-to-end recognition of one frame.
//!
//! `grid → classify → match → deduplicate → calibrate → count`, synchronous
//! and allocation-light: per-slot buffers come from a [`MatchScratch`] that a
//! worker reuses across frames. The template library is only read.

use crate::aggregate::{count_items, sort_by_slot, suppress_overlaps, Detection};
use crate::calibrate::{calibrate, validate_frame, FrameSummary, Validation};
use crate::candidate::MatchCandidate;
use crate::classify::{classify_slot, SlotClassification};
use crate::config::RecognitionConfig;
use crate::context::FrameContext;
use crate::grid::{locate, LayoutSource, Slot};
use crate::image::RgbaView;
use crate::library::{RarityTier, TemplateLibrary};
use crate::matcher::{MatchScratch, Rejection, SlotMatcher};
use crate::trace::{trace_event, trace_span};
use crate::util::IconMatchResult;
use std::collections::BTreeMap;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Diagnostics for one candidate slot.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotReport {
    pub slot: Slot,
    pub classification: SlotClassification,
    /// Border tier seen by the matcher (occupied slots only).
    pub rarity: Option<RarityTier>,
    /// Best candidates for manual review (occupied slots only).
    pub candidates: Vec<MatchCandidate>,
    pub rejection: Option<Rejection>,
}

/// Everything one recognition pass produced.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub layout_source: LayoutSource,
    pub slots: Vec<SlotReport>,
    /// Accepted detections in slot order, at most one per slot.
    pub detections: Vec<Detection>,
    pub validation: Validation,
    /// Detections per template id above the count floor.
    pub counts: BTreeMap<String, usize>,
}

impl FrameReport {
    pub fn occupied_slots(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.classification.is_occupied())
            .count()
    }
}

/// One frame of a batch.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub image: RgbaView<'a>,
    pub context: &'a FrameContext,
}

/// Recognition pipeline bound to a library snapshot.
pub struct Recognizer<'lib> {
    library: &'lib TemplateLibrary,
    config: RecognitionConfig,
}

impl<'lib> Recognizer<'lib> {
    /// Validates `config` and binds it to `library`.
    pub fn new(library: &'lib TemplateLibrary, config: RecognitionConfig) -> IconMatchResult<Self> {
        config.validate()?;
        library.geometry().validate()?;
        Ok(Self { library, config })
    }

    pub fn library(&self) -> &'lib TemplateLibrary {
        self.library
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Runs one frame with freshly allocated scratch buffers.
    pub fn recognize(&self, image: RgbaView<'_>, ctx: &FrameContext) -> FrameReport {
        let mut scratch = MatchScratch::new();
        self.recognize_with_scratch(image, ctx, &mut scratch)
    }

    /// Runs one frame reusing `scratch`.
    pub fn recognize_with_scratch(
        &self,
        image: RgbaView<'_>,
        ctx: &FrameContext,
        scratch: &mut MatchScratch,
    ) -> FrameReport {
        let _span = trace_span!("recognize", width = image.width(), height = image.height()).entered();
        let cfg = &self.config;
        let layout = locate(image, &cfg.grid, &cfg.palette);
        let matcher = SlotMatcher::new(self.library, &cfg.matcher, &cfg.palette);

        let mut slots = Vec::with_capacity(layout.slots.len());
        let mut detections = Vec::new();
        for slot in &layout.slots {
            let classification =
                classify_slot(image, slot, &cfg.classifier, ctx.biome, &mut scratch.gray);
            let mut report = SlotReport {
                slot: *slot,
                classification,
                rarity: None,
                candidates: Vec::new(),
                rejection: None,
            };

            if classification.is_occupied() {
                if let Ok(view) = image.roi(slot.x, slot.y, slot.width, slot.height) {
                    let result = matcher.match_slot(view, scratch);
                    report.rarity = result.rarity.map(|(tier, _)| tier);
                    report.rejection = result.rejection;
                    report.candidates = result
                        .top
                        .iter()
                        .filter_map(|s| MatchCandidate::resolve(*s, self.library))
                        .collect();
                    if let Some(best) = result.accepted {
                        if let Some(template) = self.library.templates().get(best.index) {
                            detections.push(Detection {
                                template_id: template.id().to_owned(),
                                template_index: best.index,
                                raw_score: best.score,
                                confidence: best.score,
                                slot: *slot,
                                rarity: report.rarity,
                            });
                        }
                    }
                }
            }
            slots.push(report);
        }

        let mut detections = suppress_overlaps(detections, cfg.aggregate.overlap_iou);
        sort_by_slot(&mut detections);

        let summary = FrameSummary::from_categories(detections.iter().map(|d| {
            self.library
                .templates()
                .get(d.template_index)
                .and_then(|t| t.category())
        }));
        let validation = validate_frame(&summary, ctx, &cfg.calibration);
        for det in &mut detections {
            det.confidence = calibrate(det.raw_score, validation.score, &cfg.calibration);
        }
        let counts = count_items(&detections, cfg.aggregate.count_floor);

        trace_event!(
            "frame_recognized",
            slots = slots.len(),
            occupied = slots.iter().filter(|s| s.classification.is_occupied()).count(),
            detections = detections.len(),
            validation = validation.score
        );

        FrameReport {
            layout_source: layout.source,
            slots,
            detections,
            validation,
            counts,
        }
    }

    /// Recognizes every frame; output order follows input order.
    ///
    /// With the `rayon` feature frames run in parallel, each worker reusing
    /// one scratch set. Results are identical to the sequential path.
    pub fn recognize_batch(&self, frames: &[Frame<'_>]) -> Vec<FrameReport> {
        #[cfg(feature = "rayon")]
        {
            frames
                .par_iter()
                .map_init(MatchScratch::new, |scratch, frame| {
                    self.recognize_with_scratch(frame.image, frame.context, scratch)
                })
                .collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            let mut scratch = MatchScratch::new();
            frames
                .iter()
                .map(|frame| self.recognize_with_scratch(frame.image, frame.context, &mut scratch))
                .collect()
        }
    }
}
