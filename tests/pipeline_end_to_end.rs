use iconmatch::lowlevel::{locate_fixed, MatchScratch, SlotMatcher};
use iconmatch::{
    Biome, FrameContext, GridConfig, ItemCategory, MatcherConfig, PrecisionMode, RarityPalette,
    RarityTier, RecognitionConfig, Recognizer, Rejection, RgbaImageBuf, Slot, TemplateGeometry,
    TemplateLibrary, TemplateMeta,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BACKGROUND: [u8; 4] = [30, 30, 30, 255];
const RARE: [u8; 4] = [60, 130, 220, 255];

fn noise_icon(rng: &mut StdRng, size: usize) -> RgbaImageBuf {
    let mut img = RgbaImageBuf::filled(size, size, [0, 0, 0, 255]).unwrap();
    for y in 0..size {
        for x in 0..size {
            img.put(x, y, [rng.random(), rng.random(), rng.random(), 255]);
        }
    }
    img
}

/// Adds uniform per-channel noise in `[-amp, amp]`.
fn perturb(icon: &RgbaImageBuf, rng: &mut StdRng, amp: i16) -> RgbaImageBuf {
    let mut out = icon.clone();
    let view = icon.view();
    for y in 0..icon.height() {
        for x in 0..icon.width() {
            let px = view.get(x, y).unwrap();
            let mut next = [0u8, 0, 0, 255];
            for c in 0..3 {
                next[c] = (px[c] as i16 + rng.random_range(-amp..=amp)).clamp(0, 255) as u8;
            }
            out.put(x, y, next);
        }
    }
    out
}

fn with_border(icon: &RgbaImageBuf, color: [u8; 4], thickness: usize) -> RgbaImageBuf {
    let mut out = icon.clone();
    let (w, h) = (icon.width(), icon.height());
    for y in 0..h {
        for x in 0..w {
            if x < thickness || y < thickness || x >= w - thickness || y >= h - thickness {
                out.put(x, y, color);
            }
        }
    }
    out
}

fn blend(a: &RgbaImageBuf, b: &RgbaImageBuf, wa: f32) -> RgbaImageBuf {
    let mut out = a.clone();
    for y in 0..a.height() {
        for x in 0..a.width() {
            let pa = a.view().get(x, y).unwrap();
            let pb = b.view().get(x, y).unwrap();
            let mut px = [0u8, 0, 0, 255];
            for c in 0..3 {
                px[c] = (pa[c] as f32 * wa + pb[c] as f32 * (1.0 - wa)).round() as u8;
            }
            out.put(x, y, px);
        }
    }
    out
}

fn upscale2(icon: &RgbaImageBuf) -> RgbaImageBuf {
    let mut out = RgbaImageBuf::filled(icon.width() * 2, icon.height() * 2, BACKGROUND).unwrap();
    for y in 0..out.height() {
        for x in 0..out.width() {
            out.put(x, y, icon.view().get(x / 2, y / 2).unwrap());
        }
    }
    out
}

fn library(entries: &[(TemplateMeta, &RgbaImageBuf)]) -> TemplateLibrary {
    let mut builder = TemplateLibrary::builder(TemplateGeometry::default());
    for (meta, icon) in entries {
        builder.add_icon(meta.clone(), icon.view()).unwrap();
    }
    builder.build()
}

fn icons(seed: u64, n: usize) -> Vec<RgbaImageBuf> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| noise_icon(&mut rng, 40)).collect()
}

fn library_of(icons: &[RgbaImageBuf]) -> TemplateLibrary {
    let entries: Vec<(TemplateMeta, &RgbaImageBuf)> = icons
        .iter()
        .enumerate()
        .map(|(i, icon)| (TemplateMeta::new(format!("item_{i}")), icon))
        .collect();
    library(&entries)
}

fn frame_with(width: usize, height: usize, placed: &[(&RgbaImageBuf, Slot)]) -> RgbaImageBuf {
    let mut frame = RgbaImageBuf::filled(width, height, BACKGROUND).unwrap();
    for (icon, slot) in placed {
        frame.blit(icon.view(), slot.x, slot.y);
    }
    frame
}

fn slots_720() -> Vec<Slot> {
    locate_fixed(1280, 720, &GridConfig::default())
}

#[test]
fn icon_in_first_slot_is_detected() {
    let icons = icons(1, 5);
    let lib = library_of(&icons);
    let slot = slots_720()[0];
    let frame = frame_with(1280, 720, &[(&icons[2], slot)]);

    let recognizer = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    let report = recognizer.recognize(frame.view(), &FrameContext::default());

    assert_eq!(report.occupied_slots(), 1);
    assert_eq!(report.detections.len(), 1);
    let det = &report.detections[0];
    assert_eq!(det.template_id, "item_2");
    assert_eq!(det.slot, slot);
    assert!(det.confidence >= 0.95, "confidence {}", det.confidence);
    assert_eq!(report.counts.get("item_2"), Some(&1));
    assert_eq!(report.counts.len(), 1);

    let reviewed = &report.slots[0].candidates;
    assert_eq!(reviewed.len(), 3);
    assert_eq!(reviewed[0].template_id, "item_2");
}

#[test]
fn icon_outside_every_slot_is_ignored() {
    let icons = icons(1, 5);
    let lib = library_of(&icons);
    let off_grid = Slot {
        x: 600,
        y: 100,
        width: 40,
        height: 40,
        row: 0,
        col: 0,
    };
    let frame = frame_with(1280, 720, &[(&icons[2], off_grid)]);

    let recognizer = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    let report = recognizer.recognize(frame.view(), &FrameContext::default());
    assert!(!report.slots.is_empty());
    assert_eq!(report.occupied_slots(), 0);
    assert!(report.detections.is_empty());
    assert!(report.counts.is_empty());
}

#[test]
fn black_frame_has_slots_but_no_detections() {
    let lib = library_of(&icons(1, 3));
    let black = RgbaImageBuf::filled(1280, 720, [0, 0, 0, 255]).unwrap();

    let recognizer = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    let report = recognizer.recognize(black.view(), &FrameContext::default());
    assert_eq!(report.slots.len(), 3 * 17);
    assert!(report.slots.iter().all(|s| !s.classification.is_occupied()));
    assert!(report.detections.is_empty());
}

#[test]
fn near_duplicates_are_ambiguous_in_high_precision_mode() {
    let mut rng = StdRng::seed_from_u64(9);
    let a = noise_icon(&mut rng, 40);
    let b = perturb(&a, &mut rng, 12);
    let lib = library(&[(TemplateMeta::new("a"), &a), (TemplateMeta::new("b"), &b)]);
    let slot = slots_720()[4];
    let frame = frame_with(1280, 720, &[(&a, slot)]);
    let ctx = FrameContext::default();

    let standard = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    let report = standard.recognize(frame.view(), &ctx);
    assert_eq!(report.detections.len(), 1);
    assert_eq!(report.detections[0].template_id, "a");
    let candidates = &report.slots[4].candidates;
    assert_eq!(candidates[1].template_id, "b");
    assert!(candidates[1].score > 0.9);

    let mut cfg = RecognitionConfig::default();
    cfg.matcher.precision = PrecisionMode::HighPrecision { min_gap: 0.05 };
    let strict = Recognizer::new(&lib, cfg).unwrap();
    let report = strict.recognize(frame.view(), &ctx);
    assert!(report.detections.is_empty());
    assert_eq!(report.slots[4].rejection, Some(Rejection::Ambiguous));
}

#[test]
fn doubled_resolution_gives_the_same_answer() {
    let icons = icons(3, 4);
    let lib = library_of(&icons);
    let cfg = RecognitionConfig::default();
    let recognizer = Recognizer::new(&lib, cfg.clone()).unwrap();
    let ctx = FrameContext::default();

    let small_slot = slots_720()[5];
    let small = frame_with(1280, 720, &[(&icons[1], small_slot)]);
    let large_slot = locate_fixed(2560, 1440, &cfg.grid)[5];
    let big_icon = upscale2(&icons[1]);
    let large = frame_with(2560, 1440, &[(&big_icon, large_slot)]);

    let small_report = recognizer.recognize(small.view(), &ctx);
    let large_report = recognizer.recognize(large.view(), &ctx);

    assert_eq!(small_report.slots.len(), large_report.slots.len());
    assert_eq!(large_report.detections.len(), 1);
    assert_eq!(large_report.detections[0].template_id, "item_1");
    assert_eq!(large_report.detections[0].slot.x, 2 * small_slot.x);
    assert!(large_report.detections[0].raw_score > 0.99);
}

#[test]
fn recognition_is_deterministic() {
    let icons = icons(5, 8);
    let lib = library_of(&icons);
    let slots = slots_720();
    let placed: Vec<(&RgbaImageBuf, Slot)> = icons
        .iter()
        .enumerate()
        .map(|(i, icon)| (icon, slots[i * 3]))
        .collect();
    let frame = frame_with(1280, 720, &placed);

    let recognizer = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    let ctx = FrameContext::with_biome(Biome::Desert, 0.7);
    let first = recognizer.recognize(frame.view(), &ctx);
    let second = recognizer.recognize(frame.view(), &ctx);
    assert_eq!(first, second);
    assert_eq!(first.detections.len(), icons.len());
}

#[test]
fn raising_the_threshold_never_adds_detections() {
    let icons = icons(6, 6);
    let lib = library_of(&icons);
    let slots = slots_720();
    let mut rng = StdRng::seed_from_u64(60);

    // Increasingly degraded copies spread the best scores out.
    let degraded: Vec<RgbaImageBuf> = icons
        .iter()
        .enumerate()
        .map(|(i, icon)| {
            let noise = noise_icon(&mut rng, 40);
            blend(icon, &noise, 1.0 - i as f32 * 0.12)
        })
        .collect();
    let placed: Vec<(&RgbaImageBuf, Slot)> = degraded
        .iter()
        .enumerate()
        .map(|(i, icon)| (icon, slots[i * 2]))
        .collect();
    let frame = frame_with(1280, 720, &placed);
    let ctx = FrameContext::default();

    let mut previous = usize::MAX;
    for step in 0..=10 {
        let mut cfg = RecognitionConfig::default();
        cfg.matcher.acceptance.global = 0.5 + step as f32 * 0.05;
        let recognizer = Recognizer::new(&lib, cfg).unwrap();
        let accepted = recognizer.recognize(frame.view(), &ctx).detections.len();
        assert!(accepted <= previous, "threshold step {step}: {accepted} > {previous}");
        previous = accepted;
    }
}

#[test]
fn per_item_threshold_overrides_global() {
    let mut rng = StdRng::seed_from_u64(21);
    let icon = noise_icon(&mut rng, 40);
    let noisy = perturb(&icon, &mut rng, 30);
    let lib = library(&[(TemplateMeta::new("ghost"), &icon)]);
    let frame = frame_with(1280, 720, &[(&noisy, slots_720()[0])]);
    let ctx = FrameContext::default();

    let lenient = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    assert_eq!(lenient.recognize(frame.view(), &ctx).detections.len(), 1);

    let mut cfg = RecognitionConfig::default();
    cfg.matcher
        .acceptance
        .per_item
        .insert("ghost".to_owned(), 0.995);
    let strict = Recognizer::new(&lib, cfg).unwrap();
    let report = strict.recognize(frame.view(), &ctx);
    assert!(report.detections.is_empty());
    assert_eq!(report.slots[0].rejection, Some(Rejection::BelowThreshold));
}

#[test]
fn rarity_border_shortlists_matching_tier() {
    let mut rng = StdRng::seed_from_u64(33);
    let a = with_border(&noise_icon(&mut rng, 40), RARE, 3);
    let b = noise_icon(&mut rng, 40);
    let lib = library(&[
        (TemplateMeta::new("sapphire").with_rarity(RarityTier::Rare), &a),
        (TemplateMeta::new("pebble").with_rarity(RarityTier::Common), &b),
    ]);

    // Interior leans towards the common item; the border says rare.
    let slot_icon = with_border(&blend(&a, &b, 0.45), RARE, 3);
    let slot = slots_720()[0];
    let frame = frame_with(1280, 720, &[(&slot_icon, slot)]);
    let ctx = FrameContext::default();

    let recognizer = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    let report = recognizer.recognize(frame.view(), &ctx);
    assert_eq!(report.slots[0].rarity, Some(RarityTier::Rare));
    assert_eq!(report.detections.len(), 1);
    assert_eq!(report.detections[0].template_id, "sapphire");
    assert_eq!(report.detections[0].rarity, Some(RarityTier::Rare));

    let mut cfg = RecognitionConfig::default();
    cfg.matcher.rarity_shortlist = false;
    let plain = Recognizer::new(&lib, cfg).unwrap();
    let report = plain.recognize(frame.view(), &ctx);
    assert_eq!(report.slots[0].rarity, None);
    assert_eq!(report.detections[0].template_id, "pebble");
}

#[test]
fn boosted_same_tier_duplicates_keep_their_raw_order() {
    let mut rng = StdRng::seed_from_u64(41);
    let a = with_border(&noise_icon(&mut rng, 40), RARE, 3);
    let b = with_border(&perturb(&a, &mut rng, 12), RARE, 3);
    // The near-duplicate comes first, so a tie would hand it the slot.
    let lib = library(&[
        (TemplateMeta::new("b").with_rarity(RarityTier::Rare), &b),
        (TemplateMeta::new("a").with_rarity(RarityTier::Rare), &a),
    ]);
    let frame = frame_with(1280, 720, &[(&a, slots_720()[0])]);
    let ctx = FrameContext::default();

    let recognizer = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    let report = recognizer.recognize(frame.view(), &ctx);
    assert_eq!(report.slots[0].rarity, Some(RarityTier::Rare));
    assert_eq!(report.detections.len(), 1);
    assert_eq!(report.detections[0].template_id, "a");
    assert!(report.detections[0].raw_score <= 1.0);

    let candidates = &report.slots[0].candidates;
    assert_eq!(candidates[0].template_id, "a");
    assert_eq!(candidates[1].template_id, "b");
    assert!(candidates.iter().all(|c| c.score <= 1.0));
}

#[test]
fn high_precision_accepts_a_clear_same_tier_winner() {
    let mut rng = StdRng::seed_from_u64(43);
    let a = with_border(&noise_icon(&mut rng, 40), RARE, 3);
    let c = with_border(&perturb(&a, &mut rng, 40), RARE, 3);
    let lib = library(&[
        (TemplateMeta::new("c").with_rarity(RarityTier::Rare), &c),
        (TemplateMeta::new("a").with_rarity(RarityTier::Rare), &a),
    ]);
    let frame = frame_with(1280, 720, &[(&a, slots_720()[0])]);
    let ctx = FrameContext::default();

    // Both boosted scores exceed 1, but the raw gap is still wide.
    let mut cfg = RecognitionConfig::default();
    cfg.matcher.precision = PrecisionMode::HighPrecision { min_gap: 0.01 };
    let strict = Recognizer::new(&lib, cfg).unwrap();
    let report = strict.recognize(frame.view(), &ctx);
    assert_eq!(report.slots[0].rejection, None);
    assert_eq!(report.detections.len(), 1);
    assert_eq!(report.detections[0].template_id, "a");
    assert_eq!(report.detections[0].rarity, Some(RarityTier::Rare));
}

#[test]
fn scratch_exposes_the_full_ranking() {
    let icons = icons(12, 6);
    let lib = library_of(&icons);
    let cfg = MatcherConfig::default();
    let palette = RarityPalette::default();
    let matcher = SlotMatcher::new(&lib, &cfg, &palette);
    let mut scratch = MatchScratch::new();

    let result = matcher.match_slot(icons[3].view(), &mut scratch);
    assert_eq!(result.accepted.map(|s| s.index), Some(3));
    assert_eq!(result.top.len(), cfg.review_top_k);

    let ranking = scratch.ranking();
    assert_eq!(ranking.len(), lib.len());
    assert_eq!(ranking[0].index, 3);
    assert!(ranking.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(&ranking[..cfg.review_top_k], result.top.as_slice());

    let plan = scratch.slot_plan();
    let size = lib.geometry().size;
    assert_eq!((plan.width(), plan.height()), (size, size));
    assert!(plan.variance() > 0.0);
    assert!(plan.mean() > 0.0 && plan.mean() < 255.0);
}

#[test]
fn failed_signals_lower_confidence_but_keep_detections() {
    let icons = icons(8, 3);
    let entries: Vec<(TemplateMeta, &RgbaImageBuf)> = icons
        .iter()
        .enumerate()
        .map(|(i, icon)| {
            let meta = TemplateMeta::new(format!("item_{i}")).with_category(ItemCategory::Item);
            (meta, icon)
        })
        .collect();
    let lib = library(&entries);
    let slots = slots_720();
    let frame = frame_with(
        1280,
        720,
        &[(&icons[0], slots[0]), (&icons[1], slots[1]), (&icons[2], slots[2])],
    );

    let recognizer = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    let neutral = recognizer.recognize(frame.view(), &FrameContext::default());
    assert_eq!(neutral.validation.score, 1.0);

    // Hell frames are expected to show many items; three is suspicious.
    let hell = recognizer.recognize(frame.view(), &FrameContext::with_biome(Biome::Hell, 0.9));
    assert!((hell.validation.score - 0.6).abs() < 1e-6);
    assert_eq!(hell.detections.len(), 3);
    for (n, h) in neutral.detections.iter().zip(&hell.detections) {
        assert_eq!(n.template_id, h.template_id);
        assert!((h.confidence - n.raw_score * 0.8).abs() < 1e-4);
    }
    assert_eq!(hell.counts.values().sum::<usize>(), 3);

    let mut cfg = RecognitionConfig::default();
    cfg.aggregate.count_floor = 0.9;
    let picky = Recognizer::new(&lib, cfg).unwrap();
    let report = picky.recognize(frame.view(), &FrameContext::with_biome(Biome::Hell, 0.9));
    assert_eq!(report.detections.len(), 3);
    assert!(report.counts.is_empty());
}

#[test]
fn empty_library_rejects_occupied_slots() {
    let icons = icons(1, 1);
    let lib = TemplateLibrary::builder(TemplateGeometry::default()).build();
    let frame = frame_with(1280, 720, &[(&icons[0], slots_720()[0])]);

    let recognizer = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    let report = recognizer.recognize(frame.view(), &FrameContext::default());
    assert_eq!(report.occupied_slots(), 1);
    assert!(report.detections.is_empty());
    assert_eq!(report.slots[0].rejection, Some(Rejection::NoTemplates));
}
