use iconmatch::lowlevel::{derive_item_thresholds, validate_frame, FrameSummary, LabeledScore};
use iconmatch::{
    Biome, CalibrationConfig, CrossValidationSignal, FrameContext, ItemCategory, Predicate,
};

fn summary(weapons: usize, others: usize) -> FrameSummary {
    FrameSummary::from_categories(
        std::iter::repeat(Some(ItemCategory::Weapon))
            .take(weapons)
            .chain(std::iter::repeat(Some(ItemCategory::Item)).take(others)),
    )
}

#[test]
fn inapplicable_signals_drop_out() {
    let cfg = CalibrationConfig::default();
    let validation = validate_frame(&summary(2, 10), &FrameContext::default(), &cfg);
    assert_eq!(validation.score, 1.0);

    let passed: Vec<Option<bool>> = validation.outcomes.iter().map(|o| o.passed).collect();
    assert_eq!(passed, vec![Some(true), None, None, None]);
}

#[test]
fn weighted_pass_rate() {
    let cfg = CalibrationConfig::default();

    // Too many weapons and a low-confidence biome guess.
    let ctx = FrameContext::with_biome(Biome::Forest, 0.3);
    let validation = validate_frame(&summary(6, 10), &ctx, &cfg);
    // weapon_slots fails (1.0), forest_item_count passes (1.0), biome_color_match fails (0.5).
    assert!((validation.score - 1.0 / 2.5).abs() < 1e-6);

    let ctx = FrameContext::with_biome(Biome::Forest, 0.8);
    let validation = validate_frame(&summary(1, 30), &ctx, &cfg);
    // Forest frames with 31 items are implausible.
    assert!((validation.score - 1.5 / 2.5).abs() < 1e-6);
}

#[test]
fn custom_signals_count_all_detections() {
    let cfg = CalibrationConfig {
        signals: vec![CrossValidationSignal::new(
            "hotbar_capacity",
            2.0,
            Predicate::CountInRange {
                category: None,
                min: 1,
                max: 51,
            },
        )],
        ..CalibrationConfig::default()
    };
    let ctx = FrameContext::default();
    assert_eq!(validate_frame(&summary(0, 0), &ctx, &cfg).score, 0.0);
    assert_eq!(validate_frame(&summary(3, 4), &ctx, &cfg).score, 1.0);
}

#[test]
fn derived_thresholds_separate_labeled_scores() {
    let sample = |id: &str, score: f32, correct: bool| LabeledScore {
        predicted: id.to_owned(),
        score,
        correct,
    };
    let thresholds = derive_item_thresholds(&[
        sample("ghost", 0.95, true),
        sample("ghost", 0.91, true),
        sample("ghost", 0.85, false),
        sample("clover", 0.97, true),
        sample("tome", 0.6, false),
        sample("tome", f32::NAN, true),
    ]);

    assert!((thresholds["ghost"] - 0.88).abs() < 1e-6);
    assert!((thresholds["clover"] - 0.97).abs() < 1e-6);
    assert!((thresholds["tome"] - 0.8).abs() < 1e-6);
    assert_eq!(thresholds.len(), 3);
}
