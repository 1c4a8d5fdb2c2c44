//! Offline derivation of per-item acceptance thresholds.
//!
//! Input samples are best-match scores for slots with a known label. A sample
//! is a true positive for its predicted item when the prediction equals the
//! label and a false positive otherwise. Labels must be assigned per slot;
//! inferring them from detected-vs-expected counts is not supported.

use std::collections::BTreeMap;

/// Best-match score of one labeled slot.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledScore {
    /// Template id the matcher ranked first.
    pub predicted: String,
    pub score: f32,
    /// Whether `predicted` equals the slot's ground-truth label.
    pub correct: bool,
}

/// Per-item threshold separating true from false positives.
///
/// With both kinds present the threshold is the midpoint between the lowest
/// true-positive and the highest false-positive score. Items with only true
/// positives get their lowest true-positive score; items with only false
/// positives get the midpoint between their highest score and 1.
pub fn derive_item_thresholds(samples: &[LabeledScore]) -> BTreeMap<String, f32> {
    let mut bounds: BTreeMap<&str, (Option<f32>, Option<f32>)> = BTreeMap::new();
    for sample in samples {
        if !sample.score.is_finite() {
            continue;
        }
        let (min_tp, max_fp) = bounds.entry(sample.predicted.as_str()).or_default();
        if sample.correct {
            *min_tp = Some(min_tp.map_or(sample.score, |m| m.min(sample.score)));
        } else {
            *max_fp = Some(max_fp.map_or(sample.score, |m| m.max(sample.score)));
        }
    }

    bounds
        .into_iter()
        .filter_map(|(id, bound)| {
            let threshold = match bound {
                (Some(tp), Some(fp)) => (tp + fp) * 0.5,
                (Some(tp), None) => tp,
                (None, Some(fp)) => (fp + 1.0) * 0.5,
                (None, None) => return None,
            };
            Some((id.to_owned(), threshold.clamp(f32::MIN_POSITIVE, 1.0)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{derive_item_thresholds, LabeledScore};

    fn sample(id: &str, score: f32, correct: bool) -> LabeledScore {
        LabeledScore {
            predicted: id.to_owned(),
            score,
            correct,
        }
    }

    #[test]
    fn midpoint_between_min_tp_and_max_fp() {
        let thresholds = derive_item_thresholds(&[
            sample("ghost", 0.92, true),
            sample("ghost", 0.88, true),
            sample("ghost", 0.70, false),
            sample("ghost", 0.76, false),
        ]);
        assert!((thresholds["ghost"] - 0.82).abs() < 1e-6);
    }

    #[test]
    fn single_sided_items() {
        let thresholds = derive_item_thresholds(&[
            sample("clover", 0.9, true),
            sample("moldy_cheese", 0.6, false),
        ]);
        assert!((thresholds["clover"] - 0.9).abs() < 1e-6);
        assert!((thresholds["moldy_cheese"] - 0.8).abs() < 1e-6);
    }
}
