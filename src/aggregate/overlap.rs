//! Suppression of detections whose slots overlap.

use crate::aggregate::Detection;

/// Keeps the strongest of any group of overlapping detections.
///
/// Detections are visited by descending raw score (ties by slot position)
/// and kept unless their slot overlaps an already kept one by more than
/// `max_iou`. The survivors are returned in visiting order.
pub fn suppress_overlaps(mut detections: Vec<Detection>, max_iou: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.raw_score
            .total_cmp(&a.raw_score)
            .then_with(|| a.slot.y.cmp(&b.slot.y))
            .then_with(|| a.slot.x.cmp(&b.slot.x))
            .then_with(|| a.template_index.cmp(&b.template_index))
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    'outer: for det in detections {
        for k in &kept {
            if det.slot.iou(&k.slot) > max_iou {
                continue 'outer;
            }
        }
        kept.push(det);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::suppress_overlaps;
    use crate::aggregate::Detection;
    use crate::grid::Slot;

    fn det(id: &str, x: usize, score: f32) -> Detection {
        Detection {
            template_id: id.to_owned(),
            template_index: 0,
            raw_score: score,
            confidence: score,
            slot: Slot {
                x,
                y: 0,
                width: 10,
                height: 10,
                row: 0,
                col: 0,
            },
            rarity: None,
        }
    }

    #[test]
    fn overlapping_weaker_detection_is_dropped() {
        let kept = suppress_overlaps(vec![det("a", 0, 0.8), det("b", 1, 0.9), det("c", 30, 0.7)], 0.5);
        let ids: Vec<&str> = kept.iter().map(|d| d.template_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
