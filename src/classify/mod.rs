//! Empty/occupied decision for a single slot.
//!
//! A slot is empty when its grayscale variance or mean falls below the
//! active thresholds. Slots that pass are refined with a Sobel edge scan:
//! when edge density in the outer ring dwarfs that of the center, the
//! variance comes from a frame or a clipped neighbour rather than an icon,
//! and the slot is reclassified as empty.

use crate::context::Biome;
use crate::grid::Slot;
use crate::image::RgbaView;
use crate::util::math::{gray_of, mean_var};
use crate::util::{IconMatchError, IconMatchResult};
use std::collections::HashMap;

/// Minimum statistics an occupied slot must reach.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EmptySlotThresholds {
    /// Grayscale variance below this means "flat".
    pub min_variance: f32,
    /// Grayscale mean below this means "dark".
    pub min_mean: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierConfig {
    pub thresholds: EmptySlotThresholds,
    /// Per-biome replacements for `thresholds`.
    pub biome_overrides: HashMap<Biome, EmptySlotThresholds>,
    /// Enables the border-artifact refinement.
    pub edge_refinement: bool,
    /// Sobel magnitude counted as an edge.
    pub edge_threshold: f32,
    /// Outer ring thickness as a fraction of the slot's smaller side.
    pub border_fraction: f32,
    /// Border/center edge density ratio above which a slot is an artifact.
    pub max_edge_ratio: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let mut biome_overrides = HashMap::new();
        // Flames and glow wash out icon texture in hell frames.
        biome_overrides.insert(
            Biome::Hell,
            EmptySlotThresholds {
                min_variance: 90.0,
                min_mean: 20.0,
            },
        );
        Self {
            thresholds: EmptySlotThresholds {
                min_variance: 150.0,
                min_mean: 20.0,
            },
            biome_overrides,
            edge_refinement: true,
            edge_threshold: 60.0,
            border_fraction: 0.2,
            max_edge_ratio: 4.0,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> IconMatchResult<()> {
        let check = |t: &EmptySlotThresholds| {
            if !(t.min_variance > 0.0) || t.min_mean < 0.0 {
                Err(IconMatchError::config(
                    "empty-slot variance threshold must be positive and mean threshold non-negative",
                ))
            } else {
                Ok(())
            }
        };
        check(&self.thresholds)?;
        for t in self.biome_overrides.values() {
            check(t)?;
        }
        if !(0.0..0.5).contains(&self.border_fraction) {
            return Err(IconMatchError::config("border_fraction must lie in [0, 0.5)"));
        }
        if !(self.max_edge_ratio > 0.0) {
            return Err(IconMatchError::config("max_edge_ratio must be positive"));
        }
        Ok(())
    }

    /// Thresholds in force for `biome`.
    pub fn thresholds_for(&self, biome: Option<Biome>) -> EmptySlotThresholds {
        biome
            .and_then(|b| self.biome_overrides.get(&b))
            .copied()
            .unwrap_or(self.thresholds)
    }
}

/// Low-level texture measurements of one slot.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SlotStats {
    pub mean: f32,
    pub variance: f32,
    /// Fraction of interior pixels whose Sobel magnitude exceeds the threshold.
    pub edge_density: f32,
    pub border_edge_density: f32,
    pub center_edge_density: f32,
    /// `border_edge_density / center_edge_density`; infinite when only the
    /// border has edges, zero when neither does.
    pub edge_ratio: f32,
}

/// Outcome of classifying one slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    Occupied,
    /// Variance below threshold.
    Flat,
    /// Mean below threshold.
    Dark,
    /// Edges concentrated in the outer ring.
    BorderArtifact,
    /// The slot rectangle does not lie inside the image.
    OutOfBounds,
}

impl SlotState {
    pub fn is_occupied(self) -> bool {
        self == SlotState::Occupied
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SlotClassification {
    pub state: SlotState,
    pub stats: SlotStats,
}

impl SlotClassification {
    pub fn is_occupied(&self) -> bool {
        self.state.is_occupied()
    }
}

/// Grayscale copy of `view` into `gray`.
fn fill_gray(view: RgbaView<'_>, gray: &mut Vec<f32>) {
    gray.clear();
    gray.reserve(view.width() * view.height());
    for y in 0..view.height() {
        for x in 0..view.width() {
            gray.push(view.get(x, y).map_or(0.0, gray_of));
        }
    }
}

/// Computes [`SlotStats`]; `gray` is scratch space.
pub fn slot_stats(view: RgbaView<'_>, cfg: &ClassifierConfig, gray: &mut Vec<f32>) -> SlotStats {
    fill_gray(view, gray);
    let (w, h) = (view.width(), view.height());
    let (mean, variance) = mean_var(gray.iter().copied());

    let ring = (w.min(h) as f32 * cfg.border_fraction).round() as usize;
    let threshold_sq = cfg.edge_threshold * cfg.edge_threshold;
    let (mut edges, mut total) = (0usize, 0usize);
    let (mut border_edges, mut border_total) = (0usize, 0usize);
    let (mut center_edges, mut center_total) = (0usize, 0usize);

    if w >= 3 && h >= 3 {
        let at = |x: usize, y: usize| gray[y * w + x];
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                    - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
                let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                    - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
                let is_edge = gx * gx + gy * gy > threshold_sq;
                let in_border = x < ring || y < ring || x >= w - ring || y >= h - ring;

                total += 1;
                edges += is_edge as usize;
                if in_border {
                    border_total += 1;
                    border_edges += is_edge as usize;
                } else {
                    center_total += 1;
                    center_edges += is_edge as usize;
                }
            }
        }
    }

    let density = |e: usize, n: usize| if n == 0 { 0.0 } else { e as f32 / n as f32 };
    let border_edge_density = density(border_edges, border_total);
    let center_edge_density = density(center_edges, center_total);
    let edge_ratio = if center_edge_density > 0.0 {
        border_edge_density / center_edge_density
    } else if border_edge_density > 0.0 {
        f32::INFINITY
    } else {
        0.0
    };

    SlotStats {
        mean,
        variance,
        edge_density: density(edges, total),
        border_edge_density,
        center_edge_density,
        edge_ratio,
    }
}

/// Classifies a slot view under the thresholds for `biome`.
pub fn classify_view(
    view: RgbaView<'_>,
    cfg: &ClassifierConfig,
    biome: Option<Biome>,
    gray: &mut Vec<f32>,
) -> SlotClassification {
    let stats = slot_stats(view, cfg, gray);
    let thresholds = cfg.thresholds_for(biome);
    let state = if stats.variance < thresholds.min_variance {
        SlotState::Flat
    } else if stats.mean < thresholds.min_mean {
        SlotState::Dark
    } else if cfg.edge_refinement && stats.edge_ratio > cfg.max_edge_ratio {
        SlotState::BorderArtifact
    } else {
        SlotState::Occupied
    };
    SlotClassification { state, stats }
}

/// Classifies `slot` inside `image`; slots reaching outside are empty.
pub fn classify_slot(
    image: RgbaView<'_>,
    slot: &Slot,
    cfg: &ClassifierConfig,
    biome: Option<Biome>,
    gray: &mut Vec<f32>,
) -> SlotClassification {
    match image.roi(slot.x, slot.y, slot.width, slot.height) {
        Ok(view) => classify_view(view, cfg, biome, gray),
        Err(_) => SlotClassification {
            state: SlotState::OutOfBounds,
            stats: SlotStats::default(),
        },
    }
}
