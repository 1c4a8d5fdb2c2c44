//! Pixel-driven hotbar measurement.
//!
//! 1. Slide an icon-high window over the lower part of the frame and score
//!    each position by mean brightness, intensity spread and saturation
//!    (sampled on a sparse column grid). The best window is the hotbar band.
//! 2. Walk a few horizontal lines inside the band, recording the start of
//!    every short run of rarity border color as an icon edge.
//! 3. The modal distance between edges is the on-screen icon pitch. It
//!    rescales the base icon and row measurements; the first edge anchors
//!    column 0.
//!
//! Fewer than two edges, or no plausible pitch, yields `None` and the caller
//! falls back to the fixed layout.

use crate::grid::{emit_slots, GridConfig, GridLayout, LayoutSource, ScaledGrid};
use crate::image::RgbaView;
use crate::library::RarityPalette;
use crate::trace::trace_event;
use crate::util::math::{gray_of, modal_value, saturation_of, scale_px};
use crate::util::{IconMatchError, IconMatchResult};

/// Tuning for the adaptive locator. Pixel lengths are at reference height.
#[derive(Clone, Debug, PartialEq)]
pub struct AdaptiveGridConfig {
    /// Band search starts at `height * search_top_fraction`.
    pub search_top_fraction: f32,
    /// Number of sampled columns per row when scoring bands.
    pub sample_columns: usize,
    pub brightness_weight: f32,
    pub variance_weight: f32,
    pub saturation_weight: f32,
    /// Bands scoring below this are treated as "no hotbar".
    pub min_band_score: f32,
    /// Horizontal lines scanned inside the band.
    pub scan_lines: usize,
    /// Accepted border run length range.
    pub min_run: f32,
    pub max_run: f32,
    /// Edges closer than this are merged.
    pub merge_distance: f32,
    /// Plausible pitch range as multiples of the fixed pitch.
    pub min_pitch_ratio: f32,
    pub max_pitch_ratio: f32,
}

impl Default for AdaptiveGridConfig {
    fn default() -> Self {
        Self {
            search_top_fraction: 0.55,
            sample_columns: 160,
            brightness_weight: 0.3,
            variance_weight: 0.4,
            saturation_weight: 0.3,
            min_band_score: 0.08,
            scan_lines: 5,
            min_run: 2.0,
            max_run: 6.0,
            merge_distance: 2.0,
            min_pitch_ratio: 0.6,
            max_pitch_ratio: 2.5,
        }
    }
}

impl AdaptiveGridConfig {
    pub fn validate(&self) -> IconMatchResult<()> {
        if !(0.0..1.0).contains(&self.search_top_fraction) {
            return Err(IconMatchError::config(
                "search_top_fraction must lie in [0, 1)",
            ));
        }
        if self.sample_columns == 0 || self.scan_lines == 0 {
            return Err(IconMatchError::config(
                "sample_columns and scan_lines must be at least 1",
            ));
        }
        if self.min_run < 1.0 || self.max_run < self.min_run {
            return Err(IconMatchError::config("border run range is invalid"));
        }
        if !(self.min_pitch_ratio > 0.0) || self.max_pitch_ratio < self.min_pitch_ratio {
            return Err(IconMatchError::config("pitch ratio range is invalid"));
        }
        Ok(())
    }
}

/// Per-row aggregates over the sampled columns.
#[derive(Copy, Clone, Default)]
struct RowStats {
    sum: f64,
    sum_sq: f64,
    sat: f64,
    n: usize,
}

fn row_stats(image: RgbaView<'_>, y: usize, step: usize) -> RowStats {
    let mut stats = RowStats::default();
    let mut x = step / 2;
    while x < image.width() {
        if let Some(px) = image.get(x, y) {
            let g = gray_of(px) as f64;
            stats.sum += g;
            stats.sum_sq += g * g;
            stats.sat += saturation_of(px) as f64;
            stats.n += 1;
        }
        x += step;
    }
    stats
}

/// Top row and score of the best-scoring band of `band_height` rows.
pub(crate) fn find_hotbar_band(
    image: RgbaView<'_>,
    band_height: usize,
    cfg: &AdaptiveGridConfig,
) -> Option<(usize, f32)> {
    let h = image.height();
    let top = (h as f32 * cfg.search_top_fraction).floor() as usize;
    if band_height == 0 || top + band_height > h {
        return None;
    }
    let step = (image.width() / cfg.sample_columns).max(1);
    let rows: Vec<RowStats> = (top..h).map(|y| row_stats(image, y, step)).collect();

    let mut acc = RowStats::default();
    for r in &rows[..band_height] {
        accumulate(&mut acc, r, 1.0);
    }

    let mut best: Option<(usize, f32)> = None;
    for start in 0..=rows.len() - band_height {
        if start > 0 {
            accumulate(&mut acc, &rows[start - 1], -1.0);
            accumulate(&mut acc, &rows[start + band_height - 1], 1.0);
        }
        let score = band_score(&acc, cfg);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((top + start, score));
        }
    }
    best.filter(|&(_, score)| score >= cfg.min_band_score)
}

fn accumulate(acc: &mut RowStats, row: &RowStats, sign: f64) {
    acc.sum += sign * row.sum;
    acc.sum_sq += sign * row.sum_sq;
    acc.sat += sign * row.sat;
    if sign > 0.0 {
        acc.n += row.n;
    } else {
        acc.n -= row.n;
    }
}

fn band_score(acc: &RowStats, cfg: &AdaptiveGridConfig) -> f32 {
    if acc.n == 0 {
        return 0.0;
    }
    let n = acc.n as f64;
    let mean = acc.sum / n;
    let var = (acc.sum_sq / n - mean * mean).max(0.0);
    let brightness = mean / 255.0;
    let spread = (var.sqrt() / 64.0).min(1.0);
    let saturation = acc.sat / n;
    (cfg.brightness_weight as f64 * brightness
        + cfg.variance_weight as f64 * spread
        + cfg.saturation_weight as f64 * saturation) as f32
}

/// Start x of every border-colored run with length in `[min_run, max_run]`
/// along row `y`.
pub(crate) fn border_run_starts(
    image: RgbaView<'_>,
    y: usize,
    palette: &RarityPalette,
    min_run: usize,
    max_run: usize,
) -> Vec<usize> {
    let mut edges = Vec::new();
    let mut run_start: Option<usize> = None;
    for x in 0..=image.width() {
        let is_border = x < image.width()
            && image
                .get(x, y)
                .and_then(|px| palette.classify(px))
                .is_some();
        match (is_border, run_start) {
            (true, None) => run_start = Some(x),
            (false, Some(start)) => {
                let len = x - start;
                if (min_run..=max_run).contains(&len) {
                    edges.push(start);
                }
                run_start = None;
            }
            _ => {}
        }
    }
    edges
}

/// Sorted edges with near-duplicates merged into their first member.
fn merge_edges(mut edges: Vec<usize>, distance: usize) -> Vec<usize> {
    edges.sort_unstable();
    let mut merged: Vec<usize> = Vec::with_capacity(edges.len());
    for x in edges {
        match merged.last() {
            Some(&last) if x - last <= distance => {}
            _ => merged.push(x),
        }
    }
    merged
}

/// Modal distance between edge pairs that falls inside `[lo, hi]`.
///
/// Every pair within range votes, so left and right borders of the same
/// icon both reinforce the true pitch.
pub(crate) fn modal_pitch(edges: &[usize], lo: usize, hi: usize) -> Option<usize> {
    let mut gaps = Vec::new();
    for (i, &a) in edges.iter().enumerate() {
        for &b in &edges[i + 1..] {
            let gap = b - a;
            if gap > hi {
                break;
            }
            if gap >= lo {
                gaps.push(gap);
            }
        }
    }
    let mode = modal_value(&gaps)?;
    // Average the votes within one pixel of the mode to absorb rounding.
    let near: Vec<usize> = gaps
        .iter()
        .copied()
        .filter(|g| g.abs_diff(mode) <= 1)
        .collect();
    let mean = near.iter().sum::<usize>() as f32 / near.len() as f32;
    Some(mean.round() as usize)
}

/// Adaptive layout, or `None` when the frame offers too little evidence.
pub fn locate_adaptive(
    image: RgbaView<'_>,
    cfg: &GridConfig,
    palette: &RarityPalette,
) -> Option<GridLayout> {
    let (width, height) = (image.width(), image.height());
    let base = ScaledGrid::for_height(height, cfg)?;
    let acfg = &cfg.adaptive;
    let scale = height as f32 / cfg.reference_height;

    let (band_y, band_score) = find_hotbar_band(image, base.icon as usize, acfg)?;

    let min_run = scale_px(acfg.min_run, scale).max(1) as usize;
    let max_run = (scale_px(acfg.max_run, scale) as usize).max(min_run);
    let mut edges = Vec::new();
    for k in 1..=acfg.scan_lines {
        let y = band_y + k * base.icon as usize / (acfg.scan_lines + 1);
        edges.extend(border_run_starts(image, y, palette, min_run, max_run));
    }
    let merge = scale_px(acfg.merge_distance, scale).max(0) as usize;
    let edges = merge_edges(edges, merge);
    if edges.len() < 2 {
        trace_event!("adaptive_grid_fallback", edges = edges.len(), band_y = band_y);
        return None;
    }

    let fixed_pitch = base.pitch() as f32;
    let lo = (fixed_pitch * acfg.min_pitch_ratio).round().max(1.0) as usize;
    let hi = (fixed_pitch * acfg.max_pitch_ratio).round() as usize;
    let pitch = modal_pitch(&edges, lo, hi)?;

    let ratio = pitch as f32 / fixed_pitch;
    let icon = ((base.icon as f32 * ratio).round() as i64).clamp(1, pitch as i64);
    let grid = ScaledGrid {
        icon,
        spacing: pitch as i64 - icon,
        row_pitch: ((base.row_pitch as f32 * ratio).round() as i64).max(1),
        ..base
    };

    let first = edges[0] as i64;
    let last = edges[edges.len() - 1] as i64;
    let mut cols = (last - first) / pitch as i64 + 1;
    let max_cols = (width as i64 - first - icon) / pitch as i64 + 1;
    cols = cols.min(max_cols);

    let rows = grid.row_origins(height, cfg.max_rows);
    let slots = emit_slots(width, height, &rows, first, cols, icon, pitch as i64);
    trace_event!(
        "adaptive_grid",
        pitch = pitch,
        edges = edges.len(),
        band_y = band_y,
        band_score = band_score,
        slots = slots.len()
    );
    if slots.is_empty() {
        return None;
    }
    Some(GridLayout {
        slots,
        source: LayoutSource::Adaptive { pitch },
    })
}
