//! Candidate slot geometry.
//!
//! The fixed-ratio locator scales measurements calibrated at a reference
//! resolution by `height / reference_height` and lays rows out from the
//! bottom of the frame upward. The adaptive locator (see [`adaptive`])
//! measures the real on-screen icon pitch from rarity border colors and
//! falls back to the fixed layout when it cannot.

use crate::image::RgbaView;
use crate::library::RarityPalette;
use crate::trace::{trace_event, trace_span};
use crate::util::math::scale_px;
use crate::util::{IconMatchError, IconMatchResult};

pub mod adaptive;

pub use adaptive::AdaptiveGridConfig;

/// Rectangle hypothesized to hold one inventory icon.
///
/// Always lies fully inside the image it was computed for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    /// Row index counted from the bottom row (0) upward.
    pub row: usize,
    /// Column index counted from the left.
    pub col: usize,
}

impl Slot {
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Intersection over union with another slot.
    pub fn iou(&self, other: &Slot) -> f32 {
        let ix = self.right().min(other.right()).saturating_sub(self.x.max(other.x));
        let iy = self.bottom().min(other.bottom()).saturating_sub(self.y.max(other.y));
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union == 0 {
            0.0
        } else {
            inter as f32 / union as f32
        }
    }

    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

/// How slot positions are derived.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GridMode {
    /// Pure resolution-derived layout.
    Fixed,
    /// Measure icon pitch from pixels, falling back to `Fixed`.
    Adaptive,
}

/// Base grid measurements calibrated at `reference_height`.
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
    /// Frame height the base measurements were taken at.
    pub reference_height: f32,
    pub icon_size: f32,
    /// Horizontal gap between neighbouring icons.
    pub spacing: f32,
    /// Distance from the frame bottom to the bottom edge of row 0.
    pub bottom_margin: f32,
    /// Vertical distance between consecutive row origins.
    pub row_pitch: f32,
    pub max_rows: usize,
    /// Rows may not start above `height * min_y_fraction`.
    pub min_y_fraction: f32,
    /// Fraction of the width excluded on each side.
    pub side_margin_fraction: f32,
    pub mode: GridMode,
    pub adaptive: AdaptiveGridConfig,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            reference_height: 720.0,
            icon_size: 40.0,
            spacing: 4.0,
            bottom_margin: 12.0,
            row_pitch: 44.0,
            max_rows: 3,
            min_y_fraction: 0.70,
            side_margin_fraction: 0.20,
            mode: GridMode::Fixed,
            adaptive: AdaptiveGridConfig::default(),
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> IconMatchResult<()> {
        if !(self.reference_height > 0.0) {
            return Err(IconMatchError::config("reference_height must be positive"));
        }
        if !(self.icon_size > 0.0) || self.spacing < 0.0 || self.bottom_margin < 0.0 {
            return Err(IconMatchError::config(
                "icon_size must be positive, spacing and bottom_margin non-negative",
            ));
        }
        if !(self.row_pitch > 0.0) {
            return Err(IconMatchError::config("row_pitch must be positive"));
        }
        if !(0.0..=1.0).contains(&self.min_y_fraction) {
            return Err(IconMatchError::config("min_y_fraction must lie in [0, 1]"));
        }
        if !(0.0..0.5).contains(&self.side_margin_fraction) {
            return Err(IconMatchError::config(
                "side_margin_fraction must lie in [0, 0.5)",
            ));
        }
        self.adaptive.validate()
    }
}

/// Base measurements scaled to one frame, in whole pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScaledGrid {
    pub icon: i64,
    pub spacing: i64,
    pub bottom_margin: i64,
    pub row_pitch: i64,
    /// Smallest admissible row origin.
    pub min_y: i64,
}

impl ScaledGrid {
    /// Scales `cfg` to a frame height; `None` when icons round to nothing.
    pub fn for_height(height: usize, cfg: &GridConfig) -> Option<Self> {
        let scale = height as f32 / cfg.reference_height;
        let icon = scale_px(cfg.icon_size, scale);
        if icon < 1 {
            return None;
        }
        Some(Self {
            icon,
            spacing: scale_px(cfg.spacing, scale).max(0),
            bottom_margin: scale_px(cfg.bottom_margin, scale).max(0),
            row_pitch: scale_px(cfg.row_pitch, scale).max(1),
            min_y: (height as f32 * cfg.min_y_fraction).ceil() as i64,
        })
    }

    pub fn pitch(&self) -> i64 {
        self.icon + self.spacing
    }

    /// Row origins from the bottom upward, stopping at the first row that
    /// would start above `min_y` or outside the frame.
    pub fn row_origins(&self, height: usize, max_rows: usize) -> Vec<i64> {
        let mut rows = Vec::new();
        for r in 0..max_rows as i64 {
            let y = height as i64 - self.bottom_margin - r * self.row_pitch - self.icon;
            if y < self.min_y || y < 0 {
                break;
            }
            rows.push(y);
        }
        rows
    }
}

/// Where a layout came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayoutSource {
    Fixed,
    /// Adaptive scan succeeded with this measured pitch.
    Adaptive { pitch: usize },
    /// Adaptive scan was requested but found too few edges.
    AdaptiveFallback,
}

/// Slots for one frame plus how they were obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct GridLayout {
    pub slots: Vec<Slot>,
    pub source: LayoutSource,
}

/// Fixed-ratio slot layout for a frame of `width x height`.
///
/// Slots are row-major: rows from the bottom upward, columns left to right,
/// with the column block centered horizontally. Returns an empty list when
/// no row satisfies the minimum-Y bound.
pub fn locate_fixed(width: usize, height: usize, cfg: &GridConfig) -> Vec<Slot> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let Some(grid) = ScaledGrid::for_height(height, cfg) else {
        return Vec::new();
    };

    let usable = (width as f32 * (1.0 - 2.0 * cfg.side_margin_fraction)).floor() as i64;
    if usable < grid.icon {
        return Vec::new();
    }
    let cols = (usable + grid.spacing) / grid.pitch();
    let block = cols * grid.icon + (cols - 1) * grid.spacing;
    let x0 = (width as i64 - block) / 2;

    let rows = grid.row_origins(height, cfg.max_rows);
    emit_slots(width, height, &rows, x0, cols, grid.icon, grid.pitch())
}

/// Computes the slot layout according to `cfg.mode`.
pub fn locate(image: RgbaView<'_>, cfg: &GridConfig, palette: &RarityPalette) -> GridLayout {
    let _span = trace_span!("locate_grid", width = image.width(), height = image.height()).entered();
    let layout = match cfg.mode {
        GridMode::Fixed => GridLayout {
            slots: locate_fixed(image.width(), image.height(), cfg),
            source: LayoutSource::Fixed,
        },
        GridMode::Adaptive => match adaptive::locate_adaptive(image, cfg, palette) {
            Some(layout) => layout,
            None => GridLayout {
                slots: locate_fixed(image.width(), image.height(), cfg),
                source: LayoutSource::AdaptiveFallback,
            },
        },
    };
    trace_event!("grid_located", slots = layout.slots.len());
    layout
}

/// Emits one slot per (row, column) cell, dropping any that leave the frame.
pub(crate) fn emit_slots(
    width: usize,
    height: usize,
    rows: &[i64],
    x0: i64,
    cols: i64,
    icon: i64,
    pitch: i64,
) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(rows.len() * cols.max(0) as usize);
    for (row, &y) in rows.iter().enumerate() {
        for col in 0..cols.max(0) {
            let x = x0 + col * pitch;
            if x < 0 || y < 0 {
                continue;
            }
            let slot = Slot {
                x: x as usize,
                y: y as usize,
                width: icon as usize,
                height: icon as usize,
                row,
                col: col as usize,
            };
            if slot.fits_within(width, height) {
                slots.push(slot);
            }
        }
    }
    slots
}
