//! Normalized cross-correlation on equal-sized grayscale buffers.
//!
//! An [`NccPlan`] stores a zero-mean copy of a buffer together with its
//! energy `Σ(x - mean)²`, so correlating two plans is a single dot product:
//!
//! `ncc = Σ a'·b' / sqrt(energy_a · energy_b)`
//!
//! which equals `(E[xy] − E[x]E[y]) / sqrt(Var[x]·Var[y])`. Similarity is the
//! correlation remapped from `[-1, 1]` to `[0, 1]`; a flat buffer on either
//! side yields similarity 0.

use crate::util::{IconMatchError, IconMatchResult};

pub mod scalar;
#[cfg(feature = "simd")]
pub mod simd;

pub use scalar::ScalarKernel;
#[cfg(feature = "simd")]
pub use simd::SimdKernel;

/// Kernel used by the matcher: SIMD when the `simd` feature is enabled.
#[cfg(not(feature = "simd"))]
pub type DefaultKernel = ScalarKernel;
#[cfg(feature = "simd")]
pub type DefaultKernel = SimdKernel;

/// Energy below which a buffer is treated as flat.
pub const MIN_ENERGY: f32 = 1e-6;

/// Zero-mean buffer and energy for one side of a correlation.
#[derive(Clone, Debug, Default)]
pub struct NccPlan {
    width: usize,
    height: usize,
    mean: f32,
    energy: f32,
    zero_mean: Vec<f32>,
}

impl NccPlan {
    /// Builds a plan from a row-major grayscale buffer.
    pub fn from_gray(data: &[f32], width: usize, height: usize) -> IconMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(IconMatchError::InvalidDimensions { width, height });
        }
        let needed = width * height;
        if data.len() != needed {
            return Err(IconMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        let mut plan = Self::default();
        plan.refill(data, width, height);
        Ok(plan)
    }

    /// Recomputes the plan in place, reusing the zero-mean allocation.
    pub(crate) fn refill(&mut self, data: &[f32], width: usize, height: usize) {
        let n = data.len().min(width * height);
        let sum: f64 = data[..n].iter().map(|&v| v as f64).sum();
        let mean = if n == 0 { 0.0 } else { sum / n as f64 };

        self.zero_mean.clear();
        let mut energy = 0.0f64;
        for &v in &data[..n] {
            let d = v as f64 - mean;
            energy += d * d;
            self.zero_mean.push(d as f32);
        }
        self.width = width;
        self.height = height;
        self.mean = mean as f32;
        self.energy = energy as f32;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Population variance of the source buffer.
    pub fn variance(&self) -> f32 {
        let n = self.zero_mean.len();
        if n == 0 {
            0.0
        } else {
            self.energy / n as f32
        }
    }

    /// Sum of squared deviations from the mean.
    pub fn energy(&self) -> f32 {
        self.energy
    }

    /// Zero-mean samples in row-major order.
    pub fn zero_mean(&self) -> &[f32] {
        &self.zero_mean
    }

    /// True when the buffer has no usable intensity variation.
    pub fn is_degenerate(&self) -> bool {
        self.energy <= MIN_ENERGY
    }
}

/// Dot-product backend for NCC evaluation.
pub trait Kernel {
    /// Returns `Σ a[i]·b[i]` over two equal-length slices.
    fn dot(a: &[f32], b: &[f32]) -> f32;

    /// Raw correlation in `[-1, 1]`, or `None` when either side is flat or the
    /// plans differ in size.
    fn correlate(a: &NccPlan, b: &NccPlan) -> Option<f32> {
        if a.width != b.width || a.height != b.height || a.zero_mean.len() != b.zero_mean.len() {
            return None;
        }
        if a.is_degenerate() || b.is_degenerate() {
            return None;
        }
        let denom = (a.energy as f64 * b.energy as f64).sqrt();
        let ncc = Self::dot(&a.zero_mean, &b.zero_mean) as f64 / denom;
        if ncc.is_finite() {
            Some(ncc.clamp(-1.0, 1.0) as f32)
        } else {
            None
        }
    }

    /// Correlation remapped to `[0, 1]`; flat inputs score 0.
    fn similarity(a: &NccPlan, b: &NccPlan) -> f32 {
        Self::correlate(a, b).map_or(0.0, |ncc| (ncc + 1.0) * 0.5)
    }
}

/// Similarity of two raw grayscale buffers of the same shape.
///
/// Mismatched or empty buffers score 0.
pub fn ncc_similarity(a: &[f32], b: &[f32], width: usize, height: usize) -> f32 {
    match (
        NccPlan::from_gray(a, width, height),
        NccPlan::from_gray(b, width, height),
    ) {
        (Ok(pa), Ok(pb)) => DefaultKernel::similarity(&pa, &pb),
        _ => 0.0,
    }
}
