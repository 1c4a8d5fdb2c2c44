//! SIMD dot product using the `wide` crate.
//!
//! Processes eight lanes at a time with `f32x8`, then folds the remainder
//! with scalar arithmetic.

use crate::kernel::Kernel;
use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

#[inline]
fn hsum(v: f32x8) -> f32 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3] + arr[4] + arr[5] + arr[6] + arr[7]
}

/// Eight-lane dot product.
pub struct SimdKernel;

impl Kernel for SimdKernel {
    fn dot(a: &[f32], b: &[f32]) -> f32 {
        let n = a.len().min(b.len());
        let simd_end = n / LANES * LANES;

        let mut acc = f32x8::ZERO;
        let mut i = 0;
        while i < simd_end {
            acc += load_f32x8(&a[i..]) * load_f32x8(&b[i..]);
            i += LANES;
        }

        let mut tail = 0.0f32;
        while i < n {
            tail += a[i] * b[i];
            i += 1;
        }
        hsum(acc) + tail
    }
}

#[cfg(test)]
mod tests {
    use super::SimdKernel;
    use crate::kernel::{Kernel, ScalarKernel};

    #[test]
    fn simd_dot_matches_scalar() {
        let a: Vec<f32> = (0..37).map(|v| (v as f32 * 0.37).sin()).collect();
        let b: Vec<f32> = (0..37).map(|v| (v as f32 * 0.11).cos()).collect();
        let s = ScalarKernel::dot(&a, &b);
        let v = SimdKernel::dot(&a, &b);
        assert!((s - v).abs() < 1e-4);
    }
}
