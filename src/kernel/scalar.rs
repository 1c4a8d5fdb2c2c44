//! Scalar reference kernel.

use crate::kernel::Kernel;

/// Plain sequential dot product.
pub struct ScalarKernel;

impl Kernel for ScalarKernel {
    #[inline]
    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::ScalarKernel;
    use crate::kernel::{Kernel, NccPlan};

    #[test]
    fn inverted_buffer_has_zero_similarity() {
        let a: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let b: Vec<f32> = a.iter().map(|v| 15.0 - v).collect();
        let pa = NccPlan::from_gray(&a, 4, 4).unwrap();
        let pb = NccPlan::from_gray(&b, 4, 4).unwrap();
        let ncc = ScalarKernel::correlate(&pa, &pb).unwrap();
        assert!((ncc + 1.0).abs() < 1e-5);
        assert!(ScalarKernel::similarity(&pa, &pb) < 1e-5);
    }

    #[test]
    fn brightness_offset_does_not_change_score() {
        let a: Vec<f32> = (0..25).map(|v| ((v * 7) % 11) as f32).collect();
        let b: Vec<f32> = a.iter().map(|v| v * 2.0 + 30.0).collect();
        let pa = NccPlan::from_gray(&a, 5, 5).unwrap();
        let pb = NccPlan::from_gray(&b, 5, 5).unwrap();
        assert!((ScalarKernel::similarity(&pa, &pb) - 1.0).abs() < 1e-5);
    }
}
