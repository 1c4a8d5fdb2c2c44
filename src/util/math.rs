//! Numeric helpers shared by the grid, classifier and calibration stages.

/// Scales a base measurement and rounds to the nearest whole pixel.
pub(crate) fn scale_px(base: f32, scale: f32) -> i64 {
    (base * scale).round() as i64
}

/// Clamps `value` into `[lo, hi]`, mapping NaN to `lo`.
pub(crate) fn clamp_unit(value: f32, lo: f32, hi: f32) -> f32 {
    if value.is_nan() {
        return lo;
    }
    value.max(lo).min(hi)
}

/// Grayscale intensity as the plain average of the color channels.
#[inline]
pub(crate) fn gray_of(px: [u8; 4]) -> f32 {
    (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0
}

/// HSV-style saturation in `[0, 1]`.
#[inline]
pub(crate) fn saturation_of(px: [u8; 4]) -> f32 {
    let max = px[0].max(px[1]).max(px[2]) as f32;
    let min = px[0].min(px[1]).min(px[2]) as f32;
    if max <= 0.0 {
        0.0
    } else {
        (max - min) / max
    }
}

/// Most frequent value; ties resolve to the smallest value.
pub(crate) fn modal_value(values: &[usize]) -> Option<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mut best: Option<(usize, usize)> = None;
    let mut idx = 0;
    while idx < sorted.len() {
        let value = sorted[idx];
        let mut run = 1;
        while idx + run < sorted.len() && sorted[idx + run] == value {
            run += 1;
        }
        match best {
            Some((_, count)) if count >= run => {}
            _ => best = Some((value, run)),
        }
        idx += run;
    }
    best.map(|(value, _)| value)
}

/// Mean and population variance of a sample stream.
pub(crate) fn mean_var(values: impl Iterator<Item = f32>) -> (f32, f32) {
    let mut n = 0u64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for v in values {
        let v = v as f64;
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    (mean as f32, var as f32)
}
