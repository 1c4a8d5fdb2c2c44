//! Center cropping, grayscale reduction and area-averaging resampling.
//!
//! Resampling is separable: a horizontal pass into an intermediate buffer,
//! then a vertical pass into the destination. Each destination sample is the
//! exact box-filter average of the source area it covers, so downscaling by
//! an integer factor reduces to a plain block mean. All buffers are supplied
//! by the caller and reused across calls.

use crate::image::RgbaView;
use crate::util::math::gray_of;

/// Pixel rectangle `(x, y, width, height)` left after trimming a margin.
pub fn center_crop_rect(width: usize, height: usize, margin: f32) -> (usize, usize, usize, usize) {
    let mx = (width as f32 * margin).round() as usize;
    let my = (height as f32 * margin).round() as usize;
    if width <= 2 * mx || height <= 2 * my {
        return (0, 0, width, height);
    }
    (mx, my, width - 2 * mx, height - 2 * my)
}

/// Writes the grayscale center crop of `view` into `out`, returning its size.
pub fn gray_center_crop(view: RgbaView<'_>, margin: f32, out: &mut Vec<f32>) -> (usize, usize) {
    let (x0, y0, w, h) = center_crop_rect(view.width(), view.height(), margin);
    out.clear();
    out.reserve(w * h);
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            out.push(view.get(x, y).map_or(0.0, gray_of));
        }
    }
    (w, h)
}

/// Visits `(source index, weight)` pairs covering destination sample `i`.
#[inline]
fn for_each_area_weight(src_n: usize, dst_n: usize, i: usize, mut f: impl FnMut(usize, f32)) {
    let scale = src_n as f64 / dst_n as f64;
    let start = i as f64 * scale;
    let end = (i + 1) as f64 * scale;
    let first = start.floor() as usize;
    let last = (end.ceil() as usize).min(src_n);
    for j in first..last {
        let overlap = end.min((j + 1) as f64) - start.max(j as f64);
        if overlap > 0.0 {
            f(j, (overlap / scale) as f32);
        }
    }
}

/// Area-averaging resize of a row-major grayscale buffer.
///
/// `tmp` holds the horizontal pass; both `tmp` and `dst` are resized as
/// needed and keep their capacity between calls.
pub fn resize_area(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    dst: &mut Vec<f32>,
    dst_w: usize,
    dst_h: usize,
    tmp: &mut Vec<f32>,
) {
    dst.clear();
    dst.resize(dst_w * dst_h, 0.0);
    if src_w == 0 || src_h == 0 || src.len() < src_w * src_h {
        return;
    }
    if src_w == dst_w && src_h == dst_h {
        dst.copy_from_slice(&src[..dst_w * dst_h]);
        return;
    }

    tmp.clear();
    tmp.resize(dst_w * src_h, 0.0);
    for y in 0..src_h {
        let row = &src[y * src_w..(y + 1) * src_w];
        let out = &mut tmp[y * dst_w..(y + 1) * dst_w];
        for (dx, slot) in out.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for_each_area_weight(src_w, dst_w, dx, |j, w| acc += row[j] * w);
            *slot = acc;
        }
    }

    for dy in 0..dst_h {
        let out = &mut dst[dy * dst_w..(dy + 1) * dst_w];
        for_each_area_weight(src_h, dst_h, dy, |j, w| {
            let row = &tmp[j * dst_w..(j + 1) * dst_w];
            for (o, v) in out.iter_mut().zip(row) {
                *o += v * w;
            }
        });
    }
}
