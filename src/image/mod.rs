//! Borrowed RGBA image views.
//!
//! `RgbaView` is a 2D view into an interleaved RGBA8 byte buffer with an
//! explicit stride. The stride counts pixels between the starts of
//! consecutive rows, so a stride larger than the width represents padded
//! rows. ROI slices are zero-copy views into the same backing slice and keep
//! the original stride.

use crate::util::{IconMatchError, IconMatchResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod resample;

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// Borrowed RGBA8 image view with an explicit pixel stride.
#[derive(Copy, Clone, Debug)]
pub struct RgbaView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> RgbaView<'a> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [u8], width: usize, height: usize) -> IconMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride in pixels.
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize) -> IconMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(IconMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in pixels between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing bytes including any row padding.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the pixel at `(x, y)` if it is within bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.stride + x) * CHANNELS;
        let px = self.data.get(idx..idx + CHANNELS)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Returns the interleaved bytes of row `y` (`width * 4` bytes).
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?.checked_mul(CHANNELS)?;
        let end = start.checked_add(self.width * CHANNELS)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(&self, x: usize, y: usize, width: usize, height: usize) -> IconMatchResult<RgbaView<'a>> {
        if width == 0 || height == 0 {
            return Err(IconMatchError::InvalidDimensions { width, height });
        }
        let out_of_bounds = IconMatchError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = (y * self.stride + x) * CHANNELS;
        let data = self
            .data
            .get(start..)
            .ok_or(IconMatchError::BufferTooSmall {
                needed: start.saturating_add(CHANNELS),
                got: self.data.len(),
            })?;
        RgbaView::new(data, width, height, self.stride)
    }
}

/// Owned contiguous RGBA8 image, mostly used to synthesize frames.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbaImageBuf {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl RgbaImageBuf {
    /// Creates an image filled with a single color.
    pub fn filled(width: usize, height: usize, px: [u8; 4]) -> IconMatchResult<Self> {
        let len = required_len(width, height, width)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..width * height {
            data.extend_from_slice(&px);
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Wraps an existing contiguous RGBA8 buffer.
    pub fn from_vec(data: Vec<u8>, width: usize, height: usize) -> IconMatchResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() != needed {
            return Err(IconMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Writes one pixel; out-of-bounds writes are ignored.
    pub fn put(&mut self, x: usize, y: usize, px: [u8; 4]) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * CHANNELS;
            self.data[idx..idx + CHANNELS].copy_from_slice(&px);
        }
    }

    /// Copies `src` with its top-left corner at `(x, y)`, clipping at the edges.
    pub fn blit(&mut self, src: RgbaView<'_>, x: usize, y: usize) {
        for sy in 0..src.height() {
            for sx in 0..src.width() {
                if let Some(px) = src.get(sx, sy) {
                    self.put(x + sx, y + sy, px);
                }
            }
        }
    }

    pub fn view(&self) -> RgbaView<'_> {
        RgbaView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}

/// Number of bytes a `width x height` view with `stride` must cover.
fn required_len(width: usize, height: usize, stride: usize) -> IconMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(IconMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(IconMatchError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .and_then(|v| v.checked_mul(CHANNELS))
        .ok_or(IconMatchError::InvalidDimensions { width, height })
}
