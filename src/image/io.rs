//! Convenience helpers for decoding screenshots and icons via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{RgbaImageBuf, RgbaView};
use crate::util::{IconMatchError, IconMatchResult};
use std::path::Path;

/// Creates a borrowed view over an `image::RgbaImage`.
pub fn view_from_rgba_image(img: &image::RgbaImage) -> IconMatchResult<RgbaView<'_>> {
    RgbaView::from_slice(img.as_raw(), img.width() as usize, img.height() as usize)
}

/// Converts a decoded image of any color type into an owned RGBA buffer.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> IconMatchResult<RgbaImageBuf> {
    let rgba = img.to_rgba8();
    let width = rgba.width() as usize;
    let height = rgba.height() as usize;
    RgbaImageBuf::from_vec(rgba.into_raw(), width, height)
}

/// Loads an image from disk as RGBA8.
pub fn load_rgba_image<P: AsRef<Path>>(path: P) -> IconMatchResult<RgbaImageBuf> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| IconMatchError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    })?;
    owned_from_dynamic_image(&img)
}
