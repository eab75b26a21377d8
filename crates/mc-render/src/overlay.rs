//! Hover highlight: a translucent tint of one mask over the full extent.

use crate::mask::AlphaPlane;
use image::{ImageFormat, Rgba, RgbaImage};
use mc_core::{Color, DataUri};
use std::io::Cursor;

/// Tint every covered pixel of `plane` with `color` at `alpha`, scaled by
/// the pixel's own coverage. Uncovered pixels stay fully transparent.
pub fn highlight_overlay(plane: &AlphaPlane, color: Color, alpha: u8) -> RgbaImage {
    RgbaImage::from_fn(plane.width(), plane.height(), |x, y| {
        let coverage = plane.get(x, y) as u16;
        let a = (coverage * alpha as u16 / 255) as u8;
        Rgba([color.r, color.g, color.b, a])
    })
}

/// Encode an overlay as a PNG data URI the view can draw directly.
pub fn to_png_data_uri(img: &RgbaImage) -> Result<DataUri, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(DataUri::from_bytes("image/png", &buf))
}
