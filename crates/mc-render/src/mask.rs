//! Mask decoding: data URI → single-channel coverage plane over the full
//! image extent.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use mc_core::{DataUriError, SegmentationMask};

#[derive(thiserror::Error, Debug)]
pub enum MaskError {
    #[error("mask `{label}`: {source}")]
    DataUri {
        label: String,
        #[source]
        source: DataUriError,
    },

    #[error("mask `{label}`: cannot decode image: {source}")]
    Decode {
        label: String,
        #[source]
        source: image::ImageError,
    },

    #[error("mask `{label}`: bounding box is empty")]
    EmptyBox { label: String },

    #[error("target extent {width}x{height} is empty")]
    EmptyExtent { width: u32, height: u32 },
}

/// Per-pixel coverage, row-major. Non-zero means covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaPlane {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl AlphaPlane {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap raw coverage bytes. Returns `None` if the length doesn't match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Fill the rectangle `(x, y, w, h)` with `value`, clipped to the plane.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, value: u8) {
        let x1 = x.saturating_add(w).min(self.width);
        let y1 = y.saturating_add(h).min(self.height);
        let x0 = x.min(x1);
        for row in y.min(self.height)..y1 {
            self.data[pixel_offset(self.width, x0, row)..pixel_offset(self.width, x1, row)]
                .fill(value);
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[pixel_offset(self.width, x, y)]
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn covered_pixels(&self) -> usize {
        self.data.iter().filter(|&&a| a > 0).count()
    }
}

/// Row-major offset of `(x, y)`, computed in `usize` so large rasters
/// don't wrap.
pub(crate) fn pixel_offset(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// Decode `mask` and place it over a `width × height` extent.
///
/// The alpha channel is coverage; images without alpha use luma. A mask
/// without a box is stretched to the whole extent; a boxed mask is
/// stretched into its box and the rest stays uncovered.
pub fn decode_mask(
    mask: &SegmentationMask,
    width: u32,
    height: u32,
) -> Result<AlphaPlane, MaskError> {
    if width == 0 || height == 0 {
        return Err(MaskError::EmptyExtent { width, height });
    }
    let bytes = mask.mask.decode().map_err(|source| MaskError::DataUri {
        label: mask.label.clone(),
        source,
    })?;
    let decoded = image::load_from_memory(&bytes).map_err(|source| MaskError::Decode {
        label: mask.label.clone(),
        source,
    })?;
    let coverage = coverage_channel(&decoded);

    let plane = match mask.bbox {
        None => stretch(&coverage, width, height),
        Some(bbox) => {
            let (bx, by, bw, bh) =
                bbox.to_pixels(width, height)
                    .ok_or_else(|| MaskError::EmptyBox {
                        label: mask.label.clone(),
                    })?;
            let boxed = stretch(&coverage, bw, bh);
            let mut full = GrayImage::new(width, height);
            imageops::replace(&mut full, &boxed, bx as i64, by as i64);
            full
        }
    };

    log::trace!(
        "decoded mask `{}` -> {}x{}",
        mask.label,
        plane.width(),
        plane.height()
    );
    let (w, h) = plane.dimensions();
    Ok(AlphaPlane {
        width: w,
        height: h,
        data: plane.into_raw(),
    })
}

fn coverage_channel(img: &DynamicImage) -> GrayImage {
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let (w, h) = rgba.dimensions();
        GrayImage::from_fn(w, h, |x, y| image::Luma([rgba.get_pixel(x, y)[3]]))
    } else {
        img.to_luma8()
    }
}

fn stretch(img: &GrayImage, width: u32, height: u32) -> GrayImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Nearest)
}
