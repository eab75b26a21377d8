//! Images, assets, generation results, and segmentation masks.
//!
//! Everything here is plain data owned by the workspace. Image payloads are
//! [`DataUri`]s; nothing is decoded until a consumer needs pixels.

use crate::color::{Color, mask_color};
use crate::data_uri::DataUri;
use crate::id::Id;
use serde::{Deserialize, Serialize};

/// An immutable image. A new one is minted on every upload, paste, or
/// saved generation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: Id,
    pub data: DataUri,
}

impl ImageRef {
    pub fn new(data: DataUri) -> Self {
        Self {
            id: Id::with_prefix("image"),
            data,
        }
    }
}

/// A user-supplied reference image on the asset shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Id,
    pub name: String,
    pub image: DataUri,
}

impl Asset {
    pub fn new(name: impl Into<String>, image: DataUri) -> Self {
        Self {
            id: Id::with_prefix("asset"),
            name: name.into(),
            image,
        }
    }
}

/// One variation returned by the generative model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub image: DataUri,
    /// Caption the model returned alongside the image (may be empty).
    #[serde(default)]
    pub text: String,
}

/// Bounding box on the 0..1000 scale segmentation models report,
/// `[y0, x0, y1, x1]` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct MaskBox {
    pub y0: f64,
    pub x0: f64,
    pub y1: f64,
    pub x1: f64,
}

impl MaskBox {
    pub const SCALE: f64 = 1000.0;

    /// Pixel rect `(x, y, w, h)` inside an image of `width × height`,
    /// clipped to the image. `None` when the box is empty after clipping.
    pub fn to_pixels(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let sx = |v: f64| (v / Self::SCALE * width as f64).round().clamp(0.0, width as f64);
        let sy = |v: f64| (v / Self::SCALE * height as f64).round().clamp(0.0, height as f64);
        let (x0, x1) = (sx(self.x0.min(self.x1)), sx(self.x0.max(self.x1)));
        let (y0, y1) = (sy(self.y0.min(self.y1)), sy(self.y0.max(self.y1)));
        let (w, h) = (x1 - x0, y1 - y0);
        if w < 1.0 || h < 1.0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, w as u32, h as u32))
    }
}

impl From<[f64; 4]> for MaskBox {
    fn from([y0, x0, y1, x1]: [f64; 4]) -> Self {
        Self { y0, x0, y1, x1 }
    }
}

impl From<MaskBox> for [f64; 4] {
    fn from(b: MaskBox) -> Self {
        [b.y0, b.x0, b.y1, b.x1]
    }
}

/// One detected object: a label and its coverage mask.
///
/// Without `bbox` the mask covers the full image extent. With `bbox` the
/// mask image is stretched into that box and everything outside is
/// uncovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMask {
    pub label: String,
    pub mask: DataUri,
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<MaskBox>,
}

/// The ordered masks computed for one base image. Order is z-order:
/// later masks sit on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskSet {
    /// The base image these masks were computed for.
    pub image_id: Id,
    pub masks: Vec<SegmentationMask>,
}

impl MaskSet {
    /// Build a set from `(label, mask, bbox)` triples, assigning palette
    /// colors by position.
    pub fn from_detections(
        image_id: Id,
        detections: impl IntoIterator<Item = (String, DataUri, Option<MaskBox>)>,
    ) -> Self {
        let masks = detections
            .into_iter()
            .enumerate()
            .map(|(i, (label, mask, bbox))| SegmentationMask {
                label,
                mask,
                color: mask_color(i),
                bbox,
            })
            .collect();
        Self { image_id, masks }
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.masks.get(index).map(|m| m.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mask_box_to_pixels() {
        let b = MaskBox::from([0.0, 500.0, 500.0, 1000.0]);
        assert_eq!(b.to_pixels(800, 600), Some((400, 0, 400, 300)));
    }

    #[test]
    fn mask_box_swapped_corners_and_clipping() {
        let b = MaskBox::from([1200.0, 600.0, 900.0, 100.0]);
        assert_eq!(b.to_pixels(1000, 1000), Some((100, 900, 500, 100)));
        let empty = MaskBox::from([10.0, 10.0, 10.0, 10.0]);
        assert_eq!(empty.to_pixels(100, 100), None);
    }

    #[test]
    fn detections_get_palette_colors() {
        let uri = DataUri::from_bytes("image/png", &[0]);
        let set = MaskSet::from_detections(
            Id::intern("image_base"),
            vec![
                ("boat".to_string(), uri.clone(), None),
                ("sky".to_string(), uri, None),
            ],
        );
        assert_eq!(set.masks[0].color, mask_color(0));
        assert_eq!(set.masks[1].color, mask_color(1));
        assert_eq!(set.label(1), Some("sky"));
        assert_eq!(set.label(2), None);
    }

    #[test]
    fn mask_box_serializes_as_array() {
        let b = MaskBox::from([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.0,2.0,3.0,4.0]");
    }
}
