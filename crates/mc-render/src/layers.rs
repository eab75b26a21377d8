//! Decoded segmentation for one base image: the mask set, each mask's
//! coverage plane, and the hit map built from them.
//!
//! Two ways in:
//!
//! - [`MaskLayers::decode`] fans decodes out over tokio's blocking pool and
//!   joins them all before the hit map is considered authoritative.
//! - [`MaskLayers::decode_blocking`] does the same work inline, for hosts
//!   without a runtime (the wasm bridge).

use crate::hit::{HitMap, HitMapBuilder};
use crate::mask::{AlphaPlane, decode_mask};
use crate::overlay::highlight_overlay;
use image::RgbaImage;
use mc_core::{Id, MaskSet, NormPoint};
#[cfg(not(target_arch = "wasm32"))]
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct MaskLayers {
    set: MaskSet,
    /// `None` for masks that failed to decode.
    planes: Vec<Option<AlphaPlane>>,
    hit: HitMap,
}

impl MaskLayers {
    /// Decode every mask of `set` concurrently against a `width × height`
    /// image and wait until all of them have settled.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn decode(set: MaskSet, width: u32, height: u32) -> Self {
        let mut builder = HitMapBuilder::new(width, height, labels(&set));
        let mut planes: Vec<Option<AlphaPlane>> = vec![None; set.len()];

        let mut tasks = JoinSet::new();
        for (index, mask) in set.masks.iter().cloned().enumerate() {
            tasks.spawn_blocking(move || (index, decode_mask(&mask, width, height)));
        }

        // Completion order is arbitrary; the builder's max rule makes the
        // settled raster independent of it.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(plane))) => {
                    builder.apply(index, &plane);
                    planes[index] = Some(plane);
                }
                Ok((index, Err(e))) => {
                    log::warn!("skipping mask {index}: {e}");
                    builder.skip(index);
                }
                Err(e) => log::warn!("mask decode task failed: {e}"),
            }
        }

        // A panicked task never reported its index; nothing more will arrive.
        for (index, plane) in planes.iter().enumerate() {
            if plane.is_none() {
                builder.skip(index);
            }
        }
        let hit = match builder.finish() {
            Ok(hit) => hit,
            Err(partial) => partial.preview().clone(),
        };
        log::debug!(
            "segmentation for {} settled: {}/{} masks decoded",
            set.image_id,
            planes.iter().filter(|p| p.is_some()).count(),
            set.len()
        );
        Self { set, planes, hit }
    }

    /// Decode every mask inline, in list order.
    pub fn decode_blocking(set: MaskSet, width: u32, height: u32) -> Self {
        let mut hit = HitMap::new(width, height, labels(&set));
        let planes = set
            .masks
            .iter()
            .enumerate()
            .map(|(index, mask)| match decode_mask(mask, width, height) {
                Ok(plane) => {
                    hit.apply(index, &plane);
                    Some(plane)
                }
                Err(e) => {
                    log::warn!("skipping mask {index}: {e}");
                    None
                }
            })
            .collect();
        Self { set, planes, hit }
    }

    pub fn image_id(&self) -> Id {
        self.set.image_id
    }

    pub fn mask_set(&self) -> &MaskSet {
        &self.set
    }

    pub fn hit_map(&self) -> &HitMap {
        &self.hit
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.hit.dimensions()
    }

    pub fn index_at(&self, point: NormPoint) -> Option<usize> {
        self.hit.index_at(point)
    }

    pub fn label_at(&self, point: NormPoint) -> Option<&str> {
        self.hit.label_at(point)
    }

    /// Translucent tint of mask `index` over the full extent.
    pub fn highlight(&self, index: usize, alpha: u8) -> Option<RgbaImage> {
        let plane = self.planes.get(index)?.as_ref()?;
        let color = self.set.masks.get(index)?.color;
        Some(highlight_overlay(plane, color, alpha))
    }

    pub fn decoded_count(&self) -> usize {
        self.planes.iter().filter(|p| p.is_some()).count()
    }
}

fn labels(set: &MaskSet) -> Vec<String> {
    set.masks.iter().map(|m| m.label.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::test_support::{mask, rect_mask_uri};
    use mc_core::{DataUri, Id};

    fn quadrant_set() -> MaskSet {
        MaskSet {
            image_id: Id::intern("image_quadrants"),
            masks: vec![
                mask("boat", rect_mask_uri(8, 6, (0, 0, 4, 3)), None),
                mask("tree", rect_mask_uri(8, 6, (4, 3, 4, 3)), None),
                mask("broken", DataUri::from_bytes("image/png", b"nope"), None),
            ],
        }
    }

    #[test]
    fn blocking_decode_builds_hit_map() {
        let layers = MaskLayers::decode_blocking(quadrant_set(), 8, 6);
        assert_eq!(layers.decoded_count(), 2);
        assert_eq!(layers.label_at(NormPoint::new(0.1, 0.1)), Some("boat"));
        assert_eq!(layers.label_at(NormPoint::new(0.9, 0.9)), Some("tree"));
        assert_eq!(layers.label_at(NormPoint::new(0.9, 0.1)), None);
    }

    #[tokio::test]
    async fn async_decode_matches_blocking() {
        let a = MaskLayers::decode(quadrant_set(), 8, 6).await;
        let b = MaskLayers::decode_blocking(quadrant_set(), 8, 6);
        assert_eq!(a.hit_map(), b.hit_map());
        assert_eq!(a.decoded_count(), 2);
    }

    #[test]
    fn highlight_only_for_decoded_masks() {
        let layers = MaskLayers::decode_blocking(quadrant_set(), 8, 6);
        assert!(layers.highlight(0, 80).is_some());
        assert!(layers.highlight(2, 80).is_none());
        assert!(layers.highlight(9, 80).is_none());
    }
}
