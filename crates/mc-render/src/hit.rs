//! Hit map: normalized point → segmentation label lookup.
//!
//! The raster has the base image's natural dimensions. Each pixel stores
//! `index + 1` of the topmost mask covering it, or `0` for background, so
//! a lookup is one read no matter how many masks there are.
//!
//! Masks may be applied in any order: a covered pixel keeps the larger of
//! its current and incoming value, which is exactly "last mask in list
//! order wins" once every mask has landed.

use crate::mask::{AlphaPlane, pixel_offset};
use mc_core::NormPoint;

/// Largest mask count a single-channel raster can address.
pub const MAX_MASKS: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitMap {
    width: u32,
    height: u32,
    data: Vec<u8>,
    labels: Vec<String>,
}

impl HitMap {
    /// An empty (all background) raster for `labels`, in list order.
    pub fn new(width: u32, height: u32, labels: Vec<String>) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
            labels,
        }
    }

    /// Paint mask `index` into the raster. Planes of the wrong size and
    /// indices the raster can't encode are skipped.
    pub fn apply(&mut self, index: usize, plane: &AlphaPlane) -> bool {
        if index >= self.labels.len() || index >= MAX_MASKS {
            log::warn!("hit map: mask index {index} cannot be encoded, skipping");
            return false;
        }
        if plane.dimensions() != (self.width, self.height) {
            log::warn!(
                "hit map: mask {index} is {:?}, raster is {}x{}, skipping",
                plane.dimensions(),
                self.width,
                self.height
            );
            return false;
        }
        let value = (index + 1) as u8;
        for (px, &alpha) in self.data.iter_mut().zip(plane.as_raw()) {
            if alpha > 0 && *px < value {
                *px = value;
            }
        }
        log::trace!("hit map: applied mask {index} `{}`", self.labels[index]);
        true
    }

    /// Reset every pixel to background, keeping size and labels.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw encoded value at pixel `(x, y)`; `0` outside the raster.
    pub fn value_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[pixel_offset(self.width, x, y)]
    }

    /// Index of the topmost mask under `point`.
    pub fn index_at(&self, point: NormPoint) -> Option<usize> {
        let (x, y) = self.pixel_of(point)?;
        match self.value_at(x, y) {
            0 => None,
            v => {
                let index = v as usize - 1;
                (index < self.labels.len()).then_some(index)
            }
        }
    }

    /// Label of the topmost mask under `point`.
    pub fn label_at(&self, point: NormPoint) -> Option<&str> {
        self.index_at(point).map(|i| self.labels[i].as_str())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// `floor(normalized * dims)`, with `1.0` mapping to the last pixel.
    fn pixel_of(&self, point: NormPoint) -> Option<(u32, u32)> {
        if self.width == 0 || self.height == 0 || !point.is_inside() {
            return None;
        }
        let px = ((point.x * self.width as f64).floor() as u32).min(self.width - 1);
        let py = ((point.y * self.height as f64).floor() as u32).min(self.height - 1);
        Some((px, py))
    }
}

/// Accumulates masks as their decodes complete and hands out the hit map
/// once every mask has either landed or failed.
#[derive(Debug)]
pub struct HitMapBuilder {
    map: HitMap,
    settled: Vec<bool>,
}

impl HitMapBuilder {
    pub fn new(width: u32, height: u32, labels: Vec<String>) -> Self {
        let settled = vec![false; labels.len()];
        Self {
            map: HitMap::new(width, height, labels),
            settled,
        }
    }

    /// Record a decoded mask.
    pub fn apply(&mut self, index: usize, plane: &AlphaPlane) {
        if let Some(done) = self.settled.get_mut(index) {
            *done = true;
        }
        self.map.apply(index, plane);
    }

    /// Record a mask that failed to decode; it contributes no pixels.
    pub fn skip(&mut self, index: usize) {
        if let Some(done) = self.settled.get_mut(index) {
            *done = true;
        }
    }

    pub fn pending(&self) -> usize {
        self.settled.iter().filter(|s| !**s).count()
    }

    pub fn is_settled(&self) -> bool {
        self.pending() == 0
    }

    /// The partially built raster, for incremental previews.
    pub fn preview(&self) -> &HitMap {
        &self.map
    }

    /// The authoritative hit map, or the builder back if masks are still
    /// outstanding.
    pub fn finish(self) -> Result<HitMap, Self> {
        if self.is_settled() {
            Ok(self.map)
        } else {
            Err(self)
        }
    }
}
