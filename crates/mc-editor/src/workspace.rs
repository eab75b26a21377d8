//! Workspace state: everything the canvas knows about the current session.
//!
//! One `Workspace` is owned by one [`crate::controller::CanvasController`].
//! It holds no gesture state; it is the data the gestures act on, plus the
//! derived geometry and hit map that resolve pointers to image space.

use mc_core::{
    Asset, GeneratedImage, Id, ImageRef, MarkerStore, MaskSet, NormPoint, Point, RenderedImage,
    Size, Viewport,
};
use mc_render::MaskLayers;

/// An external drag currently hovering the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct DragOver {
    /// `None` for native file drags.
    pub asset_id: Option<Id>,
    /// Where an asset would land.
    pub indicator: Option<NormPoint>,
    pub label: Option<String>,
}

/// The mask under the pointer: its index in the mask set and its label.
pub type MaskHit = (usize, String);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompareState {
    pub active: bool,
    /// Divider position as a normalized x.
    pub split: f64,
}

impl Default for CompareState {
    fn default() -> Self {
        Self {
            active: false,
            split: 0.5,
        }
    }
}

#[derive(Debug, Default)]
pub struct Workspace {
    pub base: Option<ImageRef>,
    /// Natural pixel size of the base image, once the view has loaded it.
    pub natural_size: Option<(u32, u32)>,
    /// Canvas element size in container pixels.
    pub container: Option<Size>,
    /// Letterboxed image rect; derived from `container` and `natural_size`.
    pub rendered: Option<RenderedImage>,
    pub viewport: Viewport,

    /// The latest mask set for the base image, decoded or not.
    pub masks: Option<MaskSet>,
    /// Decoded masks and hit map. Always matches `natural_size` or is `None`.
    pub layers: Option<MaskLayers>,

    pub markers: MarkerStore,
    /// Marker last pressed; target of the delete shortcut.
    pub selected_marker: Option<Id>,
    pub assets: Vec<Asset>,

    pub results: Vec<GeneratedImage>,
    pub selected_result: usize,
    pub compare: CompareState,

    pub grid: bool,
    /// A collaborator request is in flight; interaction is disabled.
    pub busy: bool,
    pub hovered_label: Option<String>,
    /// Index of the hovered mask. Labels may repeat, so the highlight
    /// goes by index.
    pub hovered_mask: Option<usize>,
    pub drag_over: Option<DragOver>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_id(&self) -> Option<Id> {
        self.base.as_ref().map(|b| b.id)
    }

    /// Install a new base image and discard everything tied to the old one.
    pub fn reset_for(&mut self, image: Option<ImageRef>) {
        self.base = image;
        self.natural_size = None;
        self.rendered = None;
        self.viewport = Viewport::default();
        self.masks = None;
        self.layers = None;
        self.markers.clear();
        self.selected_marker = None;
        self.results.clear();
        self.selected_result = 0;
        self.compare = CompareState::default();
        self.hovered_label = None;
        self.hovered_mask = None;
        self.drag_over = None;
    }

    /// Recompute the letterboxed rect. Returns `true` if it changed.
    pub fn recompute_geometry(&mut self) -> bool {
        let next = match (self.container, self.natural_size) {
            (Some(container), Some((w, h))) => {
                RenderedImage::contain(container, Size::new(w as f64, h as f64))
            }
            _ => None,
        };
        let changed = next != self.rendered;
        self.rendered = next;
        changed
    }

    /// Rebuild the hit map from `masks` if it is missing or sized for a
    /// different image. Returns `true` if a rebuild happened.
    pub fn sync_layers(&mut self) -> bool {
        let (Some(set), Some((w, h))) = (&self.masks, self.natural_size) else {
            return false;
        };
        if let Some(layers) = &self.layers
            && layers.dimensions() == (w, h)
            && layers.mask_set() == set
        {
            return false;
        }
        // Never serve lookups from a raster built for other content.
        self.layers = None;
        self.layers = Some(MaskLayers::decode_blocking(set.clone(), w, h));
        true
    }

    /// Container pointer → clamped normalized point.
    pub fn resolve(&self, pointer: Point) -> Option<NormPoint> {
        let rendered = self.rendered.as_ref()?;
        self.viewport.to_normalized(pointer, rendered)
    }

    /// Container pointer → normalized point only if it lies on the image.
    pub fn resolve_inside(&self, pointer: Point) -> Option<NormPoint> {
        let rendered = self.rendered.as_ref()?;
        self.viewport
            .to_normalized_unclamped(pointer, rendered)
            .filter(NormPoint::is_inside)
    }

    /// Normalized point → container pixel, for drawing and hit tests.
    pub fn to_container(&self, point: NormPoint) -> Option<Point> {
        let rendered = self.rendered.as_ref()?;
        self.viewport.to_container(point, rendered)
    }

    pub fn label_at(&self, point: NormPoint) -> Option<String> {
        self.mask_at(point).map(|(_, label)| label)
    }

    /// Topmost mask covering `point`.
    pub fn mask_at(&self, point: NormPoint) -> Option<MaskHit> {
        let layers = self.layers.as_ref()?;
        let index = layers.index_at(point)?;
        Some((index, layers.label_at(point)?.to_string()))
    }

    pub fn asset(&self, id: Id) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }
}
