//! Viewport geometry: container pixels ↔ normalized image coordinates.
//!
//! Three spaces are involved:
//!
//! - **Container space**: pixels relative to the canvas element's top-left,
//!   as pointer events report them.
//! - **Content space**: container space before the viewport transform
//!   (`translate(pan) · scale(zoom)`) is applied. The image is drawn here
//!   inside its letterboxed [`RenderedImage`] rect.
//! - **Normalized space**: fractions of the image's own pixel extent,
//!   `[0,1]²`. Markers and drop indicators live here, so they survive any
//!   zoom, pan or resize.
//!
//! Every mapping returns `None` for degenerate geometry (image not loaded,
//! zero-sized container, non-finite input) instead of producing NaN.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

// ─── Normalized coordinates ──────────────────────────────────────────────

/// A position as a fraction of image width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormPoint {
    pub x: f64,
    pub y: f64,
}

impl NormPoint {
    pub const CENTER: NormPoint = NormPoint { x: 0.5, y: 0.5 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp each axis independently into `[0, 1]`.
    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    pub fn is_inside(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

// ─── Rendered image rect ─────────────────────────────────────────────────

/// Where the image is drawn inside its container (content space), under
/// "contain" fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderedImage {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RenderedImage {
    /// Fit an image of `natural` size into `container`, preserving aspect
    /// ratio and centering on the shorter axis.
    pub fn contain(container: Size, natural: Size) -> Option<Self> {
        if !is_usable(container) || !is_usable(natural) {
            return None;
        }
        let scale = (container.width / natural.width).min(container.height / natural.height);
        let width = natural.width * scale;
        let height = natural.height * scale;
        Some(Self {
            x: (container.width - width) / 2.0,
            y: (container.height - height) / 2.0,
            width,
            height,
        })
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.origin(), self.size())
    }

    /// Zero-sized or non-finite; nothing can be resolved against it.
    pub fn is_degenerate(&self) -> bool {
        !is_usable(self.size()) || !self.x.is_finite() || !self.y.is_finite()
    }
}

fn is_usable(size: Size) -> bool {
    size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0
}

// ─── Zoom limits ─────────────────────────────────────────────────────────

/// Bounds and step for viewport zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
    /// Multiplicative factor per wheel notch or button press.
    pub step: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.2,
            max: 5.0,
            step: 1.2,
        }
    }
}

impl ZoomLimits {
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

// ─── Viewport ────────────────────────────────────────────────────────────

/// Zoom and pan applied to the content before it reaches the container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f64,
    /// Translation in container pixels.
    pub pan: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl Viewport {
    /// Map a container-space pointer to normalized image space, without
    /// clamping. May fall outside `[0,1]`.
    pub fn to_normalized_unclamped(
        &self,
        pointer: Point,
        image: &RenderedImage,
    ) -> Option<NormPoint> {
        if image.is_degenerate() || !(self.zoom > 0.0) || !self.zoom.is_finite() {
            return None;
        }
        if !pointer.x.is_finite() || !pointer.y.is_finite() {
            return None;
        }
        let content = Point::ZERO + (pointer - self.pan).to_vec2() / self.zoom;
        let local = content - image.origin();
        Some(NormPoint::new(
            local.x / image.width,
            local.y / image.height,
        ))
    }

    /// Map a container-space pointer to normalized image space, clamping
    /// each axis to `[0,1]` so drops just outside the image snap to its edge.
    pub fn to_normalized(&self, pointer: Point, image: &RenderedImage) -> Option<NormPoint> {
        self.to_normalized_unclamped(pointer, image)
            .map(|p| NormPoint::clamped(p.x, p.y))
    }

    /// Inverse of [`Viewport::to_normalized_unclamped`]: where a normalized
    /// point is drawn in the container.
    pub fn to_container(&self, point: NormPoint, image: &RenderedImage) -> Option<Point> {
        if image.is_degenerate() || !(self.zoom > 0.0) {
            return None;
        }
        let content = Point::new(
            image.x + point.x * image.width,
            image.y + point.y * image.height,
        );
        Some(Point::ZERO + content.to_vec2() * self.zoom + self.pan)
    }

    /// Change zoom keeping the container point `anchor` visually fixed.
    ///
    /// The target is clamped to `limits`; returns `false` (and leaves the
    /// viewport untouched) when the clamped zoom equals the current one.
    pub fn zoom_about(&mut self, target: f64, anchor: Point, limits: &ZoomLimits) -> bool {
        if !target.is_finite() || !anchor.x.is_finite() || !anchor.y.is_finite() {
            return false;
        }
        let new_zoom = limits.clamp(target);
        if new_zoom == self.zoom {
            return false;
        }
        let ratio = new_zoom / self.zoom;
        let anchor = anchor.to_vec2();
        self.pan = anchor - (anchor - self.pan) * ratio;
        self.zoom = new_zoom;
        true
    }

    /// One step in, about `anchor`.
    pub fn zoom_in(&mut self, anchor: Point, limits: &ZoomLimits) -> bool {
        self.zoom_about(self.zoom * limits.step, anchor, limits)
    }

    /// One step out, about `anchor`.
    pub fn zoom_out(&mut self, anchor: Point, limits: &ZoomLimits) -> bool {
        self.zoom_about(self.zoom / limits.step, anchor, limits)
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Back to `zoom = 1`, no pan. Returns `true` if anything changed.
    pub fn reset(&mut self) -> bool {
        let changed = *self != Viewport::default();
        *self = Viewport::default();
        changed
    }

    /// Container x of the compare divider at `split` (normalized x).
    pub fn divider_x(&self, split: f64, image: &RenderedImage) -> Option<f64> {
        self.to_container(NormPoint::new(split.clamp(0.0, 1.0), 0.0), image)
            .map(|p| p.x)
    }
}
