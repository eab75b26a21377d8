//! Interaction tuning knobs.

use crate::geometry::ZoomLimits;
use serde::{Deserialize, Serialize};

/// Configuration for the canvas controller.
///
/// Every field has a default matching the stock front end; a host can
/// override a subset from JSON (`#[serde(default)]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    pub zoom: ZoomLimits,

    /// Pointer travel (container px, either axis) that turns a press into a
    /// pan instead of a click. Movement equal to it still counts as a click.
    pub pan_threshold: f64,

    /// Radius (container px) of a marker's drag handle.
    pub marker_handle_radius: f64,

    /// Horizontal distance (container px) from the compare divider that
    /// still grabs it.
    pub slider_hit_tolerance: f64,

    /// Maximum base-image undo depth.
    pub history_depth: usize,

    /// Alpha (0–255) of the hovered-mask highlight.
    pub highlight_alpha: u8,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomLimits::default(),
            pan_threshold: 5.0,
            marker_handle_radius: 14.0,
            slider_hit_tolerance: 12.0,
            history_depth: 50,
            highlight_alpha: 96,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: CanvasConfig = serde_json::from_str(r#"{"panThreshold": 8}"#).unwrap();
        assert_eq!(cfg.pan_threshold, 8.0);
        assert_eq!(cfg.zoom, ZoomLimits::default());
        assert_eq!(cfg.history_depth, 50);
    }

    #[test]
    fn partial_zoom_limits() {
        let cfg: CanvasConfig = serde_json::from_str(r#"{"zoom": {"max": 8}}"#).unwrap();
        assert_eq!(cfg.zoom.max, 8.0);
        assert_eq!(cfg.zoom.min, 0.2);
    }
}
