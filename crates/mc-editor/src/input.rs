//! Input abstraction layer.
//!
//! Normalizes mouse, touch, wheel, and drag-and-drop events into a unified
//! `InputEvent` enum consumed by the controller. Positions are container
//! pixels relative to the canvas element's top-left.

use mc_core::{Id, Point};
use serde::{Deserialize, Serialize};

/// MIME type the view attaches to internal asset drags.
pub const ASSET_DRAG_TYPE: &str = "application/x-markcanvas-asset";

/// Keyboard modifier state at the time of the event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Platform command key: ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What an external drag carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DragPayload {
    /// Native files from the OS.
    Files,
    /// An asset from the shelf, identified by the custom drag type.
    #[serde(rename_all = "camelCase")]
    Asset { asset_id: Id },
}

impl DragPayload {
    /// Classify a browser drag from its `dataTransfer.types` and the data
    /// stored under [`ASSET_DRAG_TYPE`], if any.
    pub fn classify(types: &[&str], asset_data: Option<&str>) -> Option<Self> {
        if types.contains(&ASSET_DRAG_TYPE) {
            let id = asset_data.map(str::trim).filter(|s| !s.is_empty())?;
            return Some(DragPayload::Asset {
                asset_id: Id::intern(id),
            });
        }
        types.contains(&"Files").then_some(DragPayload::Files)
    }
}

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start).
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },

    PointerMove {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },

    PointerUp {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },

    /// Pointer left the canvas element.
    PointerLeave,

    /// Wheel notch. Negative `delta_y` zooms in.
    #[serde(rename_all = "camelCase")]
    Wheel { x: f64, y: f64, delta_y: f64 },

    DragEnter { x: f64, y: f64, payload: DragPayload },

    DragOver { x: f64, y: f64, payload: DragPayload },

    DragLeave,

    Drop { x: f64, y: f64, payload: DragPayload },
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    /// Extract the position, if this event has one.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::Wheel { x, y, .. }
            | Self::DragEnter { x, y, .. }
            | Self::DragOver { x, y, .. }
            | Self::Drop { x, y, .. } => Some(Point::new(*x, *y)),
            Self::PointerLeave | Self::DragLeave => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_asset_drag() {
        let p = DragPayload::classify(&["text/plain", ASSET_DRAG_TYPE], Some("asset_4"));
        assert_eq!(
            p,
            Some(DragPayload::Asset {
                asset_id: Id::intern("asset_4")
            })
        );
    }

    #[test]
    fn classify_files_and_unknown() {
        assert_eq!(DragPayload::classify(&["Files"], None), Some(DragPayload::Files));
        assert_eq!(DragPayload::classify(&["text/html"], None), None);
        // Asset type without data is unusable.
        assert_eq!(DragPayload::classify(&[ASSET_DRAG_TYPE], Some("  ")), None);
    }

    #[test]
    fn events_deserialize_from_view_json() {
        let ev: InputEvent =
            serde_json::from_str(r#"{"type":"pointerDown","x":1.5,"y":2}"#).unwrap();
        assert_eq!(ev, InputEvent::pointer_down(1.5, 2.0));
        let ev: InputEvent =
            serde_json::from_str(r#"{"type":"wheel","x":0,"y":0,"deltaY":-120}"#).unwrap();
        assert!(matches!(ev, InputEvent::Wheel { delta_y, .. } if delta_y < 0.0));
        let ev: InputEvent = serde_json::from_str(
            r#"{"type":"drop","x":3,"y":4,"payload":{"type":"asset","assetId":"asset_1"}}"#,
        )
        .unwrap();
        assert_eq!(ev.position(), Some(Point::new(3.0, 4.0)));
    }
}
