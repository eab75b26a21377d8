//! WASM bridge for MarkCanvas: exposes the canvas controller to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The view forwards DOM
//! events through the typed helpers (or raw command JSON through
//! [`McCanvas::dispatch`]) and receives every dispatch result as JSON:
//! `{"changed":bool,"notifications":[{"type":"markerAdded",...},...]}`.

use mc_core::{CanvasConfig, Id};
use mc_editor::controller::{CanvasController, Command, Dispatch, Notification};
use mc_editor::input::{DragPayload, InputEvent, Modifiers};
use mc_genai::parse_segmentation;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct DispatchJson<'a> {
    changed: bool,
    notifications: &'a [Notification],
}

fn dispatch_to_json(d: &Dispatch) -> String {
    let json = DispatchJson {
        changed: d.changed,
        notifications: &d.notifications,
    };
    serde_json::to_string(&json).unwrap_or_else(|e| rejected_json(&e.to_string()))
}

fn rejected_json(reason: &str) -> String {
    let rejected = [Notification::Rejected {
        reason: reason.to_string(),
    }];
    let json = DispatchJson {
        changed: false,
        notifications: &rejected,
    };
    serde_json::to_string(&json).unwrap_or_else(|_| r#"{"changed":false,"notifications":[]}"#.to_string())
}

/// The WASM-facing canvas.
///
/// Wraps one [`CanvasController`]; the JS side owns rendering and the
/// collaborator calls, this side owns every interaction decision.
#[wasm_bindgen]
pub struct McCanvas {
    controller: CanvasController,
}

#[wasm_bindgen]
impl McCanvas {
    /// Create a canvas for a container of the given size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();
        Self::with_controller(CanvasController::default(), width, height)
    }

    /// Like `new`, with tuning knobs from JSON (missing fields default).
    pub fn with_config(config_json: &str, width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();
        let config = serde_json::from_str::<CanvasConfig>(config_json).unwrap_or_else(|e| {
            log::warn!("invalid canvas config, using defaults: {e}");
            CanvasConfig::default()
        });
        Self::with_controller(CanvasController::new(config), width, height)
    }

    /// Apply one command given as JSON (`{"type":"zoomIn"}` …).
    pub fn dispatch(&mut self, command_json: &str) -> String {
        match serde_json::from_str::<Command>(command_json) {
            Ok(command) => self.run(command),
            Err(e) => rejected_json(&format!("invalid command: {e}")),
        }
    }

    // ─── DOM event helpers ───────────────────────────────────────────────

    pub fn resize(&mut self, width: f64, height: f64) -> String {
        self.run(Command::Resize { width, height })
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> String {
        self.input(InputEvent::pointer_down(x, y))
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> String {
        self.input(InputEvent::pointer_move(x, y))
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> String {
        self.input(InputEvent::pointer_up(x, y))
    }

    pub fn pointer_leave(&mut self) -> String {
        self.input(InputEvent::PointerLeave)
    }

    pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) -> String {
        self.input(InputEvent::Wheel { x, y, delta_y })
    }

    /// `types_json` is `dataTransfer.types` as a JSON array; `asset_data`
    /// is the data stored under the asset drag type ("" if none).
    pub fn drag_over(&mut self, x: f64, y: f64, types_json: &str, asset_data: &str) -> String {
        match classify_drag(types_json, asset_data) {
            Some(payload) => self.input(InputEvent::DragOver { x, y, payload }),
            None => dispatch_to_json(&Dispatch::default()),
        }
    }

    pub fn drag_leave(&mut self) -> String {
        self.input(InputEvent::DragLeave)
    }

    pub fn drop_at(&mut self, x: f64, y: f64, types_json: &str, asset_data: &str) -> String {
        match classify_drag(types_json, asset_data) {
            Some(payload) => self.input(InputEvent::Drop { x, y, payload }),
            None => self.input(InputEvent::DragLeave),
        }
    }

    pub fn key(&mut self, key: &str, shift: bool, ctrl: bool, alt: bool, meta: bool) -> String {
        self.run(Command::Key {
            key: key.to_string(),
            modifiers: Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
        })
    }

    /// Feed raw segmenter output for `image_id`.
    pub fn set_masks_from_response(&mut self, image_id: &str, response: &str) -> String {
        match parse_segmentation(Id::intern(image_id), response) {
            Ok(masks) => self.run(Command::SetMasks { masks }),
            Err(e) => rejected_json(&e.user_message()),
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Everything the view needs to draw one frame, as JSON.
    pub fn view_state(&self) -> String {
        let c = &self.controller;
        let compare = c.compare();
        let handles: Vec<_> = c
            .marker_handles()
            .into_iter()
            .map(|(id, p)| serde_json::json!({ "id": id, "x": p.x, "y": p.y }))
            .collect();
        serde_json::json!({
            "viewport": c.viewport(),
            "rendered": c.rendered(),
            "markers": c.markers().iter().collect::<Vec<_>>(),
            "handles": handles,
            "selectedMarker": c.selected_marker(),
            "hoveredLabel": c.hovered_label(),
            "hoveredMask": c.hovered_mask(),
            "dragActive": c.drag_active(),
            "dropIndicator": c.drop_indicator(),
            "compare": {
                "active": compare.active,
                "split": compare.split,
                "dividerX": c.divider_x(),
            },
            "grid": c.grid_visible(),
            "busy": c.is_busy(),
            "canUndo": c.can_undo(),
            "canRedo": c.can_redo(),
        })
        .to_string()
    }

    /// Data URI of the hovered-mask tint, or "" when nothing is hovered.
    pub fn hover_highlight(&self) -> String {
        self.controller
            .hover_highlight()
            .map(|uri| uri.to_string())
            .unwrap_or_default()
    }
}

impl McCanvas {
    fn with_controller(mut controller: CanvasController, width: f64, height: f64) -> Self {
        controller.dispatch(Command::Resize { width, height });
        Self { controller }
    }

    fn input(&mut self, event: InputEvent) -> String {
        self.run(Command::Input { event })
    }

    fn run(&mut self, command: Command) -> String {
        dispatch_to_json(&self.controller.dispatch(command))
    }
}

fn classify_drag(types_json: &str, asset_data: &str) -> Option<DragPayload> {
    let types: Vec<String> = serde_json::from_str(types_json).ok()?;
    let types: Vec<&str> = types.iter().map(String::as_str).collect();
    DragPayload::classify(&types, Some(asset_data))
}

/// Set up a panic hook that logs to the browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("MarkCanvas WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
