//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. Keys are
//! `KeyboardEvent.key` values. Text fields in the view (marker prompts)
//! are expected to swallow their own key events before they get here.

use crate::input::Modifiers;
use serde::{Deserialize, Serialize};

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShortcutAction {
    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomReset,
    ToggleGrid,
    ToggleCompare,

    // ── Edit ──
    Undo,
    Redo,
    /// Remove the selected (last pressed) marker.
    DeleteMarker,
    /// Abort the current gesture or drag-over.
    Cancel,
}

/// Resolves key events into shortcut actions.
///
/// Uses platform-aware modifier detection: on macOS `meta` is ⌘,
/// on other platforms `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action, or `None` if unbound.
    pub fn resolve(key: &str, mods: &Modifiers) -> Option<ShortcutAction> {
        let cmd = mods.command();

        // ── Modifier combos first (most specific) ──
        if cmd && mods.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                // Claim the browser zoom keys for the canvas.
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomReset),
                _ => None,
            };
        }

        // `+` needs Shift on most layouts.
        if key == "+" {
            return Some(ShortcutAction::ZoomIn);
        }
        if mods.shift || mods.alt {
            return None;
        }

        // ── Single keys (no modifiers) ──
        match key {
            "=" => Some(ShortcutAction::ZoomIn),
            "-" => Some(ShortcutAction::ZoomOut),
            "0" => Some(ShortcutAction::ZoomReset),
            "g" | "G" => Some(ShortcutAction::ToggleGrid),
            "c" | "C" => Some(ShortcutAction::ToggleCompare),
            "Delete" | "Backspace" => Some(ShortcutAction::DeleteMarker),
            "Escape" => Some(ShortcutAction::Cancel),
            _ => None,
        }
    }
}
