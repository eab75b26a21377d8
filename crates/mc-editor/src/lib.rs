pub mod controller;
pub mod gesture;
pub mod history;
pub mod input;
pub mod shortcuts;
pub mod workspace;

pub use controller::{CanvasController, Command, Dispatch, Notification};
pub use input::{DragPayload, InputEvent, Modifiers};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use workspace::{CompareState, MaskHit, Workspace};
