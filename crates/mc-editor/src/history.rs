//! Base-image undo/redo history.
//!
//! Every base-image change (upload, paste, saved result) pushes the image
//! it replaced. Undo swaps the current image with the top of the undo
//! stack; redo swaps it back. Markers and segmentation are not recorded:
//! they belong to the image they were made on and are discarded on any
//! swap.

use mc_core::ImageRef;

pub struct ImageHistory {
    undo_stack: Vec<ImageRef>,
    redo_stack: Vec<ImageRef>,
    /// Maximum undo depth.
    max_depth: usize,
}

impl ImageHistory {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth,
        }
    }

    /// Record that `previous` was replaced by a new base image.
    pub fn record(&mut self, previous: ImageRef) {
        self.undo_stack.push(previous);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Step back. `current` goes onto the redo stack; the restored image is
    /// returned.
    pub fn undo(&mut self, current: Option<ImageRef>) -> Option<ImageRef> {
        let restored = self.undo_stack.pop()?;
        if let Some(current) = current {
            self.redo_stack.push(current);
        }
        Some(restored)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: Option<ImageRef>) -> Option<ImageRef> {
        let restored = self.redo_stack.pop()?;
        if let Some(current) = current {
            self.undo_stack.push(current);
        }
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}
