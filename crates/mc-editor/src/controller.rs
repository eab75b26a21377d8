//! Canvas interaction controller.
//!
//! The controller is the single owner of the [`Workspace`]. Everything the
//! view or the orchestrator wants to change arrives as a [`Command`];
//! everything the orchestrator needs to react to leaves as a
//! [`Notification`]. One `dispatch` call returns the notifications it
//! produced, in order, plus a `changed` flag telling the view to re-render.
//!
//! - **View → controller**: pointer, wheel, drag-and-drop and key events,
//!   container resizes, image-load completion, toolbar buttons.
//! - **Orchestrator → controller**: base images, segmentation results,
//!   generated results, placed asset markers, the busy flag.
//! - **Controller → orchestrator**: marker lifecycle, asset-drop generation
//!   triggers, slider and viewport changes, hover labels, rejections.
//!
//! Commands never fail. Anything the controller refuses comes back as
//! [`Notification::Rejected`]; geometry that cannot be resolved (no image,
//! zero-sized container) is a silent no-op.

use crate::gesture::{GestureAction, GestureMachine, PressTarget};
use crate::history::ImageHistory;
use crate::input::{DragPayload, InputEvent, Modifiers};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::workspace::{CompareState, DragOver, MaskHit, Workspace};
use mc_core::{
    Asset, CanvasConfig, DataUri, GeneratedImage, Id, ImageRef, Marker, MarkerPatch, MarkerStore,
    MaskSet, NormPoint, Point, RenderedImage, Vec2, Viewport,
};
use mc_render::{MaskLayers, to_png_data_uri};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Everything that can be asked of the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    // ── From the view ──
    Input {
        event: InputEvent,
    },
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// The canvas element was resized (container px).
    Resize {
        width: f64,
        height: f64,
    },
    /// The view finished loading `image_id` and reports its natural size.
    ImageLoaded {
        image_id: Id,
        width: u32,
        height: u32,
    },
    ZoomIn,
    ZoomOut,
    ZoomReset,
    ToggleGrid,
    ToggleCompare,
    SetCompareSplit {
        split: f64,
    },
    SelectResult {
        index: usize,
    },
    UpdateMarker {
        id: Id,
        patch: MarkerPatch,
    },
    RemoveMarker {
        id: Id,
    },
    Undo,
    Redo,

    // ── From the orchestrator ──
    /// Upload or paste: replaces the base image and records history.
    SetBaseImage {
        image: ImageRef,
    },
    /// Segmentation for the image named by `masks.image_id`.
    SetMasks {
        masks: MaskSet,
    },
    AddAsset {
        asset: Asset,
    },
    RemoveAsset {
        asset_id: Id,
    },
    ClearAssets,
    /// An asset-placement generation succeeded; pin its marker.
    PlaceAsset {
        asset_id: Id,
        position: NormPoint,
        #[serde(default, rename = "targetObjectLabel")]
        target_label: Option<String>,
        #[serde(default)]
        prompt: Option<String>,
    },
    SetResults {
        results: Vec<GeneratedImage>,
    },
    /// Promote a generated result to the base image.
    SaveResult {
        index: usize,
    },
    SetBusy {
        busy: bool,
    },
}

/// Everything the controller reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Notification {
    MarkerAdded {
        marker: Marker,
    },
    MarkerUpdated {
        marker: Marker,
    },
    MarkerRemoved {
        id: Id,
    },
    MarkerDragStarted {
        id: Id,
    },
    MarkerDragEnded {
        id: Id,
    },
    /// An asset was dropped on the image: generate a placement there.
    AssetDropGenerate {
        asset_id: Id,
        position: NormPoint,
        #[serde(rename = "targetObjectLabel")]
        target_label: Option<String>,
    },
    /// Files were dropped: the orchestrator should read them and send
    /// [`Command::SetBaseImage`].
    BaseImageReplaceRequested,
    SliderDragStarted {
        split: f64,
    },
    SliderMoved {
        split: f64,
    },
    SliderDragEnded {
        split: f64,
    },
    ViewportChanged {
        zoom: f64,
        pan: Vec2,
    },
    GridToggled {
        visible: bool,
    },
    CompareToggled {
        active: bool,
    },
    HoverLabelChanged {
        label: Option<String>,
    },
    DropIndicatorChanged {
        position: Option<NormPoint>,
    },
    DragActiveChanged {
        active: bool,
    },
    /// A new base image (or none) is installed; all image-bound state is gone.
    WorkspaceReset {
        image_id: Option<Id>,
    },
    /// The hit map for `image_id` is built and authoritative.
    SegmentationReady {
        image_id: Id,
        labels: Vec<String>,
    },
    HistoryChanged {
        can_undo: bool,
        can_redo: bool,
    },
    Rejected {
        reason: String,
    },
}

pub type Notifications = SmallVec<[Notification; 4]>;

/// Outcome of one [`CanvasController::dispatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    pub notifications: Notifications,
    /// Something visible changed; the view should re-render.
    pub changed: bool,
}

impl Dispatch {
    fn notify(&mut self, notification: Notification) {
        self.changed = true;
        self.notifications.push(notification);
    }

    fn reject(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        log::debug!("rejected: {reason}");
        self.notifications.push(Notification::Rejected { reason });
    }

    fn touch(&mut self) {
        self.changed = true;
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && !self.changed
    }
}

const BUSY: &str = "a request is in progress";

pub struct CanvasController {
    config: CanvasConfig,
    ws: Workspace,
    gesture: GestureMachine,
    history: ImageHistory,
}

impl Default for CanvasController {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl CanvasController {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            gesture: GestureMachine::new(config.pan_threshold),
            history: ImageHistory::new(config.history_depth),
            ws: Workspace::new(),
            config,
        }
    }

    /// Apply one command.
    pub fn dispatch(&mut self, command: Command) -> Dispatch {
        let mut out = Dispatch::default();
        match command {
            Command::Input { event } => self.handle_input(&event, &mut out),
            Command::Key { key, modifiers } => {
                if let Some(action) = ShortcutMap::resolve(&key, &modifiers) {
                    log::debug!("shortcut `{key}` → {action:?}");
                    self.run_shortcut(action, &mut out);
                }
            }
            Command::Resize { width, height } => {
                self.ws.container = Some(mc_core::Size::new(width, height));
                if self.ws.recompute_geometry() {
                    out.touch();
                }
            }
            Command::ImageLoaded {
                image_id,
                width,
                height,
            } => self.image_loaded(image_id, width, height, &mut out),
            Command::ZoomIn => self.zoom_step(true, &mut out),
            Command::ZoomOut => self.zoom_step(false, &mut out),
            Command::ZoomReset => {
                if self.ws.viewport.reset() {
                    self.notify_viewport(&mut out);
                }
            }
            Command::ToggleGrid => {
                self.ws.grid = !self.ws.grid;
                out.notify(Notification::GridToggled {
                    visible: self.ws.grid,
                });
            }
            Command::ToggleCompare => self.toggle_compare(&mut out),
            Command::SetCompareSplit { split } => self.set_split(split, &mut out),
            Command::SelectResult { index } => {
                if index < self.ws.results.len() {
                    if self.ws.selected_result != index {
                        self.ws.selected_result = index;
                        out.touch();
                    }
                } else {
                    out.reject(format!("no generated result #{index}"));
                }
            }
            Command::UpdateMarker { id, patch } => {
                if self.ws.busy {
                    return reject_busy(out);
                }
                match self.ws.markers.update(id, &patch) {
                    Some(marker) => out.notify(Notification::MarkerUpdated { marker }),
                    None => log::trace!("marker {id}: update had no effect"),
                }
            }
            Command::RemoveMarker { id } => {
                if self.ws.busy {
                    return reject_busy(out);
                }
                self.remove_marker(id, &mut out);
            }
            Command::Undo => self.step_history(true, &mut out),
            Command::Redo => self.step_history(false, &mut out),
            Command::SetBaseImage { image } => {
                if self.ws.busy {
                    return reject_busy(out);
                }
                self.replace_base(image, &mut out);
            }
            Command::SetMasks { masks } => self.set_masks(masks, &mut out),
            Command::AddAsset { asset } => {
                match self.ws.assets.iter_mut().find(|a| a.id == asset.id) {
                    Some(slot) => *slot = asset,
                    None => self.ws.assets.push(asset),
                }
                out.touch();
            }
            Command::RemoveAsset { asset_id } => {
                let before = self.ws.assets.len();
                self.ws.assets.retain(|a| a.id != asset_id);
                if self.ws.assets.len() != before {
                    out.touch();
                }
            }
            Command::ClearAssets => {
                if !self.ws.assets.is_empty() {
                    self.ws.assets.clear();
                    out.touch();
                }
            }
            Command::PlaceAsset {
                asset_id,
                position,
                target_label,
                prompt,
            } => {
                let marker = self
                    .ws
                    .markers
                    .add_asset(asset_id, position, target_label, prompt);
                out.notify(Notification::MarkerAdded {
                    marker: Marker::Asset(marker),
                });
            }
            Command::SetResults { results } => {
                self.ws.results = results;
                self.ws.selected_result = 0;
                if self.ws.results.is_empty() && self.ws.compare.active {
                    self.set_compare(false, &mut out);
                }
                out.touch();
            }
            Command::SaveResult { index } => {
                if self.ws.busy {
                    return reject_busy(out);
                }
                match self.ws.results.get(index) {
                    Some(result) => {
                        let image = ImageRef::new(result.image.clone());
                        self.replace_base(image, &mut out);
                    }
                    None => out.reject(format!("no generated result #{index}")),
                }
            }
            Command::SetBusy { busy } => self.set_busy(busy, &mut out),
        }
        out
    }

    /// Install segmentation decoded off-thread with [`MaskLayers::decode`].
    ///
    /// Layers for a stale image or the wrong dimensions are dropped; the
    /// mask set is still kept and re-rasterized when the image loads.
    pub fn install_layers(&mut self, layers: MaskLayers) -> Dispatch {
        let mut out = Dispatch::default();
        if self.ws.base_id() != Some(layers.image_id()) {
            log::debug!("dropping stale layers for {}", layers.image_id());
            return out;
        }
        let set = layers.mask_set().clone();
        if self.ws.natural_size == Some(layers.dimensions()) {
            self.ws.masks = Some(set);
            self.ws.layers = Some(layers);
            self.segmentation_ready(&mut out);
        } else {
            self.set_masks(set, &mut out);
        }
        out
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.ws
    }

    pub fn viewport(&self) -> Viewport {
        self.ws.viewport
    }

    pub fn rendered(&self) -> Option<RenderedImage> {
        self.ws.rendered
    }

    pub fn markers(&self) -> &MarkerStore {
        &self.ws.markers
    }

    pub fn selected_marker(&self) -> Option<Id> {
        self.ws.selected_marker
    }

    pub fn hovered_label(&self) -> Option<&str> {
        self.ws.hovered_label.as_deref()
    }

    pub fn hovered_mask(&self) -> Option<usize> {
        self.ws.hovered_mask
    }

    pub fn drag_active(&self) -> bool {
        self.ws.drag_over.is_some()
    }

    pub fn drop_indicator(&self) -> Option<NormPoint> {
        self.ws.drag_over.as_ref().and_then(|d| d.indicator)
    }

    pub fn compare(&self) -> CompareState {
        self.ws.compare
    }

    pub fn grid_visible(&self) -> bool {
        self.ws.grid
    }

    pub fn is_busy(&self) -> bool {
        self.ws.busy
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn gesture(&self) -> &GestureMachine {
        &self.gesture
    }

    /// Container-pixel anchor of every marker, in paint order.
    pub fn marker_handles(&self) -> Vec<(Id, Point)> {
        self.ws
            .markers
            .iter()
            .filter_map(|m| Some((m.id(), self.ws.to_container(m.position())?)))
            .collect()
    }

    /// Container x of the compare divider, when compare mode is on.
    pub fn divider_x(&self) -> Option<f64> {
        if !self.ws.compare.active {
            return None;
        }
        let rendered = self.ws.rendered?;
        self.ws.viewport.divider_x(self.ws.compare.split, &rendered)
    }

    /// Tinted PNG of the hovered mask, at image resolution.
    pub fn hover_highlight(&self) -> Option<DataUri> {
        let index = self.ws.hovered_mask?;
        let layers = self.ws.layers.as_ref()?;
        let overlay = layers.highlight(index, self.config.highlight_alpha)?;
        to_png_data_uri(&overlay)
            .map_err(|e| log::warn!("highlight encode failed: {e}"))
            .ok()
    }

    // ─── Pointer & drag handling ─────────────────────────────────────────

    fn handle_input(&mut self, event: &InputEvent, out: &mut Dispatch) {
        match *event {
            InputEvent::Wheel { x, y, delta_y } => {
                let anchor = Point::new(x, y);
                let changed = if delta_y < 0.0 {
                    self.ws.viewport.zoom_in(anchor, &self.config.zoom)
                } else if delta_y > 0.0 {
                    self.ws.viewport.zoom_out(anchor, &self.config.zoom)
                } else {
                    false
                };
                if changed {
                    self.notify_viewport(out);
                }
            }
            InputEvent::PointerDown { x, y, .. } => {
                if self.ws.busy {
                    return;
                }
                let target = self.press_target(Point::new(x, y));
                if let PressTarget::Marker(id) = target {
                    self.ws.selected_marker = Some(id);
                }
                for action in self.gesture.handle(event, target) {
                    self.apply(action, out);
                }
            }
            InputEvent::PointerMove { .. } | InputEvent::PointerUp { .. } => {
                for action in self.gesture.handle(event, PressTarget::Inert) {
                    self.apply(action, out);
                }
            }
            InputEvent::PointerLeave => {
                for action in self.gesture.handle(event, PressTarget::Inert) {
                    self.apply(action, out);
                }
                self.set_hover(None, out);
            }
            InputEvent::DragEnter { x, y, ref payload }
            | InputEvent::DragOver { x, y, ref payload } => {
                if !self.ws.busy {
                    self.drag_over(Point::new(x, y), payload, out);
                }
            }
            InputEvent::DragLeave => self.end_drag(out),
            InputEvent::Drop { x, y, ref payload } => {
                self.end_drag(out);
                if self.ws.busy {
                    out.reject(BUSY);
                    return;
                }
                self.drop_payload(Point::new(x, y), payload, out);
            }
        }
    }

    /// Decide what a pointer-down at `p` grabs.
    fn press_target(&self, p: Point) -> PressTarget {
        let Some(rendered) = self.ws.rendered else {
            return PressTarget::Inert;
        };
        if self.ws.compare.active {
            // Compare mode only lets the divider move.
            return match self.ws.viewport.divider_x(self.ws.compare.split, &rendered) {
                Some(x) if (p.x - x).abs() <= self.config.slider_hit_tolerance => {
                    PressTarget::Slider
                }
                _ => PressTarget::Inert,
            };
        }
        match self.marker_at(p) {
            Some(id) => PressTarget::Marker(id),
            None => PressTarget::Canvas,
        }
    }

    /// Topmost marker whose handle contains `p`.
    fn marker_at(&self, p: Point) -> Option<Id> {
        let radius = self.config.marker_handle_radius;
        self.ws.markers.iter().rev().find_map(|m| {
            let anchor = self.ws.to_container(m.position())?;
            (anchor.distance(p) <= radius).then(|| m.id())
        })
    }

    fn apply(&mut self, action: GestureAction, out: &mut Dispatch) {
        match action {
            GestureAction::Pan(delta) => {
                self.ws.viewport.pan_by(delta);
                self.notify_viewport(out);
            }
            GestureAction::Click(p) => {
                let Some(point) = self.ws.resolve(p) else {
                    return;
                };
                let label = self.ws.label_at(point);
                let marker = self.ws.markers.add_edit(point, label);
                self.ws.selected_marker = Some(marker.id);
                out.notify(Notification::MarkerAdded {
                    marker: Marker::Edit(marker),
                });
            }
            GestureAction::BeginMarkerDrag(id) => {
                out.notify(Notification::MarkerDragStarted { id });
            }
            GestureAction::MoveMarker { id, at } => {
                let Some(point) = self.ws.resolve(at) else {
                    return;
                };
                if let Some(marker) = self.ws.markers.update(id, &MarkerPatch::position(point)) {
                    out.notify(Notification::MarkerUpdated { marker });
                }
            }
            GestureAction::EndMarkerDrag(id) => {
                out.notify(Notification::MarkerDragEnded { id });
            }
            GestureAction::BeginSliderDrag => {
                out.notify(Notification::SliderDragStarted {
                    split: self.ws.compare.split,
                });
            }
            GestureAction::MoveSlider(p) => {
                if let Some(point) = self.ws.resolve(p) {
                    self.set_split(point.x, out);
                }
            }
            GestureAction::EndSliderDrag => {
                out.notify(Notification::SliderDragEnded {
                    split: self.ws.compare.split,
                });
            }
            GestureAction::Hover(p) => {
                let hit = self
                    .ws
                    .resolve_inside(p)
                    .and_then(|point| self.ws.mask_at(point));
                log::trace!("hover at {p:?}: {hit:?}");
                self.set_hover(hit, out);
            }
        }
    }

    fn drag_over(&mut self, p: Point, payload: &DragPayload, out: &mut Dispatch) {
        let was_active = self.ws.drag_over.is_some();
        let previous = self.drop_indicator();
        let (next, hit) = match payload {
            DragPayload::Files => (
                DragOver {
                    asset_id: None,
                    indicator: None,
                    label: None,
                },
                None,
            ),
            DragPayload::Asset { asset_id } => {
                let indicator = self.ws.resolve(p);
                let hit = indicator.and_then(|point| self.ws.mask_at(point));
                let over = DragOver {
                    asset_id: Some(*asset_id),
                    indicator,
                    label: hit.as_ref().map(|(_, label)| label.clone()),
                };
                (over, hit)
            }
        };
        let is_asset = next.asset_id.is_some();
        self.ws.drag_over = Some(next);

        if !was_active {
            out.notify(Notification::DragActiveChanged { active: true });
        }
        if self.drop_indicator() != previous {
            out.notify(Notification::DropIndicatorChanged {
                position: self.drop_indicator(),
            });
        }
        if is_asset {
            self.set_hover(hit, out);
        }
    }

    fn end_drag(&mut self, out: &mut Dispatch) {
        let Some(previous) = self.ws.drag_over.take() else {
            return;
        };
        if previous.indicator.is_some() {
            out.notify(Notification::DropIndicatorChanged { position: None });
        }
        out.notify(Notification::DragActiveChanged { active: false });
    }

    fn drop_payload(&mut self, p: Point, payload: &DragPayload, out: &mut Dispatch) {
        match payload {
            DragPayload::Files => out.notify(Notification::BaseImageReplaceRequested),
            DragPayload::Asset { asset_id } => {
                if self.ws.asset(*asset_id).is_none() {
                    out.reject(format!("unknown asset {asset_id}"));
                    return;
                }
                // Drops outside the image clamp to its nearest edge.
                let Some(position) = self.ws.resolve(p) else {
                    return;
                };
                let target_label = self.ws.label_at(position);
                log::debug!("asset {asset_id} dropped at {position:?} on {target_label:?}");
                out.notify(Notification::AssetDropGenerate {
                    asset_id: *asset_id,
                    position,
                    target_label,
                });
            }
        }
    }

    fn set_hover(&mut self, hit: Option<MaskHit>, out: &mut Dispatch) {
        let (index, label) = match hit {
            Some((index, label)) => (Some(index), Some(label)),
            None => (None, None),
        };
        // Same label on a different mask still moves the highlight.
        if self.ws.hovered_mask != index {
            self.ws.hovered_mask = index;
            out.touch();
        }
        if self.ws.hovered_label != label {
            self.ws.hovered_label = label.clone();
            out.notify(Notification::HoverLabelChanged { label });
        }
    }

    // ─── View state ──────────────────────────────────────────────────────

    fn notify_viewport(&self, out: &mut Dispatch) {
        out.notify(Notification::ViewportChanged {
            zoom: self.ws.viewport.zoom,
            pan: self.ws.viewport.pan,
        });
    }

    /// One zoom step about the container center.
    fn zoom_step(&mut self, zoom_in: bool, out: &mut Dispatch) {
        let Some(container) = self.ws.container else {
            return;
        };
        let anchor = Point::new(container.width / 2.0, container.height / 2.0);
        let changed = if zoom_in {
            self.ws.viewport.zoom_in(anchor, &self.config.zoom)
        } else {
            self.ws.viewport.zoom_out(anchor, &self.config.zoom)
        };
        if changed {
            self.notify_viewport(out);
        }
    }

    fn toggle_compare(&mut self, out: &mut Dispatch) {
        if !self.ws.compare.active && !self.ws.has_results() {
            out.reject("nothing to compare yet");
            return;
        }
        let active = !self.ws.compare.active;
        self.set_compare(active, out);
    }

    fn set_compare(&mut self, active: bool, out: &mut Dispatch) {
        // Panning and marker drags don't survive a mode switch.
        for action in self.gesture.cancel() {
            self.apply(action, out);
        }
        self.ws.compare.active = active;
        out.notify(Notification::CompareToggled { active });
    }

    fn set_split(&mut self, split: f64, out: &mut Dispatch) {
        if !split.is_finite() {
            return;
        }
        let split = split.clamp(0.0, 1.0);
        if split != self.ws.compare.split {
            self.ws.compare.split = split;
            out.notify(Notification::SliderMoved { split });
        }
    }

    fn set_busy(&mut self, busy: bool, out: &mut Dispatch) {
        if self.ws.busy == busy {
            return;
        }
        if busy {
            for action in self.gesture.cancel() {
                self.apply(action, out);
            }
            self.end_drag(out);
        }
        log::debug!("busy: {busy}");
        self.ws.busy = busy;
        out.touch();
    }

    fn run_shortcut(&mut self, action: ShortcutAction, out: &mut Dispatch) {
        let command = match action {
            ShortcutAction::ZoomIn => Command::ZoomIn,
            ShortcutAction::ZoomOut => Command::ZoomOut,
            ShortcutAction::ZoomReset => Command::ZoomReset,
            ShortcutAction::ToggleGrid => Command::ToggleGrid,
            ShortcutAction::ToggleCompare => Command::ToggleCompare,
            ShortcutAction::Undo => Command::Undo,
            ShortcutAction::Redo => Command::Redo,
            ShortcutAction::DeleteMarker => match self.ws.selected_marker {
                Some(id) => Command::RemoveMarker { id },
                None => return,
            },
            ShortcutAction::Cancel => {
                for action in self.gesture.cancel() {
                    self.apply(action, out);
                }
                self.end_drag(out);
                return;
            }
        };
        let inner = self.dispatch(command);
        out.changed |= inner.changed;
        out.notifications.extend(inner.notifications);
    }

    // ─── Markers ─────────────────────────────────────────────────────────

    fn remove_marker(&mut self, id: Id, out: &mut Dispatch) {
        if self.ws.markers.remove(id).is_none() {
            log::trace!("remove: unknown marker {id}");
            return;
        }
        if self.ws.selected_marker == Some(id) {
            self.ws.selected_marker = None;
        }
        // A drag on a removed marker has nothing left to move.
        if let crate::gesture::Gesture::DraggingMarker { id: dragged } = self.gesture.state()
            && dragged == id
        {
            for action in self.gesture.cancel() {
                self.apply(action, out);
            }
        }
        out.notify(Notification::MarkerRemoved { id });
    }

    // ─── Base image, segmentation & history ──────────────────────────────

    fn replace_base(&mut self, image: ImageRef, out: &mut Dispatch) {
        if let Some(previous) = self.ws.base.take() {
            self.history.record(previous);
        }
        self.install_base(Some(image), out);
    }

    fn step_history(&mut self, undo: bool, out: &mut Dispatch) {
        if self.ws.busy {
            out.reject(BUSY);
            return;
        }
        let current = self.ws.base.clone();
        let restored = if undo {
            self.history.undo(current)
        } else {
            self.history.redo(current)
        };
        if let Some(image) = restored {
            self.install_base(Some(image), out);
        }
    }

    fn install_base(&mut self, image: Option<ImageRef>, out: &mut Dispatch) {
        // Close open drags while their markers still exist.
        for action in self.gesture.cancel() {
            self.apply(action, out);
        }
        self.ws.reset_for(image);
        let image_id = self.ws.base_id();
        log::debug!("workspace reset for {image_id:?}");
        out.notify(Notification::WorkspaceReset { image_id });
        out.notify(Notification::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    fn image_loaded(&mut self, image_id: Id, width: u32, height: u32, out: &mut Dispatch) {
        if self.ws.base_id() != Some(image_id) {
            log::debug!("ignoring load of stale image {image_id}");
            return;
        }
        self.ws.natural_size = Some((width, height));
        // Geometry first, then the raster that depends on the image size.
        if self.ws.recompute_geometry() {
            out.touch();
        }
        if self.ws.sync_layers() {
            self.segmentation_ready(out);
        }
    }

    fn set_masks(&mut self, masks: MaskSet, out: &mut Dispatch) {
        if self.ws.base_id() != Some(masks.image_id) {
            log::debug!("dropping stale segmentation for {}", masks.image_id);
            return;
        }
        self.ws.masks = Some(masks);
        self.ws.layers = None;
        self.set_hover(None, out);
        if self.ws.sync_layers() {
            self.segmentation_ready(out);
        } else {
            out.touch();
        }
    }

    fn segmentation_ready(&mut self, out: &mut Dispatch) {
        let Some(layers) = &self.ws.layers else {
            return;
        };
        let image_id = layers.image_id();
        let labels = layers.hit_map().labels().to_vec();
        log::debug!(
            "segmentation ready for {image_id}: {}/{} masks",
            layers.decoded_count(),
            labels.len()
        );
        out.notify(Notification::SegmentationReady { image_id, labels });
    }
}

fn reject_busy(mut out: Dispatch) -> Dispatch {
    out.reject(BUSY);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_core::Size;

    fn controller_with_image() -> (CanvasController, Id) {
        let mut c = CanvasController::default();
        let image = ImageRef::new(DataUri::from_bytes("image/png", &[1, 2, 3]));
        let id = image.id;
        c.dispatch(Command::Resize {
            width: 1000.0,
            height: 600.0,
        });
        c.dispatch(Command::SetBaseImage { image });
        c.dispatch(Command::ImageLoaded {
            image_id: id,
            width: 800,
            height: 600,
        });
        (c, id)
    }

    fn input(event: InputEvent) -> Command {
        Command::Input { event }
    }

    #[test]
    fn geometry_follows_resize_and_load() {
        let (c, _) = controller_with_image();
        assert_eq!(
            c.rendered().map(|r| r.size()),
            Some(Size::new(800.0, 600.0))
        );
    }

    #[test]
    fn stale_image_load_is_ignored() {
        let mut c = CanvasController::default();
        let image = ImageRef::new(DataUri::from_bytes("image/png", &[9]));
        c.dispatch(Command::Resize {
            width: 100.0,
            height: 100.0,
        });
        c.dispatch(Command::SetBaseImage { image });
        let d = c.dispatch(Command::ImageLoaded {
            image_id: Id::intern("some_other_image"),
            width: 10,
            height: 10,
        });
        assert!(d.is_empty());
        assert!(c.rendered().is_none());
    }

    #[test]
    fn click_without_image_is_noop() {
        let mut c = CanvasController::default();
        c.dispatch(input(InputEvent::pointer_down(10.0, 10.0)));
        let d = c.dispatch(input(InputEvent::pointer_up(10.0, 10.0)));
        assert!(d.notifications.is_empty());
        assert!(c.markers().is_empty());
    }

    #[test]
    fn pressing_marker_starts_drag_not_pan() {
        let (mut c, _) = controller_with_image();
        c.dispatch(input(InputEvent::pointer_down(500.0, 300.0)));
        c.dispatch(input(InputEvent::pointer_up(500.0, 300.0)));
        let id = c.markers().iter().next().map(Marker::id).unwrap();

        // Inside the handle radius but not dead center.
        let d = c.dispatch(input(InputEvent::pointer_down(508.0, 305.0)));
        assert_eq!(
            d.notifications.as_slice(),
            &[Notification::MarkerDragStarted { id }]
        );
        let d = c.dispatch(input(InputEvent::pointer_move(700.0, 300.0)));
        match d.notifications.as_slice() {
            [Notification::MarkerUpdated { marker }] => {
                assert_eq!(marker.position(), NormPoint::new(0.75, 0.5));
            }
            other => panic!("unexpected {other:?}"),
        }
        let d = c.dispatch(input(InputEvent::pointer_up(700.0, 300.0)));
        assert_eq!(
            d.notifications.as_slice(),
            &[Notification::MarkerDragEnded { id }]
        );
        assert_eq!(c.viewport(), Viewport::default());
        assert_eq!(c.markers().len(), 1);
    }

    #[test]
    fn wheel_zooms_about_cursor() {
        let (mut c, _) = controller_with_image();
        let d = c.dispatch(input(InputEvent::Wheel {
            x: 100.0,
            y: 100.0,
            delta_y: -1.0,
        }));
        assert!(d.changed);
        assert!((c.viewport().zoom - 1.2).abs() < 1e-12);
        c.dispatch(input(InputEvent::Wheel {
            x: 100.0,
            y: 100.0,
            delta_y: 1.0,
        }));
        assert!((c.viewport().zoom - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zoom_buttons_hold_container_center() {
        let (mut c, _) = controller_with_image();
        let before = c.workspace().resolve(Point::new(500.0, 300.0));
        c.dispatch(Command::ZoomIn);
        c.dispatch(Command::ZoomIn);
        let after = c.workspace().resolve(Point::new(500.0, 300.0));
        let (before, after) = (before.unwrap(), after.unwrap());
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
        let d = c.dispatch(Command::ZoomReset);
        assert_eq!(
            d.notifications.as_slice(),
            &[Notification::ViewportChanged {
                zoom: 1.0,
                pan: Vec2::ZERO
            }]
        );
    }

    #[test]
    fn grid_toggle_round_trips() {
        let mut c = CanvasController::default();
        let d = c.dispatch(Command::Key {
            key: "g".into(),
            modifiers: Modifiers::NONE,
        });
        assert_eq!(
            d.notifications.as_slice(),
            &[Notification::GridToggled { visible: true }]
        );
        c.dispatch(Command::ToggleGrid);
        assert!(!c.grid_visible());
    }

    #[test]
    fn delete_key_removes_selected_marker() {
        let (mut c, _) = controller_with_image();
        c.dispatch(input(InputEvent::pointer_down(300.0, 300.0)));
        c.dispatch(input(InputEvent::pointer_up(300.0, 300.0)));
        let id = c.selected_marker().unwrap();
        let d = c.dispatch(Command::Key {
            key: "Delete".into(),
            modifiers: Modifiers::NONE,
        });
        assert_eq!(
            d.notifications.as_slice(),
            &[Notification::MarkerRemoved { id }]
        );
        assert!(c.selected_marker().is_none());
        assert!(c.markers().is_empty());
    }

    #[test]
    fn command_json_uses_camel_case_tags() {
        let json = r#"{"type":"imageLoaded","imageId":"image_x","width":4,"height":3}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::ImageLoaded {
                image_id: Id::intern("image_x"),
                width: 4,
                height: 3
            }
        );
        let n = serde_json::to_value(Notification::HistoryChanged {
            can_undo: true,
            can_redo: false,
        })
        .unwrap();
        assert_eq!(n["type"], "historyChanged");
        assert_eq!(n["canUndo"], true);
    }
}
