//! Edit and asset markers anchored in normalized image space.
//!
//! Markers are immutable-by-replacement records keyed by [`Id`]. The store
//! keeps both kinds in one list whose order is the paint order: later
//! markers are drawn on top and win handle hit tests.

use crate::color::{Color, MARKER_PALETTE};
use crate::geometry::NormPoint;
use crate::id::Id;
use serde::{Deserialize, Serialize};

/// A free-text edit instruction pinned to a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMarker {
    pub id: Id,
    #[serde(flatten)]
    pub position: NormPoint,
    pub prompt: String,
    #[serde(rename = "targetObjectLabel")]
    pub target_label: Option<String>,
}

/// An uploaded asset placed at a point. The asset is referenced, not owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMarker {
    pub id: Id,
    pub asset_id: Id,
    #[serde(flatten)]
    pub position: NormPoint,
    pub color: Color,
    pub prompt: Option<String>,
    #[serde(rename = "targetObjectLabel")]
    pub target_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Marker {
    Edit(EditMarker),
    Asset(AssetMarker),
}

impl Marker {
    pub fn id(&self) -> Id {
        match self {
            Marker::Edit(m) => m.id,
            Marker::Asset(m) => m.id,
        }
    }

    pub fn position(&self) -> NormPoint {
        match self {
            Marker::Edit(m) => m.position,
            Marker::Asset(m) => m.position,
        }
    }

    pub fn target_label(&self) -> Option<&str> {
        match self {
            Marker::Edit(m) => m.target_label.as_deref(),
            Marker::Asset(m) => m.target_label.as_deref(),
        }
    }

    /// Return a copy with `patch` merged in.
    fn merged(&self, patch: &MarkerPatch) -> Marker {
        let mut next = self.clone();
        match &mut next {
            Marker::Edit(m) => {
                if let Some(p) = &patch.prompt {
                    m.prompt = p.clone();
                }
                if let Some(label) = &patch.target_label {
                    m.target_label = label.clone();
                }
                if let Some(pos) = patch.position {
                    m.position = NormPoint::clamped(pos.x, pos.y);
                }
            }
            Marker::Asset(m) => {
                if let Some(p) = &patch.prompt {
                    m.prompt = (!p.is_empty()).then(|| p.clone());
                }
                if let Some(label) = &patch.target_label {
                    m.target_label = label.clone();
                }
                if let Some(pos) = patch.position {
                    m.position = NormPoint::clamped(pos.x, pos.y);
                }
            }
        }
        next
    }
}

/// Partial update. `None` fields are left unchanged; `target_label:
/// Some(None)` clears the binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkerPatch {
    pub prompt: Option<String>,
    #[serde(
        rename = "targetObjectLabel",
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_label: Option<Option<String>>,
    pub position: Option<NormPoint>,
}

impl MarkerPatch {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            prompt: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn position(position: NormPoint) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }
}

/// Distinguishes "field absent" from "field is null" for `Option<Option<T>>`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

/// All markers in the workspace, plus the asset palette cursor.
#[derive(Debug, Clone, Default)]
pub struct MarkerStore {
    markers: Vec<Marker>,
    /// Advances on every asset-marker creation; never rewinds.
    next_color: usize,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edit marker with an empty prompt.
    pub fn add_edit(&mut self, position: NormPoint, target_label: Option<String>) -> EditMarker {
        let marker = EditMarker {
            id: Id::with_prefix("edit"),
            position: NormPoint::clamped(position.x, position.y),
            prompt: String::new(),
            target_label,
        };
        log::debug!("add edit marker {} at {:?}", marker.id, marker.position);
        self.markers.push(Marker::Edit(marker.clone()));
        marker
    }

    /// Append an asset marker, taking the next palette color.
    pub fn add_asset(
        &mut self,
        asset_id: Id,
        position: NormPoint,
        target_label: Option<String>,
        prompt: Option<String>,
    ) -> AssetMarker {
        let color = MARKER_PALETTE[self.next_color % MARKER_PALETTE.len()];
        self.next_color = (self.next_color + 1) % MARKER_PALETTE.len();
        let marker = AssetMarker {
            id: Id::with_prefix("asset_marker"),
            asset_id,
            position: NormPoint::clamped(position.x, position.y),
            color,
            prompt,
            target_label,
        };
        log::debug!(
            "add asset marker {} for {} color {}",
            marker.id,
            asset_id,
            color.to_hex()
        );
        self.markers.push(Marker::Asset(marker.clone()));
        marker
    }

    /// Merge `patch` into the marker with `id`. Returns the new record.
    pub fn update(&mut self, id: Id, patch: &MarkerPatch) -> Option<Marker> {
        let slot = self.markers.iter_mut().find(|m| m.id() == id)?;
        let next = slot.merged(patch);
        if next == *slot {
            return None;
        }
        *slot = next.clone();
        Some(next)
    }

    /// Reposition a marker (drag). Returns `false` if the id is unknown or
    /// the position is unchanged.
    pub fn move_to(&mut self, id: Id, position: NormPoint) -> bool {
        self.update(id, &MarkerPatch::position(position)).is_some()
    }

    pub fn remove(&mut self, id: Id) -> Option<Marker> {
        let pos = self.markers.iter().position(|m| m.id() == id)?;
        Some(self.markers.remove(pos))
    }

    /// Drop every marker. The palette cursor is kept.
    pub fn clear(&mut self) {
        self.markers.clear();
    }

    pub fn get(&self, id: Id) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id() == id)
    }

    /// Markers in paint order (bottom first).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn edits(&self) -> impl Iterator<Item = &EditMarker> {
        self.markers.iter().filter_map(|m| match m {
            Marker::Edit(e) => Some(e),
            Marker::Asset(_) => None,
        })
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetMarker> {
        self.markers.iter().filter_map(|m| match m {
            Marker::Asset(a) => Some(a),
            Marker::Edit(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Palette index the next asset marker will take.
    pub fn next_color_index(&self) -> usize {
        self.next_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn edit_marker_starts_empty() {
        let mut store = MarkerStore::new();
        let m = store.add_edit(NormPoint::new(0.25, 0.75), Some("boat".into()));
        assert_eq!(m.prompt, "");
        assert_eq!(m.target_label.as_deref(), Some("boat"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn palette_cycles_regardless_of_removals() {
        let mut store = MarkerStore::new();
        let asset = Id::intern("asset_src");
        let mut colors = Vec::new();
        for i in 0..8 {
            let m = store.add_asset(asset, NormPoint::CENTER, None, None);
            colors.push(m.color);
            if i % 2 == 0 {
                store.remove(m.id);
            }
        }
        let expected: Vec<Color> = (0..8).map(|i| MARKER_PALETTE[i % 6]).collect();
        assert_eq!(colors, expected);
    }

    #[test]
    fn clear_keeps_palette_cursor() {
        let mut store = MarkerStore::new();
        let asset = Id::intern("asset_src");
        store.add_asset(asset, NormPoint::CENTER, None, None);
        store.add_asset(asset, NormPoint::CENTER, None, None);
        store.clear();
        assert!(store.is_empty());
        let m = store.add_asset(asset, NormPoint::CENTER, None, None);
        assert_eq!(m.color, MARKER_PALETTE[2]);
    }

    #[test]
    fn update_merges_partial_fields() {
        let mut store = MarkerStore::new();
        let m = store.add_edit(NormPoint::new(0.1, 0.1), Some("tree".into()));
        let updated = store.update(m.id, &MarkerPatch::prompt("make it red")).unwrap();
        match updated {
            Marker::Edit(e) => {
                assert_eq!(e.prompt, "make it red");
                assert_eq!(e.target_label.as_deref(), Some("tree"));
                assert_eq!(e.position, NormPoint::new(0.1, 0.1));
            }
            Marker::Asset(_) => panic!("expected edit marker"),
        }

        let clear_label = MarkerPatch {
            target_label: Some(None),
            ..MarkerPatch::default()
        };
        store.update(m.id, &clear_label).unwrap();
        assert_eq!(store.get(m.id).unwrap().target_label(), None);
    }

    #[test]
    fn unchanged_update_reports_nothing() {
        let mut store = MarkerStore::new();
        let m = store.add_edit(NormPoint::CENTER, None);
        assert!(store.update(m.id, &MarkerPatch::prompt("")).is_none());
        assert!(!store.move_to(m.id, NormPoint::CENTER));
        assert!(!store.move_to(Id::intern("missing"), NormPoint::CENTER));
    }

    #[test]
    fn move_clamps_into_image() {
        let mut store = MarkerStore::new();
        let m = store.add_edit(NormPoint::CENTER, None);
        assert!(store.move_to(m.id, NormPoint::new(1.4, -0.2)));
        assert_eq!(store.get(m.id).unwrap().position(), NormPoint::new(1.0, 0.0));
    }

    #[test]
    fn coincident_markers_stay_addressable() {
        let mut store = MarkerStore::new();
        let a = store.add_edit(NormPoint::CENTER, None);
        let b = store.add_edit(NormPoint::CENTER, None);
        assert_ne!(a.id, b.id);
        store.remove(a.id);
        assert!(store.get(b.id).is_some());
        assert_eq!(store.edits().count(), 1);
    }

    #[test]
    fn marker_json_has_flat_coordinates() {
        let mut store = MarkerStore::new();
        let m = store.add_edit(NormPoint::new(0.25, 0.75), Some("boat".into()));
        let json = serde_json::to_value(Marker::Edit(m.clone())).unwrap();
        assert_eq!(json["kind"], "edit");
        assert_eq!(json["x"], 0.25);
        assert_eq!(json["y"], 0.75);
        assert_eq!(json["targetObjectLabel"], "boat");
        assert!(json.get("position").is_none());

        let back: Marker = serde_json::from_value(json).unwrap();
        assert_eq!(back, Marker::Edit(m));
    }

    #[test]
    fn patch_json_distinguishes_null_label() {
        let patch: MarkerPatch = serde_json::from_str(r#"{"targetObjectLabel":null}"#).unwrap();
        assert_eq!(patch.target_label, Some(None));
        let patch: MarkerPatch = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert_eq!(patch.target_label, None);
    }
}
