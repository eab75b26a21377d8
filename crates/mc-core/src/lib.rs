pub mod color;
pub mod config;
pub mod data_uri;
pub mod geometry;
pub mod id;
pub mod marker;
pub mod model;

pub use color::{Color, MARKER_PALETTE, MASK_PALETTE};
pub use config::CanvasConfig;
pub use data_uri::{DataUri, DataUriError};
pub use geometry::{NormPoint, RenderedImage, Viewport, ZoomLimits};
pub use id::Id;
pub use marker::{AssetMarker, EditMarker, Marker, MarkerPatch, MarkerStore};
pub use model::*;

// Re-export kurbo geometry so downstream crates don't need a direct dependency
pub use kurbo::{Point, Size, Vec2};
