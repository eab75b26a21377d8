//! Pixel-side machinery: decoding segmentation masks, rasterizing them into
//! a hit map, and tinting the hovered one.

pub mod hit;
pub mod layers;
pub mod mask;
pub mod overlay;

pub use hit::{HitMap, HitMapBuilder};
pub use layers::MaskLayers;
pub use mask::{AlphaPlane, MaskError, decode_mask};
pub use overlay::{highlight_overlay, to_png_data_uri};
