//! Immutable edit state shared by the renderer and the editor.
//!
//! Nothing in this crate touches the GPU. A snapshot is an [`ImageState`]
//! behind an `Arc`; every edit produces a new snapshot with one field
//! replaced.

pub mod filter;
pub mod id;
pub mod layer;
pub mod math;
pub mod state;
pub mod texture;

pub use filter::{FilterKind, FilterSettings};
pub use id::{IdAllocator, LayerId, TextureId};
pub use layer::{
    BoxMetrics, BrushStyle, BrushTouch, DrawLayer, EstimatedTextMeasure, FontAttributes, Layer,
    LayerKind, Placement, Rgba, StickerLayer, TextAlign, TextBackground, TextLayer, TextMeasure,
    TextStroke,
};
pub use math::{deg_to_rad, Camera, Mat3};
pub use state::{AspectPreset, AspectRatio, ImageState};
pub use texture::{RawPixels, TextureError, TexturePixels, TextureSource, TextureSourceFactory};
