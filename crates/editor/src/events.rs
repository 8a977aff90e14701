use editstate::{AspectRatio, BrushTouch, FilterKind, FilterSettings, LayerId, LayerKind, Placement};
use serde::{Deserialize, Serialize};

/// Discrete edit emitted by UI collaborators. Each variant carries exactly
/// what its mutator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageChangeEvent {
    /// One slider moved.
    Filter { kind: FilterKind, value: f32 },
    /// The whole filter block replaced, e.g. when applying a preset.
    Filters { settings: FilterSettings },
    /// Absolute rotation in degrees.
    Rotate {
        angle: f32,
        #[serde(default)]
        animation: bool,
    },
    AspectRatio { aspect_ratio: AspectRatio },
    /// Translation delta in photo pixels.
    Translate {
        dx: f32,
        dy: f32,
        #[serde(default)]
        animation: bool,
    },
    /// Scale delta added to each axis.
    Scale {
        dx: f32,
        dy: f32,
        #[serde(default)]
        animation: bool,
    },
    FlipHorizontal {
        #[serde(default)]
        animation: bool,
    },
    CreateLayer {
        kind: LayerKind,
        #[serde(default)]
        placement: Option<Placement>,
    },
    UpdateLayer {
        id: LayerId,
        #[serde(default)]
        kind: Option<LayerKind>,
        #[serde(default)]
        placement: Option<Placement>,
        #[serde(default)]
        z_index: Option<i32>,
    },
    DeleteLayer { id: LayerId },
    /// Brush touches appended to the draw layer.
    Draw { touches: Vec<BrushTouch> },
}

impl ImageChangeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ImageChangeEvent::Filter { .. } => "filter",
            ImageChangeEvent::Filters { .. } => "filters",
            ImageChangeEvent::Rotate { .. } => "rotate",
            ImageChangeEvent::AspectRatio { .. } => "aspect_ratio",
            ImageChangeEvent::Translate { .. } => "translate",
            ImageChangeEvent::Scale { .. } => "scale",
            ImageChangeEvent::FlipHorizontal { .. } => "flip_horizontal",
            ImageChangeEvent::CreateLayer { .. } => "create_layer",
            ImageChangeEvent::UpdateLayer { .. } => "update_layer",
            ImageChangeEvent::DeleteLayer { .. } => "delete_layer",
            ImageChangeEvent::Draw { .. } => "draw",
        }
    }
}
