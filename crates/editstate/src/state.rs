use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::filter::FilterSettings;
use crate::id::LayerId;
use crate::layer::{DrawLayer, Layer, Placement};
use crate::texture::TextureSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectPreset {
    #[serde(rename = "3:2")]
    ThreeTwo,
    #[serde(rename = "2:3")]
    TwoThree,
    #[serde(rename = "4:3")]
    FourThree,
    #[serde(rename = "3:4")]
    ThreeFour,
    #[serde(rename = "5:4")]
    FiveFour,
    #[serde(rename = "4:5")]
    FourFive,
    #[serde(rename = "7:5")]
    SevenFive,
    #[serde(rename = "5:7")]
    FiveSeven,
    #[serde(rename = "16:9")]
    SixteenNine,
    #[serde(rename = "9:16")]
    NineSixteen,
}

impl AspectPreset {
    pub fn ratio(self) -> f32 {
        let (w, h) = match self {
            AspectPreset::ThreeTwo => (3.0, 2.0),
            AspectPreset::TwoThree => (2.0, 3.0),
            AspectPreset::FourThree => (4.0, 3.0),
            AspectPreset::ThreeFour => (3.0, 4.0),
            AspectPreset::FiveFour => (5.0, 4.0),
            AspectPreset::FourFive => (4.0, 5.0),
            AspectPreset::SevenFive => (7.0, 5.0),
            AspectPreset::FiveSeven => (5.0, 7.0),
            AspectPreset::SixteenNine => (16.0, 9.0),
            AspectPreset::NineSixteen => (9.0, 16.0),
        };
        w / h
    }
}

/// Crop frame directive: either a named preset or a free-form ratio.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    #[default]
    Free,
    Original,
    Square,
    Preset(AspectPreset),
    /// Width divided by height.
    Ratio(f32),
}

impl AspectRatio {
    /// Width / height for this directive, `None` when unconstrained.
    pub fn resolve(self, width: u32, height: u32) -> Option<f32> {
        match self {
            AspectRatio::Free => None,
            AspectRatio::Original => {
                if height == 0 {
                    None
                } else {
                    Some(width as f32 / height as f32)
                }
            }
            AspectRatio::Square => Some(1.0),
            AspectRatio::Preset(preset) => Some(preset.ratio()),
            AspectRatio::Ratio(ratio) if ratio.is_finite() && ratio > 0.0 => Some(ratio),
            AspectRatio::Ratio(_) => None,
        }
    }
}

/// Snapshot of every edit parameter at one point in history.
///
/// Snapshots are shared through `Arc` and never mutated; the `with_*`
/// builders clone the struct and replace a single field.
#[derive(Debug, Clone, Serialize)]
pub struct ImageState {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub source: Option<TextureSource>,
    pub filter: FilterSettings,
    pub placement: Placement,
    pub aspect_ratio: AspectRatio,
    pub layers: Vec<Arc<Layer>>,
}

impl ImageState {
    /// A state for a `width x height` photo pivoting around its centre.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            source: None,
            filter: FilterSettings::default(),
            placement: Placement {
                origin: [width as f32 * 0.5, height as f32 * 0.5],
                ..Placement::default()
            },
            aspect_ratio: AspectRatio::Free,
            layers: Vec::new(),
        }
    }

    pub fn from_source(source: TextureSource) -> Self {
        let (width, height) = source.dimensions();
        let mut state = Self::new(width, height);
        state.source = Some(source);
        state
    }

    pub fn translation(&self) -> [f32; 2] {
        self.placement.translation
    }

    pub fn scale(&self) -> [f32; 2] {
        self.placement.scale
    }

    pub fn rotation(&self) -> f32 {
        self.placement.rotation
    }

    pub fn with_filter(&self, filter: FilterSettings) -> Self {
        Self {
            filter,
            ..self.clone()
        }
    }

    pub fn with_placement(&self, placement: Placement) -> Self {
        Self {
            placement,
            ..self.clone()
        }
    }

    pub fn with_rotation(&self, degrees: f32) -> Self {
        self.with_placement(Placement {
            rotation: degrees,
            ..self.placement
        })
    }

    pub fn with_translation(&self, translation: [f32; 2]) -> Self {
        self.with_placement(Placement {
            translation,
            ..self.placement
        })
    }

    pub fn with_scale(&self, scale: [f32; 2]) -> Self {
        self.with_placement(Placement {
            scale,
            ..self.placement
        })
    }

    pub fn with_origin(&self, origin: [f32; 2]) -> Self {
        self.with_placement(Placement {
            origin,
            ..self.placement
        })
    }

    pub fn with_aspect_ratio(&self, aspect_ratio: AspectRatio) -> Self {
        Self {
            aspect_ratio,
            ..self.clone()
        }
    }

    pub fn with_source(&self, source: TextureSource) -> Self {
        let (width, height) = source.dimensions();
        Self {
            width,
            height,
            source: Some(source),
            ..self.clone()
        }
    }

    /// Inserts `layer`, replacing any layer with the same id.
    pub fn with_layer(&self, layer: Layer) -> Self {
        let mut layers = self.layers.clone();
        let layer = Arc::new(layer);
        match layers.iter().position(|existing| existing.id == layer.id) {
            Some(index) => layers[index] = layer,
            None => layers.push(layer),
        }
        Self {
            layers,
            ..self.clone()
        }
    }

    pub fn without_layer(&self, id: LayerId) -> Self {
        let layers = self
            .layers
            .iter()
            .filter(|layer| layer.id != id)
            .cloned()
            .collect();
        Self {
            layers,
            ..self.clone()
        }
    }

    pub fn layer(&self, id: LayerId) -> Option<&Arc<Layer>> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// The first freehand layer, if any. The editor keeps at most one.
    pub fn draw_layer(&self) -> Option<(&Layer, &DrawLayer)> {
        self.layers
            .iter()
            .find_map(|layer| layer.as_draw().map(|draw| (layer.as_ref(), draw)))
    }

    /// Text and sticker layers in paint order (lowest z first, insertion
    /// order breaking ties).
    pub fn object_layers(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self
            .layers
            .iter()
            .map(|layer| layer.as_ref())
            .filter(|layer| layer.as_draw().is_none())
            .collect();
        layers.sort_by_key(|layer| layer.z_index);
        layers
    }

    pub fn next_z_index(&self) -> i32 {
        self.layers
            .iter()
            .map(|layer| layer.z_index)
            .max()
            .map_or(0, |z| z + 1)
    }

    /// Pixel size of the compiled output: the largest centred rectangle with
    /// the resolved aspect ratio inside the photo.
    pub fn result_size(&self) -> (u32, u32) {
        let width = self.width.max(1);
        let height = self.height.max(1);
        match self.aspect_ratio.resolve(width, height) {
            None => (width, height),
            Some(ratio) => {
                let current = width as f32 / height as f32;
                if current > ratio {
                    (((height as f32 * ratio).round() as u32).max(1), height)
                } else {
                    (width, ((width as f32 / ratio).round() as u32).max(1))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerKind, StickerLayer};

    fn sticker(id: u64, z_index: i32) -> Layer {
        Layer::new(
            LayerId(id),
            z_index,
            LayerKind::Sticker(StickerLayer {
                source: format!("sticker-{id}"),
                width: 64,
                height: 64,
            }),
        )
    }

    #[test]
    fn builders_leave_original_untouched() {
        let state = ImageState::new(800, 600);
        let rotated = state.with_rotation(90.0);
        assert_eq!(state.rotation(), 0.0);
        assert_eq!(rotated.rotation(), 90.0);
        assert_eq!(rotated.placement.origin, [400.0, 300.0]);
    }

    #[test]
    fn with_layer_replaces_by_id() {
        let state = ImageState::new(10, 10)
            .with_layer(sticker(1, 0))
            .with_layer(sticker(2, 1));
        let moved = sticker(1, 5);
        let state = state.with_layer(moved);
        assert_eq!(state.layers.len(), 2);
        let order: Vec<u64> = state.object_layers().iter().map(|l| l.id.0).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(state.next_z_index(), 6);
        assert_eq!(state.without_layer(LayerId(2)).layers.len(), 1);
    }

    #[test]
    fn result_size_crops_to_ratio() {
        let state = ImageState::new(1600, 900);
        assert_eq!(state.result_size(), (1600, 900));
        assert_eq!(
            state.with_aspect_ratio(AspectRatio::Square).result_size(),
            (900, 900)
        );
        assert_eq!(
            state
                .with_aspect_ratio(AspectRatio::Preset(AspectPreset::NineSixteen))
                .result_size(),
            (506, 900)
        );
        assert_eq!(
            state.with_aspect_ratio(AspectRatio::Ratio(4.0)).result_size(),
            (1600, 400)
        );
    }

    #[test]
    fn invalid_ratio_is_unconstrained() {
        assert_eq!(AspectRatio::Ratio(-1.0).resolve(10, 10), None);
        assert_eq!(AspectRatio::Ratio(f32::NAN).resolve(10, 10), None);
    }
}
