//! Overlay objects composited above the photo.

use serde::{Deserialize, Serialize};

use crate::id::LayerId;
use crate::math::{deg_to_rad, Mat3};
use crate::texture::TextureSource;

/// Straight-alpha RGBA, each channel in `0.0..=1.0`.
pub type Rgba = [f32; 4];

/// Affine placement shared by the photo and every layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub translation: [f32; 2],
    pub origin: [f32; 2],
    pub scale: [f32; 2],
    /// Degrees.
    pub rotation: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            translation: [0.0, 0.0],
            origin: [0.0, 0.0],
            scale: [1.0, 1.0],
            rotation: 0.0,
        }
    }
}

impl Placement {
    /// Local space (pixels, origin at `origin`) to parent space.
    pub fn matrix(&self) -> Mat3 {
        self.scaled_matrix(1.0)
    }

    /// Same as [`Placement::matrix`] for content whose pixel units were
    /// multiplied by `factor` (the device pixel ratio).
    pub fn scaled_matrix(&self, factor: f32) -> Mat3 {
        let mut m = Mat3::identity();
        m.translate([self.translation[0] * factor, self.translation[1] * factor])
            .rotate(deg_to_rad(self.rotation))
            .scale(self.scale)
            .translate([-self.origin[0] * factor, -self.origin[1] * factor]);
        m
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushStyle {
    Paint,
    /// Samples a blur of the photo under the brush.
    Blur,
    /// Overwrites earlier strokes with transparency.
    Eraser,
}

impl BrushStyle {
    /// Value written to the per-vertex style attribute.
    pub fn shader_index(self) -> f32 {
        match self {
            BrushStyle::Paint => 0.0,
            BrushStyle::Blur => 1.0,
            BrushStyle::Eraser => 2.0,
        }
    }

    pub fn replaces_destination(self) -> bool {
        matches!(self, BrushStyle::Eraser)
    }
}

/// One sampled point of a freehand stroke, in photo pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushTouch {
    pub x: f32,
    pub y: f32,
    /// Stroke diameter in photo pixels.
    pub size: f32,
    pub style: BrushStyle,
    pub color: Rgba,
    pub sequence_id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawLayer {
    #[serde(default)]
    pub touches: Vec<BrushTouch>,
}

impl DrawLayer {
    /// Splits touches into runs of one continuous gesture each.
    pub fn gestures(&self) -> Vec<&[BrushTouch]> {
        self.touches
            .chunk_by(|a, b| a.sequence_id == b.sequence_id)
            .collect()
    }

    pub fn next_sequence_id(&self) -> u32 {
        self.touches
            .iter()
            .map(|touch| touch.sequence_id)
            .max()
            .map_or(0, |id| id + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontAttributes {
    pub family: String,
    /// Pixels.
    pub size: f32,
    pub weight: u16,
    pub align: TextAlign,
    /// Multiple of `size`.
    pub line_height: f32,
}

impl Default for FontAttributes {
    fn default() -> Self {
        Self {
            family: "Roboto".to_string(),
            size: 24.0,
            weight: 500,
            align: TextAlign::Center,
            line_height: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStroke {
    pub color: Rgba,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBackground {
    #[default]
    None,
    /// Rounded box behind the text.
    Solid,
    /// Translucent rounded box.
    Frosted,
}

/// Box derived from the text and font; the texture producer draws into it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxMetrics {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub radius: f32,
}

/// Measures laid-out text. Real glyph metrics belong to the UI; the core
/// only needs a box to size textures and hit areas.
pub trait TextMeasure {
    /// Width of a single line in pixels.
    fn line_width(&self, line: &str, font: &FontAttributes) -> f32;
}

/// Average-advance estimate used when no UI measurer is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedTextMeasure;

impl TextMeasure for EstimatedTextMeasure {
    fn line_width(&self, line: &str, font: &FontAttributes) -> f32 {
        let weight_factor = if font.weight >= 600 { 0.62 } else { 0.56 };
        line.chars().count() as f32 * font.size * weight_factor
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    pub text: String,
    #[serde(default)]
    pub font: FontAttributes,
    #[serde(default = "default_text_fill")]
    pub fill: Rgba,
    #[serde(default)]
    pub stroke: Option<TextStroke>,
    #[serde(default)]
    pub background: TextBackground,
    #[serde(default)]
    pub metrics: BoxMetrics,
}

fn default_text_fill() -> Rgba {
    [1.0, 1.0, 1.0, 1.0]
}

impl TextLayer {
    pub fn new(text: impl Into<String>, font: FontAttributes, measure: &dyn TextMeasure) -> Self {
        let mut layer = Self {
            text: text.into(),
            font,
            fill: default_text_fill(),
            stroke: None,
            background: TextBackground::None,
            metrics: BoxMetrics::default(),
        };
        layer.metrics = layer.measure(measure);
        layer
    }

    pub fn with_text(&self, text: impl Into<String>, measure: &dyn TextMeasure) -> Self {
        let mut next = self.clone();
        next.text = text.into();
        next.metrics = next.measure(measure);
        next
    }

    pub fn with_font(&self, font: FontAttributes, measure: &dyn TextMeasure) -> Self {
        let mut next = self.clone();
        next.font = font;
        next.metrics = next.measure(measure);
        next
    }

    /// Recomputes the box from the current text and font.
    pub fn measure(&self, measure: &dyn TextMeasure) -> BoxMetrics {
        let lines: Vec<&str> = if self.text.is_empty() {
            vec![""]
        } else {
            self.text.lines().collect()
        };
        let widest = lines
            .iter()
            .map(|line| measure.line_width(line, &self.font))
            .fold(0.0_f32, f32::max);
        let padding = self.font.size * 0.3;
        let stroke = self.stroke.map_or(0.0, |stroke| stroke.width);
        BoxMetrics {
            width: widest + padding * 2.0 + stroke * 2.0,
            height: lines.len() as f32 * self.font.size * self.font.line_height
                + padding * 2.0
                + stroke * 2.0,
            padding,
            radius: self.font.size * 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickerLayer {
    /// Opaque reference resolved by the sticker decoder.
    pub source: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKind {
    Text(TextLayer),
    Draw(DrawLayer),
    Sticker(StickerLayer),
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Text(_) => "text",
            LayerKind::Draw(_) => "draw",
            LayerKind::Sticker(_) => "sticker",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub id: LayerId,
    pub z_index: i32,
    pub dirty: bool,
    pub placement: Placement,
    /// Pre-rendered pixels for text and sticker layers, written by decoders
    /// outside the core.
    #[serde(skip)]
    pub texture: Option<TextureSource>,
    pub kind: LayerKind,
}

impl Layer {
    pub fn new(id: LayerId, z_index: i32, kind: LayerKind) -> Self {
        Self {
            id,
            z_index,
            dirty: true,
            placement: Placement::default(),
            texture: None,
            kind,
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_texture(mut self, texture: TextureSource) -> Self {
        self.texture = Some(texture);
        self.dirty = false;
        self
    }

    pub fn as_draw(&self) -> Option<&DrawLayer> {
        match &self.kind {
            LayerKind::Draw(draw) => Some(draw),
            _ => None,
        }
    }

    /// Size of the quad the object-layer program draws, in layer pixels.
    pub fn content_size(&self) -> Option<(f32, f32)> {
        match &self.kind {
            LayerKind::Text(text) => Some((text.metrics.width, text.metrics.height)),
            LayerKind::Sticker(sticker) => Some((sticker.width as f32, sticker.height as f32)),
            LayerKind::Draw(_) => None,
        }
    }
}
