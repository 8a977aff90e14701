//! Pure conversions from edit state into vertex buffers.
//!
//! All spatial values are multiplied by the device pixel ratio here, at build
//! time; the programs upload these buffers verbatim. Buffers are parallel
//! (one `Vec<f32>` per attribute) and always describe triangle lists.

use std::ops::Range;

use editstate::{BrushStyle, DrawLayer, ImageState, Layer, Mat3};

/// Two triangles per brush touch.
pub const VERTICES_PER_TOUCH: usize = 6;

/// Corner coordinates of a unit quad, in triangle-list order.
const QUAD_CORNERS: [[f32; 2]; VERTICES_PER_TOUCH] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

/// Fraction of a brush diameter softened at the rim.
const BRUSH_BORDER_FRACTION: f32 = 0.08;

/// A rectangle of texture drawn with a model matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TexturedQuad {
    pub positions: Vec<f32>,
    pub texcoords: Vec<f32>,
    /// Object space to world space (device pixels).
    pub model: Mat3,
}

impl TexturedQuad {
    fn rect(width: f32, height: f32, model: Mat3) -> Self {
        let mut positions = Vec::with_capacity(VERTICES_PER_TOUCH * 2);
        let mut texcoords = Vec::with_capacity(VERTICES_PER_TOUCH * 2);
        for [cx, cy] in QUAD_CORNERS {
            let u = (cx + 1.0) * 0.5;
            let v = (cy + 1.0) * 0.5;
            positions.extend_from_slice(&[u * width, v * height]);
            texcoords.extend_from_slice(&[u, v]);
        }
        Self {
            positions,
            texcoords,
            model,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        (self.positions.len() / 2) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentBlend {
    /// Premultiplied source-over.
    Over,
    /// Blending disabled; the fragment replaces what is underneath.
    Replace,
}

/// Consecutive vertices sharing one blend requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlendSegment {
    pub blend: SegmentBlend,
    pub vertices: Range<u32>,
}

/// Every touch of a draw layer flattened into one vertex stream.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushStrokes {
    pub positions: Vec<f32>,
    /// Quad-local coordinates in `-1..=1`, used for the circle test.
    pub corners: Vec<f32>,
    /// `[diameter, style index, border width]` per vertex.
    pub properties: Vec<f32>,
    /// Straight-alpha RGBA per vertex.
    pub colors: Vec<f32>,
    /// Photo UV under each vertex, sampled by the blur style.
    pub texcoords: Vec<f32>,
    pub segments: Vec<BlendSegment>,
    pub model: Mat3,
}

impl BrushStrokes {
    pub fn vertex_count(&self) -> u32 {
        (self.positions.len() / 2) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Photo space to world space for `state`.
pub fn photo_model(state: &ImageState, device_pixel_ratio: f32) -> Mat3 {
    state.placement.scaled_matrix(device_pixel_ratio)
}

/// The photo as one quad covering its full pixel size.
pub fn background_object(state: &ImageState, device_pixel_ratio: f32) -> TexturedQuad {
    TexturedQuad::rect(
        state.width as f32 * device_pixel_ratio,
        state.height as f32 * device_pixel_ratio,
        photo_model(state, device_pixel_ratio),
    )
}

/// Quad for a text or sticker layer, placed relative to the photo. `None`
/// for draw layers and for layers with an empty box.
pub fn layer_object(state: &ImageState, layer: &Layer, device_pixel_ratio: f32) -> Option<TexturedQuad> {
    let (width, height) = layer.content_size()?;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    let mut model = photo_model(state, device_pixel_ratio);
    model.multiply(&layer.placement.scaled_matrix(device_pixel_ratio));
    Some(TexturedQuad::rect(
        width * device_pixel_ratio,
        height * device_pixel_ratio,
        model,
    ))
}

/// Clip-space quad covering the whole target; UV origin at the top left.
pub fn fullscreen_object() -> TexturedQuad {
    let mut positions = Vec::with_capacity(VERTICES_PER_TOUCH * 2);
    let mut texcoords = Vec::with_capacity(VERTICES_PER_TOUCH * 2);
    for [cx, cy] in QUAD_CORNERS {
        positions.extend_from_slice(&[cx, cy]);
        texcoords.extend_from_slice(&[(cx + 1.0) * 0.5, (1.0 - cy) * 0.5]);
    }
    TexturedQuad {
        positions,
        texcoords,
        model: Mat3::identity(),
    }
}

fn segment_blend(style: BrushStyle) -> SegmentBlend {
    if style.replaces_destination() {
        SegmentBlend::Replace
    } else {
        SegmentBlend::Over
    }
}

pub fn brush_object(state: &ImageState, layer: &DrawLayer, device_pixel_ratio: f32) -> BrushStrokes {
    let count = layer.touches.len() * VERTICES_PER_TOUCH;
    let mut strokes = BrushStrokes {
        positions: Vec::with_capacity(count * 2),
        corners: Vec::with_capacity(count * 2),
        properties: Vec::with_capacity(count * 3),
        colors: Vec::with_capacity(count * 4),
        texcoords: Vec::with_capacity(count * 2),
        segments: Vec::new(),
        model: photo_model(state, device_pixel_ratio),
    };
    let photo_width = state.width.max(1) as f32;
    let photo_height = state.height.max(1) as f32;

    for touch in &layer.touches {
        let radius = touch.size.max(0.0) * 0.5;
        let diameter = touch.size.max(0.0) * device_pixel_ratio;
        let border = (diameter * BRUSH_BORDER_FRACTION).max(1.0);
        let first = strokes.vertex_count();
        for [cx, cy] in QUAD_CORNERS {
            let x = touch.x + cx * radius;
            let y = touch.y + cy * radius;
            strokes
                .positions
                .extend_from_slice(&[x * device_pixel_ratio, y * device_pixel_ratio]);
            strokes.corners.extend_from_slice(&[cx, cy]);
            strokes
                .properties
                .extend_from_slice(&[diameter, touch.style.shader_index(), border]);
            strokes.colors.extend_from_slice(&touch.color);
            strokes
                .texcoords
                .extend_from_slice(&[x / photo_width, y / photo_height]);
        }
        let last = strokes.vertex_count();
        let blend = segment_blend(touch.style);
        match strokes.segments.last_mut() {
            Some(segment) if segment.blend == blend => segment.vertices.end = last,
            _ => strokes.segments.push(BlendSegment {
                blend,
                vertices: first..last,
            }),
        }
    }
    strokes
}

#[cfg(test)]
mod tests {
    use super::*;
    use editstate::{BrushTouch, LayerId, LayerKind, Placement, StickerLayer};

    fn touch(x: f32, style: BrushStyle) -> BrushTouch {
        BrushTouch {
            x,
            y: 10.0,
            size: 4.0,
            style,
            color: [0.2, 0.4, 0.6, 1.0],
            sequence_id: 0,
        }
    }

    #[test]
    fn three_touches_flatten_to_eighteen_vertices() {
        let state = ImageState::new(100, 50);
        let layer = DrawLayer {
            touches: vec![
                touch(10.0, BrushStyle::Paint),
                touch(12.0, BrushStyle::Paint),
                touch(14.0, BrushStyle::Paint),
            ],
        };
        let strokes = brush_object(&state, &layer, 1.0);
        assert_eq!(strokes.vertex_count(), 18);
        assert_eq!(strokes.corners.len(), 36);
        assert_eq!(strokes.properties.len(), 54);
        assert_eq!(strokes.colors.len(), 72);
        assert_eq!(strokes.texcoords.len(), 36);
        assert_eq!(
            strokes.segments,
            vec![BlendSegment {
                blend: SegmentBlend::Over,
                vertices: 0..18
            }]
        );
    }

    #[test]
    fn touch_quad_is_centred_and_scaled_by_pixel_ratio() {
        let state = ImageState::new(100, 50);
        let layer = DrawLayer {
            touches: vec![touch(10.0, BrushStyle::Paint)],
        };
        let strokes = brush_object(&state, &layer, 2.0);
        // First corner is (-1, -1): (10 - 2, 10 - 2) * 2.
        assert_eq!(&strokes.positions[..2], &[16.0, 16.0]);
        // Last corner is (1, 1): (10 + 2, 10 + 2) * 2.
        assert_eq!(&strokes.positions[10..12], &[24.0, 24.0]);
        assert_eq!(strokes.properties[0], 8.0);
        assert_eq!(&strokes.texcoords[..2], &[0.08, 0.16]);
    }

    #[test]
    fn eraser_runs_get_their_own_segment() {
        let state = ImageState::new(10, 10);
        let layer = DrawLayer {
            touches: vec![
                touch(1.0, BrushStyle::Paint),
                touch(2.0, BrushStyle::Blur),
                touch(3.0, BrushStyle::Eraser),
                touch(4.0, BrushStyle::Eraser),
                touch(5.0, BrushStyle::Paint),
            ],
        };
        let strokes = brush_object(&state, &layer, 1.0);
        let blends: Vec<(SegmentBlend, Range<u32>)> = strokes
            .segments
            .iter()
            .map(|segment| (segment.blend, segment.vertices.clone()))
            .collect();
        assert_eq!(
            blends,
            vec![
                (SegmentBlend::Over, 0..12),
                (SegmentBlend::Replace, 12..24),
                (SegmentBlend::Over, 24..30),
            ]
        );
        assert_eq!(strokes.properties[6 * 3 + 1], BrushStyle::Blur.shader_index());
    }

    #[test]
    fn background_quad_spans_photo() {
        let state = ImageState::new(30, 20);
        let quad = background_object(&state, 1.5);
        assert_eq!(quad.vertex_count(), 6);
        let xs: Vec<f32> = quad.positions.iter().step_by(2).copied().collect();
        let ys: Vec<f32> = quad.positions.iter().skip(1).step_by(2).copied().collect();
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 45.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 30.0);
        // Default placement pivots around the centre, so the centre lands on
        // the world origin.
        let centre = quad.model.transform_point([22.5, 15.0]);
        assert!(centre[0].abs() < 1e-4 && centre[1].abs() < 1e-4);
    }

    #[test]
    fn layer_quad_follows_photo_and_layer_placement() {
        let state = ImageState::new(100, 100);
        let layer = Layer::new(
            LayerId(1),
            0,
            LayerKind::Sticker(StickerLayer {
                source: "cat".into(),
                width: 20,
                height: 10,
            }),
        )
        .with_placement(Placement {
            translation: [60.0, 50.0],
            ..Placement::default()
        });
        let quad = layer_object(&state, &layer, 1.0).expect("sticker quad");
        let corner = quad.model.transform_point([0.0, 0.0]);
        // Layer origin at photo (60, 50), photo centre (50, 50) at world 0.
        assert!((corner[0] - 10.0).abs() < 1e-4 && corner[1].abs() < 1e-4);

        let draw = Layer::new(LayerId(2), 0, LayerKind::Draw(DrawLayer::default()));
        assert!(layer_object(&state, &draw, 1.0).is_none());
    }

    #[test]
    fn fullscreen_uv_origin_is_top_left() {
        let quad = fullscreen_object();
        for (position, uv) in quad.positions.chunks(2).zip(quad.texcoords.chunks(2)) {
            if position == [-1.0, 1.0] {
                assert_eq!(uv, [0.0, 0.0]);
            }
            if position == [1.0, -1.0] {
                assert_eq!(uv, [1.0, 1.0]);
            }
        }
    }
}
