use bytemuck::{Pod, Zeroable};
use editstate::{FilterSettings, Mat3};

/// Disc radius sampled by the blur brush, in photo texels.
pub(crate) const BLUR_RADIUS_TEXELS: f32 = 12.0;

/// Slider values converted to the parameters the background shader reads.
///
/// Sliders are clamped to their ranges here; the edit state keeps whatever
/// the caller wrote.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FilterUniforms {
    /// enhance, brightness, contrast, saturation
    pub tone: [f32; 4],
    /// warmth, fade, highlights, shadows
    pub color: [f32; 4],
    /// vignette, grain, sharpen, unused
    pub finish: [f32; 4],
}

impl FilterUniforms {
    pub fn from_settings(settings: &FilterSettings) -> Self {
        let s = settings.clamped();
        Self {
            tone: [
                s.enhance / 100.0,
                s.brightness / 100.0,
                s.contrast / 100.0 * 0.3 + 1.0,
                s.saturation / 100.0 + 1.0,
            ],
            color: [
                s.warmth / 100.0,
                s.fade / 100.0,
                (s.highlights * 0.75 + 100.0) / 100.0,
                (s.shadows * 0.55 + 100.0) / 100.0,
            ],
            finish: [s.vignette / 100.0, s.grain / 100.0 * 0.04, s.sharpen / 100.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct BackgroundUniforms {
    pub matrix: [[f32; 4]; 3],
    /// 1/width, 1/height of the photo texture.
    pub texel: [f32; 4],
    pub filter: FilterUniforms,
}

impl BackgroundUniforms {
    pub fn new(matrix: &Mat3, photo_size: (u32, u32), filter: &FilterSettings) -> Self {
        Self {
            matrix: matrix.to_std140(),
            texel: texel_size(photo_size),
            filter: FilterUniforms::from_settings(filter),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct BrushUniforms {
    pub matrix: [[f32; 4]; 3],
    /// texel x, texel y, blur radius in texels, unused
    pub blur: [f32; 4],
}

impl BrushUniforms {
    pub fn new(matrix: &Mat3, photo_size: (u32, u32)) -> Self {
        let [x, y, _, _] = texel_size(photo_size);
        Self {
            matrix: matrix.to_std140(),
            blur: [x, y, BLUR_RADIUS_TEXELS, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct LayerUniforms {
    pub matrix: [[f32; 4]; 3],
    /// opacity, unused x3
    pub params: [f32; 4],
}

impl LayerUniforms {
    pub fn new(matrix: &Mat3, opacity: f32) -> Self {
        Self {
            matrix: matrix.to_std140(),
            params: [opacity.clamp(0.0, 1.0), 0.0, 0.0, 0.0],
        }
    }
}

fn texel_size((width, height): (u32, u32)) -> [f32; 4] {
    [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32, 0.0, 0.0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use editstate::FilterKind;

    #[test]
    fn neutral_settings_map_to_identity_parameters() {
        let uniforms = FilterUniforms::from_settings(&FilterSettings::default());
        assert_eq!(uniforms.tone, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(uniforms.color, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(uniforms.finish, [0.0; 4]);
    }

    #[test]
    fn documented_conversions() {
        let settings = FilterSettings::default()
            .with(FilterKind::Contrast, 100.0)
            .with(FilterKind::Highlights, -100.0)
            .with(FilterKind::Shadows, 100.0)
            .with(FilterKind::Grain, 50.0);
        let uniforms = FilterUniforms::from_settings(&settings);
        assert!((uniforms.tone[2] - 1.3).abs() < 1e-6);
        assert!((uniforms.color[2] - 0.25).abs() < 1e-6);
        assert!((uniforms.color[3] - 1.55).abs() < 1e-6);
        assert!((uniforms.finish[1] - 0.02).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_values_are_clamped_for_the_shader() {
        let settings = FilterSettings::default().with(FilterKind::Brightness, 400.0);
        let uniforms = FilterUniforms::from_settings(&settings);
        assert_eq!(uniforms.tone[1], 1.0);
        // The settings themselves are untouched.
        assert_eq!(settings.brightness, 400.0);
    }

    #[test]
    fn uniform_blocks_are_std140_sized() {
        assert_eq!(std::mem::size_of::<BackgroundUniforms>(), 112);
        assert_eq!(std::mem::size_of::<BrushUniforms>(), 64);
        assert_eq!(std::mem::size_of::<LayerUniforms>(), 64);
    }
}
