use serde::{Deserialize, Serialize};

/// Names of the tone/colour sliders, in the order the UI lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Enhance,
    Brightness,
    Contrast,
    Saturation,
    Warmth,
    Fade,
    Highlights,
    Shadows,
    Vignette,
    Grain,
    Sharpen,
}

impl FilterKind {
    pub const ALL: [FilterKind; 11] = [
        FilterKind::Enhance,
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Saturation,
        FilterKind::Warmth,
        FilterKind::Fade,
        FilterKind::Highlights,
        FilterKind::Shadows,
        FilterKind::Vignette,
        FilterKind::Grain,
        FilterKind::Sharpen,
    ];

    /// Slider range configured by the UI. The state layer does not enforce
    /// it; the renderer clamps when building uniforms.
    pub fn range(self) -> (f32, f32) {
        match self {
            FilterKind::Enhance
            | FilterKind::Fade
            | FilterKind::Vignette
            | FilterKind::Grain
            | FilterKind::Sharpen => (0.0, 100.0),
            FilterKind::Brightness
            | FilterKind::Contrast
            | FilterKind::Saturation
            | FilterKind::Warmth
            | FilterKind::Highlights
            | FilterKind::Shadows => (-100.0, 100.0),
        }
    }

    pub fn clamp(self, value: f32) -> f32 {
        let (min, max) = self.range();
        if value.is_nan() {
            return 0.0;
        }
        value.clamp(min, max)
    }
}

/// Slider values for the background filter pass. Zero everywhere means "no
/// adjustment".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub enhance: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub warmth: f32,
    pub fade: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub vignette: f32,
    pub grain: f32,
    pub sharpen: f32,
}

impl FilterSettings {
    pub fn get(&self, kind: FilterKind) -> f32 {
        match kind {
            FilterKind::Enhance => self.enhance,
            FilterKind::Brightness => self.brightness,
            FilterKind::Contrast => self.contrast,
            FilterKind::Saturation => self.saturation,
            FilterKind::Warmth => self.warmth,
            FilterKind::Fade => self.fade,
            FilterKind::Highlights => self.highlights,
            FilterKind::Shadows => self.shadows,
            FilterKind::Vignette => self.vignette,
            FilterKind::Grain => self.grain,
            FilterKind::Sharpen => self.sharpen,
        }
    }

    /// Returns a copy with one slider replaced.
    pub fn with(mut self, kind: FilterKind, value: f32) -> Self {
        let slot = match kind {
            FilterKind::Enhance => &mut self.enhance,
            FilterKind::Brightness => &mut self.brightness,
            FilterKind::Contrast => &mut self.contrast,
            FilterKind::Saturation => &mut self.saturation,
            FilterKind::Warmth => &mut self.warmth,
            FilterKind::Fade => &mut self.fade,
            FilterKind::Highlights => &mut self.highlights,
            FilterKind::Shadows => &mut self.shadows,
            FilterKind::Vignette => &mut self.vignette,
            FilterKind::Grain => &mut self.grain,
            FilterKind::Sharpen => &mut self.sharpen,
        };
        *slot = value;
        self
    }

    pub fn is_identity(&self) -> bool {
        FilterKind::ALL.iter().all(|kind| self.get(*kind) == 0.0)
    }

    /// Every slider clamped to its documented range.
    pub fn clamped(&self) -> Self {
        FilterKind::ALL
            .iter()
            .fold(*self, |acc, kind| acc.with(*kind, kind.clamp(self.get(*kind))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_replaces_only_one_slider() {
        let settings = FilterSettings::default().with(FilterKind::Warmth, 35.0);
        assert_eq!(settings.warmth, 35.0);
        for kind in FilterKind::ALL {
            if kind != FilterKind::Warmth {
                assert_eq!(settings.get(kind), 0.0, "{kind:?} changed");
            }
        }
        assert!(!settings.is_identity());
    }

    #[test]
    fn clamped_respects_slider_ranges() {
        let settings = FilterSettings {
            brightness: 250.0,
            grain: -4.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(settings.brightness, 100.0);
        assert_eq!(settings.grain, 0.0);
    }
}
