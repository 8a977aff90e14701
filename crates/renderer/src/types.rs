use std::fmt;

use serde::{Deserialize, Serialize};

/// Output surface in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

impl Canvas {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
        }
    }
}

/// Which layer kinds participate in a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderLayers {
    pub draw: bool,
    pub text: bool,
    pub sticker: bool,
}

impl RenderLayers {
    pub const ALL: RenderLayers = RenderLayers {
        draw: true,
        text: true,
        sticker: true,
    };
    pub const NONE: RenderLayers = RenderLayers {
        draw: false,
        text: false,
        sticker: false,
    };

    pub fn includes(&self, kind: &editstate::LayerKind) -> bool {
        match kind {
            editstate::LayerKind::Draw(_) => self.draw,
            editstate::LayerKind::Text(_) => self.text,
            editstate::LayerKind::Sticker(_) => self.sticker,
        }
    }
}

impl Default for RenderLayers {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub render_layers: RenderLayers,
}

impl RenderOptions {
    /// Photo and filters only, as shown while an object layer is being
    /// edited by the UI.
    pub fn background_only() -> Self {
        Self {
            render_layers: RenderLayers::NONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Png => f.write_str("png"),
            ExportFormat::Jpeg => f.write_str("jpeg"),
        }
    }
}

/// Which wgpu backends to try when acquiring a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Vulkan/Metal/DX12 first, then the GL compatibility backend.
    #[default]
    Auto,
    Primary,
    Gl,
}

impl BackendPreference {
    pub(crate) fn attempts(self) -> &'static [wgpu::Backends] {
        const PRIMARY: wgpu::Backends = wgpu::Backends::PRIMARY;
        const GL: wgpu::Backends = wgpu::Backends::GL;
        match self {
            BackendPreference::Auto => &[PRIMARY, GL],
            BackendPreference::Primary => &[PRIMARY],
            BackendPreference::Gl => &[GL],
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendPreference::Auto => f.write_str("auto"),
            BackendPreference::Primary => f.write_str("primary"),
            BackendPreference::Gl => f.write_str("gl"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

impl GpuPowerPreference {
    pub(crate) fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RendererOptions {
    pub backend: BackendPreference,
    pub power: GpuPowerPreference,
    pub export_format: ExportFormat,
    /// 1-100, only used for JPEG output.
    pub jpeg_quality: u8,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            power: GpuPowerPreference::Low,
            export_format: ExportFormat::Png,
            jpeg_quality: 92,
        }
    }
}

/// Encoded output of a compile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledImage {
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Summary of the adapter the renderer ended up on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    /// Acquired through the GL compatibility path with downlevel limits.
    pub compatibility: bool,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, compatibility: bool) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            compatibility,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("no usable GPU adapter ({attempts})")]
    NoAdapter { attempts: String },
    #[error("canvas must be at least 1x1 (got {width}x{height})")]
    InvalidCanvas { width: u32, height: u32 },
    #[error("{width}x{height} exceeds the GPU texture limit of {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("renderer has been destroyed")]
    Destroyed,
    #[error("state has no source image to render")]
    MissingSource,
    #[error("failed to read pixels back from the GPU: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),
    #[error("failed to encode compiled image: {0}")]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Gpu(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use editstate::{DrawLayer, LayerKind, StickerLayer};

    #[test]
    fn render_layers_filter_by_kind() {
        let draw = LayerKind::Draw(DrawLayer::default());
        let sticker = LayerKind::Sticker(StickerLayer {
            source: "s".into(),
            width: 1,
            height: 1,
        });
        let preview = RenderLayers {
            draw: true,
            ..RenderLayers::NONE
        };
        assert!(preview.includes(&draw));
        assert!(!preview.includes(&sticker));
        assert!(RenderLayers::default().includes(&sticker));
    }

    #[test]
    fn auto_backend_falls_back_to_gl() {
        assert_eq!(
            BackendPreference::Auto.attempts(),
            &[wgpu::Backends::PRIMARY, wgpu::Backends::GL]
        );
        assert_eq!(BackendPreference::Gl.attempts(), &[wgpu::Backends::GL]);
    }

    #[test]
    fn canvas_rejects_bad_pixel_ratio() {
        assert_eq!(Canvas::new(10, 10, 0.0).device_pixel_ratio, 1.0);
        assert_eq!(Canvas::new(10, 10, f32::NAN).device_pixel_ratio, 1.0);
        assert_eq!(Canvas::new(10, 10, 2.0).device_pixel_ratio, 2.0);
    }
}
