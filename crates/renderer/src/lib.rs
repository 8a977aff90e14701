//! GPU renderer for the photo editor.
//!
//! The renderer draws an [`ImageState`] into an offscreen canvas target in a
//! fixed order:
//!
//! ```text
//!   draw layer ──▶ brush program ──▶ stroke framebuffer ─┐
//!   photo ───────▶ background program (filters) ─────────┼─▶ canvas
//!                  blit program ◀────────────────────────┘     ▲
//!   text/sticker ▶ object-layer program (z order) ─────────────┘
//! ```
//!
//! `compile_image` runs the same passes at the state's result size with every
//! layer enabled, reads the pixels back and encodes them. Everything that
//! does not need a device (draw-object builders, uniform conversion, the
//! texture cache policy, readback unpadding) is testable without a GPU.

mod compile;
pub mod draw_object;
mod gpu;
mod types;

use editstate::ImageState;

pub use gpu::uniforms::FilterUniforms;
pub use types::{
    AdapterProfile, BackendPreference, Canvas, CompiledImage, ExportFormat, GpuPowerPreference,
    RenderLayers, RenderOptions, RendererError, RendererOptions,
};

/// What the editor needs from a renderer. [`Renderer`] is the GPU
/// implementation; tests bind recording doubles.
pub trait RenderBackend {
    fn render(&mut self, state: &ImageState, options: &RenderOptions) -> Result<(), RendererError>;

    fn compile_image(&mut self, state: &ImageState) -> Result<CompiledImage, RendererError>;

    /// New canvas size in device pixels; the pixel ratio is unchanged.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RendererError>;

    fn destroy(&mut self);
}

/// Owns the device, the four programs and every GPU resource. After
/// [`Renderer::destroy`] every call returns [`RendererError::Destroyed`].
pub struct Renderer {
    gpu: Option<gpu::GpuState>,
}

impl Renderer {
    pub fn init(canvas: Canvas, options: RendererOptions) -> Result<Self, RendererError> {
        tracing::debug!(
            backend = %options.backend,
            format = %options.export_format,
            "initialising renderer"
        );
        let gpu = gpu::GpuState::new(canvas, &options)?;
        Ok(Self { gpu: Some(gpu) })
    }

    fn gpu(&mut self) -> Result<&mut gpu::GpuState, RendererError> {
        self.gpu.as_mut().ok_or(RendererError::Destroyed)
    }

    pub fn is_destroyed(&self) -> bool {
        self.gpu.is_none()
    }

    pub fn adapter_profile(&self) -> Option<&AdapterProfile> {
        self.gpu.as_ref().map(|gpu| gpu.adapter_profile())
    }

    pub fn canvas(&self) -> Option<Canvas> {
        self.gpu.as_ref().map(|gpu| gpu.canvas())
    }

    pub fn resize_canvas(&mut self, canvas: Canvas) -> Result<(), RendererError> {
        self.gpu()?.resize(canvas)
    }

    pub fn render(&mut self, state: &ImageState, options: &RenderOptions) -> Result<(), RendererError> {
        self.gpu()?.render(state, options)
    }

    pub fn compile_image(&mut self, state: &ImageState) -> Result<CompiledImage, RendererError> {
        self.gpu()?.compile(state)
    }

    /// Straight-alpha RGBA rows of the last rendered frame, top row first.
    pub fn read_pixels(&mut self) -> Result<Vec<u8>, RendererError> {
        self.gpu()?.read_pixels()
    }

    /// Number of texture uploads since init. Unchanged sources never upload
    /// twice.
    pub fn upload_count(&self) -> u64 {
        self.gpu.as_ref().map_or(0, |gpu| gpu.upload_count())
    }

    pub fn destroy(&mut self) {
        if let Some(mut gpu) = self.gpu.take() {
            gpu.destroy();
        }
    }
}

impl RenderBackend for Renderer {
    fn render(&mut self, state: &ImageState, options: &RenderOptions) -> Result<(), RendererError> {
        Renderer::render(self, state, options)
    }

    fn compile_image(&mut self, state: &ImageState) -> Result<CompiledImage, RendererError> {
        Renderer::compile_image(self, state)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RendererError> {
        let gpu = self.gpu()?;
        let canvas = Canvas::new(width, height, gpu.canvas().device_pixel_ratio);
        gpu.resize(canvas)
    }

    fn destroy(&mut self) {
        Renderer::destroy(self);
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.destroy();
    }
}
