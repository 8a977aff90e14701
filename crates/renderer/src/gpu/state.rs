use editstate::{Camera, ImageState, Mat3};

use crate::draw_object::{
    background_object, brush_object, fullscreen_object, layer_object, TexturedQuad,
};
use crate::types::{
    AdapterProfile, Canvas, CompiledImage, ExportFormat, RenderLayers, RenderOptions,
    RendererError, RendererOptions,
};

use super::context::{GpuContext, RenderTarget};
use super::programs::background::BackgroundProgram;
use super::programs::blit::BlitProgram;
use super::programs::brush::BrushProgram;
use super::programs::object_layer::ObjectLayerProgram;
use super::readback::{encode, read_target, unpremultiply};
use super::textures::{GpuTexture, GpuUploader, TextureCache, TextureSlot};
use super::uniforms::{BackgroundUniforms, BrushUniforms, LayerUniforms};

struct Programs {
    background: BackgroundProgram,
    brush: BrushProgram,
    layer: ObjectLayerProgram,
    blit: BlitProgram,
}

impl Programs {
    fn new(device: &wgpu::Device) -> anyhow::Result<Self> {
        Ok(Self {
            background: BackgroundProgram::new(device)?,
            brush: BrushProgram::new(device)?,
            layer: ObjectLayerProgram::new(device)?,
            blit: BlitProgram::new(device)?,
        })
    }

    fn destroy(&self) {
        self.background.destroy();
        self.brush.destroy();
        self.layer.destroy();
    }
}

/// Where one frame is drawn and how the scene is viewed.
struct FrameTargets<'a> {
    target: &'a RenderTarget,
    strokes: &'a RenderTarget,
    camera: Camera,
    device_pixel_ratio: f32,
}

pub(crate) struct GpuState {
    context: GpuContext,
    programs: Programs,
    textures: TextureCache<GpuUploader>,
    placeholder: GpuTexture,
    fullscreen: TexturedQuad,
    canvas: Canvas,
    target: RenderTarget,
    strokes: RenderTarget,
    export_format: ExportFormat,
    jpeg_quality: u8,
}

impl GpuState {
    pub(crate) fn new(canvas: Canvas, options: &RendererOptions) -> Result<Self, RendererError> {
        let context = GpuContext::new(options.backend, options.power)?;
        context.check_size(canvas.width, canvas.height)?;
        let programs = Programs::new(&context.device)?;
        let uploader = GpuUploader::new(
            context.device.clone(),
            context.queue.clone(),
            context.max_dimension,
        );
        let placeholder = uploader.placeholder();
        let target = RenderTarget::new(&context.device, "canvas target", canvas.width, canvas.height);
        let strokes = RenderTarget::new(
            &context.device,
            "stroke framebuffer",
            canvas.width,
            canvas.height,
        );
        tracing::info!(
            width = canvas.width,
            height = canvas.height,
            device_pixel_ratio = canvas.device_pixel_ratio,
            adapter = %context.adapter_profile.name,
            "renderer initialised"
        );
        Ok(Self {
            context,
            programs,
            textures: TextureCache::new(uploader),
            placeholder,
            fullscreen: fullscreen_object(),
            canvas,
            target,
            strokes,
            export_format: options.export_format,
            jpeg_quality: options.jpeg_quality,
        })
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub(crate) fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub(crate) fn upload_count(&self) -> u64 {
        self.textures.upload_count()
    }

    /// Reallocates the canvas target and stroke framebuffer when the device
    /// pixel size changes.
    pub(crate) fn resize(&mut self, canvas: Canvas) -> Result<(), RendererError> {
        self.context.check_size(canvas.width, canvas.height)?;
        if (canvas.width, canvas.height) != self.target.size() {
            self.target.destroy();
            self.strokes.destroy();
            self.target = RenderTarget::new(
                &self.context.device,
                "canvas target",
                canvas.width,
                canvas.height,
            );
            self.strokes = RenderTarget::new(
                &self.context.device,
                "stroke framebuffer",
                canvas.width,
                canvas.height,
            );
            tracing::debug!(width = canvas.width, height = canvas.height, "resized canvas");
        }
        self.canvas = canvas;
        Ok(())
    }

    /// Camera fitting the whole photo inside the canvas.
    fn live_camera(&self, state: &ImageState) -> Camera {
        let width = self.canvas.width as f32;
        let height = self.canvas.height as f32;
        let dpr = self.canvas.device_pixel_ratio;
        let mut camera = Camera::centered(width, height);
        camera.distance = (state.width.max(1) as f32 * dpr / width)
            .max(state.height.max(1) as f32 * dpr / height);
        camera
    }

    pub(crate) fn render(
        &mut self,
        state: &ImageState,
        options: &RenderOptions,
    ) -> Result<(), RendererError> {
        self.sync_textures(state)?;
        let frame = FrameTargets {
            target: &self.target,
            strokes: &self.strokes,
            camera: self.live_camera(state),
            device_pixel_ratio: self.canvas.device_pixel_ratio,
        };
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render encoder"),
            });
        self.encode_frame(&mut encoder, &frame, state, options.render_layers);
        self.context.queue.submit(Some(encoder.finish()));
        tracing::trace!(layers = state.layers.len(), "rendered frame");
        Ok(())
    }

    /// Renders `state` at its result size with every layer enabled, reads
    /// it back and encodes it.
    pub(crate) fn compile(&mut self, state: &ImageState) -> Result<CompiledImage, RendererError> {
        if state.source.is_none() {
            return Err(RendererError::MissingSource);
        }
        let (width, height) = state.result_size();
        self.context.check_size(width, height)?;
        self.sync_textures(state)?;

        let target = RenderTarget::new(&self.context.device, "compile target", width, height);
        let strokes = RenderTarget::new(&self.context.device, "compile stroke framebuffer", width, height);
        let frame = FrameTargets {
            target: &target,
            strokes: &strokes,
            camera: Camera::centered(width as f32, height as f32),
            device_pixel_ratio: 1.0,
        };
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("compile encoder"),
            });
        self.encode_frame(&mut encoder, &frame, state, RenderLayers::ALL);
        self.context.queue.submit(Some(encoder.finish()));

        let pixels = read_target(&self.context.device, &self.context.queue, &target);
        target.destroy();
        strokes.destroy();
        let mut pixels = pixels?;
        unpremultiply(&mut pixels);
        let bytes = encode(pixels, width, height, self.export_format, self.jpeg_quality)?;
        tracing::info!(
            width,
            height,
            format = %self.export_format,
            bytes = bytes.len(),
            "compiled image"
        );
        Ok(CompiledImage {
            format: self.export_format,
            width,
            height,
            bytes,
        })
    }

    /// Straight-alpha RGBA of the live canvas, top row first.
    pub(crate) fn read_pixels(&self) -> Result<Vec<u8>, RendererError> {
        let mut pixels = read_target(&self.context.device, &self.context.queue, &self.target)?;
        unpremultiply(&mut pixels);
        Ok(pixels)
    }

    fn sync_textures(&mut self, state: &ImageState) -> Result<(), RendererError> {
        self.textures.sync(state)?;
        Ok(())
    }

    fn encode_frame(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameTargets<'_>,
        state: &ImageState,
        layers: RenderLayers,
    ) {
        let device = &self.context.device;
        let dpr = frame.device_pixel_ratio;
        let projection_view = frame.camera.projection_view();
        let photo = self.textures.get(TextureSlot::Photo);
        let photo_size = (state.width, state.height);

        let mut drew_strokes = false;
        if layers.draw {
            if let Some((_, draw)) = state.draw_layer() {
                let strokes = brush_object(state, draw, dpr);
                if !strokes.is_empty() {
                    let uniforms =
                        BrushUniforms::new(&model_view(&projection_view, &strokes.model), photo_size);
                    let background = photo.unwrap_or(&self.placeholder);
                    self.programs.brush.draw(
                        device,
                        encoder,
                        &frame.strokes.view,
                        &background.view,
                        &strokes,
                        &uniforms,
                    );
                    drew_strokes = true;
                }
            }
        }

        let clear = wgpu::Color::TRANSPARENT;
        match photo {
            Some(texture) => {
                let object = background_object(state, dpr);
                let uniforms = BackgroundUniforms::new(
                    &model_view(&projection_view, &object.model),
                    texture.size(),
                    &state.filter,
                );
                self.programs.background.draw(
                    device,
                    encoder,
                    &frame.target.view,
                    clear,
                    Some((&texture.view, &object, &uniforms)),
                );
            }
            None => {
                self.programs
                    .background
                    .draw(device, encoder, &frame.target.view, clear, None);
            }
        }

        if drew_strokes {
            self.programs.blit.draw(
                device,
                encoder,
                &frame.target.view,
                &frame.strokes.view,
                &self.fullscreen,
            );
        }

        for layer in state.object_layers() {
            if !layers.includes(&layer.kind) {
                continue;
            }
            let Some(texture) = self.textures.get(TextureSlot::Layer(layer.id)) else {
                tracing::debug!(layer = %layer.id, kind = layer.kind.name(), "layer has no texture yet, skipping");
                continue;
            };
            let Some(object) = layer_object(state, layer, dpr) else {
                continue;
            };
            let uniforms = LayerUniforms::new(&model_view(&projection_view, &object.model), 1.0);
            self.programs.layer.draw(
                device,
                encoder,
                &frame.target.view,
                &texture.view,
                &object,
                &uniforms,
            );
        }
    }

    pub(crate) fn destroy(&mut self) {
        self.textures.clear();
        self.programs.destroy();
        self.placeholder.texture.destroy();
        self.target.destroy();
        self.strokes.destroy();
        tracing::info!("renderer destroyed");
    }
}

fn model_view(projection_view: &Mat3, model: &Mat3) -> Mat3 {
    let mut matrix = *projection_view;
    matrix.multiply(model);
    matrix
}
