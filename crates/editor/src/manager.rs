use std::sync::Arc;
use std::time::Duration;

use editconfig::EditorConfig;
use editstate::{
    AspectRatio, BrushTouch, DrawLayer, EstimatedTextMeasure, FilterKind, FilterSettings,
    IdAllocator, ImageState, Layer, LayerId, LayerKind, Placement, TextMeasure, TextureSource,
};
use renderer::{CompiledImage, RenderBackend, RenderOptions, RendererError};
use scheduler::{
    lerp, lerp2, Clock, EasingCurve, FrameHandle, FrameSource, RenderQueue, RenderTask,
    RenderTicket, SystemClock, Tween,
};

use crate::events::ImageChangeEvent;
use crate::history::History;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("editor has no renderer bound; call init first")]
    NotReady,
    #[error("no layer with id {0}")]
    UnknownLayer(LayerId),
    #[error(transparent)]
    Render(#[from] RendererError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorSettings {
    pub history_limit: usize,
    pub animation_duration: Duration,
    pub animation_curve: EasingCurve,
    /// Options used for live renders; compiles always include every layer.
    pub render_options: RenderOptions,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for EditorSettings {
    fn from(config: &EditorConfig) -> Self {
        Self {
            history_limit: config.history.limit,
            animation_duration: config.animation.duration,
            animation_curve: config.animation.curve,
            render_options: RenderOptions::default(),
        }
    }
}

/// Changes to an existing layer; `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerUpdate {
    pub kind: Option<LayerKind>,
    pub placement: Option<Placement>,
    pub z_index: Option<i32>,
}

/// Placement tween from the previous committed state to `target`.
struct Animation {
    tween: Tween,
    from: Placement,
    target: Arc<ImageState>,
}

impl Animation {
    fn placement_at(&self, progress: f32) -> Placement {
        let to = self.target.placement;
        Placement {
            translation: lerp2(self.from.translation, to.translation, progress),
            origin: lerp2(self.from.origin, to.origin, progress),
            scale: lerp2(self.from.scale, to.scale, progress),
            rotation: lerp(self.from.rotation, to.rotation, progress),
        }
    }
}

fn render_task<R>(state: Arc<ImageState>, options: RenderOptions) -> RenderTask<R>
where
    R: RenderBackend + 'static,
{
    Box::new(move |backend: &mut R| {
        if let Err(err) = backend.render(&state, &options) {
            tracing::warn!(error = %err, "queued render failed");
        }
    })
}

/// Owns history and the only writer of [`ImageState`]. Every mutator pushes
/// a snapshot and returns it; rendering is queued (or animated) only once a
/// backend is bound with [`EditorStateManager::init`].
pub struct EditorStateManager<R, F, C = SystemClock>
where
    R: RenderBackend,
    F: FrameSource,
    C: Clock,
{
    backend: Option<R>,
    frames: F,
    clock: C,
    queue: RenderQueue<R>,
    history: History,
    animation: Option<Animation>,
    animation_frame: Option<FrameHandle>,
    layer_ids: IdAllocator,
    measure: Box<dyn TextMeasure>,
    settings: EditorSettings,
}

impl<R, F, C> EditorStateManager<R, F, C>
where
    R: RenderBackend + 'static,
    F: FrameSource,
    C: Clock,
{
    pub fn new(initial: ImageState, frames: F, clock: C, settings: EditorSettings) -> Self {
        let first_layer_id = initial
            .layers
            .iter()
            .map(|layer| layer.id.0 + 1)
            .max()
            .unwrap_or(1);
        Self {
            backend: None,
            frames,
            clock,
            queue: RenderQueue::new(),
            history: History::new(Arc::new(initial), settings.history_limit),
            animation: None,
            animation_frame: None,
            layer_ids: IdAllocator::starting_at(first_layer_id),
            measure: Box::new(EstimatedTextMeasure),
            settings,
        }
    }

    /// Swaps the text measurement used to size text layers.
    pub fn with_text_measure(mut self, measure: Box<dyn TextMeasure>) -> Self {
        self.measure = measure;
        self
    }

    /// Binds the renderer and queues a render of the current state.
    pub fn init(&mut self, backend: R) -> Option<RenderTicket> {
        self.backend = Some(backend);
        tracing::info!(history = self.history.len(), "editor ready");
        self.request_render()
    }

    /// Binds the renderer and reseeds history with `initial` as its only
    /// snapshot.
    pub fn init_with_state(&mut self, backend: R, initial: ImageState) -> Option<RenderTicket> {
        self.cancel_animation();
        self.history = History::new(Arc::new(initial), self.settings.history_limit);
        self.init(backend)
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&R> {
        self.backend.as_ref()
    }

    pub fn frames(&self) -> &F {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut F {
        &mut self.frames
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn get_current_image_state(&self) -> Arc<ImageState> {
        Arc::clone(self.history.current())
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn pending_renders(&self) -> usize {
        self.queue.len()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Steps back one snapshot. Does not render; call
    /// [`EditorStateManager::request_render`] to show the result.
    pub fn undo(&mut self) -> Arc<ImageState> {
        self.cancel_animation();
        let state = self.history.undo();
        tracing::debug!(index = self.history.index(), "undo");
        state
    }

    pub fn redo(&mut self) -> Arc<ImageState> {
        self.cancel_animation();
        let state = self.history.redo();
        tracing::debug!(index = self.history.index(), "redo");
        state
    }

    /// Queues a render of the snapshot that is current now. `None` before
    /// init.
    pub fn request_render(&mut self) -> Option<RenderTicket> {
        self.backend.as_ref()?;
        let state = Arc::clone(self.history.current());
        let options = self.settings.render_options;
        let ticket = self
            .queue
            .run_in_next_available_frame(&mut self.frames, render_task(state, options));
        Some(ticket)
    }

    /// The host's display refresh callback for `frame`. Advances a running
    /// animation and runs one queued render. Returns whether anything drew.
    pub fn on_frame(&mut self, frame: FrameHandle) -> bool {
        let mut drew = false;
        if self.animation_frame == Some(frame) {
            self.animation_frame = None;
            drew |= self.step_animation();
        }
        if self.queue.scheduled_frame() == Some(frame) {
            if let Some(backend) = self.backend.as_mut() {
                drew |= self.queue.run_frame(&mut self.frames, backend);
            }
        }
        drew
    }

    fn step_animation(&mut self) -> bool {
        let Some(animation) = self.animation.as_ref() else {
            return false;
        };
        let (progress, finished) = animation.tween.progress(self.clock.now());
        let frame_state = if finished {
            Arc::clone(&animation.target)
        } else {
            Arc::new(animation.target.with_placement(animation.placement_at(progress)))
        };
        if finished {
            self.animation = None;
            tracing::debug!("animation finished");
        } else {
            self.animation_frame = Some(self.frames.request_frame());
        }
        let Some(backend) = self.backend.as_mut() else {
            return false;
        };
        if let Err(err) = backend.render(&frame_state, &self.settings.render_options) {
            tracing::warn!(error = %err, "animation frame render failed");
        }
        true
    }

    fn cancel_animation(&mut self) {
        self.animation = None;
        if let Some(handle) = self.animation_frame.take() {
            self.frames.cancel_frame(handle);
        }
    }

    fn commit(&mut self, next: ImageState, animate: bool) -> Arc<ImageState> {
        let from = self.history.current().placement;
        let next = self.history.push(Arc::new(next));
        self.cancel_animation();
        if self.backend.is_none() {
            return next;
        }
        if animate && from != next.placement {
            if let Some(tween) = Tween::new(
                self.settings.animation_duration,
                self.settings.animation_curve,
                self.clock.now(),
            ) {
                tracing::debug!(duration = ?tween.duration(), "animation started");
                self.animation = Some(Animation {
                    tween,
                    from,
                    target: Arc::clone(&next),
                });
                self.animation_frame = Some(self.frames.request_frame());
                return next;
            }
        }
        self.request_render();
        next
    }

    fn current(&self) -> Arc<ImageState> {
        Arc::clone(self.history.current())
    }

    /// Replaces the whole filter block. Values are stored as given.
    pub fn filter(&mut self, settings: FilterSettings) -> Arc<ImageState> {
        let next = self.current().with_filter(settings);
        self.commit(next, false)
    }

    pub fn set_filter(&mut self, kind: FilterKind, value: f32) -> Arc<ImageState> {
        let current = self.current();
        let next = current.with_filter(current.filter.with(kind, value));
        self.commit(next, false)
    }

    /// Absolute rotation in degrees.
    pub fn rotate(&mut self, angle: f32, animation: bool) -> Arc<ImageState> {
        let next = self.current().with_rotation(angle);
        self.commit(next, animation)
    }

    pub fn move_to(&mut self, x: f32, y: f32, animation: bool) -> Arc<ImageState> {
        let next = self.current().with_translation([x, y]);
        self.commit(next, animation)
    }

    /// Sets the photo scale on each axis.
    pub fn resize(&mut self, x: f32, y: f32, animation: bool) -> Arc<ImageState> {
        let next = self.current().with_scale([x, y]);
        self.commit(next, animation)
    }

    pub fn flip_horizontally(&mut self, animation: bool) -> Arc<ImageState> {
        let current = self.current();
        let [x, y] = current.scale();
        let next = current.with_scale([-x, y]);
        self.commit(next, animation)
    }

    pub fn crop(&mut self, aspect_ratio: AspectRatio) -> Arc<ImageState> {
        let next = self.current().with_aspect_ratio(aspect_ratio);
        self.commit(next, false)
    }

    pub fn set_origin(&mut self, x: f32, y: f32) -> Arc<ImageState> {
        let next = self.current().with_origin([x, y]);
        self.commit(next, false)
    }

    fn measured(&self, kind: LayerKind) -> LayerKind {
        match kind {
            LayerKind::Text(mut text) => {
                text.metrics = text.measure(self.measure.as_ref());
                LayerKind::Text(text)
            }
            other => other,
        }
    }

    /// Adds a layer on top of every existing one.
    pub fn add_layer(&mut self, kind: LayerKind, placement: Option<Placement>) -> (LayerId, Arc<ImageState>) {
        let id = LayerId(self.layer_ids.allocate());
        let current = self.current();
        let layer = Layer::new(id, current.next_z_index(), self.measured(kind))
            .with_placement(placement.unwrap_or_default());
        tracing::debug!(layer = %id, kind = layer.kind.name(), "layer added");
        let next = current.with_layer(layer);
        (id, self.commit(next, false))
    }

    pub fn update_layer(&mut self, id: LayerId, update: LayerUpdate) -> Result<Arc<ImageState>, EditorError> {
        let current = self.current();
        let existing = current.layer(id).ok_or(EditorError::UnknownLayer(id))?;
        let mut layer = Layer::clone(existing);
        if let Some(kind) = update.kind {
            layer.kind = self.measured(kind);
            layer.texture = None;
            layer.dirty = true;
        }
        if let Some(placement) = update.placement {
            layer.placement = placement;
        }
        if let Some(z_index) = update.z_index {
            layer.z_index = z_index;
        }
        let next = current.with_layer(layer);
        Ok(self.commit(next, false))
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Result<Arc<ImageState>, EditorError> {
        let current = self.current();
        if current.layer(id).is_none() {
            return Err(EditorError::UnknownLayer(id));
        }
        let next = current.without_layer(id);
        Ok(self.commit(next, false))
    }

    /// Appends touches to the draw layer, creating it on first use.
    pub fn add_touches(&mut self, touches: Vec<BrushTouch>) -> Arc<ImageState> {
        let current = self.current();
        let layer = match current.draw_layer() {
            Some((layer, draw)) => {
                let mut draw = draw.clone();
                draw.touches.extend(touches);
                Layer {
                    kind: LayerKind::Draw(draw),
                    ..layer.clone()
                }
            }
            None => {
                let id = LayerId(self.layer_ids.allocate());
                Layer::new(id, current.next_z_index(), LayerKind::Draw(DrawLayer { touches }))
            }
        };
        let next = current.with_layer(layer);
        self.commit(next, false)
    }

    /// Attaches pixels produced by a text or sticker decoder. Resolving a
    /// texture is not an edit: every snapshot holding the same layer with the
    /// same content gets the texture, so undo never loses it.
    pub fn set_layer_texture(
        &mut self,
        id: LayerId,
        texture: TextureSource,
    ) -> Result<Arc<ImageState>, EditorError> {
        let kind = match self.history.current().layer(id) {
            Some(layer) => layer.kind.clone(),
            None => return Err(EditorError::UnknownLayer(id)),
        };
        let attached = self.history.map_layer(id, |layer| {
            (layer.kind == kind).then(|| Layer::clone(layer).with_texture(texture.clone()))
        });
        tracing::debug!(layer = %id, snapshots = attached, "layer texture resolved");
        let next = self.current();
        match self.animation.as_mut() {
            // The remaining animation frames pick the texture up.
            Some(animation) => animation.target = Arc::clone(&next),
            None => {
                self.request_render();
            }
        }
        Ok(next)
    }

    /// Routes one UI event to its mutator.
    pub fn apply(&mut self, event: ImageChangeEvent) -> Result<Arc<ImageState>, EditorError> {
        tracing::debug!(event = event.name(), "applying image change");
        let state = match event {
            ImageChangeEvent::Filter { kind, value } => self.set_filter(kind, value),
            ImageChangeEvent::Filters { settings } => self.filter(settings),
            ImageChangeEvent::Rotate { angle, animation } => self.rotate(angle, animation),
            ImageChangeEvent::AspectRatio { aspect_ratio } => self.crop(aspect_ratio),
            ImageChangeEvent::Translate { dx, dy, animation } => {
                let [x, y] = self.history.current().translation();
                self.move_to(x + dx, y + dy, animation)
            }
            ImageChangeEvent::Scale { dx, dy, animation } => {
                let [x, y] = self.history.current().scale();
                self.resize(x + dx, y + dy, animation)
            }
            ImageChangeEvent::FlipHorizontal { animation } => self.flip_horizontally(animation),
            ImageChangeEvent::CreateLayer { kind, placement } => self.add_layer(kind, placement).1,
            ImageChangeEvent::UpdateLayer {
                id,
                kind,
                placement,
                z_index,
            } => self.update_layer(
                id,
                LayerUpdate {
                    kind,
                    placement,
                    z_index,
                },
            )?,
            ImageChangeEvent::DeleteLayer { id } => self.remove_layer(id)?,
            ImageChangeEvent::Draw { touches } => self.add_touches(touches),
        };
        Ok(state)
    }

    /// Compiles the current snapshot to encoded bytes.
    pub fn get_current_image_source(&mut self) -> Result<CompiledImage, EditorError> {
        let state = self.current();
        let backend = self.backend.as_mut().ok_or(EditorError::NotReady)?;
        Ok(backend.compile_image(&state)?)
    }

    /// Resizes the canvas. Pending renders target the old size, so the queue
    /// is flushed and one fresh render queued.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> Result<(), EditorError> {
        let backend = self.backend.as_mut().ok_or(EditorError::NotReady)?;
        backend.resize(width, height)?;
        self.queue.clear(&mut self.frames);
        self.request_render();
        Ok(())
    }

    /// Clears the render queue, then tears the renderer down. The history
    /// survives so the session state can still be inspected.
    pub fn destroy(&mut self) {
        self.queue.clear(&mut self.frames);
        self.cancel_animation();
        if let Some(mut backend) = self.backend.take() {
            backend.destroy();
            tracing::info!("editor destroyed");
        }
    }
}
