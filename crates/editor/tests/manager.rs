use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use editor::{EditorError, EditorSettings, EditorStateManager, ImageChangeEvent, LayerUpdate};
use editstate::{
    BrushStyle, BrushTouch, FilterKind, FilterSettings, ImageState, LayerId, LayerKind,
    StickerLayer, TextureSourceFactory,
};
use renderer::{CompiledImage, ExportFormat, RenderBackend, RenderOptions, RendererError};
use scheduler::{EasingCurve, ManualClock, ManualFrameSource, TicketStatus};

#[derive(Debug, Default)]
struct RenderLog {
    renders: Vec<ImageState>,
    compiles: usize,
    resizes: Vec<(u32, u32)>,
    destroyed: bool,
}

struct RecordingBackend {
    log: Rc<RefCell<RenderLog>>,
}

impl RenderBackend for RecordingBackend {
    fn render(&mut self, state: &ImageState, _options: &RenderOptions) -> Result<(), RendererError> {
        self.log.borrow_mut().renders.push(state.clone());
        Ok(())
    }

    fn compile_image(&mut self, state: &ImageState) -> Result<CompiledImage, RendererError> {
        self.log.borrow_mut().compiles += 1;
        let (width, height) = state.result_size();
        Ok(CompiledImage {
            format: ExportFormat::Png,
            width,
            height,
            bytes: Vec::new(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RendererError> {
        self.log.borrow_mut().resizes.push((width, height));
        Ok(())
    }

    fn destroy(&mut self) {
        self.log.borrow_mut().destroyed = true;
    }
}

type Manager = EditorStateManager<RecordingBackend, ManualFrameSource, ManualClock>;

fn settings() -> EditorSettings {
    EditorSettings {
        history_limit: 10,
        animation_duration: Duration::from_millis(300),
        animation_curve: EasingCurve::Linear,
        render_options: RenderOptions::default(),
    }
}

fn manager() -> (Manager, ManualClock) {
    let clock = ManualClock::new();
    let manager = EditorStateManager::new(
        ImageState::new(40, 30),
        ManualFrameSource::new(),
        clock.clone(),
        settings(),
    );
    (manager, clock)
}

fn ready_manager() -> (Manager, ManualClock, Rc<RefCell<RenderLog>>) {
    let (mut manager, clock) = manager();
    let log = Rc::new(RefCell::new(RenderLog::default()));
    manager.init(RecordingBackend { log: Rc::clone(&log) });
    drain(&mut manager);
    log.borrow_mut().renders.clear();
    (manager, clock, log)
}

fn drain(manager: &mut Manager) -> usize {
    let mut fired = 0;
    while let Some(frame) = manager.frames_mut().fire() {
        manager.on_frame(frame);
        fired += 1;
    }
    fired
}

fn touch(x: f32, sequence_id: u32) -> BrushTouch {
    BrushTouch {
        x,
        y: 1.0,
        size: 4.0,
        style: BrushStyle::Paint,
        color: [1.0, 0.0, 0.0, 1.0],
        sequence_id,
    }
}

fn sticker() -> LayerKind {
    LayerKind::Sticker(StickerLayer {
        source: "star".into(),
        width: 8,
        height: 8,
    })
}

#[test]
fn undo_walks_back_to_initial_state() {
    let (mut manager, _clock, _log) = ready_manager();
    for step in 1..=9 {
        manager.set_filter(FilterKind::Brightness, step as f32);
    }
    for _ in 0..9 {
        assert!(manager.can_undo());
        manager.undo();
    }
    assert!(!manager.can_undo());
    assert_eq!(manager.get_current_image_state().filter, FilterSettings::default());
}

#[test]
fn history_is_capped_and_redo_tail_truncated() {
    let (mut manager, _clock, _log) = ready_manager();
    for step in 1..=12 {
        manager.set_filter(FilterKind::Contrast, step as f32);
    }
    assert_eq!(manager.history().len(), 10);
    while manager.can_undo() {
        manager.undo();
    }
    assert_eq!(manager.get_current_image_state().filter.contrast, 3.0);

    manager.redo();
    manager.set_filter(FilterKind::Fade, 10.0);
    assert!(!manager.can_redo());
    assert_eq!(manager.history().len(), 3);
}

#[test]
fn filter_values_are_stored_verbatim() {
    let (mut manager, _clock, _log) = ready_manager();
    let state = manager.set_filter(FilterKind::Brightness, 400.0);
    assert_eq!(state.filter.brightness, 400.0);
}

#[test]
fn filter_change_renders_once_and_is_undoable() {
    let (mut manager, _clock, log) = ready_manager();
    let state = manager.set_filter(FilterKind::Brightness, 20.0);
    assert_eq!(state.filter, FilterSettings::default().with(FilterKind::Brightness, 20.0));
    assert!(manager.can_undo());
    assert_eq!(drain(&mut manager), 1);

    let log = log.borrow();
    assert_eq!(log.renders.len(), 1);
    assert_eq!(log.renders[0].filter.brightness, 20.0);
    assert_eq!(log.renders[0].filter.contrast, 0.0);
}

#[test]
fn resize_then_undo_restores_scale() {
    let (mut manager, _clock, _log) = ready_manager();
    manager.resize(2.0, 1.0, false);
    assert_eq!(manager.get_current_image_state().scale(), [2.0, 1.0]);
    let state = manager.undo();
    assert_eq!(state.scale(), [1.0, 1.0]);
    assert!(manager.can_redo());
}

#[test]
fn flip_negates_horizontal_scale() {
    let (mut manager, _clock, _log) = ready_manager();
    manager.resize(2.0, 3.0, false);
    let state = manager.flip_horizontally(false);
    assert_eq!(state.scale(), [-2.0, 3.0]);
}

#[test]
fn animated_rotation_converges_on_target() {
    let (mut manager, clock, log) = ready_manager();
    manager.rotate(90.0, true);
    assert!(manager.is_animating());
    assert_eq!(manager.frames().pending(), 1);
    assert_eq!(manager.get_current_image_state().rotation(), 90.0);

    while let Some(frame) = manager.frames_mut().fire() {
        clock.advance(Duration::from_millis(100));
        manager.on_frame(frame);
    }
    assert!(!manager.is_animating());

    let log = log.borrow();
    assert_eq!(log.renders.len(), 3);
    let first = log.renders[0].rotation();
    assert!(first > 0.0 && first < 90.0, "intermediate rotation {first}");
    assert!(log.renders[1].rotation() > first);
    assert_eq!(log.renders[2].rotation(), 90.0);
}

#[test]
fn zero_duration_animation_renders_directly() {
    let log = Rc::new(RefCell::new(RenderLog::default()));
    let settings = EditorSettings {
        animation_duration: Duration::ZERO,
        ..settings()
    };
    let mut manager: Manager = EditorStateManager::new(
        ImageState::new(4, 4),
        ManualFrameSource::new(),
        ManualClock::new(),
        settings,
    );
    manager.init(RecordingBackend { log: Rc::clone(&log) });
    drain(&mut manager);
    log.borrow_mut().renders.clear();

    manager.move_to(5.0, 6.0, true);
    assert!(!manager.is_animating());
    assert_eq!(drain(&mut manager), 1);
    assert_eq!(log.borrow().renders[0].translation(), [5.0, 6.0]);
}

#[test]
fn edit_during_animation_cancels_it() {
    let (mut manager, _clock, _log) = ready_manager();
    manager.rotate(45.0, true);
    assert!(manager.is_animating());
    manager.set_filter(FilterKind::Warmth, 10.0);
    assert!(!manager.is_animating());
    assert_eq!(manager.frames().cancelled(), 1);
}

#[test]
fn renders_are_single_flight_and_fifo() {
    let (mut manager, _clock, log) = ready_manager();
    let before = manager.frames().requested();
    for value in [10.0, 20.0, 30.0] {
        manager.set_filter(FilterKind::Saturation, value);
    }
    assert_eq!(manager.frames().requested(), before + 1);
    assert_eq!(manager.pending_renders(), 3);

    assert_eq!(drain(&mut manager), 3);
    let renders: Vec<f32> = log
        .borrow()
        .renders
        .iter()
        .map(|state| state.filter.saturation)
        .collect();
    assert_eq!(renders, vec![10.0, 20.0, 30.0]);
}

#[test]
fn destroy_cancels_pending_work() {
    let (mut manager, _clock, log) = ready_manager();
    manager.set_filter(FilterKind::Shadows, 5.0);
    let ticket = manager.request_render().expect("ready manager queues renders");
    manager.destroy();

    assert_eq!(ticket.status(), TicketStatus::Cancelled);
    assert_eq!(manager.frames().pending(), 0);
    assert!(log.borrow().destroyed);
    assert!(log.borrow().renders.is_empty());
    assert!(!manager.is_ready());
    assert!(matches!(
        manager.get_current_image_source(),
        Err(EditorError::NotReady)
    ));
}

#[test]
fn edits_before_init_are_recorded_without_rendering() {
    let (mut manager, _clock) = manager();
    manager.set_filter(FilterKind::Grain, 3.0);
    manager.rotate(30.0, true);
    assert_eq!(manager.frames().requested(), 0);
    assert!(manager.request_render().is_none());
    assert_eq!(manager.history().len(), 3);

    let log = Rc::new(RefCell::new(RenderLog::default()));
    manager.init(RecordingBackend { log: Rc::clone(&log) });
    assert_eq!(drain(&mut manager), 1);
    assert_eq!(log.borrow().renders[0].rotation(), 30.0);
}

#[test]
fn init_with_state_reseeds_history() {
    let (mut manager, _clock) = manager();
    manager.set_filter(FilterKind::Fade, 1.0);
    let log = Rc::new(RefCell::new(RenderLog::default()));
    manager.init_with_state(RecordingBackend { log }, ImageState::new(8, 8));
    assert!(!manager.can_undo());
    assert_eq!(manager.get_current_image_state().width, 8);
}

#[test]
fn apply_routes_events_to_mutators() {
    let (mut manager, _clock, _log) = ready_manager();
    let translate = ImageChangeEvent::Translate {
        dx: 3.0,
        dy: -1.0,
        animation: false,
    };
    manager.apply(translate.clone()).unwrap();
    let state = manager.apply(translate).unwrap();
    assert_eq!(state.translation(), [6.0, -2.0]);

    let state = manager
        .apply(ImageChangeEvent::Scale {
            dx: 0.5,
            dy: 0.0,
            animation: false,
        })
        .unwrap();
    assert_eq!(state.scale(), [1.5, 1.0]);

    let err = manager
        .apply(ImageChangeEvent::DeleteLayer { id: LayerId(99) })
        .unwrap_err();
    assert!(matches!(err, EditorError::UnknownLayer(LayerId(99))));
}

#[test]
fn layers_can_be_added_updated_and_removed() {
    let (mut manager, _clock, _log) = ready_manager();
    let (first, _) = manager.add_layer(sticker(), None);
    let (second, state) = manager.add_layer(sticker(), None);
    assert_ne!(first, second);
    assert!(state.layer(second).unwrap().z_index > state.layer(first).unwrap().z_index);

    let state = manager
        .update_layer(
            first,
            LayerUpdate {
                z_index: Some(10),
                ..LayerUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(state.layer(first).unwrap().z_index, 10);

    let state = manager.remove_layer(second).unwrap();
    assert!(state.layer(second).is_none());
    assert!(matches!(
        manager.remove_layer(second),
        Err(EditorError::UnknownLayer(_))
    ));
}

#[test]
fn touches_accumulate_on_one_draw_layer() {
    let (mut manager, _clock, _log) = ready_manager();
    manager.add_touches(vec![touch(1.0, 0)]);
    let state = manager.add_touches(vec![touch(2.0, 1), touch(3.0, 1)]);
    let (_, draw) = state.draw_layer().expect("draw layer created");
    assert_eq!(draw.touches.len(), 3);
    assert_eq!(draw.gestures().len(), 2);
    assert_eq!(state.layers.len(), 1);

    let state = manager.undo();
    let (_, draw) = state.draw_layer().unwrap();
    assert_eq!(draw.touches.len(), 1);
}

#[test]
fn layer_texture_does_not_add_history() {
    let (mut manager, _clock, _log) = ready_manager();
    let (id, _) = manager.add_layer(sticker(), None);
    let history = manager.history().len();

    let texture = TextureSourceFactory::new()
        .create_raw_source(1, 1, vec![255, 255, 255, 255], false)
        .unwrap();
    let state = manager.set_layer_texture(id, texture).unwrap();
    let layer = state.layer(id).unwrap();
    assert!(layer.texture.is_some());
    assert!(!layer.dirty);
    assert_eq!(manager.history().len(), history);
}

fn white_texture() -> editstate::TextureSource {
    TextureSourceFactory::new()
        .create_raw_source(1, 1, vec![255, 255, 255, 255], false)
        .unwrap()
}

#[test]
fn resolved_texture_survives_undo_of_later_edit() {
    let (mut manager, _clock, _log) = ready_manager();
    let (id, _) = manager.add_layer(sticker(), None);
    manager.set_filter(FilterKind::Brightness, 10.0);
    manager.set_layer_texture(id, white_texture()).unwrap();

    let state = manager.undo();
    assert_eq!(state.filter.brightness, 0.0);
    let layer = state.layer(id).expect("layer still present");
    assert!(layer.texture.is_some());
    assert!(!layer.dirty);
}

#[test]
fn resolved_texture_skips_snapshots_with_other_content() {
    let (mut manager, _clock, _log) = ready_manager();
    let (id, _) = manager.add_layer(sticker(), None);
    let moon = LayerKind::Sticker(StickerLayer {
        source: "moon".into(),
        width: 8,
        height: 8,
    });
    manager
        .update_layer(
            id,
            LayerUpdate {
                kind: Some(moon),
                ..LayerUpdate::default()
            },
        )
        .unwrap();
    manager.set_layer_texture(id, white_texture()).unwrap();

    let state = manager.undo();
    let layer = state.layer(id).unwrap();
    assert_eq!(layer.kind, sticker());
    assert!(layer.texture.is_none());
}

#[test]
fn texture_resolved_mid_animation_reaches_final_frame() {
    let (mut manager, clock, log) = ready_manager();
    let (id, _) = manager.add_layer(sticker(), None);
    drain(&mut manager);
    log.borrow_mut().renders.clear();

    manager.rotate(90.0, true);
    manager.set_layer_texture(id, white_texture()).unwrap();
    assert!(manager.is_animating());
    assert_eq!(manager.pending_renders(), 0);

    while let Some(frame) = manager.frames_mut().fire() {
        clock.advance(Duration::from_millis(100));
        manager.on_frame(frame);
    }

    let log = log.borrow();
    assert_eq!(log.renders.len(), 3);
    for state in &log.renders {
        assert!(state.layer(id).unwrap().texture.is_some());
    }
    assert_eq!(log.renders[2].rotation(), 90.0);
}

#[test]
fn compile_and_canvas_resize_go_through_backend() {
    let (mut manager, _clock, log) = ready_manager();
    manager.crop(editstate::AspectRatio::Preset(editstate::AspectPreset::FourThree));
    let image = manager.get_current_image_source().unwrap();
    let (width, height) = manager.get_current_image_state().result_size();
    assert_eq!((image.width, image.height), (width, height));
    assert_eq!(log.borrow().compiles, 1);

    manager.set_filter(FilterKind::Vignette, 4.0);
    assert_eq!(manager.pending_renders(), 2);
    manager.resize_canvas(200, 100).unwrap();
    assert_eq!(log.borrow().resizes, vec![(200, 100)]);
    assert_eq!(manager.pending_renders(), 1);
    assert_eq!(drain(&mut manager), 1);
    assert_eq!(manager.frames().pending(), 0);
}
