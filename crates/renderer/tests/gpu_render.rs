//! End-to-end passes against a real adapter. Run with `--ignored` on a
//! machine with a GPU (or a software GL driver).

use editstate::{FilterKind, ImageState, TextureSourceFactory};
use renderer::{Canvas, ExportFormat, RenderOptions, Renderer, RendererError, RendererOptions};

fn solid_state(factory: &TextureSourceFactory, size: u32, rgba: [u8; 4]) -> ImageState {
    let data = rgba.repeat((size * size) as usize);
    let source = factory
        .create_raw_source(size, size, data, false)
        .expect("valid buffer");
    ImageState::from_source(source)
}

fn close(actual: &[u8], expected: &[u8], tolerance: u8) -> bool {
    actual
        .iter()
        .zip(expected)
        .all(|(a, e)| a.abs_diff(*e) <= tolerance)
}

#[test]
#[ignore = "needs a GPU adapter"]
fn neutral_filters_leave_photo_unchanged() {
    let factory = TextureSourceFactory::new();
    let state = solid_state(&factory, 4, [200, 40, 10, 255]);
    let mut renderer =
        Renderer::init(Canvas::new(8, 8, 1.0), RendererOptions::default()).expect("renderer");
    renderer
        .render(&state, &RenderOptions::default())
        .expect("render");
    let pixels = renderer.read_pixels().expect("readback");
    let centre = ((4 * 8 + 4) * 4) as usize;
    assert!(
        close(&pixels[centre..centre + 4], &[200, 40, 10, 255], 3),
        "got {:?}",
        &pixels[centre..centre + 4]
    );
}

#[test]
#[ignore = "needs a GPU adapter"]
fn texture_is_uploaded_once_per_source() {
    let factory = TextureSourceFactory::new();
    let state = solid_state(&factory, 4, [10, 20, 30, 255]);
    let mut renderer =
        Renderer::init(Canvas::new(8, 8, 1.0), RendererOptions::default()).expect("renderer");
    renderer.render(&state, &RenderOptions::default()).unwrap();
    let brighter = state.with_filter(state.filter.with(FilterKind::Brightness, 50.0));
    renderer.render(&brighter, &RenderOptions::default()).unwrap();
    assert_eq!(renderer.upload_count(), 1);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn compile_encodes_result_size() {
    let factory = TextureSourceFactory::new();
    let state = solid_state(&factory, 6, [0, 128, 255, 255]);
    let mut renderer = Renderer::init(
        Canvas::new(16, 16, 2.0),
        RendererOptions {
            export_format: ExportFormat::Png,
            ..RendererOptions::default()
        },
    )
    .expect("renderer");
    let compiled = renderer.compile_image(&state).expect("compile");
    let decoded = image::load_from_memory(&compiled.bytes).expect("valid png");
    assert_eq!((decoded.width(), decoded.height()), (6, 6));
    let pixel = decoded.to_rgba8().get_pixel(3, 3).0;
    assert!(close(&pixel, &[0, 128, 255, 255], 3), "got {pixel:?}");
}

#[test]
#[ignore = "needs a GPU adapter"]
fn destroyed_renderer_rejects_calls() {
    let factory = TextureSourceFactory::new();
    let state = solid_state(&factory, 2, [0, 0, 0, 255]);
    let mut renderer =
        Renderer::init(Canvas::new(4, 4, 1.0), RendererOptions::default()).expect("renderer");
    renderer.destroy();
    assert!(renderer.is_destroyed());
    assert!(matches!(
        renderer.render(&state, &RenderOptions::default()),
        Err(RendererError::Destroyed)
    ));
    assert!(matches!(
        renderer.compile_image(&state),
        Err(RendererError::Destroyed)
    ));
}
