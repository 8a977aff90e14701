use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use editconfig::EditorConfig;
use editor::{EditorSettings, EditorStateManager};
use editstate::{ImageState, TextureSourceFactory};
use renderer::{Canvas, ExportFormat, Renderer};
use scheduler::{ManualFrameSource, SystemClock};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ConfigAction, EditArgs};
use crate::paths::AppPaths;
use crate::script::{ReplayReport, Script};

type HeadlessEditor = EditorStateManager<Renderer, ManualFrameSource, SystemClock>;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    let config_path = cli
        .edit
        .config
        .clone()
        .unwrap_or_else(|| paths.config_file());
    tracing::debug!(
        config_dir = %paths.config_dir().display(),
        config = %config_path.display(),
        "resolved photoedit paths"
    );

    if let Some(Command::Config(command)) = &cli.command {
        return run_config(command.action, &paths, &config_path);
    }

    let config = EditorConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    run_edit(&cli.edit, &config)
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_config(action: ConfigAction, paths: &AppPaths, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Where => {
            let status = if config_path.is_file() { "present" } else { "missing" };
            println!("config dir : {}", paths.config_dir().display());
            println!("config file: {} ({status})", config_path.display());
        }
        ConfigAction::Show => {
            let config = EditorConfig::load_or_default(config_path)
                .with_context(|| format!("failed to load config {}", config_path.display()))?;
            print!("{}", config.to_toml_string());
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct DryRunSummary<'a> {
    input: &'a Path,
    output: &'a Path,
    format: ExportFormat,
    photo: [u32; 2],
    result: [u32; 2],
    steps: usize,
    replay: ReplayReport,
    history: HistorySummary,
    state: &'a ImageState,
}

#[derive(Debug, Serialize)]
struct HistorySummary {
    len: usize,
    index: usize,
    can_undo: bool,
    can_redo: bool,
}

fn run_edit(args: &EditArgs, config: &EditorConfig) -> Result<()> {
    let input = args
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("no INPUT photo given (see --help)"))?;

    let factory = TextureSourceFactory::new();
    let photo = image::open(input)
        .with_context(|| format!("failed to decode photo {}", input.display()))?;
    let source = factory.create_image_source(photo);
    let (width, height) = source.dimensions();
    tracing::info!(input = %input.display(), width, height, "loaded photo");

    let script = match args.script.as_deref() {
        Some(path) => Script::load(path)?,
        None => Script::default(),
    };
    let script_dir = args
        .script
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));

    // Nothing is on screen, so edits land immediately instead of tweening.
    let settings = EditorSettings {
        animation_duration: Duration::ZERO,
        ..EditorSettings::from(config)
    };
    let mut editor: HeadlessEditor = EditorStateManager::new(
        ImageState::from_source(source),
        ManualFrameSource::new(),
        SystemClock,
        settings,
    );
    let report = script.replay(&mut editor, script_dir, &factory)?;
    tracing::info!(
        edits = report.edits,
        undos = report.undos,
        redos = report.redos,
        "replayed edit script"
    );

    let format = resolve_format(args.format, args.output.as_deref(), config.export.format);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(input, format));

    let state = editor.get_current_image_state();
    if args.dry_run {
        let (result_width, result_height) = state.result_size();
        let history = editor.history();
        let summary = DryRunSummary {
            input,
            output: &output,
            format,
            photo: [width, height],
            result: [result_width, result_height],
            steps: script.len(),
            replay: report,
            history: HistorySummary {
                len: history.len(),
                index: history.index(),
                can_undo: history.can_undo(),
                can_redo: history.can_redo(),
            },
            state: &state,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let (canvas_width, canvas_height) = args.size.unwrap_or((width, height));
    let dpr = args.dpr.unwrap_or(config.render.device_pixel_ratio);
    let mut options = config.renderer_options();
    if let Some(backend) = args.backend {
        options.backend = backend;
    }
    options.export_format = format;

    let renderer = Renderer::init(Canvas::new(canvas_width, canvas_height, dpr), options)
        .context("failed to initialise the GPU renderer")?;
    if let Some(profile) = renderer.adapter_profile() {
        tracing::info!(
            adapter = %profile.name,
            backend = ?profile.backend,
            compatibility = profile.compatibility,
            "renderer ready"
        );
    }
    editor.init(renderer);
    while let Some(frame) = editor.frames_mut().fire() {
        editor.on_frame(frame);
    }

    let compiled = editor
        .get_current_image_source()
        .context("failed to compile the edited image")?;
    fs::write(&output, &compiled.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(
        output = %output.display(),
        width = compiled.width,
        height = compiled.height,
        bytes = compiled.bytes.len(),
        "wrote compiled image"
    );
    editor.destroy();
    Ok(())
}

fn resolve_format(flag: Option<ExportFormat>, output: Option<&Path>, fallback: ExportFormat) -> ExportFormat {
    if let Some(format) = flag {
        return format;
    }
    let extension = output
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => ExportFormat::Jpeg,
        Some("png") => ExportFormat::Png,
        _ => fallback,
    }
}

fn default_output(input: &Path, format: ExportFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("photo");
    input.with_file_name(format!("{stem}-edited.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_beats_extension() {
        let output = Path::new("out.png");
        assert_eq!(
            resolve_format(Some(ExportFormat::Jpeg), Some(output), ExportFormat::Png),
            ExportFormat::Jpeg
        );
        assert_eq!(
            resolve_format(None, Some(Path::new("OUT.JPG")), ExportFormat::Png),
            ExportFormat::Jpeg
        );
        assert_eq!(
            resolve_format(None, Some(Path::new("out.tiff")), ExportFormat::Jpeg),
            ExportFormat::Jpeg
        );
        assert_eq!(resolve_format(None, None, ExportFormat::Png), ExportFormat::Png);
    }

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output(Path::new("/tmp/beach.png"), ExportFormat::Jpeg),
            PathBuf::from("/tmp/beach-edited.jpg")
        );
    }
}
