use std::path::PathBuf;

use clap::{Parser, Subcommand};
use renderer::{BackendPreference, ExportFormat};

#[derive(Parser, Debug)]
#[command(
    name = "photoedit",
    author,
    version,
    about = "Replay an edit script over a photo and export the result"
)]
pub struct Cli {
    #[command(flatten)]
    pub edit: EditArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct EditArgs {
    /// Photo to edit (PNG, JPEG, BMP or GIF).
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// JSON edit script: an array of image change events, `"undo"` or `"redo"`.
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Where to write the compiled image. Defaults to `<input>-edited.<ext>`.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Editor config file; defaults to `editor.toml` in the config directory.
    #[arg(long, value_name = "PATH", env = "PHOTOEDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Live canvas size (e.g. `1280x720`). Defaults to the photo size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Device pixel ratio of the live canvas.
    #[arg(long, value_name = "RATIO")]
    pub dpr: Option<f32>,

    /// GPU backend: `auto`, `primary` or `gl`.
    #[arg(long, value_name = "BACKEND", value_parser = parse_backend)]
    pub backend: Option<BackendPreference>,

    /// Output encoding: `png` or `jpeg`. Inferred from `--output` when omitted.
    #[arg(long, value_name = "FORMAT", value_parser = parse_format)]
    pub format: Option<ExportFormat>,

    /// Replay the script without a GPU and print a JSON summary instead of
    /// writing an image.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the editor configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the resolved config directory and file.
    Where,
    /// Print the effective configuration as TOML.
    Show,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be at least 1x1 (got {trimmed})"));
    }
    Ok((width, height))
}

pub fn parse_backend(value: &str) -> Result<BackendPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "auto" | "default" => Ok(BackendPreference::Auto),
        "primary" | "vulkan" | "metal" | "dx12" => Ok(BackendPreference::Primary),
        "gl" | "gles" | "opengl" => Ok(BackendPreference::Gl),
        other => Err(format!(
            "unknown backend '{other}'; expected auto, primary, or gl"
        )),
    }
}

pub fn parse_format(value: &str) -> Result<ExportFormat, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "png" => Ok(ExportFormat::Png),
        "jpeg" | "jpg" => Ok(ExportFormat::Jpeg),
        other => Err(format!("unknown format '{other}'; expected png or jpeg")),
    }
}
