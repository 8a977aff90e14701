//! JSON edit scripts.
//!
//! ```json
//! [
//!   {"type": "filter", "kind": "brightness", "value": 20},
//!   {"type": "create_layer", "kind": {"type": "sticker", "source": "cat", "width": 64, "height": 64},
//!    "texture": "cat.png"},
//!   "undo",
//!   "redo"
//! ]
//! ```
//!
//! `texture` paths are resolved against the script's directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use editor::{EditorStateManager, ImageChangeEvent};
use editstate::{LayerId, TextureSourceFactory};
use renderer::RenderBackend;
use scheduler::{Clock, FrameSource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStep {
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EditStep {
    #[serde(flatten)]
    pub event: ImageChangeEvent,
    /// Image decoded into the layer's texture once the step is applied.
    #[serde(default)]
    pub texture: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    History(HistoryStep),
    Edit(EditStep),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

/// Tally of what a replay did, reported in the dry-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub edits: usize,
    pub undos: usize,
    pub redos: usize,
    pub textures: usize,
}

impl Script {
    pub fn parse(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("failed to parse edit script")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read edit script {}", path.display()))?;
        let script = Self::parse(&contents)
            .with_context(|| format!("invalid edit script {}", path.display()))?;
        tracing::debug!(path = %path.display(), steps = script.steps.len(), "loaded edit script");
        Ok(script)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Applies every step in order. Texture paths are relative to `base_dir`.
    pub fn replay<R, F, C>(
        &self,
        manager: &mut EditorStateManager<R, F, C>,
        base_dir: &Path,
        factory: &TextureSourceFactory,
    ) -> Result<ReplayReport>
    where
        R: RenderBackend + 'static,
        F: FrameSource,
        C: Clock,
    {
        let mut report = ReplayReport::default();
        for (index, step) in self.steps.iter().enumerate() {
            match step {
                ScriptStep::History(HistoryStep::Undo) => {
                    manager.undo();
                    report.undos += 1;
                }
                ScriptStep::History(HistoryStep::Redo) => {
                    manager.redo();
                    report.redos += 1;
                }
                ScriptStep::Edit(edit) => {
                    let name = edit.event.name();
                    let layer = apply_edit(manager, &edit.event)
                        .with_context(|| format!("step {index} ({name}) failed"))?;
                    report.edits += 1;
                    if let Some(path) = edit.texture.as_deref() {
                        let Some(id) = layer else {
                            bail!("step {index} ({name}) cannot take a texture; only layer steps can");
                        };
                        let path = base_dir.join(path);
                        let image = image::open(&path)
                            .with_context(|| format!("failed to decode texture {}", path.display()))?;
                        manager
                            .set_layer_texture(id, factory.create_image_source(image))
                            .with_context(|| format!("step {index} ({name}) failed"))?;
                        report.textures += 1;
                    }
                }
            }
        }
        // Undo and redo do not render on their own.
        if report.undos + report.redos > 0 {
            manager.request_render();
        }
        Ok(report)
    }
}

/// Applies one event, returning the layer it created or updated.
fn apply_edit<R, F, C>(
    manager: &mut EditorStateManager<R, F, C>,
    event: &ImageChangeEvent,
) -> Result<Option<LayerId>>
where
    R: RenderBackend + 'static,
    F: FrameSource,
    C: Clock,
{
    match event {
        ImageChangeEvent::CreateLayer { kind, placement } => {
            let (id, _) = manager.add_layer(kind.clone(), *placement);
            Ok(Some(id))
        }
        ImageChangeEvent::UpdateLayer { id, .. } => {
            manager.apply(event.clone())?;
            Ok(Some(*id))
        }
        _ => {
            manager.apply(event.clone())?;
            Ok(None)
        }
    }
}
