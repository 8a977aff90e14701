//! Editor state manager: history, mutators, animation and render scheduling
//! on top of [`editstate`] snapshots.
//!
//! The manager never draws by itself. Mutators push a new snapshot and queue
//! a render on the [`scheduler::RenderQueue`]; the host forwards its display
//! refresh callback to [`EditorStateManager::on_frame`].

mod events;
mod history;
mod manager;

pub use events::ImageChangeEvent;
pub use history::History;
pub use manager::{EditorError, EditorSettings, EditorStateManager, LayerUpdate};
