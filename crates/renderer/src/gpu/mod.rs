//! Headless wgpu rendering for the editor.
//!
//! - `context` acquires the device (primary backends first, then GL) and
//!   owns offscreen render targets.
//! - `programs` holds the four GLSL programs and their shared plumbing.
//! - `textures` uploads texture sources and caches them by id per slot.
//! - `uniforms` converts edit state into std140 parameter blocks.
//! - `readback` copies a target back to the CPU and encodes it.
//! - `state` glues everything together into the frame order used by
//!   [`crate::Renderer`].

mod context;
pub(crate) mod programs;
mod readback;
mod state;
mod textures;
pub(crate) mod uniforms;

pub(crate) use state::GpuState;
