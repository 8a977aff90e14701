//! Frame-synchronised scheduling for the editor.
//!
//! The host owns the display refresh callback; this crate only decides what
//! runs in each frame. [`RenderQueue`] serialises render work onto frames,
//! [`Clock`] abstracts wall-clock time and [`Tween`] turns elapsed time into
//! eased progress.

mod clock;
mod queue;
mod tween;

pub use clock::{Clock, ManualClock, SystemClock};
pub use queue::{
    FrameHandle, FrameSource, ManualFrameSource, RenderQueue, RenderTask, RenderTicket,
    TicketStatus,
};
pub use tween::{lerp, lerp2, EasingCurve, Tween};
