//! Single-flight render queue.
//!
//! Tasks submitted between two display frames are queued in order. At most
//! one frame request is outstanding at a time; each frame runs one task and
//! asks for another frame only while work remains.

use std::cell::Cell;
use std::collections::VecDeque;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// Opaque token for one requested display frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// The host's display refresh callback, seen from the scheduler.
pub trait FrameSource {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Frame source driven by hand, for tests and headless hosts.
#[derive(Debug, Default)]
pub struct ManualFrameSource {
    next: u64,
    pending: Vec<FrameHandle>,
    requested: usize,
    cancelled: usize,
}

impl ManualFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    /// Consumes the oldest outstanding request, as if its frame fired.
    pub fn fire(&mut self) -> Option<FrameHandle> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }
}

impl FrameSource for ManualFrameSource {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next);
        self.next += 1;
        self.requested += 1;
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let before = self.pending.len();
        self.pending.retain(|pending| *pending != handle);
        self.cancelled += before - self.pending.len();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Resolves once the task it was issued for has run, or was dropped by
/// [`RenderQueue::clear`].
#[derive(Debug)]
pub struct RenderTicket {
    sequence: u64,
    outcome: Receiver<TicketStatus>,
    settled: Cell<TicketStatus>,
}

impl RenderTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn status(&self) -> TicketStatus {
        if self.settled.get() != TicketStatus::Pending {
            return self.settled.get();
        }
        let status = match self.outcome.try_recv() {
            Ok(status) => status,
            Err(TryRecvError::Empty) => TicketStatus::Pending,
            Err(TryRecvError::Disconnected) => TicketStatus::Cancelled,
        };
        self.settled.set(status);
        status
    }

    pub fn is_completed(&self) -> bool {
        self.status() == TicketStatus::Completed
    }
}

pub type RenderTask<C> = Box<dyn FnOnce(&mut C)>;

struct QueuedTask<C> {
    sequence: u64,
    task: RenderTask<C>,
    done: Sender<TicketStatus>,
}

pub struct RenderQueue<C> {
    tasks: VecDeque<QueuedTask<C>>,
    scheduled: Option<FrameHandle>,
    submitted: u64,
}

impl<C> Default for RenderQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RenderQueue<C> {
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
            scheduled: None,
            submitted: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether a frame request is outstanding.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.is_some()
    }

    /// The outstanding frame request, so a host juggling several frame
    /// consumers can tell whose callback fired.
    pub fn scheduled_frame(&self) -> Option<FrameHandle> {
        self.scheduled
    }

    pub fn run_in_next_available_frame<F>(&mut self, frames: &mut F, task: RenderTask<C>) -> RenderTicket
    where
        F: FrameSource + ?Sized,
    {
        let (done, outcome) = crossbeam_channel::bounded(1);
        let sequence = self.submitted;
        self.submitted += 1;
        self.tasks.push_back(QueuedTask {
            sequence,
            task,
            done,
        });
        if self.scheduled.is_none() {
            self.scheduled = Some(frames.request_frame());
        }
        tracing::trace!(sequence, queued = self.tasks.len(), "render task queued");
        RenderTicket {
            sequence,
            outcome,
            settled: Cell::new(TicketStatus::Pending),
        }
    }

    /// Frame callback body: runs the oldest task and reschedules while work
    /// remains. Returns whether a task ran.
    pub fn run_frame<F>(&mut self, frames: &mut F, ctx: &mut C) -> bool
    where
        F: FrameSource + ?Sized,
    {
        self.scheduled = None;
        let Some(queued) = self.tasks.pop_front() else {
            return false;
        };
        (queued.task)(ctx);
        // The ticket may have been dropped by the caller; that is fine.
        let _ = queued.done.send(TicketStatus::Completed);
        tracing::trace!(sequence = queued.sequence, remaining = self.tasks.len(), "render task ran");
        if !self.tasks.is_empty() {
            self.scheduled = Some(frames.request_frame());
        }
        true
    }

    /// Cancels the outstanding frame request and drops every queued task.
    pub fn clear<F>(&mut self, frames: &mut F)
    where
        F: FrameSource + ?Sized,
    {
        if let Some(handle) = self.scheduled.take() {
            frames.cancel_frame(handle);
        }
        let dropped = self.tasks.len();
        for queued in self.tasks.drain(..) {
            let _ = queued.done.send(TicketStatus::Cancelled);
        }
        if dropped > 0 {
            tracing::debug!(dropped, "render queue cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(queue: &mut RenderQueue<Vec<u32>>, frames: &mut ManualFrameSource, value: u32) -> RenderTicket {
        queue.run_in_next_available_frame(frames, Box::new(move |log: &mut Vec<u32>| log.push(value)))
    }

    #[test]
    fn batches_requests_into_one_frame() {
        let mut frames = ManualFrameSource::new();
        let mut queue = RenderQueue::new();
        let first = push(&mut queue, &mut frames, 1);
        let second = push(&mut queue, &mut frames, 2);
        let third = push(&mut queue, &mut frames, 3);
        assert_eq!(frames.requested(), 1);
        assert_eq!(frames.pending(), 1);

        let mut log = Vec::new();
        while frames.fire().is_some() {
            queue.run_frame(&mut frames, &mut log);
        }
        assert_eq!(log, vec![1, 2, 3]);
        assert_eq!(frames.requested(), 3);
        assert!(!queue.is_scheduled());
        assert!(first.is_completed() && second.is_completed() && third.is_completed());
    }

    #[test]
    fn ticket_stays_pending_until_its_task_runs() {
        let mut frames = ManualFrameSource::new();
        let mut queue = RenderQueue::new();
        let first = push(&mut queue, &mut frames, 1);
        let second = push(&mut queue, &mut frames, 2);
        let mut log = Vec::new();
        frames.fire();
        queue.run_frame(&mut frames, &mut log);
        assert_eq!(first.status(), TicketStatus::Completed);
        assert_eq!(second.status(), TicketStatus::Pending);
        assert_eq!(frames.pending(), 1);
    }

    #[test]
    fn clear_cancels_frame_and_tickets() {
        let mut frames = ManualFrameSource::new();
        let mut queue = RenderQueue::new();
        let ticket = push(&mut queue, &mut frames, 1);
        queue.clear(&mut frames);
        assert_eq!(frames.pending(), 0);
        assert_eq!(frames.cancelled(), 1);
        assert_eq!(ticket.status(), TicketStatus::Cancelled);
        assert!(queue.is_empty());

        let mut log = Vec::new();
        assert!(!queue.run_frame(&mut frames, &mut log));
        assert!(log.is_empty());
    }

    #[test]
    fn goes_idle_after_draining() {
        let mut frames = ManualFrameSource::new();
        let mut queue = RenderQueue::new();
        push(&mut queue, &mut frames, 7);
        let mut log = Vec::new();
        frames.fire();
        queue.run_frame(&mut frames, &mut log);
        assert_eq!(frames.pending(), 0);
        push(&mut queue, &mut frames, 8);
        assert_eq!(frames.requested(), 2);
    }
}
