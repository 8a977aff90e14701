use std::collections::VecDeque;
use std::sync::Arc;

use editstate::{ImageState, Layer, LayerId};

/// Bounded undo/redo stack of immutable snapshots.
///
/// `index` always points at the current snapshot. Pushing while not at the
/// tail discards the redo tail; pushing past `limit` evicts from the front
/// and shifts `index` down by the number of evicted entries.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Arc<ImageState>>,
    index: usize,
    limit: usize,
}

impl History {
    pub fn new(initial: Arc<ImageState>, limit: usize) -> Self {
        let mut entries = VecDeque::with_capacity(limit.max(1));
        entries.push_back(initial);
        Self {
            entries,
            index: 0,
            limit: limit.max(1),
        }
    }

    pub fn current(&self) -> &Arc<ImageState> {
        &self.entries[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn push(&mut self, state: Arc<ImageState>) -> Arc<ImageState> {
        self.entries.truncate(self.index + 1);
        self.entries.push_back(Arc::clone(&state));
        let mut evicted = 0;
        while self.entries.len() > self.limit {
            self.entries.pop_front();
            evicted += 1;
        }
        self.index = self.entries.len() - 1;
        if evicted > 0 {
            tracing::trace!(evicted, len = self.entries.len(), "history cap reached");
        }
        state
    }

    /// Steps back one snapshot; a no-op at the start.
    pub fn undo(&mut self) -> Arc<ImageState> {
        if self.can_undo() {
            self.index -= 1;
        }
        Arc::clone(self.current())
    }

    /// Steps forward one snapshot; a no-op at the tail.
    pub fn redo(&mut self) -> Arc<ImageState> {
        if self.can_redo() {
            self.index += 1;
        }
        Arc::clone(self.current())
    }

    /// Rewrites layer `id` in every snapshot that holds it, wherever `f`
    /// returns a replacement. Returns how many snapshots changed.
    pub(crate) fn map_layer(&mut self, id: LayerId, mut f: impl FnMut(&Layer) -> Option<Layer>) -> usize {
        let mut changed = 0;
        for entry in self.entries.iter_mut() {
            let Some(layer) = entry.layer(id) else {
                continue;
            };
            if let Some(next) = f(layer) {
                *entry = Arc::new(entry.with_layer(next));
                changed += 1;
            }
        }
        changed
    }
}
