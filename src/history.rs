use crate::*;

/// Linear undo/redo over full graph snapshots.
///
/// `position` indexes the entry that matches the live store. Recording a new
/// snapshot drops everything after `position`, so a redo branch disappears as
/// soon as the user edits again. The oldest entry is evicted once `capacity`
/// is exceeded.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<GraphState>,
    position: usize,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            position: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn snapshot(&mut self, state: GraphState) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.position + 1);
        }
        self.entries.push(state);

        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(0..excess);
        }
        self.position = self.entries.len() - 1;
        tracing::trace!(len = self.entries.len(), "recorded snapshot");
    }

    pub fn undo(&mut self) -> Option<&GraphState> {
        if !self.can_undo() {
            return None;
        }
        self.position -= 1;
        self.entries.get(self.position)
    }

    pub fn redo(&mut self) -> Option<&GraphState> {
        if !self.can_redo() {
            return None;
        }
        self.position += 1;
        self.entries.get(self.position)
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position + 1 < self.entries.len()
    }

    pub fn current(&self) -> Option<&GraphState> {
        self.entries.get(self.position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
