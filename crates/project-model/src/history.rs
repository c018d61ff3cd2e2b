//! Snapshot-based undo/redo history.
//!
//! Two bounded stacks of snapshots. Each entry holds the state from *before*
//! an edit. Recording a new entry clears the redo stack.
//!
//! ```ignore
//! let mut history = History::new(50);
//! history.record("Split clip", project.clone());
//! // ... mutate project ...
//! if let Some(prev) = history.undo(project.clone()) {
//!     project = prev;
//! }
//! ```

use std::collections::VecDeque;

/// Default maximum depth of both stacks.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
struct Entry<S> {
    label: String,
    snapshot: S,
}

/// Bounded undo/redo stacks over any cloneable snapshot type.
#[derive(Debug, Clone)]
pub struct History<S: Clone> {
    undo_stack: VecDeque<Entry<S>>,
    redo_stack: VecDeque<Entry<S>>,
    limit: usize,
}

impl<S: Clone> Default for History<S> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl<S: Clone> History<S> {
    /// Create a history keeping at most `limit` entries per stack.
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state before an edit. Clears the redo stack.
    pub fn record(&mut self, label: &str, snapshot: S) {
        self.redo_stack.clear();
        self.undo_stack.push_back(Entry {
            label: label.to_string(),
            snapshot,
        });
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
        tracing::debug!(label, undo_depth = self.undo_stack.len(), "History entry recorded");
    }

    /// Step back. `current` moves onto the redo stack and the previous state is returned.
    pub fn undo(&mut self, current: S) -> Option<S> {
        let entry = self.undo_stack.pop_back()?;
        self.redo_stack.push_front(Entry {
            label: entry.label.clone(),
            snapshot: current,
        });
        while self.redo_stack.len() > self.limit {
            self.redo_stack.pop_back();
        }
        tracing::debug!(
            label = %entry.label,
            undo_depth = self.undo_stack.len(),
            redo_depth = self.redo_stack.len(),
            "Undo"
        );
        Some(entry.snapshot)
    }

    /// Step forward. `current` moves onto the undo stack and the next state is returned.
    pub fn redo(&mut self, current: S) -> Option<S> {
        let entry = self.redo_stack.pop_front()?;
        self.undo_stack.push_back(Entry {
            label: entry.label.clone(),
            snapshot: current,
        });
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
        tracing::debug!(
            label = %entry.label,
            undo_depth = self.undo_stack.len(),
            redo_depth = self.redo_stack.len(),
            "Redo"
        );
        Some(entry.snapshot)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Label of the edit the next undo would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.front().map(|e| e.label.as_str())
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
