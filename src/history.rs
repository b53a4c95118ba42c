use crate::engine::EditGeneration;
use crate::{Document, EntityTable, Selection};
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_HISTORY_CAPACITY: usize = 30;

/// Session state captured before a mutation.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    pub document: Document,
    pub entities: Arc<EntityTable>,
    pub selection: Selection,
    pub generation: EditGeneration,
    /// Name of the operation this snapshot precedes.
    pub label: String,
    pub taken_at: DateTime<Local>,
}

/// Bounded undo stack. Pushing onto a full stack evicts the oldest snapshot.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: VecDeque<HistorySnapshot>,
    capacity: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryStack {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        HistoryStack { entries: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, snapshot: HistorySnapshot) {
        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                log::debug!("history full, dropping '{}' from {}", evicted.label, evicted.taken_at.format("%H:%M:%S"));
            }
        }
        self.entries.push_back(snapshot);
    }

    pub fn pop(&mut self) -> Option<HistorySnapshot> {
        self.entries.pop_back()
    }

    /// Label of the operation the next undo reverts.
    pub fn peek_label(&self) -> Option<&str> {
        self.entries.back().map(|s| s.label.as_str())
    }

    /// Labels, most recent first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(|s| s.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
