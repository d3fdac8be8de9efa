//! Snapshot-based undo/redo.
//!
//! Provides:
//! - `UndoManager` trait for anything that can undo/redo itself
//! - `History` - two stacks of serialized surface markup

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo, not just track state.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if successful.
    fn undo(&mut self) -> bool;

    /// Perform redo. Returns true if successful.
    fn redo(&mut self) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// Undo and redo stacks of full-markup snapshots.
///
/// Callers decide what is save-worthy; nothing is coalesced. The oldest undo
/// entry is evicted once `max_steps` is exceeded.
#[derive(Clone, Debug)]
pub struct History {
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    max_steps: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps: max_steps.max(1),
        }
    }

    /// Push `markup` as an undo point. The redo stack is cleared: once a new
    /// edit diverges, the undone future is unreachable.
    pub fn save_state(&mut self, markup: String) {
        self.redo_stack.clear();
        self.undo_stack.push(markup);
        if self.undo_stack.len() > self.max_steps {
            let excess = self.undo_stack.len() - self.max_steps;
            self.undo_stack.drain(..excess);
        }
        tracing::trace!(target: "kalpna::history", depth = self.undo_stack.len(), "saved state");
    }

    /// Forget undone states after an edit that was not saved as an undo
    /// point.
    pub fn discard_redo(&mut self) {
        self.redo_stack.clear();
    }

    /// Pop the previous state, remembering `current` for redo.
    pub fn undo(&mut self, current: String) -> Option<String> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Pop the next state, remembering `current` for undo.
    pub fn redo(&mut self, current: String) -> Option<String> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
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

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_cycle() {
        let mut history = History::default();
        history.save_state("<p>a</p>".into());

        let previous = history.undo("<p>ab</p>".into());
        assert_eq!(previous.as_deref(), Some("<p>a</p>"));
        assert!(history.can_redo());

        let next = history.redo("<p>a</p>".into());
        assert_eq!(next.as_deref(), Some("<p>ab</p>"));
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_save_clears_redo() {
        let mut history = History::default();
        history.save_state("one".into());
        history.undo("two".into());
        assert!(history.can_redo());

        history.save_state("one".into());
        assert!(!history.can_redo());
        assert_eq!(history.redo("one".into()), None);
    }

    #[test]
    fn test_discard_redo_keeps_undo() {
        let mut history = History::default();
        history.save_state("one".into());
        history.save_state("two".into());
        history.undo("three".into());

        history.discard_redo();
        assert!(!history.can_redo());
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_empty_stacks() {
        let mut history = History::default();
        assert_eq!(history.undo("x".into()), None);
        assert_eq!(history.redo("x".into()), None);
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.save_state(format!("state {i}"));
        }
        assert_eq!(history.undo_depth(), 3);
        let mut current = "now".to_string();
        let mut seen = Vec::new();
        while let Some(previous) = history.undo(current.clone()) {
            seen.push(previous.clone());
            current = previous;
        }
        assert_eq!(seen, vec!["state 4", "state 3", "state 2"]);
    }
}
