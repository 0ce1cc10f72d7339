//! Linear undo/redo log of full scene snapshots.
//!
//! Each entry is a complete [`Scene`]. Scenes share their element list
//! through an `Arc`, so a snapshot costs one reference count until the live
//! scene is mutated again; logically every entry is still an independent,
//! complete state. Partial diffs are never stored.

use crate::scene::Scene;

/// Snapshot log with a cursor. The cursor always indexes a valid entry.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Scene>,
    cursor: usize,
    /// Maximum number of retained snapshots (`None` = unbounded).
    capacity: Option<usize>,
}

impl History {
    /// Start a history whose only entry is `initial`.
    pub fn new(initial: Scene, capacity: Option<usize>) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            capacity: capacity.map(|c| c.max(1)),
        }
    }

    /// Drop the redo suffix, append `snapshot`, and move the cursor to it.
    /// When a capacity is set the oldest entries are discarded.
    pub fn commit(&mut self, snapshot: Scene) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(snapshot);
        if let Some(cap) = self.capacity
            && self.entries.len() > cap
        {
            let excess = self.entries.len() - cap;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one snapshot. `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&Scene> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward one snapshot. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&Scene> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    /// The snapshot under the cursor.
    pub fn current(&self) -> &Scene {
        &self.entries[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Forget everything and restart from `initial`.
    pub fn reset(&mut self, initial: Scene) {
        self.entries.clear();
        self.entries.push(initial);
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Size;

    fn scene(w: f32) -> Scene {
        Scene::new(Size::new(w, 100.0))
    }

    #[test]
    fn undo_at_start_is_noop() {
        let mut h = History::new(scene(1.0), None);
        assert!(h.undo().is_none());
        assert_eq!(h.cursor(), 0);
    }

    #[test]
    fn redo_at_end_is_noop() {
        let mut h = History::new(scene(1.0), None);
        h.commit(scene(2.0));
        assert!(h.redo().is_none());
        assert_eq!(h.cursor(), 1);
    }

    #[test]
    fn commit_after_undo_discards_redo_suffix() {
        let mut h = History::new(scene(1.0), None);
        h.commit(scene(2.0));
        h.commit(scene(3.0));
        assert_eq!(h.undo().map(|s| s.canvas_size().width), Some(2.0));
        h.commit(scene(4.0));
        assert!(!h.can_redo());
        assert_eq!(h.len(), 3);
        assert_eq!(h.current().canvas_size().width, 4.0);
    }

    #[test]
    fn capacity_drops_oldest_and_keeps_cursor_valid() {
        let mut h = History::new(scene(0.0), Some(3));
        for i in 1..=5 {
            h.commit(scene(i as f32));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.cursor(), 2);
        let mut undos = 0;
        while h.undo().is_some() {
            undos += 1;
        }
        assert_eq!(undos, 2);
        assert_eq!(h.current().canvas_size().width, 3.0);
    }
}
