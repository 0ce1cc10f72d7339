use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an element within one scene.
///
/// Ids are handed out by [`IdAllocator`] and are never reused for the
/// lifetime of the scene, even after the element is deleted, so a snapshot
/// replayed by undo/redo can never alias a newer element.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u64);

impl ElementId {
    /// Largest id a template may carry: the biggest integer a JS number
    /// holds exactly, since templates round-trip through browser storage.
    pub const MAX: ElementId = ElementId((1 << 53) - 1);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el-{}", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el-{}", self.0)
    }
}

/// Monotonic id source owned by a scene store.
///
/// Undo and redo never roll the counter back.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Start after the highest id already in use (for loaded templates).
    /// `None` when that id leaves no room below [`ElementId::MAX`].
    pub fn after<'a>(used: impl IntoIterator<Item = &'a ElementId>) -> Option<Self> {
        let max = used.into_iter().map(|id| id.0).max().unwrap_or(0);
        max.checked_add(1)
            .filter(|next| *next <= ElementId::MAX.0)
            .map(|next| Self { next })
    }

    pub fn next_id(&mut self) -> ElementId {
        let id = ElementId(self.next);
        self.next += 1;
        id
    }

    /// The id that the next call to [`IdAllocator::next_id`] will return.
    pub fn peek(&self) -> ElementId {
        ElementId(self.next)
    }
}
