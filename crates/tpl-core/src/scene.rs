//! The scene and the store that owns it.
//!
//! [`SceneStore`] is the single source of truth for the editor. Every
//! structural mutation goes through one of its operations and commits one
//! snapshot to the [`History`]; selection and tool changes are cosmetic and
//! never touch history. Operations that name an element which no longer
//! exists are silent no-ops, since async callbacks (image decode, export)
//! may arrive after the element was deleted.

use crate::config::EditorConfig;
use crate::history::History;
use crate::id::{ElementId, IdAllocator};
use crate::model::{Attr, Element, ElementSpec, Size};
use crate::tool::ToolKind;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

// ─── Scene ───────────────────────────────────────────────────────────────

/// Structural document state: the ordered element list and canvas size.
///
/// Cloning is cheap: the element list is shared until the next mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    elements: Arc<Vec<Element>>,
    canvas_size: Size,
}

impl Scene {
    pub fn new(canvas_size: Size) -> Self {
        Self {
            elements: Arc::new(Vec::new()),
            canvas_size,
        }
    }

    pub fn from_elements(elements: Vec<Element>, canvas_size: Size) -> Self {
        Self {
            elements: Arc::new(elements),
            canvas_size,
        }
    }

    /// Elements in insertion order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    /// Elements in paint order: ascending z-index, ties by insertion order.
    pub fn paint_order(&self) -> Vec<&Element> {
        let mut ordered: Vec<&Element> = self.elements.iter().collect();
        // Stable sort keeps insertion order among equal z-indices.
        ordered.sort_by_key(|e| e.z_index);
        ordered
    }

    /// Highest z-index in use, `None` for an empty scene.
    pub fn top_z(&self) -> Option<u32> {
        self.elements.iter().map(|e| e.z_index).max()
    }

    fn elements_mut(&mut self) -> &mut Vec<Element> {
        Arc::make_mut(&mut self.elements)
    }
}

// ─── Selection ───────────────────────────────────────────────────────────

/// Transient selection state. Never part of snapshots or templates.
///
/// `primary` is the single element the property editor targets; `marked`
/// holds the `selected` flags set by a marquee gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    primary: Option<ElementId>,
    marked: BTreeSet<ElementId>,
}

impl Selection {
    pub fn primary(&self) -> Option<ElementId> {
        self.primary
    }

    pub fn marked(&self) -> &BTreeSet<ElementId> {
        &self.marked
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.primary == Some(id) || self.marked.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.marked.is_empty()
    }

    /// Every selected id, primary first.
    pub fn ids(&self) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self.primary.into_iter().collect();
        ids.extend(self.marked.iter().filter(|id| Some(**id) != self.primary));
        ids
    }

    fn clear(&mut self) {
        self.primary = None;
        self.marked.clear();
    }

    fn retain_existing(&mut self, scene: &Scene) {
        if self.primary.is_some_and(|id| !scene.contains(id)) {
            self.primary = None;
        }
        self.marked.retain(|id| scene.contains(*id));
    }
}

/// Direction for [`SceneStore::reorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    Up,
    Down,
}

// ─── Scene store ─────────────────────────────────────────────────────────

pub struct SceneStore {
    scene: Scene,
    session: Uuid,
    ids: IdAllocator,
    selection: Selection,
    tool: ToolKind,
    history: History,
    /// Gesture nesting depth (0 = not batching).
    gesture_depth: usize,
    batch_gestures: bool,
    duplicate_offset: (f32, f32),
}

impl SceneStore {
    /// Empty scene sized from the config.
    pub fn new(config: &EditorConfig) -> Self {
        Self::with_ids(Scene::new(config.canvas_size), IdAllocator::new(), config)
    }

    /// Wrap an existing scene (e.g. one loaded from a template). Element ids
    /// are kept verbatim; new ids continue after the highest one present.
    /// Returns `None` if that id leaves nothing to allocate.
    pub fn from_scene(scene: Scene, config: &EditorConfig) -> Option<Self> {
        let ids = IdAllocator::after(scene.elements().iter().map(|e| &e.id))?;
        Some(Self::with_ids(scene, ids, config))
    }

    fn with_ids(scene: Scene, ids: IdAllocator, config: &EditorConfig) -> Self {
        Self {
            history: History::new(scene.clone(), config.history.capacity),
            scene,
            session: Uuid::new_v4(),
            ids,
            selection: Selection::default(),
            tool: ToolKind::default(),
            gesture_depth: 0,
            batch_gestures: config.history.batch_gestures,
            duplicate_offset: config.duplicate_offset,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn elements(&self) -> &[Element] {
        self.scene.elements()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.scene.get(id)
    }

    /// Identifier of this editing session, fresh for every store.
    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The primary selected element, if it still exists.
    pub fn selected_element(&self) -> Option<&Element> {
        self.selection.primary.and_then(|id| self.scene.get(id))
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || (self.in_gesture() && self.scene_differs_from_snapshot())
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn in_gesture(&self) -> bool {
        self.gesture_depth > 0
    }

    // ─── Structural operations ───────────────────────────────────────────

    /// Add an element above everything currently in the scene.
    pub fn add_element(&mut self, spec: ElementSpec) -> ElementId {
        let id = self.ids.next_id();
        let z = self.scene.top_z().map_or(0, |z| z.saturating_add(1));
        let element = Element::from_spec(id, z, spec);
        log::debug!("add {} {} at ({}, {})", element.kind.name(), id, element.x, element.y);
        self.scene.elements_mut().push(element);
        self.commit("add element");
        id
    }

    /// Apply a partial update. Returns `true` if the element changed.
    ///
    /// A patch that leaves the element as it was commits no snapshot, so
    /// history holds one entry per effective update rather than one per
    /// call. Undo therefore never lands on a step that looks like nothing.
    pub fn update_element(&mut self, id: ElementId, patch: &[Attr]) -> bool {
        let Some(current) = self.scene.get(id) else {
            return false;
        };
        let mut updated = current.clone();
        for attr in patch {
            updated.apply(attr);
        }
        if &updated == current {
            return false;
        }
        if let Some(idx) = self.scene.index_of(id) {
            self.scene.elements_mut()[idx] = updated;
        }
        self.commit("update element");
        true
    }

    pub fn delete_element(&mut self, id: ElementId) -> bool {
        let Some(idx) = self.scene.index_of(id) else {
            return false;
        };
        self.scene.elements_mut().remove(idx);
        if self.selection.primary == Some(id) {
            self.selection.primary = None;
        }
        self.selection.marked.remove(&id);
        self.commit("delete element");
        true
    }

    /// Clone an element under a fresh id, offset so the copy is visible and
    /// stacked above every current element.
    pub fn duplicate_element(&mut self, id: ElementId) -> Option<ElementId> {
        let mut copy = self.scene.get(id)?.clone();
        let new_id = self.ids.next_id();
        copy.id = new_id;
        copy.x += self.duplicate_offset.0;
        copy.y += self.duplicate_offset.1;
        copy.z_index = self.scene.top_z().map_or(0, |z| z.saturating_add(1));
        self.scene.elements_mut().push(copy);
        self.commit("duplicate element");
        Some(new_id)
    }

    /// Move an element one step up or down in z-order. Moving below zero is
    /// a no-op; there is no ceiling.
    pub fn reorder(&mut self, id: ElementId, direction: ZOrder) -> bool {
        let Some(idx) = self.scene.index_of(id) else {
            return false;
        };
        let z = self.scene.elements()[idx].z_index;
        let new_z = match direction {
            ZOrder::Up => z.saturating_add(1),
            ZOrder::Down => match z.checked_sub(1) {
                Some(z) => z,
                None => return false,
            },
        };
        self.scene.elements_mut()[idx].z_index = new_z;
        self.commit("reorder element");
        true
    }

    /// Change the logical canvas size. Elements are not rescaled.
    pub fn set_canvas_size(&mut self, size: Size) -> bool {
        let valid = size.width.is_finite() && size.height.is_finite();
        if !valid || size.width <= 0.0 || size.height <= 0.0 || size == self.scene.canvas_size {
            return false;
        }
        self.scene.canvas_size = size;
        self.commit("resize canvas");
        true
    }

    /// Remove every element in one step.
    pub fn clear(&mut self) -> bool {
        if self.scene.is_empty() {
            return false;
        }
        self.scene.elements_mut().clear();
        self.selection.clear();
        self.commit("clear canvas");
        true
    }

    // ─── Cosmetic state ──────────────────────────────────────────────────

    /// Select one element (or nothing). Unknown ids are ignored.
    pub fn set_selection(&mut self, id: Option<ElementId>) -> bool {
        match id {
            Some(id) if !self.scene.contains(id) => false,
            Some(id) => {
                self.selection.primary = Some(id);
                self.selection.marked.clear();
                self.selection.marked.insert(id);
                true
            }
            None => {
                self.selection.clear();
                true
            }
        }
    }

    /// Replace the marked set (marquee result). A single marked element
    /// also becomes the primary selection.
    pub fn set_marked(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.selection.marked = ids.into_iter().filter(|id| self.scene.contains(*id)).collect();
        self.selection.primary = if self.selection.marked.len() == 1 {
            self.selection.marked.iter().next().copied()
        } else {
            None
        };
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool != self.tool {
            log::debug!("tool {} -> {}", self.tool.name(), tool.name());
            self.tool = tool;
        }
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Restore the previous snapshot. Returns `false` at the oldest one.
    pub fn undo(&mut self) -> bool {
        self.flush_gesture();
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.scene = snapshot.clone();
        self.selection.retain_existing(&self.scene);
        true
    }

    /// Re-apply the next snapshot. Returns `false` at the newest one.
    pub fn redo(&mut self) -> bool {
        self.flush_gesture();
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.scene = snapshot.clone();
        self.selection.retain_existing(&self.scene);
        true
    }

    /// Start a gesture. Mutations until the matching [`Self::end_gesture`]
    /// are applied live but committed as a single snapshot. Does nothing
    /// when gesture batching is disabled in the config.
    pub fn begin_gesture(&mut self) {
        if self.batch_gestures {
            self.gesture_depth += 1;
        }
    }

    /// End a gesture. When the outermost gesture closes and the scene
    /// differs from the last snapshot, one snapshot is committed.
    pub fn end_gesture(&mut self) {
        if self.gesture_depth == 0 {
            return;
        }
        self.gesture_depth -= 1;
        if self.gesture_depth == 0 && self.scene_differs_from_snapshot() {
            self.history.commit(self.scene.clone());
            log::debug!("commit gesture ({} snapshots)", self.history.len());
        }
    }

    fn flush_gesture(&mut self) {
        if self.gesture_depth > 0 {
            self.gesture_depth = 1;
            self.end_gesture();
        }
    }

    fn scene_differs_from_snapshot(&self) -> bool {
        *self.history.current() != self.scene
    }

    fn commit(&mut self, description: &str) {
        if self.gesture_depth > 0 {
            return;
        }
        self.history.commit(self.scene.clone());
        log::debug!("commit {description} ({} snapshots)", self.history.len());
    }
}
