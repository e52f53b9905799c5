//! Schema store: the flat, ordered sequence of typed content elements.
//!
//! The document is *not* a tree. Nesting is encoded per element as
//! `group_ids`, the ordered chain of ancestor ids starting at the owning
//! top-level block (the "view line") and ending at the immediate parent. An
//! element with an empty chain is itself a view line. Two invariants hold at
//! all times:
//!
//! - a block appears before every element whose chain starts with its id;
//! - the descendants of a block occupy a contiguous run of the sequence.
//!
//! Every mutation appends [`AffectedElement`] diff records for the view
//! projector, and in [`Trace::Record`] mode also history record items to a
//! pending journal the editor drains into the history manager. Undo/redo
//! replays mutations in [`Trace::Replay`] mode so they are not re-recorded.

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EditorError;
use crate::history::HistoryRecord;

/// Stable identity of a schema element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    pub(crate) fn fresh() -> Self {
        ElementId(Uuid::new_v4())
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Closed set of content kinds. Blockness is a property of the element's
/// position (`group_ids` empty), not of its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Paragraph,
    Heading { level: u8 },
    Blockquote,
    CodeFence,
    Text,
    Strong,
    Emphasis,
    CodeSpan,
}

/// One content fragment of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaElement {
    pub id: ElementId,
    pub version: u64,
    pub version_nonce: u64,
    pub updated_at: u64,
    pub is_deleted: bool,
    pub kind: ElementKind,
    pub group_ids: Vec<ElementId>,
    pub content: String,
}

impl SchemaElement {
    /// A top-level block, i.e. one view line.
    pub fn is_view_line(&self) -> bool {
        self.group_ids.is_empty()
    }

    /// Id of the view line owning this element (itself when top-level).
    pub fn view_line(&self) -> ElementId {
        self.group_ids.first().copied().unwrap_or(self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffectedBehavior {
    Add,
    Change,
    Delete,
}

/// Transient diff record produced by every mutation and consumed exactly once
/// by the view projector.
#[derive(Debug, Clone, PartialEq)]
pub struct AffectedElement {
    pub id: ElementId,
    pub behavior: AffectedBehavior,
    /// For `Add`: index of the element's logical predecessor in the sequence.
    pub prev_index: Option<usize>,
    /// For `Delete`: the chain the element had, since it is gone from the
    /// sequence by the time the projector runs.
    pub group_ids: Option<Vec<ElementId>>,
}

/// Whether a mutation is a user edit (recorded into history) or a history
/// replay (never re-recorded). Passing the mode explicitly at the call site
/// replaces the suspend-flag approach and cannot leak across reentrant calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trace {
    Record,
    Replay,
}

/// Owner of the element sequence and its pending diff/journal sets.
#[derive(Default)]
pub struct Schema {
    elements: Vec<SchemaElement>,
    index: HashMap<ElementId, usize>,
    affected: Vec<AffectedElement>,
    journal: Vec<HistoryRecord>,
    version: u64,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure factory: assigns a fresh id, the next version, a random nonce and
    /// the current timestamp. Does not insert.
    pub fn create_element(
        &mut self,
        kind: ElementKind,
        group_ids: Vec<ElementId>,
        content: impl Into<String>,
    ) -> SchemaElement {
        self.version += 1;
        let id = ElementId::fresh();
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        id.hash(&mut hasher);
        SchemaElement {
            id,
            version: self.version,
            version_nonce: hasher.finish(),
            updated_at: now_millis(),
            is_deleted: false,
            kind,
            group_ids,
            content: content.into(),
        }
    }

    pub fn elements(&self) -> &[SchemaElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn element(&self, id: ElementId) -> Option<&SchemaElement> {
        self.index_of(id).map(|i| &self.elements[i])
    }

    pub(crate) fn require(&self, id: ElementId) -> Result<&SchemaElement, EditorError> {
        self.element(id)
            .ok_or_else(|| EditorError::structural(id))
    }

    // ---- mutation primitives ----

    pub fn append(&mut self, element: SchemaElement) -> ElementId {
        self.append_in(Trace::Record, element)
    }

    pub fn append_in(&mut self, mode: Trace, element: SchemaElement) -> ElementId {
        let pos = self.elements.len();
        self.insert_at(mode, pos, element)
    }

    /// Insert directly before the anchor element.
    pub fn append_before(
        &mut self,
        element: SchemaElement,
        anchor: ElementId,
    ) -> Result<ElementId, EditorError> {
        let pos = self
            .index_of(anchor)
            .ok_or_else(|| EditorError::ElementNotFound(anchor.to_string()))?;
        Ok(self.insert_at(Trace::Record, pos, element))
    }

    /// Insert directly after the anchor element.
    pub fn append_after(
        &mut self,
        element: SchemaElement,
        anchor: ElementId,
    ) -> Result<ElementId, EditorError> {
        let pos = self
            .index_of(anchor)
            .ok_or_else(|| EditorError::ElementNotFound(anchor.to_string()))?;
        Ok(self.insert_at(Trace::Record, pos + 1, element))
    }

    fn insert_at(&mut self, mode: Trace, pos: usize, element: SchemaElement) -> ElementId {
        let pos = pos.min(self.elements.len());
        let id = element.id;
        if mode == Trace::Record {
            self.journal.push(HistoryRecord::Add {
                element: element.clone(),
                index: pos,
            });
        }
        self.affected.push(AffectedElement {
            id,
            behavior: AffectedBehavior::Add,
            prev_index: pos.checked_sub(1),
            group_ids: None,
        });
        self.elements.insert(pos, element);
        self.rebuild_index();
        id
    }

    /// Swap the element stored under `id` for `element`, which may carry a
    /// different id. Bumps version and timestamp of the incoming element.
    pub fn replace(
        &mut self,
        element: SchemaElement,
        id: ElementId,
    ) -> Result<ElementId, EditorError> {
        self.replace_in(Trace::Record, element, id)
    }

    pub fn replace_in(
        &mut self,
        mode: Trace,
        mut element: SchemaElement,
        id: ElementId,
    ) -> Result<ElementId, EditorError> {
        let pos = self
            .index_of(id)
            .ok_or_else(|| EditorError::ElementNotFound(id.to_string()))?;
        if mode == Trace::Record {
            self.version += 1;
            element.version = self.version;
            element.updated_at = now_millis();
        }

        let old = self.elements[pos].clone();
        let new_id = element.id;
        if mode == Trace::Record {
            self.journal.push(HistoryRecord::Change {
                element: element.clone(),
                old_element: old,
            });
        }
        self.affected.push(AffectedElement {
            id: new_id,
            behavior: AffectedBehavior::Change,
            prev_index: None,
            group_ids: None,
        });
        self.elements[pos] = element;
        if new_id != id {
            self.rebuild_index();
        }
        Ok(new_id)
    }

    /// Combined remove + insert. Returns the removed elements with their
    /// `is_deleted` flag set.
    ///
    /// Delete diff records are deduplicated: removing a block together with
    /// its descendants emits one delete per top-level removed subtree, since
    /// the projector drops the whole subtree with the block.
    pub fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        items: Vec<SchemaElement>,
    ) -> Vec<SchemaElement> {
        self.splice_in(Trace::Record, start, delete_count, items)
    }

    pub fn splice_in(
        &mut self,
        mode: Trace,
        start: usize,
        delete_count: usize,
        items: Vec<SchemaElement>,
    ) -> Vec<SchemaElement> {
        let start = start.min(self.elements.len());
        let end = (start + delete_count).min(self.elements.len());

        let mut removed: Vec<SchemaElement> =
            self.elements.splice(start..end, items.iter().cloned()).collect();

        let removed_ids: HashSet<ElementId> = removed.iter().map(|el| el.id).collect();
        for (offset, el) in removed.iter_mut().enumerate() {
            if mode == Trace::Record {
                self.journal.push(HistoryRecord::Delete {
                    element: el.clone(),
                    index: start,
                    offset,
                });
            }
            let covered_by_ancestor = el.group_ids.iter().any(|gid| removed_ids.contains(gid));
            if !(covered_by_ancestor || el.is_deleted) {
                self.affected.push(AffectedElement {
                    id: el.id,
                    behavior: AffectedBehavior::Delete,
                    prev_index: None,
                    group_ids: Some(el.group_ids.clone()),
                });
            }
            el.is_deleted = true;
        }

        for (j, item) in items.iter().enumerate() {
            if mode == Trace::Record {
                self.journal.push(HistoryRecord::Add {
                    element: item.clone(),
                    index: start + j,
                });
            }
            self.affected.push(AffectedElement {
                id: item.id,
                behavior: AffectedBehavior::Add,
                prev_index: (start + j).checked_sub(1),
                group_ids: None,
            });
        }

        self.rebuild_index();
        removed
    }

    // ---- pending sets ----

    pub fn drain_affected(&mut self) -> Vec<AffectedElement> {
        std::mem::take(&mut self.affected)
    }

    pub fn drain_journal(&mut self) -> Vec<HistoryRecord> {
        std::mem::take(&mut self.journal)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.affected.is_empty()
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, el) in self.elements.iter().enumerate() {
            self.index.insert(el.id, i);
        }
    }

    // ---- view-line helpers ----

    /// Index range `[start, end)` of a view line's subtree in the sequence.
    pub fn view_line_span(&self, line: ElementId) -> Option<(usize, usize)> {
        let start = self.index_of(line)?;
        if !self.elements[start].is_view_line() {
            return None;
        }
        let mut end = start + 1;
        while end < self.elements.len() && self.elements[end].group_ids.first() == Some(&line) {
            end += 1;
        }
        Some((start, end))
    }

    /// Concatenated text content of one view line.
    pub fn view_line_text(&self, line: ElementId) -> Option<String> {
        let (start, end) = self.view_line_span(line)?;
        Some(
            self.elements[start..end]
                .iter()
                .map(|el| el.content.as_str())
                .collect(),
        )
    }

    /// Verifies the ancestor-contiguity invariant over the whole sequence.
    pub fn check_ancestor_contiguity(&self) -> Result<(), EditorError> {
        let mut seen_children: HashMap<ElementId, (usize, usize, usize)> = HashMap::new();
        for (i, el) in self.elements.iter().enumerate() {
            for gid in &el.group_ids {
                let parent_idx = self
                    .index_of(*gid)
                    .ok_or_else(|| EditorError::structural(*gid))?;
                if parent_idx >= i {
                    return Err(EditorError::structural(el.id));
                }
            }
            if let Some(line) = el.group_ids.first() {
                let entry = seen_children.entry(*line).or_insert((i, i, 0));
                entry.0 = entry.0.min(i);
                entry.1 = entry.1.max(i);
                entry.2 += 1;
            }
        }
        for (line, (min, max, count)) in seen_children {
            // contiguous run directly behind the owning block
            let block_idx = self.index_of(line).ok_or_else(|| EditorError::structural(line))?;
            if max - min + 1 != count || min != block_idx + 1 {
                return Err(EditorError::structural(line));
            }
        }
        Ok(())
    }
}
