//! Undo/redo stacks over the schema journal.
//!
//! Mutations arrive as [`HistoryRecord`]s drained from the schema store.
//! Consecutive records closer together than the debounce window coalesce
//! into one batch, so a typing burst undoes as a single step. Replaying a
//! batch uses [`Trace::Replay`] so the replay itself is never re-recorded.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::schema::{ElementId, Schema, SchemaElement, Trace};
use crate::selection::{EditorSelection, RangeId};

/// One replayable schema mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryRecord {
    Add {
        element: SchemaElement,
        /// Position the element was inserted at.
        index: usize,
    },
    Change {
        element: SchemaElement,
        old_element: SchemaElement,
    },
    Delete {
        element: SchemaElement,
        /// Start index of the removing splice.
        index: usize,
        /// Position within that splice's removed run.
        offset: usize,
    },
}

/// Plain data snapshot of one selection range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSnapshot {
    pub id: RangeId,
    pub anchor_block: ElementId,
    pub anchor_offset: usize,
    pub focus_block: ElementId,
    pub focus_offset: usize,
}

#[derive(Debug, Clone)]
struct HistoryStack {
    records: Vec<HistoryRecord>,
    ranges_before: Vec<RangeSnapshot>,
    current_before: Option<RangeId>,
    ranges_after: Vec<RangeSnapshot>,
    current_after: Option<RangeId>,
}

/// Debounce-batching undo/redo manager.
pub struct EditorHistory {
    stacks: Vec<HistoryStack>,
    free: VecDeque<HistoryStack>,
    temp: Vec<HistoryRecord>,
    batch_before: Option<(Vec<RangeSnapshot>, Option<RangeId>)>,
    duration: Duration,
    last_record_at: Option<Instant>,
}

pub const DEFAULT_HISTORY_DEBOUNCE: Duration = Duration::from_millis(200);

impl Default for EditorHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEBOUNCE)
    }
}

impl EditorHistory {
    pub fn new(duration: Duration) -> Self {
        Self {
            stacks: Vec::new(),
            free: VecDeque::new(),
            temp: Vec::new(),
            batch_before: None,
            duration,
            last_record_at: None,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.stacks.len() + usize::from(!self.temp.is_empty())
    }

    pub fn redo_depth(&self) -> usize {
        self.free.len()
    }

    /// Feed journal records from a user edit, snapshotting the live selection
    /// as the pre-edit state.
    pub fn record(&mut self, records: Vec<HistoryRecord>, selection: &EditorSelection) {
        self.record_with(records, selection.snapshot(), selection.current_id());
    }

    /// Like [`EditorHistory::record`] but with an explicitly captured
    /// pre-edit selection (the editor snapshots it before running a command,
    /// since by drain time the caret has already moved). Invalidates the redo
    /// stack and closes the previous batch when the debounce window has
    /// passed since the last record.
    pub fn record_with(
        &mut self,
        records: Vec<HistoryRecord>,
        ranges: Vec<RangeSnapshot>,
        current: Option<RangeId>,
    ) {
        if records.is_empty() {
            return;
        }
        self.free.clear();

        let now = Instant::now();
        let gap_elapsed = self
            .last_record_at
            .is_some_and(|prev| now.duration_since(prev) >= self.duration);
        if gap_elapsed {
            // the pre-state of this edit is the post-state of the last batch
            self.flush_with(ranges.clone(), current);
        }

        if self.temp.is_empty() {
            self.batch_before = Some((ranges, current));
        }
        self.temp.extend(records);
        self.last_record_at = Some(now);
    }

    /// Close the open batch, snapshotting the selection as its "after" state.
    pub fn flush(&mut self, selection: &EditorSelection) {
        self.flush_with(selection.snapshot(), selection.current_id());
    }

    fn flush_with(&mut self, ranges_after: Vec<RangeSnapshot>, current_after: Option<RangeId>) {
        if self.temp.is_empty() {
            return;
        }
        let (ranges_before, current_before) = self
            .batch_before
            .take()
            .unwrap_or_else(|| (ranges_after.clone(), current_after));
        let stack = HistoryStack {
            records: std::mem::take(&mut self.temp),
            ranges_before,
            current_before,
            ranges_after,
            current_after,
        };
        log::debug!("history: closing batch of {} records", stack.records.len());
        self.stacks.push(stack);
    }

    /// Replay the newest batch backwards. Returns false when nothing to undo.
    pub fn undo(&mut self, schema: &mut Schema, selection: &mut EditorSelection) -> bool {
        self.flush(selection);
        let Some(stack) = self.stacks.pop() else {
            return false;
        };

        for record in stack.records.iter().rev() {
            match record {
                HistoryRecord::Add { index, .. } => {
                    schema.splice_in(Trace::Replay, *index, 1, vec![]);
                }
                HistoryRecord::Change {
                    element,
                    old_element,
                } => {
                    let _ = schema.replace_in(Trace::Replay, old_element.clone(), element.id);
                }
                HistoryRecord::Delete { element, index, .. } => {
                    let mut el = element.clone();
                    el.is_deleted = false;
                    schema.splice_in(Trace::Replay, *index, 0, vec![el]);
                }
            }
        }

        selection.restore(&stack.ranges_before, stack.current_before);
        log::debug!("history: undo ({} records)", stack.records.len());
        self.free.push_front(stack);
        true
    }

    /// Replay the next free batch forwards. Returns false when nothing to redo.
    pub fn redo(&mut self, schema: &mut Schema, selection: &mut EditorSelection) -> bool {
        let Some(stack) = self.free.pop_front() else {
            return false;
        };

        for record in &stack.records {
            match record {
                HistoryRecord::Add { element, index } => {
                    schema.splice_in(Trace::Replay, *index, 0, vec![element.clone()]);
                }
                HistoryRecord::Change {
                    element,
                    old_element,
                } => {
                    let _ = schema.replace_in(Trace::Replay, element.clone(), old_element.id);
                }
                HistoryRecord::Delete { index, .. } => {
                    schema.splice_in(Trace::Replay, *index, 1, vec![]);
                }
            }
        }

        selection.restore(&stack.ranges_after, stack.current_after);
        log::debug!("history: redo ({} records)", stack.records.len());
        self.stacks.push(stack);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ElementKind;
    use pretty_assertions::assert_eq;

    fn selection_for(schema: &Schema) -> EditorSelection {
        let mut selection = EditorSelection::new();
        let first = schema.elements()[0].id;
        selection.add_range(first, 0, first, 0);
        selection
    }

    fn schema_with_line(content: &str) -> Schema {
        let mut schema = Schema::new();
        let el = schema.create_element(ElementKind::Paragraph, vec![], content);
        schema.append(el);
        schema
    }

    #[test]
    fn undo_restores_prior_content_and_selection() {
        let mut schema = schema_with_line("ab");
        let id = schema.elements()[0].id;
        schema.drain_journal();
        let mut selection = selection_for(&schema);
        let mut history = EditorHistory::new(Duration::ZERO);

        // the edit: replace content and move the caret
        let mut changed = schema.element(id).unwrap().clone();
        changed.content = "aXb".to_string();
        schema.replace(changed, id).unwrap();
        history.record(schema.drain_journal(), &selection);
        selection.set_focus_of_current(id, 2);
        selection.set_anchor_of_current(id, 2);
        history.flush(&selection);

        assert!(history.undo(&mut schema, &mut selection));
        assert_eq!(schema.element(id).unwrap().content, "ab");
        let snap = selection.snapshot();
        assert_eq!(snap[0].anchor_offset, 0);

        assert!(history.redo(&mut schema, &mut selection));
        assert_eq!(schema.element(id).unwrap().content, "aXb");
        let snap = selection.snapshot();
        assert_eq!(snap[0].focus_offset, 2);
    }

    #[test]
    fn undo_of_splice_reinserts_in_original_order() {
        let mut schema = schema_with_line("a");
        let b = schema.create_element(ElementKind::Paragraph, vec![], "b");
        schema.append(b);
        let c = schema.create_element(ElementKind::Paragraph, vec![], "c");
        schema.append(c);
        schema.drain_journal();
        let mut selection = selection_for(&schema);
        let mut history = EditorHistory::new(Duration::ZERO);

        schema.splice(0, 3, vec![]);
        history.record(schema.drain_journal(), &selection);
        history.flush(&selection);
        assert!(schema.is_empty());

        assert!(history.undo(&mut schema, &mut selection));
        let contents: Vec<&str> = schema.elements().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
    }

    #[test]
    fn new_edit_invalidates_redo() {
        let mut schema = schema_with_line("a");
        let id = schema.elements()[0].id;
        schema.drain_journal();
        let mut selection = selection_for(&schema);
        let mut history = EditorHistory::new(Duration::ZERO);

        let mut changed = schema.element(id).unwrap().clone();
        changed.content = "ab".to_string();
        schema.replace(changed, id).unwrap();
        history.record(schema.drain_journal(), &selection);
        history.flush(&selection);

        history.undo(&mut schema, &mut selection);
        assert_eq!(history.redo_depth(), 1);

        let mut changed = schema.element(id).unwrap().clone();
        changed.content = "ac".to_string();
        schema.replace(changed, id).unwrap();
        history.record(schema.drain_journal(), &selection);

        assert_eq!(history.redo_depth(), 0);
        assert!(!history.redo(&mut schema, &mut selection));
    }

    #[test]
    fn replay_is_not_rerecorded() {
        let mut schema = schema_with_line("a");
        let id = schema.elements()[0].id;
        schema.drain_journal();
        let mut selection = selection_for(&schema);
        let mut history = EditorHistory::new(Duration::ZERO);

        let mut changed = schema.element(id).unwrap().clone();
        changed.content = "ab".to_string();
        schema.replace(changed, id).unwrap();
        history.record(schema.drain_journal(), &selection);
        history.flush(&selection);

        history.undo(&mut schema, &mut selection);
        assert!(schema.drain_journal().is_empty(), "replay must not journal");
        assert_eq!(history.undo_depth(), 0);
    }
}
