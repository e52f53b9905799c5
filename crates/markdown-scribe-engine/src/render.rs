//! Rendered-index: the ordered list of measured view-line rectangles.
//!
//! The external renderer measures only the view lines named by a projection
//! diff; this index patches positions incrementally (shift-up on delete,
//! shift-down on add, delta-shift on height change) instead of re-measuring
//! the whole document. After every patch the list stays sorted by `y`,
//! contiguous, and `last_top` equals the total content height.
//!
//! All coordinates here are document space.

use std::collections::HashMap;

use crate::error::EditorError;
use crate::schema::ElementId;
use crate::view::{AffectedViewLine, ViewBlock, ViewLineBehavior};

/// Box measured by the external renderer for one view line. The vertical
/// position is computed by the index, not the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineBox {
    pub x: f64,
    pub width: f64,
    pub height: f64,
}

/// One view line's rectangle in document space.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedElement {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub line_height: f64,
}

#[derive(Debug, Default)]
pub struct RenderedIndex {
    items: Vec<RenderedElement>,
    last_top: f64,
}

impl RenderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[RenderedElement] {
        &self.items
    }

    /// Total content height.
    pub fn last_top(&self) -> f64 {
        self.last_top
    }

    pub fn position(&self, id: ElementId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn get(&self, id: ElementId) -> Option<&RenderedElement> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn first(&self) -> Option<&RenderedElement> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&RenderedElement> {
        self.items.last()
    }

    /// View line whose vertical extent contains `y`; clamps to the first or
    /// last line when `y` falls outside the content.
    pub fn line_at_y(&self, y: f64) -> Option<&RenderedElement> {
        if y > self.last_top {
            return self.last();
        }
        if y <= 0.0 {
            return self.first();
        }
        self.items
            .iter()
            .find(|item| y >= item.y && y <= item.y + item.height)
    }

    /// Apply one projection diff set together with the freshly measured boxes
    /// for its added/changed lines.
    pub fn patch(
        &mut self,
        diffs: &[AffectedViewLine],
        measured: &HashMap<ElementId, LineBox>,
        view_blocks: &[ViewBlock],
        line_height: f64,
    ) -> Result<(), EditorError> {
        for diff in diffs {
            match &diff.behavior {
                ViewLineBehavior::Delete => self.remove(diff.id),
                ViewLineBehavior::Add { anchor } => {
                    let line_box = measured
                        .get(&diff.id)
                        .ok_or_else(|| EditorError::ElementNotFound(diff.id.to_string()))?;
                    self.insert(diff.id, *anchor, *line_box, view_blocks, line_height);
                }
                ViewLineBehavior::Change => {
                    let line_box = measured
                        .get(&diff.id)
                        .ok_or_else(|| EditorError::ElementNotFound(diff.id.to_string()))?;
                    match self.position(diff.id) {
                        Some(pos) => self.resize(pos, *line_box),
                        // first measurement of a line the index never saw
                        None => self.insert(diff.id, None, *line_box, view_blocks, line_height),
                    }
                }
            }
        }
        Ok(())
    }

    fn remove(&mut self, id: ElementId) {
        let Some(pos) = self.position(id) else {
            return;
        };
        let removed = self.items.remove(pos);
        for item in &mut self.items[pos..] {
            item.y -= removed.height;
        }
        self.last_top -= removed.height;
    }

    fn resize(&mut self, pos: usize, line_box: LineBox) {
        let delta = line_box.height - self.items[pos].height;
        let item = &mut self.items[pos];
        item.x = line_box.x;
        item.width = line_box.width;
        item.height = line_box.height;
        if delta != 0.0 {
            for item in &mut self.items[pos + 1..] {
                item.y += delta;
            }
            self.last_top += delta;
        }
    }

    fn insert(
        &mut self,
        id: ElementId,
        anchor: Option<ElementId>,
        line_box: LineBox,
        view_blocks: &[ViewBlock],
        line_height: f64,
    ) {
        let anchor_pos = anchor
            .and_then(|a| self.position(a))
            .or_else(|| self.nearest_indexed_neighbor(id, view_blocks));

        let (pos, y) = match anchor_pos {
            Some(p) => (p + 1, self.items[p].y + self.items[p].height),
            None => (0, 0.0),
        };

        self.items.insert(
            pos,
            RenderedElement {
                id,
                x: line_box.x,
                y,
                width: line_box.width,
                height: line_box.height,
                line_height,
            },
        );
        for item in &mut self.items[pos + 1..] {
            item.y += line_box.height;
        }
        self.last_top += line_box.height;
    }

    /// When the placement anchor has not been measured yet, walk the view
    /// block order backwards from `id` for the closest line already indexed.
    fn nearest_indexed_neighbor(&self, id: ElementId, view_blocks: &[ViewBlock]) -> Option<usize> {
        let block_pos = view_blocks.iter().position(|b| b.id() == id)?;
        view_blocks[..block_pos]
            .iter()
            .rev()
            .find_map(|b| self.position(b.id()))
    }

    /// Test/debug helper: verify ordering and contiguity.
    pub fn check_invariants(&self) -> Result<(), EditorError> {
        let mut expected_y = 0.0;
        for item in &self.items {
            if (item.y - expected_y).abs() > 1e-6 {
                return Err(EditorError::structural(item.id));
            }
            expected_y += item.height;
        }
        if (self.last_top - expected_y).abs() > 1e-6 {
            return Err(EditorError::structural("last_top"));
        }
        Ok(())
    }
}
