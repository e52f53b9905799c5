//! Selection engine: the set of ranges, pointer hit testing and the
//! modifier-key gesture policies.
//!
//! Pointer input arrives in viewport space; the hit test adds the scroll
//! offsets to reach document space before consulting the rendered index.
//! Scrolling needed to chase a pointer or caret outside the viewport is
//! returned as a value and emitted by the editor, never applied here.

mod range;

pub use range::{
    EditorSelectionRange, NavIntent, NavResult, PhysicalRange, RangeId, SELECTION_PAD,
    collapse_range,
};

use crate::error::EditorError;
use crate::events::{ScrollAction, ScrollChange};
use crate::geometry::{Point, Rect};
use crate::history::RangeSnapshot;
use crate::input::{Modifiers, SelectKey};
use crate::render::RenderedIndex;
use crate::renderer::{Caret, Renderer};
use crate::schema::Schema;
use crate::text::char_len;

/// Read-only borrow bundle the selection engine needs for geometry work.
pub struct ViewContext<'a> {
    pub schema: &'a Schema,
    pub rendered: &'a RenderedIndex,
    pub renderer: &'a dyn Renderer,
    /// Current `(x, y)` scroll offsets.
    pub scroll: (f64, f64),
    /// Viewport rectangle, viewport space.
    pub container: Rect,
}

/// Map a viewport-space point to a logical caret.
///
/// A point outside the container still resolves (clamped to the nearest line
/// edge) and additionally requests an auto-scroll towards the point.
pub fn element_at_point(point: Point, ctx: &ViewContext) -> (Option<Caret>, Option<ScrollChange>) {
    let mut dx = 0.0;
    let mut dy = 0.0;
    if point.y < ctx.container.y {
        dy = point.y - ctx.container.y;
    } else if point.y > ctx.container.bottom() {
        dy = point.y - ctx.container.bottom();
    }
    if point.x < ctx.container.x {
        dx = point.x - ctx.container.x;
    } else if point.x > ctx.container.right() {
        dx = point.x - ctx.container.right();
    }
    let scroll = (dx != 0.0 || dy != 0.0).then_some(ScrollChange {
        x: dx,
        y: dy,
        action: ScrollAction::ScrollBy,
    });

    let (scroll_x, scroll_y) = ctx.scroll;
    let doc = Point::new(point.x + scroll_x, point.y + scroll_y);
    let Some(line) = ctx.rendered.line_at_y(doc.y) else {
        return (None, scroll);
    };
    // clamp into the line box so edge clicks land on a caret
    let probe = Point::new(
        doc.x.clamp(line.x, line.x + line.width),
        line.y + line.height / 2.0,
    );
    (
        ctx.renderer.caret_from_point(probe, ctx.schema, ctx.rendered),
        scroll,
    )
}

/// The live set of ranges. Unordered; exactly one is "current" (last touched)
/// whenever the set is nonempty.
#[derive(Default)]
pub struct EditorSelection {
    ranges: Vec<EditorSelectionRange>,
    current: Option<RangeId>,
    next_range_id: u64,
    /// Alt-click landed inside the current range; resolved on drag or release.
    pending_move: bool,
    dragging: bool,
}

impl EditorSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[EditorSelectionRange] {
        &self.ranges
    }

    pub fn current_id(&self) -> Option<RangeId> {
        self.current
    }

    pub fn current_range(&self) -> Option<&EditorSelectionRange> {
        self.current
            .and_then(|id| self.ranges.iter().find(|r| r.id == id))
    }

    pub fn current_range_mut(&mut self) -> Option<&mut EditorSelectionRange> {
        let id = self.current?;
        self.ranges.iter_mut().find(|r| r.id == id)
    }

    pub(crate) fn ranges_mut(&mut self) -> &mut [EditorSelectionRange] {
        &mut self.ranges
    }

    /// Add a range and make it current.
    pub fn add_range(
        &mut self,
        anchor_block: crate::schema::ElementId,
        anchor_offset: usize,
        focus_block: crate::schema::ElementId,
        focus_offset: usize,
    ) -> RangeId {
        let id = RangeId(self.next_range_id);
        self.next_range_id += 1;
        self.ranges.push(EditorSelectionRange::new(
            id,
            anchor_block,
            anchor_offset,
            focus_block,
            focus_offset,
        ));
        self.current = Some(id);
        id
    }

    pub fn remove_range(&mut self, id: RangeId) {
        self.ranges.retain(|r| r.id != id);
        if self.current == Some(id) {
            self.current = self.ranges.last().map(|r| r.id);
        }
    }

    pub fn remove_all(&mut self) {
        self.ranges.clear();
        self.current = None;
    }

    pub fn set_anchor_of_current(&mut self, block: crate::schema::ElementId, offset: usize) {
        if let Some(range) = self.current_range_mut() {
            range.set_anchor(block, offset);
        }
    }

    pub fn set_focus_of_current(&mut self, block: crate::schema::ElementId, offset: usize) {
        if let Some(range) = self.current_range_mut() {
            range.set_focus(block, offset);
        }
    }

    /// True when any live range covers content.
    pub fn has_extended(&self) -> bool {
        self.ranges.iter().any(|r| !r.is_collapsed())
    }

    pub fn snapshot(&self) -> Vec<RangeSnapshot> {
        self.ranges.iter().map(|r| r.snapshot()).collect()
    }

    /// Rebuild the set from a history snapshot, keeping the snapshot ids.
    pub fn restore(&mut self, snapshots: &[RangeSnapshot], current: Option<RangeId>) {
        self.ranges = snapshots
            .iter()
            .map(|s| {
                EditorSelectionRange::new(
                    s.id,
                    s.anchor_block,
                    s.anchor_offset,
                    s.focus_block,
                    s.focus_offset,
                )
            })
            .collect();
        self.current = current.or_else(|| self.ranges.last().map(|r| r.id));
        if let Some(max) = self.ranges.iter().map(|r| r.id.0).max() {
            self.next_range_id = self.next_range_id.max(max + 1);
        }
    }

    /// Recompute every range's rectangles, then enforce the no-overlap
    /// invariant against the current range.
    pub fn refresh_rectangles(&mut self, ctx: &ViewContext) -> Result<(), EditorError> {
        for range in &mut self.ranges {
            range.compute_rectangles(ctx)?;
        }
        self.remove_overlapping_with_current();
        Ok(())
    }

    /// Drop any non-current range whose rectangles overlap the current
    /// range's by more than one square pixel.
    pub fn remove_overlapping_with_current(&mut self) {
        let Some(current) = self.current_range() else {
            return;
        };
        let current_id = current.id;
        let current_rects = current.rectangles.clone();
        self.ranges.retain(|r| {
            r.id == current_id
                || !r.rectangles.iter().any(|a| {
                    current_rects
                        .iter()
                        .any(|b| a.intersection_area(b) > 1.0)
                })
        });
    }

    // ---- pointer gesture state machine ----

    pub fn pointer_down(
        &mut self,
        point: Point,
        modifiers: Modifiers,
        ctx: &ViewContext,
    ) -> Result<Option<ScrollChange>, EditorError> {
        let (caret, scroll) = element_at_point(point, ctx);
        let Some(caret) = caret else {
            return Ok(scroll);
        };
        self.dragging = true;
        self.pending_move = false;

        if modifiers.alt {
            // Alt+Shift deliberately behaves like plain Alt
            let mut hit = None;
            for range in &self.ranges {
                if !range.is_collapsed() && range.contains(ctx.schema, caret)? {
                    hit = Some(range.id);
                    break;
                }
            }
            match hit {
                Some(id) if Some(id) == self.current => self.pending_move = true,
                Some(id) => self.remove_range(id),
                None => {
                    self.add_range(caret.block, caret.offset, caret.block, caret.offset);
                }
            }
        } else if modifiers.shift {
            match self.current_range_mut() {
                Some(range) => range.set_focus(caret.block, caret.offset),
                None => {
                    self.add_range(caret.block, caret.offset, caret.block, caret.offset);
                }
            }
        } else {
            self.remove_all();
            self.add_range(caret.block, caret.offset, caret.block, caret.offset);
        }
        Ok(scroll)
    }

    pub fn pointer_move(
        &mut self,
        point: Point,
        ctx: &ViewContext,
    ) -> Result<Option<ScrollChange>, EditorError> {
        if !self.dragging {
            return Ok(None);
        }
        let (caret, scroll) = element_at_point(point, ctx);
        let Some(caret) = caret else {
            return Ok(scroll);
        };

        if self.pending_move {
            // first drag resolves the move gesture: restart from the pointer
            self.pending_move = false;
            if let Some(range) = self.current_range_mut() {
                range.set_ends(caret.block, caret.offset);
            }
        } else if let Some(range) = self.current_range_mut() {
            range.set_focus(caret.block, caret.offset);
        }
        Ok(scroll)
    }

    pub fn pointer_up(
        &mut self,
        point: Point,
        ctx: &ViewContext,
    ) -> Result<Option<ScrollChange>, EditorError> {
        let mut scroll = None;
        if self.pending_move {
            // release without drag: reposition inside the current range
            let (caret, s) = element_at_point(point, ctx);
            scroll = s;
            if let Some(caret) = caret
                && let Some(range) = self.current_range_mut()
            {
                range.set_ends(caret.block, caret.offset);
            }
        }
        self.pending_move = false;
        self.dragging = false;
        Ok(scroll)
    }

    // ---- keyboard selection ----

    pub fn keyboard_select(
        &mut self,
        key: SelectKey,
        modifiers: Modifiers,
        ctx: &ViewContext,
    ) -> Result<Option<ScrollChange>, EditorError> {
        if key == SelectKey::SelectAll {
            let (Some(first), Some(last)) =
                (ctx.schema.elements().first(), ctx.schema.elements().last())
            else {
                return Ok(None);
            };
            let (first_id, last_id, last_len) = (first.id, last.id, char_len(&last.content));
            self.remove_all();
            self.add_range(first_id, 0, last_id, last_len);
            return Ok(None);
        }

        let Some(range) = self.current_range() else {
            return Ok(None);
        };

        // plain horizontal arrows on an extended range collapse to its edge
        if !modifiers.shift
            && !modifiers.ctrl
            && !range.is_collapsed()
            && matches!(key, SelectKey::ArrowLeft | SelectKey::ArrowRight)
        {
            let phys = range.physics(ctx.schema)?;
            let (block, offset) = if key == SelectKey::ArrowLeft {
                (phys.start_block, phys.start_offset)
            } else {
                (phys.end_block, phys.end_offset)
            };
            if let Some(range) = self.current_range_mut() {
                range.set_ends(block, offset);
            }
            return Ok(None);
        }

        let intent = match (key, modifiers.ctrl) {
            (SelectKey::ArrowLeft, false) => NavIntent::Prev,
            (SelectKey::ArrowRight, false) => NavIntent::Next,
            (SelectKey::ArrowUp, false) => NavIntent::PrevLine,
            (SelectKey::ArrowDown, false) => NavIntent::NextLine,
            (SelectKey::ArrowLeft, true) => NavIntent::LineStart,
            (SelectKey::ArrowRight, true) => NavIntent::LineEnd,
            (SelectKey::ArrowUp, true) => NavIntent::First,
            (SelectKey::ArrowDown, true) => NavIntent::End,
            (SelectKey::SelectAll, _) => unreachable!("handled above"),
        };

        let nav = range.end_by(intent, ctx)?;
        if let Some(range) = self.current_range_mut() {
            if modifiers.shift {
                range.set_focus(nav.block, nav.offset);
            } else {
                range.set_ends(nav.block, nav.offset);
            }
        }
        Ok(nav.scroll)
    }
}
