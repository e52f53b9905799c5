//! One selection range: anchor/focus endpoints, pixel rectangles, caret
//! navigation and content collapse.

use std::collections::HashSet;

use crate::error::EditorError;
use crate::events::{ScrollAction, ScrollChange};
use crate::geometry::Rect;
use crate::history::RangeSnapshot;
use crate::renderer::Caret;
use crate::schema::{ElementId, Schema};
use crate::selection::ViewContext;
use crate::text::{char_len, slice_chars};

/// Horizontal widening applied to selection rectangles so the selection
/// handles stay grabbable at line edges.
pub const SELECTION_PAD: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeId(pub(crate) u64);

/// Anchor/focus normalized into document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalRange {
    pub start_block: ElementId,
    pub start_offset: usize,
    pub end_block: ElementId,
    pub end_offset: usize,
}

/// Directional caret intents for keyboard navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavIntent {
    Prev,
    Next,
    LineStart,
    LineEnd,
    PrevLine,
    NextLine,
    First,
    End,
}

/// Outcome of a navigation step: the new caret plus any scroll needed to keep
/// it visible. The scroll is a value, not a side effect; the editor emits it.
#[derive(Debug, Clone, PartialEq)]
pub struct NavResult {
    pub block: ElementId,
    pub offset: usize,
    pub scroll: Option<ScrollChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorSelectionRange {
    pub id: RangeId,
    pub anchor_block: ElementId,
    pub anchor_offset: usize,
    pub focus_block: ElementId,
    pub focus_offset: usize,
    /// Viewport-space rectangles, recomputed after every mutation. Empty for
    /// collapsed ranges.
    pub rectangles: Vec<Rect>,
}

impl EditorSelectionRange {
    pub(crate) fn new(
        id: RangeId,
        anchor_block: ElementId,
        anchor_offset: usize,
        focus_block: ElementId,
        focus_offset: usize,
    ) -> Self {
        Self {
            id,
            anchor_block,
            anchor_offset,
            focus_block,
            focus_offset,
            rectangles: Vec::new(),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_block == self.focus_block && self.anchor_offset == self.focus_offset
    }

    pub fn set_anchor(&mut self, block: ElementId, offset: usize) {
        self.anchor_block = block;
        self.anchor_offset = offset;
    }

    pub fn set_focus(&mut self, block: ElementId, offset: usize) {
        self.focus_block = block;
        self.focus_offset = offset;
    }

    pub fn set_ends(&mut self, block: ElementId, offset: usize) {
        self.set_anchor(block, offset);
        self.set_focus(block, offset);
    }

    pub fn snapshot(&self) -> RangeSnapshot {
        RangeSnapshot {
            id: self.id,
            anchor_block: self.anchor_block,
            anchor_offset: self.anchor_offset,
            focus_block: self.focus_block,
            focus_offset: self.focus_offset,
        }
    }

    /// Normalize anchor/focus into left-to-right, top-to-bottom order by
    /// comparing sequence index, then offset.
    pub fn physics(&self, schema: &Schema) -> Result<PhysicalRange, EditorError> {
        let anchor_idx = schema
            .index_of(self.anchor_block)
            .ok_or_else(|| EditorError::structural(self.anchor_block))?;
        let focus_idx = schema
            .index_of(self.focus_block)
            .ok_or_else(|| EditorError::structural(self.focus_block))?;

        let forward = (anchor_idx, self.anchor_offset) <= (focus_idx, self.focus_offset);
        Ok(if forward {
            PhysicalRange {
                start_block: self.anchor_block,
                start_offset: self.anchor_offset,
                end_block: self.focus_block,
                end_offset: self.focus_offset,
            }
        } else {
            PhysicalRange {
                start_block: self.focus_block,
                start_offset: self.focus_offset,
                end_block: self.anchor_block,
                end_offset: self.anchor_offset,
            }
        })
    }

    /// Whether a caret falls inside the range (endpoints included).
    pub fn contains(&self, schema: &Schema, caret: Caret) -> Result<bool, EditorError> {
        let phys = self.physics(schema)?;
        let idx = schema
            .index_of(caret.block)
            .ok_or_else(|| EditorError::structural(caret.block))?;
        let start = (schema.index_of(phys.start_block).unwrap_or(0), phys.start_offset);
        let end = (schema.index_of(phys.end_block).unwrap_or(0), phys.end_offset);
        let pos = (idx, caret.offset);
        Ok(pos >= start && pos <= end)
    }

    /// Recompute viewport-space rectangles from the rendered index.
    ///
    /// Collapsed: none. Same view line: one rectangle anchor-to-focus. Cross
    /// line: a start partial, full-width intermediates and an end partial,
    /// the first two widened by [`SELECTION_PAD`].
    pub fn compute_rectangles(&mut self, ctx: &ViewContext) -> Result<(), EditorError> {
        self.rectangles.clear();
        if self.is_collapsed() {
            return Ok(());
        }

        let phys = self.physics(ctx.schema)?;
        let start_line = ctx.schema.require(phys.start_block)?.view_line();
        let end_line = ctx.schema.require(phys.end_block)?.view_line();
        let start_caret = ctx
            .renderer
            .caret_rect(Caret::new(phys.start_block, phys.start_offset), ctx.schema, ctx.rendered)
            .ok_or_else(|| EditorError::structural(phys.start_block))?;
        let end_caret = ctx
            .renderer
            .caret_rect(Caret::new(phys.end_block, phys.end_offset), ctx.schema, ctx.rendered)
            .ok_or_else(|| EditorError::structural(phys.end_block))?;

        let mut rects = Vec::new();
        if start_line == end_line {
            let line = ctx
                .rendered
                .get(start_line)
                .ok_or_else(|| EditorError::structural(start_line))?;
            rects.push(Rect::new(
                start_caret.x,
                line.y,
                end_caret.x - start_caret.x,
                line.height,
            ));
        } else {
            let start_pos = ctx
                .rendered
                .position(start_line)
                .ok_or_else(|| EditorError::structural(start_line))?;
            let end_pos = ctx
                .rendered
                .position(end_line)
                .ok_or_else(|| EditorError::structural(end_line))?;
            let items = ctx.rendered.items();

            let first = &items[start_pos];
            rects.push(Rect::new(
                start_caret.x,
                first.y,
                first.x + first.width + SELECTION_PAD - start_caret.x,
                first.height,
            ));
            for line in &items[start_pos + 1..end_pos] {
                rects.push(Rect::new(line.x, line.y, line.width + SELECTION_PAD, line.height));
            }
            let last = &items[end_pos];
            rects.push(Rect::new(last.x, last.y, end_caret.x - last.x, last.height));
        }

        let (scroll_x, scroll_y) = ctx.scroll;
        self.rectangles = rects
            .into_iter()
            .map(|r| Rect::new(r.x - scroll_x, r.y - scroll_y, r.width, r.height))
            .collect();
        Ok(())
    }

    /// Resolve a directional intent from the current focus. Every result
    /// carries the scroll needed to keep the landing caret's line visible.
    pub fn end_by(&self, intent: NavIntent, ctx: &ViewContext) -> Result<NavResult, EditorError> {
        let el = ctx.schema.require(self.focus_block)?;
        let idx = ctx
            .schema
            .index_of(self.focus_block)
            .ok_or_else(|| EditorError::structural(self.focus_block))?;
        let elements = ctx.schema.elements();

        let plain = |block: ElementId, offset: usize| {
            Ok(NavResult {
                block,
                offset,
                scroll: scroll_to_reveal(block, ctx)?,
            })
        };

        match intent {
            NavIntent::Prev => {
                if self.focus_offset > 0 {
                    return plain(self.focus_block, self.focus_offset - 1);
                }
                let Some(prev) = idx.checked_sub(1).map(|i| &elements[i]) else {
                    return plain(self.focus_block, 0);
                };
                let len = char_len(&prev.content);
                if prev.view_line() == el.view_line() {
                    // (prev, len) is the same caret position we are leaving
                    plain(prev.id, len.saturating_sub(1))
                } else {
                    plain(prev.id, len)
                }
            }
            NavIntent::Next => {
                let len = char_len(&el.content);
                if self.focus_offset < len {
                    return plain(self.focus_block, self.focus_offset + 1);
                }
                let Some(next) = elements.get(idx + 1) else {
                    return plain(self.focus_block, len);
                };
                if next.view_line() == el.view_line() {
                    plain(next.id, char_len(&next.content).min(1))
                } else {
                    plain(next.id, 0)
                }
            }
            NavIntent::LineStart => plain(el.view_line(), 0),
            NavIntent::LineEnd => {
                let (_, end) = ctx
                    .schema
                    .view_line_span(el.view_line())
                    .ok_or_else(|| EditorError::structural(el.view_line()))?;
                let last = &elements[end - 1];
                plain(last.id, char_len(&last.content))
            }
            NavIntent::First => {
                let first = elements
                    .first()
                    .ok_or_else(|| EditorError::structural("empty document"))?;
                plain(first.id, 0)
            }
            NavIntent::End => {
                let last = elements
                    .last()
                    .ok_or_else(|| EditorError::structural("empty document"))?;
                plain(last.id, char_len(&last.content))
            }
            NavIntent::PrevLine | NavIntent::NextLine => self.vertical_jump(intent, ctx),
        }
    }

    /// Vertical caret step via pixel geometry: the flat model has no "line
    /// above" pointer, so the jump probes the neighboring rendered line at
    /// the caret's x-coordinate.
    fn vertical_jump(&self, intent: NavIntent, ctx: &ViewContext) -> Result<NavResult, EditorError> {
        let el = ctx.schema.require(self.focus_block)?;
        let line = el.view_line();
        let pos = ctx
            .rendered
            .position(line)
            .ok_or_else(|| EditorError::structural(line))?;

        let target = match intent {
            NavIntent::PrevLine => pos.checked_sub(1).map(|p| &ctx.rendered.items()[p]),
            _ => ctx.rendered.items().get(pos + 1),
        };
        let Some(target) = target else {
            // no neighboring line: clamp to the line edge instead
            let edge = if intent == NavIntent::PrevLine {
                NavIntent::LineStart
            } else {
                NavIntent::LineEnd
            };
            return self.end_by(edge, ctx);
        };

        let caret_rect = ctx
            .renderer
            .caret_rect(Caret::new(self.focus_block, self.focus_offset), ctx.schema, ctx.rendered)
            .ok_or_else(|| EditorError::structural(self.focus_block))?;
        let probe = crate::geometry::Point::new(caret_rect.x, target.y + target.height / 2.0);
        let caret = ctx
            .renderer
            .caret_from_point(probe, ctx.schema, ctx.rendered)
            .ok_or_else(|| EditorError::structural(line))?;

        Ok(NavResult {
            block: caret.block,
            offset: caret.offset,
            scroll: scroll_to_reveal(caret.block, ctx)?,
        })
    }
}

/// Scroll needed to bring the view line owning `block` into the container,
/// or `None` when it is already fully visible.
fn scroll_to_reveal(block: ElementId, ctx: &ViewContext) -> Result<Option<ScrollChange>, EditorError> {
    let line = ctx.schema.require(block)?.view_line();
    let target = ctx
        .rendered
        .get(line)
        .ok_or_else(|| EditorError::structural(line))?;
    let (_, scroll_y) = ctx.scroll;
    let top = target.y - scroll_y;
    let bottom = target.y + target.height - scroll_y;

    let dy = if top < ctx.container.y {
        top - ctx.container.y
    } else if bottom > ctx.container.bottom() {
        bottom - ctx.container.bottom()
    } else {
        return Ok(None);
    };
    Ok(Some(ScrollChange {
        x: 0.0,
        y: dy,
        action: ScrollAction::ScrollBy,
    }))
}

/// Delete the content covered by `range` and collapse it to its start.
///
/// Boundary elements merge: the start element keeps its head content plus the
/// end element's tail content. Elements strictly inside the span are removed
/// and trailing elements of the end element's view line are re-chained onto
/// the surviving line. No-op on an already collapsed range.
pub fn collapse_range(
    range: &mut EditorSelectionRange,
    schema: &mut Schema,
) -> Result<(), EditorError> {
    if range.is_collapsed() {
        return Ok(());
    }
    let phys = range.physics(schema)?;
    let s_idx = schema
        .index_of(phys.start_block)
        .ok_or_else(|| EditorError::structural(phys.start_block))?;
    let e_idx = schema
        .index_of(phys.end_block)
        .ok_or_else(|| EditorError::structural(phys.end_block))?;

    if phys.start_block == phys.end_block {
        let mut changed = schema.require(phys.start_block)?.clone();
        let head = slice_chars(&changed.content, 0, phys.start_offset);
        let tail = slice_chars(&changed.content, phys.end_offset, char_len(&changed.content));
        changed.content = head + &tail;
        schema.replace(changed, phys.start_block)?;
    } else {
        let start_el = schema.require(phys.start_block)?.clone();
        let end_el = schema.require(phys.end_block)?.clone();
        let start_line = start_el.view_line();
        let end_line = end_el.view_line();

        let mut merged = start_el;
        let head = slice_chars(&merged.content, 0, phys.start_offset);
        let tail = slice_chars(&end_el.content, phys.end_offset, char_len(&end_el.content));
        merged.content = head + &tail;
        schema.replace(merged, phys.start_block)?;

        let removed_ids: HashSet<ElementId> = schema.elements()[s_idx + 1..=e_idx]
            .iter()
            .map(|el| el.id)
            .collect();
        let tail_ids: Vec<ElementId> = schema.elements()[e_idx + 1..]
            .iter()
            .take_while(|el| el.view_line() == end_line)
            .map(|el| el.id)
            .collect();

        // survivors of the dissolved line move under the surviving one
        for tail_id in tail_ids {
            let mut el = schema.require(tail_id)?.clone();
            el.group_ids = el
                .group_ids
                .iter()
                .filter_map(|gid| {
                    if *gid == end_line {
                        Some(start_line)
                    } else if removed_ids.contains(gid) {
                        None
                    } else {
                        Some(*gid)
                    }
                })
                .collect();
            schema.replace(el, tail_id)?;
        }

        schema.splice(s_idx + 1, e_idx - s_idx, vec![]);
    }

    range.set_ends(phys.start_block, phys.start_offset);
    range.rectangles.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ElementKind;
    use pretty_assertions::assert_eq;

    fn range_on(schema: &Schema, a: ElementId, ao: usize, f: ElementId, fo: usize) -> EditorSelectionRange {
        let _ = schema;
        EditorSelectionRange::new(RangeId(1), a, ao, f, fo)
    }

    #[test]
    fn physics_orders_backwards_ranges() {
        let mut schema = Schema::new();
        let a = schema.create_element(ElementKind::Paragraph, vec![], "aa");
        let a_id = schema.append(a);
        let b = schema.create_element(ElementKind::Paragraph, vec![], "bb");
        let b_id = schema.append(b);

        let range = range_on(&schema, b_id, 1, a_id, 0);
        let phys = range.physics(&schema).unwrap();
        assert_eq!(phys.start_block, a_id);
        assert_eq!(phys.end_block, b_id);
        assert_eq!(phys.end_offset, 1);
    }

    #[test]
    fn collapse_within_one_element_removes_covered_text() {
        let mut schema = Schema::new();
        let el = schema.create_element(ElementKind::Paragraph, vec![], "hello");
        let id = schema.append(el);

        let mut range = range_on(&schema, id, 1, id, 4);
        collapse_range(&mut range, &mut schema).unwrap();

        assert_eq!(schema.element(id).unwrap().content, "ho");
        assert!(range.is_collapsed());
        assert_eq!(range.anchor_offset, 1);
    }

    #[test]
    fn collapse_is_idempotent() {
        let mut schema = Schema::new();
        let el = schema.create_element(ElementKind::Paragraph, vec![], "hello");
        let id = schema.append(el);
        schema.drain_journal();

        let mut range = range_on(&schema, id, 2, id, 2);
        collapse_range(&mut range, &mut schema).unwrap();
        collapse_range(&mut range, &mut schema).unwrap();

        assert_eq!(schema.element(id).unwrap().content, "hello");
        assert!(schema.drain_journal().is_empty());
    }

    #[test]
    fn collapse_across_lines_merges_and_rechains_tail() {
        let mut schema = Schema::new();
        let a = schema.create_element(ElementKind::Paragraph, vec![], "head");
        let a_id = schema.append(a);
        let b = schema.create_element(ElementKind::Paragraph, vec![], "tail");
        let b_id = schema.append(b);
        let strong = schema.create_element(ElementKind::Strong, vec![b_id], "rest");
        let strong_id = schema.append(strong);

        let mut range = range_on(&schema, a_id, 2, b_id, 2);
        collapse_range(&mut range, &mut schema).unwrap();

        // "he" + "il": covered text gone, boundary elements merged
        assert_eq!(schema.element(a_id).unwrap().content, "heil");
        assert!(schema.element(b_id).is_none());
        // the strong survivor now hangs off the first line
        assert_eq!(schema.element(strong_id).unwrap().group_ids, vec![a_id]);
        schema.check_ancestor_contiguity().unwrap();
        assert_eq!(range.anchor_block, a_id);
        assert_eq!(range.anchor_offset, 2);
    }
}
