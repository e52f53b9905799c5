//! Host collaborator interfaces: painting/measuring view lines and the
//! scrollbar widget. The core never touches the DOM; it talks to these traits
//! and a deterministic monospace implementation backs the tests.

use crate::geometry::{Point, Rect};
use crate::render::{LineBox, RenderedIndex};
use crate::schema::{ElementId, Schema};
use crate::text::char_len;
use crate::view::ViewBlock;

/// Logical caret position: a schema element plus a character offset into its
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub block: ElementId,
    pub offset: usize,
}

impl Caret {
    pub fn new(block: ElementId, offset: usize) -> Self {
        Self { block, offset }
    }
}

pub trait Renderer {
    /// Whether the host can resolve a pixel point to a caret. Checked once at
    /// startup; absence is an environment error.
    fn has_caret_api(&self) -> bool;

    /// Paint one projected view line and return its measured box. The
    /// vertical position is assigned by the rendered index, not the host.
    fn measure(&mut self, line: &ViewBlock) -> LineBox;

    /// Document-space caret rectangle for a logical position. `None` when the
    /// element is not currently rendered.
    fn caret_rect(&self, caret: Caret, schema: &Schema, rendered: &RenderedIndex) -> Option<Rect>;

    /// Logical caret for a document-space point.
    fn caret_from_point(
        &self,
        point: Point,
        schema: &Schema,
        rendered: &RenderedIndex,
    ) -> Option<Caret>;
}

pub trait Scrollbar {
    /// Current `(x, y)` scroll offsets.
    fn offsets(&self) -> (f64, f64);
    fn scroll(&mut self, x: Option<f64>, y: Option<f64>);
    fn scroll_by(&mut self, dx: f64, dy: f64);
}

/// Offset-tracking scrollbar with no widget behind it.
#[derive(Debug, Default)]
pub struct SimpleScrollbar {
    x: f64,
    y: f64,
}

impl SimpleScrollbar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scrollbar for SimpleScrollbar {
    fn offsets(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn scroll(&mut self, x: Option<f64>, y: Option<f64>) {
        if let Some(x) = x {
            self.x = x.max(0.0);
        }
        if let Some(y) = y {
            self.y = y.max(0.0);
        }
    }

    fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.scroll(Some(self.x + dx), Some(self.y + dy));
    }
}

/// Fixed-advance renderer: every character is `char_width` wide and every
/// view line is `line_height` tall. Deterministic caret geometry for tests
/// and headless use.
#[derive(Debug, Clone)]
pub struct MonospaceRenderer {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for MonospaceRenderer {
    fn default() -> Self {
        Self::new(8.0, 22.0)
    }
}

fn block_text(block: &ViewBlock, out: &mut String) {
    out.push_str(&block.element.content);
    for child in &block.children {
        block_text(child, out);
    }
}

impl MonospaceRenderer {
    pub fn new(char_width: f64, line_height: f64) -> Self {
        Self {
            char_width,
            line_height,
        }
    }

    /// Character offset of `(element, offset)` within its view line's
    /// concatenated text.
    fn column_of(&self, caret: Caret, schema: &Schema) -> Option<usize> {
        let el = schema.element(caret.block)?;
        let (start, end) = schema.view_line_span(el.view_line())?;
        let mut column = 0;
        for candidate in &schema.elements()[start..end] {
            if candidate.id == caret.block {
                return Some(column + caret.offset.min(char_len(&candidate.content)));
            }
            column += char_len(&candidate.content);
        }
        None
    }
}

impl Renderer for MonospaceRenderer {
    fn has_caret_api(&self) -> bool {
        true
    }

    fn measure(&mut self, line: &ViewBlock) -> LineBox {
        let mut text = String::new();
        block_text(line, &mut text);
        LineBox {
            x: 0.0,
            width: char_len(&text) as f64 * self.char_width,
            height: self.line_height,
        }
    }

    fn caret_rect(&self, caret: Caret, schema: &Schema, rendered: &RenderedIndex) -> Option<Rect> {
        let line = schema.element(caret.block)?.view_line();
        let line_box = rendered.get(line)?;
        let column = self.column_of(caret, schema)?;
        Some(Rect::new(
            line_box.x + column as f64 * self.char_width,
            line_box.y,
            1.0,
            line_box.height,
        ))
    }

    fn caret_from_point(
        &self,
        point: Point,
        schema: &Schema,
        rendered: &RenderedIndex,
    ) -> Option<Caret> {
        let line_box = rendered.line_at_y(point.y)?;
        let (start, end) = schema.view_line_span(line_box.id)?;
        let line_len: usize = schema.elements()[start..end]
            .iter()
            .map(|el| char_len(&el.content))
            .sum();
        let raw = ((point.x - line_box.x) / self.char_width).round();
        let mut column = (raw.max(0.0) as usize).min(line_len);

        for el in &schema.elements()[start..end] {
            let len = char_len(&el.content);
            if column <= len {
                return Some(Caret::new(el.id, column));
            }
            column -= len;
        }
        // line is empty: caret at offset 0 of the line element
        Some(Caret::new(line_box.id, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ElementKind, Schema};
    use crate::view::{ViewBlock, project};
    use std::collections::HashMap;

    fn rendered_for(schema: &mut Schema) -> (RenderedIndex, Vec<ViewBlock>) {
        let mut blocks = Vec::new();
        let affected = schema.drain_affected();
        let diffs = project(schema.elements(), affected, &mut blocks).unwrap();
        let mut renderer = MonospaceRenderer::default();
        let mut measured = HashMap::new();
        for block in &blocks {
            measured.insert(block.id(), renderer.measure(block));
        }
        let mut rendered = RenderedIndex::new();
        rendered
            .patch(&diffs, &measured, &blocks, renderer.line_height)
            .unwrap();
        (rendered, blocks)
    }

    #[test]
    fn caret_rect_accounts_for_preceding_inline_content() {
        let mut schema = Schema::new();
        let line = schema.create_element(ElementKind::Paragraph, vec![], "ab");
        let line_id = schema.append(line);
        let strong = schema.create_element(ElementKind::Strong, vec![line_id], "cd");
        let strong_id = schema.append(strong);
        let (rendered, _) = rendered_for(&mut schema);

        let renderer = MonospaceRenderer::default();
        let rect = renderer
            .caret_rect(Caret::new(strong_id, 1), &schema, &rendered)
            .unwrap();
        // columns: a b c | d
        assert_eq!(rect.x, 3.0 * 8.0);
        assert_eq!(rect.height, 22.0);
    }

    #[test]
    fn caret_from_point_round_trips_and_clamps() {
        let mut schema = Schema::new();
        let a = schema.create_element(ElementKind::Paragraph, vec![], "hello");
        let a_id = schema.append(a);
        let b = schema.create_element(ElementKind::Paragraph, vec![], "hi");
        let b_id = schema.append(b);
        let (rendered, _) = rendered_for(&mut schema);

        let renderer = MonospaceRenderer::default();
        let caret = renderer
            .caret_from_point(Point::new(17.0, 11.0), &schema, &rendered)
            .unwrap();
        assert_eq!(caret, Caret::new(a_id, 2));

        // past the right edge of the second line clamps to its end
        let caret = renderer
            .caret_from_point(Point::new(500.0, 33.0), &schema, &rendered)
            .unwrap();
        assert_eq!(caret, Caret::new(b_id, 2));
    }
}
