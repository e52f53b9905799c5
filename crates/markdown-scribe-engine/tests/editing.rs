//! End-to-end editing flows through the public editor surface, driven with
//! the deterministic monospace renderer (8 px per character, 22 px lines).

use std::cell::RefCell;
use std::rc::Rc;

use markdown_scribe_config::EditorOptions;
use markdown_scribe_engine::{
    Editor, EditorConfig, ElementKind, EventKind, Modifiers, MonospaceRenderer, Point, Rect,
    SelectKey, SimpleScrollbar,
};
use pretty_assertions::assert_eq;

fn editor_with(source: &str) -> Editor {
    let config = EditorConfig::new(EditorOptions::default(), Rect::new(0.0, 0.0, 400.0, 300.0));
    let mut editor = Editor::new(
        config,
        Box::new(MonospaceRenderer::default()),
        Box::new(SimpleScrollbar::new()),
    )
    .expect("mount");
    if !source.is_empty() {
        editor.load_source(source).expect("load");
    }
    editor
}

fn point_at(col: usize, line: usize) -> Point {
    Point::new(col as f64 * 8.0, line as f64 * 22.0 + 11.0)
}

fn click(editor: &mut Editor, col: usize, line: usize) {
    let point = point_at(col, line);
    editor.pointer_down(point, Modifiers::NONE).unwrap();
    editor.pointer_up(point).unwrap();
}

fn caret(editor: &Editor) -> (markdown_scribe_engine::ElementId, usize) {
    let range = editor.selection().current_range().expect("current range");
    assert!(range.is_collapsed(), "caret expected, got extended range");
    (range.anchor_block, range.anchor_offset)
}

#[test]
fn empty_document_bootstraps_one_paragraph() {
    let mut editor = editor_with("");

    assert_eq!(editor.schema().len(), 1);
    let el = &editor.schema().elements()[0];
    assert_eq!(el.kind, ElementKind::Paragraph);
    assert_eq!(el.content, "");
    assert!(editor.selection().current_range().unwrap().is_collapsed());

    // the bootstrap block is not an undoable edit
    editor.undo().unwrap();
    assert_eq!(editor.schema().len(), 1);
}

#[test]
fn insert_splices_text_and_advances_caret() {
    let mut editor = editor_with("ab");
    let id = editor.schema().elements()[0].id;

    click(&mut editor, 1, 0);
    assert_eq!(caret(&editor), (id, 1));

    editor.insert_text("X").unwrap();

    assert_eq!(editor.schema().elements()[0].content, "aXb");
    assert_eq!(caret(&editor), (id, 2));
}

#[test]
fn undo_redo_round_trips_content_and_caret() {
    let mut editor = editor_with("ab");
    let id = editor.schema().elements()[0].id;
    click(&mut editor, 1, 0);

    editor.insert_text("X").unwrap();
    editor.undo().unwrap();
    assert_eq!(editor.schema().elements()[0].content, "ab");
    assert_eq!(caret(&editor), (id, 1));

    editor.redo().unwrap();
    assert_eq!(editor.schema().elements()[0].content, "aXb");
    assert_eq!(caret(&editor), (id, 2));
}

#[test]
fn delete_at_document_start_is_a_noop() {
    let mut editor = editor_with("ab");
    click(&mut editor, 0, 0);

    editor.delete_content().unwrap();

    assert_eq!(editor.schema().len(), 1);
    assert_eq!(editor.schema().elements()[0].content, "ab");
    assert_eq!(caret(&editor).1, 0);
}

#[test]
fn delete_at_line_start_merges_with_previous_line() {
    let mut editor = editor_with("ab\n\ncd");
    let first = editor.schema().elements()[0].id;
    click(&mut editor, 0, 1);

    editor.delete_content().unwrap();

    assert_eq!(editor.schema().len(), 1);
    assert_eq!(editor.schema().elements()[0].content, "abcd");
    assert_eq!(caret(&editor), (first, 2));
    assert_eq!(editor.rendered().items().len(), 1);
    editor.rendered().check_invariants().unwrap();
}

#[test]
fn break_line_at_end_of_document_appends_one_empty_block() {
    let mut editor = editor_with("ab");
    click(&mut editor, 2, 0);

    editor.break_line().unwrap();

    assert_eq!(editor.schema().len(), 2);
    let second = &editor.schema().elements()[1];
    assert_eq!(second.kind, ElementKind::Paragraph);
    assert_eq!(second.content, "");
    assert!(second.is_view_line());
    assert_eq!(caret(&editor), (second.id, 0));
    assert_eq!(editor.rendered().items().len(), 2);
}

#[test]
fn break_line_clones_the_formatting_ancestry() {
    // paragraph > emphasis > strong, caret inside the strong leaf
    let mut editor = editor_with("***hello***");
    let (p, em, strong) = {
        let els = editor.schema().elements();
        (els[0].id, els[1].id, els[2].id)
    };
    click(&mut editor, 2, 0);
    assert_eq!(caret(&editor), (strong, 2));

    editor.break_line().unwrap();

    let els = editor.schema().elements();
    assert_eq!(els.len(), 6);
    assert_eq!(editor.schema().element(strong).unwrap().content, "he");

    let new_p = &els[3];
    let new_em = &els[4];
    let new_leaf = &els[5];
    assert_eq!(new_p.kind, ElementKind::Paragraph);
    assert!(new_p.is_view_line());
    assert_ne!(new_p.id, p);
    assert_eq!(new_em.kind, ElementKind::Emphasis);
    assert_ne!(new_em.id, em);
    assert_eq!(new_em.group_ids, vec![new_p.id]);
    assert_eq!(new_leaf.kind, ElementKind::Strong);
    assert_eq!(new_leaf.content, "llo");
    assert_eq!(new_leaf.group_ids, vec![new_p.id, new_em.id]);

    assert_eq!(caret(&editor), (new_leaf.id, 0));
    editor.schema().check_ancestor_contiguity().unwrap();
    assert_eq!(editor.value(), "***he***\n\n***llo***");
}

#[test]
fn collapsing_a_cross_line_selection_then_undoing_restores_both_lines() {
    let mut editor = editor_with("ab\n\ncd");
    click(&mut editor, 1, 0);
    // shift-click extends the current range onto the second line
    editor
        .pointer_down(point_at(1, 1), Modifiers::shift())
        .unwrap();
    editor.pointer_up(point_at(1, 1)).unwrap();

    editor.delete_content().unwrap();
    assert_eq!(editor.schema().len(), 1);
    assert_eq!(editor.schema().elements()[0].content, "ad");
    assert_eq!(caret(&editor).1, 1);

    editor.undo().unwrap();
    let contents: Vec<&str> = editor
        .schema()
        .elements()
        .iter()
        .map(|e| e.content.as_str())
        .collect();
    assert_eq!(contents, vec!["ab", "cd"]);
    editor.schema().check_ancestor_contiguity().unwrap();
    assert_eq!(editor.rendered().items().len(), 2);
    editor.rendered().check_invariants().unwrap();
}

#[test]
fn alt_click_gives_independent_carets_that_all_insert() {
    let mut editor = editor_with("ab\n\ncd");
    click(&mut editor, 1, 0);
    editor.pointer_down(point_at(1, 1), Modifiers::alt()).unwrap();
    editor.pointer_up(point_at(1, 1)).unwrap();
    assert_eq!(editor.selection().ranges().len(), 2);

    editor.insert_text("X").unwrap();

    assert_eq!(editor.schema().elements()[0].content, "aXb");
    assert_eq!(editor.schema().elements()[1].content, "cXd");
}

#[test]
fn carets_on_one_element_shift_past_earlier_insertions() {
    let mut editor = editor_with("abcd");
    let id = editor.schema().elements()[0].id;
    click(&mut editor, 1, 0);
    editor.pointer_down(point_at(3, 0), Modifiers::alt()).unwrap();
    editor.pointer_up(point_at(3, 0)).unwrap();
    assert_eq!(editor.selection().ranges().len(), 2);

    editor.insert_text("X").unwrap();

    assert_eq!(editor.schema().elements()[0].content, "aXbcXd");
    let offsets: Vec<usize> = editor
        .selection()
        .ranges()
        .iter()
        .map(|r| {
            assert_eq!(r.anchor_block, id);
            r.anchor_offset
        })
        .collect();
    assert_eq!(offsets, vec![2, 5]);
}

#[test]
fn select_all_then_value_of_line() {
    let mut editor = editor_with("ab\n\ncd");
    let (first, last) = {
        let els = editor.schema().elements();
        (els[0].id, els[1].id)
    };

    editor
        .keyboard_select(SelectKey::SelectAll, Modifiers::NONE)
        .unwrap();
    let range = editor.selection().current_range().unwrap();
    assert_eq!(range.anchor_block, first);
    assert_eq!(range.anchor_offset, 0);
    assert_eq!(range.focus_block, last);
    assert_eq!(range.focus_offset, 2);

    assert_eq!(editor.value_of(first).as_deref(), Some("ab"));
}

#[test]
fn separate_edit_bursts_undo_independently() {
    let mut editor = editor_with("ab");
    click(&mut editor, 2, 0);

    editor.insert_text("1").unwrap();
    editor.flush_history();
    editor.insert_text("2").unwrap();

    editor.undo().unwrap();
    assert_eq!(editor.schema().elements()[0].content, "ab1");
    editor.undo().unwrap();
    assert_eq!(editor.schema().elements()[0].content, "ab");
}

#[test]
fn mutations_announce_themselves_on_the_bus() {
    let mut editor = editor_with("ab");
    let schema_hits = Rc::new(RefCell::new(0));
    let render_hits = Rc::new(RefCell::new(0));

    let h = schema_hits.clone();
    editor.on(EventKind::SchemaChange, Box::new(move |_| *h.borrow_mut() += 1));
    let h = render_hits.clone();
    editor.on(EventKind::Render, Box::new(move |_| *h.borrow_mut() += 1));

    click(&mut editor, 1, 0);
    editor.insert_text("X").unwrap();

    assert!(*schema_hits.borrow() >= 1);
    assert!(*render_hits.borrow() >= 1);
}

#[test]
fn loaded_markdown_serializes_back_unchanged() {
    let source = "# Title\n\nHello **bold** tail\n\n> quoted";
    let mut editor = editor_with("");
    editor.load_source(source).unwrap();
    assert_eq!(editor.value(), source);
}
