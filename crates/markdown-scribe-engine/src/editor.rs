//! The editor: owns every subsystem and drives the per-edit pipeline
//! (command → schema mutation → history → projection → measurement →
//! rendered-index patch → range rectangles → events).

use std::collections::HashMap;

use markdown_scribe_config::{EditorOptions, ResolvedStyle};

use crate::command::{CommandArgs, CommandFn, CommandRegistry};
use crate::error::EditorError;
use crate::events::{EditorEvent, Emitter, EventHandler, EventKind, ScrollAction, ScrollChange, SubscriberId};
use crate::geometry::{Point, Rect};
use crate::history::EditorHistory;
use crate::input::{Modifiers, SelectKey};
use crate::render::{LineBox, RenderedIndex};
use crate::renderer::{Renderer, Scrollbar};
use crate::schema::{ElementId, ElementKind, Schema, Trace};
use crate::selection::{EditorSelection, ViewContext};
use crate::view::{ViewBlock, ViewLineBehavior, project};

pub const DEFAULT_SCROLLBAR_SIZE: f64 = 16.0;
pub const DEFAULT_PADDING_RIGHT: f64 = 16.0;

/// Mount-time configuration: the embedder options plus the container box the
/// editor lives in.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub options: EditorOptions,
    /// Viewport rectangle, viewport space.
    pub container: Rect,
    pub scrollbar_size: f64,
    pub padding_right: f64,
}

impl EditorConfig {
    pub fn new(options: EditorOptions, container: Rect) -> Self {
        Self {
            options,
            container,
            scrollbar_size: DEFAULT_SCROLLBAR_SIZE,
            padding_right: DEFAULT_PADDING_RIGHT,
        }
    }

    pub fn resolved_style(&self) -> ResolvedStyle {
        self.options
            .style
            .resolve(self.container.width, self.container.height)
    }
}

pub struct Editor {
    pub(crate) config: EditorConfig,
    pub(crate) style: ResolvedStyle,
    pub(crate) schema: Schema,
    pub(crate) view_blocks: Vec<ViewBlock>,
    pub(crate) rendered: RenderedIndex,
    pub(crate) selection: EditorSelection,
    pub(crate) history: EditorHistory,
    pub(crate) commands: CommandRegistry,
    pub(crate) emitter: Emitter,
    pub(crate) renderer: Box<dyn Renderer>,
    pub(crate) scrollbar: Box<dyn Scrollbar>,
}

fn view_context<'a>(
    schema: &'a Schema,
    rendered: &'a RenderedIndex,
    renderer: &'a dyn Renderer,
    scrollbar: &dyn Scrollbar,
    container: Rect,
) -> ViewContext<'a> {
    ViewContext {
        schema,
        rendered,
        renderer,
        scroll: scrollbar.offsets(),
        container,
    }
}

fn find_view_block(blocks: &[ViewBlock], id: ElementId) -> Option<&ViewBlock> {
    blocks.iter().find(|b| b.id() == id)
}

impl Editor {
    /// Mount an editor over the host collaborators. Fails up front when the
    /// renderer cannot resolve points to carets.
    pub fn new(
        config: EditorConfig,
        renderer: Box<dyn Renderer>,
        scrollbar: Box<dyn Scrollbar>,
    ) -> Result<Self, EditorError> {
        if !renderer.has_caret_api() {
            return Err(EditorError::Environment("caret-from-point"));
        }
        let style = config.resolved_style();
        let mut editor = Editor {
            config,
            style,
            schema: Schema::new(),
            view_blocks: Vec::new(),
            rendered: RenderedIndex::new(),
            selection: EditorSelection::new(),
            history: EditorHistory::default(),
            commands: CommandRegistry::with_builtins(),
            emitter: Emitter::new(),
            renderer,
            scrollbar,
        };
        editor.bootstrap();
        editor.sync()?;
        Ok(editor)
    }

    /// An empty document still needs somewhere to type: one empty paragraph
    /// and a collapsed range on it. Runs in replay mode so it is not
    /// undoable.
    fn bootstrap(&mut self) {
        if !self.schema.is_empty() {
            return;
        }
        let el = self.schema.create_element(ElementKind::Paragraph, vec![], "");
        let id = self.schema.append_in(Trace::Replay, el);
        self.selection.remove_all();
        self.selection.add_range(id, 0, id, 0);
    }

    /// Replace the whole document with parsed markdown. Resets history and
    /// selection; not undoable.
    pub fn load_source(&mut self, source: &str) -> Result<(), EditorError> {
        let items = crate::parsing::parse_source(&mut self.schema, source);
        let len = self.schema.len();
        self.schema.splice_in(Trace::Replay, 0, len, items);
        self.history = EditorHistory::default();
        self.selection.remove_all();
        if let Some(first) = self.schema.elements().first() {
            let id = first.id;
            self.selection.add_range(id, 0, id, 0);
        }
        self.bootstrap();
        self.sync()
    }

    // ---- accessors ----

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn selection(&self) -> &EditorSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut EditorSelection {
        &mut self.selection
    }

    pub fn view_blocks(&self) -> &[ViewBlock] {
        &self.view_blocks
    }

    pub fn rendered(&self) -> &RenderedIndex {
        &self.rendered
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn style(&self) -> &ResolvedStyle {
        &self.style
    }

    /// Whole document serialized back to markdown.
    pub fn value(&self) -> String {
        crate::parsing::serialize(self.schema.elements())
    }

    /// Concatenated text content of one view line.
    pub fn value_of(&self, line: ElementId) -> Option<String> {
        self.schema.view_line_text(line)
    }

    pub fn on(&mut self, kind: EventKind, handler: EventHandler) -> SubscriberId {
        self.emitter.on(kind, handler)
    }

    pub fn once(&mut self, kind: EventKind, handler: EventHandler) -> SubscriberId {
        self.emitter.once(kind, handler)
    }

    pub fn off(&mut self, id: SubscriberId) {
        self.emitter.off(id);
    }

    // ---- commands ----

    pub fn register_command(&mut self, name: &str, handler: CommandFn) -> Result<(), EditorError> {
        self.commands.register(name, handler)
    }

    pub fn execute_command(&mut self, name: &str, args: CommandArgs) -> Result<(), EditorError> {
        let handler = self.commands.get(name)?;
        log::debug!("command: {name}");

        // the pre-edit selection; by drain time the caret has moved
        let ranges_before = self.selection.snapshot();
        let current_before = self.selection.current_id();

        handler(self, args)?;

        let records = self.schema.drain_journal();
        self.history.record_with(records, ranges_before, current_before);
        self.sync()
    }

    pub fn insert_text(&mut self, text: &str) -> Result<(), EditorError> {
        self.execute_command("insert", CommandArgs::Text(text.to_string()))
    }

    pub fn delete_content(&mut self) -> Result<(), EditorError> {
        self.execute_command("delete", CommandArgs::None)
    }

    pub fn break_line(&mut self) -> Result<(), EditorError> {
        self.execute_command("break-line", CommandArgs::None)
    }

    pub fn undo(&mut self) -> Result<(), EditorError> {
        self.execute_command("undo", CommandArgs::None)
    }

    pub fn redo(&mut self) -> Result<(), EditorError> {
        self.execute_command("redo", CommandArgs::None)
    }

    /// Close the open history batch explicitly (end of an edit burst).
    pub fn flush_history(&mut self) {
        self.history.flush(&self.selection);
    }

    // ---- input ----

    pub fn pointer_down(&mut self, point: Point, modifiers: Modifiers) -> Result<(), EditorError> {
        let ctx = view_context(
            &self.schema,
            &self.rendered,
            self.renderer.as_ref(),
            self.scrollbar.as_ref(),
            self.config.container,
        );
        let scroll = self.selection.pointer_down(point, modifiers, &ctx)?;
        if let Some(change) = scroll {
            self.apply_scroll(change);
        }
        self.sync()
    }

    pub fn pointer_move(&mut self, point: Point) -> Result<(), EditorError> {
        let ctx = view_context(
            &self.schema,
            &self.rendered,
            self.renderer.as_ref(),
            self.scrollbar.as_ref(),
            self.config.container,
        );
        let scroll = self.selection.pointer_move(point, &ctx)?;
        if let Some(change) = scroll {
            self.apply_scroll(change);
        }
        self.sync()
    }

    pub fn pointer_up(&mut self, point: Point) -> Result<(), EditorError> {
        let ctx = view_context(
            &self.schema,
            &self.rendered,
            self.renderer.as_ref(),
            self.scrollbar.as_ref(),
            self.config.container,
        );
        let scroll = self.selection.pointer_up(point, &ctx)?;
        if let Some(change) = scroll {
            self.apply_scroll(change);
        }
        self.sync()
    }

    pub fn keyboard_select(&mut self, key: SelectKey, modifiers: Modifiers) -> Result<(), EditorError> {
        let ctx = view_context(
            &self.schema,
            &self.rendered,
            self.renderer.as_ref(),
            self.scrollbar.as_ref(),
            self.config.container,
        );
        let scroll = self.selection.keyboard_select(key, modifiers, &ctx)?;
        if let Some(change) = scroll {
            self.apply_scroll(change);
        }
        self.sync()
    }

    fn apply_scroll(&mut self, change: ScrollChange) {
        match change.action {
            ScrollAction::ScrollBy => self.scrollbar.scroll_by(change.x, change.y),
            ScrollAction::Scroll => self.scrollbar.scroll(Some(change.x), Some(change.y)),
        }
        self.emitter.emit(&EditorEvent::ScrollbarChange(change));
    }

    // ---- pipeline ----

    /// Flush pending schema changes through projection, measurement and the
    /// rendered index, then recompute selection rectangles and notify.
    pub fn sync(&mut self) -> Result<(), EditorError> {
        // journal entries not routed through a command (none in the normal
        // flow) still reach history with the live selection as pre-state
        let records = self.schema.drain_journal();
        self.history.record(records, &self.selection);

        if self.schema.has_pending_changes() {
            let affected = self.schema.drain_affected();
            let diffs = project(self.schema.elements(), affected, &mut self.view_blocks)?;

            let mut measured: HashMap<ElementId, LineBox> = HashMap::new();
            for diff in &diffs {
                if matches!(diff.behavior, ViewLineBehavior::Delete) {
                    continue;
                }
                let block = find_view_block(&self.view_blocks, diff.id)
                    .ok_or_else(|| EditorError::structural(diff.id))?;
                measured.insert(diff.id, self.renderer.measure(block));
            }
            self.rendered
                .patch(&diffs, &measured, &self.view_blocks, self.style.line_height)?;

            self.emitter.emit(&EditorEvent::SchemaChange);
            self.emitter.emit(&EditorEvent::BlocksChange);
            self.emitter.emit(&EditorEvent::Render { affected: diffs });
        }

        let ctx = view_context(
            &self.schema,
            &self.rendered,
            self.renderer.as_ref(),
            self.scrollbar.as_ref(),
            self.config.container,
        );
        self.selection.refresh_rectangles(&ctx)?;
        let ranges = self.selection.snapshot();
        self.emitter.emit(&EditorEvent::SelectionChange { ranges });
        Ok(())
    }
}
