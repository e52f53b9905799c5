pub mod command;
pub mod editor;
pub mod error;
pub mod events;
pub mod geometry;
pub mod history;
pub mod input;
pub mod parsing;
pub mod render;
pub mod renderer;
pub mod schema;
pub mod selection;
mod text;
pub mod view;

// Re-export key types for easier usage
pub use command::{CommandArgs, CommandFn, CommandRegistry};
pub use editor::{Editor, EditorConfig};
pub use error::EditorError;
pub use events::{EditorEvent, Emitter, EventKind, ScrollAction, ScrollChange};
pub use geometry::{Point, Rect};
pub use history::{EditorHistory, HistoryRecord, RangeSnapshot};
pub use input::{InputThrottle, Modifiers, SelectKey};
pub use render::{LineBox, RenderedElement, RenderedIndex};
pub use renderer::{Caret, MonospaceRenderer, Renderer, Scrollbar, SimpleScrollbar};
pub use schema::{ElementId, ElementKind, Schema, SchemaElement, Trace};
pub use selection::{
    EditorSelection, EditorSelectionRange, NavIntent, PhysicalRange, RangeId, ViewContext,
};
pub use view::{AffectedViewLine, ViewBlock, ViewLineBehavior};
