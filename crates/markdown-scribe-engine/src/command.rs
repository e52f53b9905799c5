//! Command layer: the single entry point for document mutation.
//!
//! Commands are plain functions over the editor. The registry maps names to
//! function pointers; registering a taken name or executing an unknown one is
//! a programmer error, not a recoverable condition.

use std::collections::HashMap;

use crate::editor::Editor;
use crate::error::EditorError;
use crate::schema::{ElementId, ElementKind};
use crate::selection::collapse_range;
use crate::text::{char_len, insert_at_char, remove_char_before, split_at_char};

#[derive(Debug, Clone, PartialEq)]
pub enum CommandArgs {
    None,
    Text(String),
}

impl CommandArgs {
    fn text(&self) -> &str {
        match self {
            CommandArgs::Text(text) => text,
            CommandArgs::None => "",
        }
    }
}

/// Function pointers keep the registry `Copy`-cheap and let a handler take
/// the whole editor mutably without aliasing the registry itself.
pub type CommandFn = fn(&mut Editor, CommandArgs) -> Result<(), EditorError>;

pub struct CommandRegistry {
    handlers: HashMap<String, CommandFn>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in editing commands.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, handler) in [
            ("insert", insert_command as CommandFn),
            ("delete", delete_content_command as CommandFn),
            ("break-line", break_line_command as CommandFn),
            ("undo", undo_command as CommandFn),
            ("redo", redo_command as CommandFn),
        ] {
            registry
                .register(name, handler)
                .unwrap_or_else(|_| unreachable!("builtin {name} registered twice"));
        }
        registry
    }

    pub fn register(&mut self, name: &str, handler: CommandFn) -> Result<(), EditorError> {
        if self.handlers.contains_key(name) {
            return Err(EditorError::CommandExists(name.to_string()));
        }
        self.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<CommandFn, EditorError> {
        self.handlers
            .get(name)
            .copied()
            .ok_or_else(|| EditorError::CommandNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Delete-then-insert: collapse every extended range, splice the text into
/// each range's anchor element and advance its caret. Other carets sitting
/// on the same element at or past the insertion point shift along.
pub fn insert_command(editor: &mut Editor, args: CommandArgs) -> Result<(), EditorError> {
    let text = args.text().to_string();
    if text.is_empty() {
        return Ok(());
    }
    let advance = char_len(&text);

    let Editor {
        schema, selection, ..
    } = editor;
    for i in 0..selection.ranges_mut().len() {
        let (block, at) = {
            let ranges = selection.ranges_mut();
            collapse_range(&mut ranges[i], schema)?;
            (ranges[i].anchor_block, ranges[i].anchor_offset)
        };

        let mut changed = schema.require(block)?.clone();
        changed.content = insert_at_char(&changed.content, at, &text);
        schema.replace(changed, block)?;

        let ranges = selection.ranges_mut();
        ranges[i].set_ends(block, at + advance);
        for (j, other) in ranges.iter_mut().enumerate() {
            if j == i {
                continue;
            }
            if other.anchor_block == block && other.anchor_offset >= at {
                other.anchor_offset += advance;
            }
            if other.focus_block == block && other.focus_offset >= at {
                other.focus_offset += advance;
            }
        }
    }
    Ok(())
}

/// Backspace semantics: collapse an extended range, else remove the
/// preceding character, else merge the element into its predecessor.
/// Silently does nothing at the very start of the document.
pub fn delete_content_command(editor: &mut Editor, _args: CommandArgs) -> Result<(), EditorError> {
    let Editor {
        schema, selection, ..
    } = editor;
    for range in selection.ranges_mut() {
        if !range.is_collapsed() {
            collapse_range(range, schema)?;
            continue;
        }

        if range.anchor_offset > 0 {
            let mut changed = schema.require(range.anchor_block)?.clone();
            changed.content = remove_char_before(&changed.content, range.anchor_offset);
            schema.replace(changed, range.anchor_block)?;
            range.set_ends(range.anchor_block, range.anchor_offset - 1);
            continue;
        }

        let idx = schema
            .index_of(range.anchor_block)
            .ok_or_else(|| EditorError::structural(range.anchor_block))?;
        if idx == 0 {
            // document start: nothing to the left
            continue;
        }

        let cur = schema.require(range.anchor_block)?.clone();
        let prev = schema.elements()[idx - 1].clone();
        let prev_len = char_len(&prev.content);
        let cur_line = cur.view_line();
        let prev_line = prev.view_line();

        let mut merged = prev.clone();
        merged.content.push_str(&cur.content);
        schema.replace(merged, prev.id)?;

        // descendants and line-mates of the dropped element re-chain onto
        // the survivor
        let follower_ids: Vec<ElementId> = schema.elements()[idx + 1..]
            .iter()
            .take_while(|el| el.view_line() == cur_line)
            .map(|el| el.id)
            .collect();
        for fid in follower_ids {
            let mut el = schema.require(fid)?.clone();
            el.group_ids = el
                .group_ids
                .iter()
                .map(|gid| {
                    if *gid == cur_line {
                        prev_line
                    } else if *gid == cur.id {
                        prev.id
                    } else {
                        *gid
                    }
                })
                .collect();
            schema.replace(el, fid)?;
        }

        schema.splice(idx, 1, vec![]);
        range.set_ends(prev.id, prev_len);
    }
    Ok(())
}

/// Split the current range's block at the caret.
///
/// At the end of the block a plain empty paragraph follows. Anywhere else
/// the caret element's ancestor chain is cloned root-down with fresh ids and
/// the tail content plus every following line-mate moves under the clones;
/// the caret lands at offset 0 of the new leaf.
pub fn break_line_command(editor: &mut Editor, _args: CommandArgs) -> Result<(), EditorError> {
    let Editor {
        schema, selection, ..
    } = editor;
    let Some(range) = selection.current_range_mut() else {
        return Ok(());
    };
    collapse_range(range, schema)?;

    let caret_el = schema.require(range.anchor_block)?.clone();
    let offset = range.anchor_offset;
    let line = caret_el.view_line();
    let (_, line_end) = schema
        .view_line_span(line)
        .ok_or_else(|| EditorError::structural(line))?;
    let el_idx = schema
        .index_of(caret_el.id)
        .ok_or_else(|| EditorError::structural(caret_el.id))?;

    let at_content_end = offset >= char_len(&caret_el.content);
    if at_content_end && el_idx + 1 == line_end {
        // nothing to carry over: a fresh empty paragraph follows the line
        let block = schema.create_element(ElementKind::Paragraph, vec![], "");
        let block_id = block.id;
        let last_of_line = schema.elements()[line_end - 1].id;
        schema.append_after(block, last_of_line)?;
        range.set_ends(block_id, 0);
        return Ok(());
    }

    let (head, tail) = split_at_char(&caret_el.content, offset);

    // clone the ancestor chain root-down, remapping ids level by level
    let mut remap: HashMap<ElementId, ElementId> = HashMap::new();
    let mut items = Vec::new();
    for gid in &caret_el.group_ids {
        let ancestor = schema.require(*gid)?.clone();
        let chain: Vec<ElementId> = ancestor
            .group_ids
            .iter()
            .map(|g| remap.get(g).copied().unwrap_or(*g))
            .collect();
        let clone = schema.create_element(ancestor.kind.clone(), chain, "");
        remap.insert(ancestor.id, clone.id);
        items.push(clone);
    }

    let leaf_chain: Vec<ElementId> = caret_el
        .group_ids
        .iter()
        .map(|g| remap.get(g).copied().unwrap_or(*g))
        .collect();
    let leaf = schema.create_element(caret_el.kind.clone(), leaf_chain, tail);
    let leaf_id = leaf.id;
    remap.insert(caret_el.id, leaf_id);
    items.push(leaf);

    let mut changed = caret_el.clone();
    changed.content = head;
    schema.replace(changed, caret_el.id)?;

    // line-mates after the caret element migrate under the cloned chain
    let mut moved = Vec::new();
    for el in &schema.elements()[el_idx + 1..line_end] {
        let mut el = el.clone();
        el.group_ids = el
            .group_ids
            .iter()
            .map(|g| remap.get(g).copied().unwrap_or(*g))
            .collect();
        moved.push(el);
    }
    items.extend(moved);

    schema.splice(el_idx + 1, line_end - (el_idx + 1), items);
    range.set_ends(leaf_id, 0);
    Ok(())
}

pub fn undo_command(editor: &mut Editor, _args: CommandArgs) -> Result<(), EditorError> {
    let Editor {
        schema,
        selection,
        history,
        ..
    } = editor;
    history.undo(schema, selection);
    Ok(())
}

pub fn redo_command(editor: &mut Editor, _args: CommandArgs) -> Result<(), EditorError> {
    let Editor {
        schema,
        selection,
        history,
        ..
    } = editor;
    history.redo(schema, selection);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_a_taken_name_fails() {
        let mut registry = CommandRegistry::with_builtins();
        let result = registry.register("insert", insert_command);
        assert!(matches!(result, Err(EditorError::CommandExists(_))));
    }

    #[test]
    fn unknown_command_lookup_fails() {
        let registry = CommandRegistry::with_builtins();
        assert!(matches!(
            registry.get("transmogrify"),
            Err(EditorError::CommandNotFound(_))
        ));
        assert!(registry.contains("break-line"));
    }
}
