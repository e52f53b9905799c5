//! View projector: derives the nested block tree from the flat sequence.
//!
//! Projection is incremental. It consumes the affected-element diff set
//! produced by the schema store, patches the existing tree in place, and
//! reports exactly the view lines whose rendering is stale, never the whole
//! tree.

use std::collections::HashSet;

use crate::error::EditorError;
use crate::schema::{AffectedBehavior, AffectedElement, ElementId, SchemaElement};

/// Nested projection of one element: the element plus its projected children.
/// Derived data; never hand-edited.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewBlock {
    pub element: SchemaElement,
    pub children: Vec<ViewBlock>,
}

impl ViewBlock {
    fn leaf(element: SchemaElement) -> Self {
        ViewBlock {
            element,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.element.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewLineBehavior {
    /// New view line; `anchor` is the preceding view line, if any.
    Add { anchor: Option<ElementId> },
    Change,
    Delete,
}

/// One view line needing DOM re-render.
#[derive(Debug, Clone, PartialEq)]
pub struct AffectedViewLine {
    pub id: ElementId,
    pub behavior: ViewLineBehavior,
}

/// Walk a `group_ids` chain down the projected tree and return the child
/// list the chain ends in. An unresolvable link means the schema and the
/// projection disagree, which is fatal.
fn chain_children<'a>(
    blocks: &'a mut Vec<ViewBlock>,
    chain: &[ElementId],
) -> Result<&'a mut Vec<ViewBlock>, EditorError> {
    let mut current = blocks;
    for gid in chain {
        let pos = current
            .iter()
            .position(|b| b.id() == *gid)
            .ok_or_else(|| EditorError::structural(*gid))?;
        current = &mut current[pos].children;
    }
    Ok(current)
}

fn find_block(blocks: &[ViewBlock], id: ElementId) -> Option<usize> {
    blocks.iter().position(|b| b.id() == id)
}

/// Apply the pending diff set to `view_blocks` and report stale view lines.
pub fn project(
    elements: &[SchemaElement],
    affected: Vec<AffectedElement>,
    view_blocks: &mut Vec<ViewBlock>,
) -> Result<Vec<AffectedViewLine>, EditorError> {
    let mut lines: Vec<AffectedViewLine> = Vec::new();
    let mut deleted: HashSet<ElementId> = HashSet::new();

    let mut push_line = |lines: &mut Vec<AffectedViewLine>, line: AffectedViewLine| {
        if !lines.contains(&line) {
            lines.push(line);
        }
    };

    for diff in affected {
        match diff.behavior {
            AffectedBehavior::Delete => {
                let chain = diff.group_ids.unwrap_or_default();
                let parent = chain_children(view_blocks, &chain)?;
                if let Some(pos) = find_block(parent, diff.id) {
                    parent.remove(pos);
                }
                if let Some(line) = chain.first() {
                    push_line(
                        &mut lines,
                        AffectedViewLine {
                            id: *line,
                            behavior: ViewLineBehavior::Change,
                        },
                    );
                } else {
                    deleted.insert(diff.id);
                    push_line(
                        &mut lines,
                        AffectedViewLine {
                            id: diff.id,
                            behavior: ViewLineBehavior::Delete,
                        },
                    );
                }
            }
            AffectedBehavior::Change => {
                let Some(idx) = elements.iter().position(|el| el.id == diff.id) else {
                    continue;
                };
                let element = &elements[idx];
                let parent = chain_children(view_blocks, &element.group_ids)?;
                match find_block(parent, element.id) {
                    Some(pos) => {
                        let children = std::mem::take(&mut parent[pos].children);
                        parent[pos] = ViewBlock {
                            element: element.clone(),
                            children,
                        };
                    }
                    None => parent.insert(0, ViewBlock::leaf(element.clone())),
                }
                push_line(
                    &mut lines,
                    AffectedViewLine {
                        id: element.view_line(),
                        behavior: ViewLineBehavior::Change,
                    },
                );
            }
            AffectedBehavior::Add => {
                let Some(idx) = elements.iter().position(|el| el.id == diff.id) else {
                    continue;
                };
                let element = &elements[idx];

                if element.is_view_line() {
                    // place after the view line owning the logical predecessor
                    let anchor = diff
                        .prev_index
                        .and_then(|p| elements.get(p))
                        .map(|prev| prev.view_line());
                    let pos = anchor
                        .and_then(|a| find_block(view_blocks, a))
                        .map(|p| p + 1)
                        .unwrap_or(if anchor.is_none() { 0 } else { view_blocks.len() });
                    view_blocks.insert(pos, ViewBlock::leaf(element.clone()));
                    push_line(
                        &mut lines,
                        AffectedViewLine {
                            id: element.id,
                            behavior: ViewLineBehavior::Add { anchor },
                        },
                    );
                } else {
                    let parent = chain_children(view_blocks, &element.group_ids)?;
                    let prev_pos = diff
                        .prev_index
                        .and_then(|p| elements.get(p))
                        .and_then(|prev| find_block(parent, prev.id));
                    match prev_pos {
                        Some(p) => parent.insert(p + 1, ViewBlock::leaf(element.clone())),
                        // predecessor lives in another block: append
                        None => parent.push(ViewBlock::leaf(element.clone())),
                    }
                    push_line(
                        &mut lines,
                        AffectedViewLine {
                            id: element.group_ids[0],
                            behavior: ViewLineBehavior::Change,
                        },
                    );
                }
            }
        }
    }

    // deletion wins over a later "changed" entry for the same line
    lines.retain(|line| {
        matches!(line.behavior, ViewLineBehavior::Delete) || !deleted.contains(&line.id)
    });

    Ok(lines)
}
