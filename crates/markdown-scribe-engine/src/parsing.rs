//! Markdown adapter: builds the flat element sequence from source text and
//! serializes it back.
//!
//! The grammar itself is `pulldown-cmark`'s; this module only flattens its
//! event stream into elements with `group_ids` ancestor chains. Constructs
//! the editor has no kind for (links, images, lists) degrade to plain text.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::schema::{ElementId, ElementKind, Schema, SchemaElement};

fn chain_of(built: &[SchemaElement], stack: &[usize]) -> Vec<ElementId> {
    stack.iter().map(|&i| built[i].id).collect()
}

fn open(schema: &mut Schema, built: &mut Vec<SchemaElement>, stack: &mut Vec<usize>, kind: ElementKind) {
    let chain = chain_of(built, stack);
    built.push(schema.create_element(kind, chain, ""));
    stack.push(built.len() - 1);
}

fn push_text(
    schema: &mut Schema,
    built: &mut Vec<SchemaElement>,
    stack: &[usize],
    kind: ElementKind,
    text: &str,
) {
    let Some(&top) = stack.last() else {
        // text outside any block is dropped
        return;
    };
    // first text inside a fresh container becomes its own content
    if kind == ElementKind::Text && top == built.len() - 1 && built[top].content.is_empty() {
        built[top].content.push_str(text);
        return;
    }
    let chain = chain_of(built, stack);
    built.push(schema.create_element(kind, chain, text));
}

/// Parse markdown source into a flat element sequence. Elements are created
/// through the schema factory (fresh ids and versions) but not inserted.
pub fn parse_source(schema: &mut Schema, source: &str) -> Vec<SchemaElement> {
    let mut built: Vec<SchemaElement> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for event in Parser::new(source) {
        match event {
            Event::Start(Tag::Paragraph) => {
                open(schema, &mut built, &mut stack, ElementKind::Paragraph);
            }
            Event::Start(Tag::Heading { level, .. }) => {
                open(
                    schema,
                    &mut built,
                    &mut stack,
                    ElementKind::Heading { level: level as u8 },
                );
            }
            Event::Start(Tag::BlockQuote(_)) => {
                open(schema, &mut built, &mut stack, ElementKind::Blockquote);
            }
            Event::Start(Tag::CodeBlock(_)) => {
                open(schema, &mut built, &mut stack, ElementKind::CodeFence);
            }
            Event::Start(Tag::Strong) => {
                open(schema, &mut built, &mut stack, ElementKind::Strong);
            }
            Event::Start(Tag::Emphasis) => {
                open(schema, &mut built, &mut stack, ElementKind::Emphasis);
            }
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::BlockQuote(_)
                | TagEnd::CodeBlock
                | TagEnd::Strong
                | TagEnd::Emphasis,
            ) => {
                stack.pop();
            }
            Event::Text(text) => {
                push_text(schema, &mut built, &stack, ElementKind::Text, &text);
            }
            Event::Code(code) => {
                push_text(schema, &mut built, &stack, ElementKind::CodeSpan, &code);
            }
            Event::SoftBreak | Event::HardBreak => {
                push_text(schema, &mut built, &stack, ElementKind::Text, "\n");
            }
            _ => {}
        }
    }
    built
}

fn inline_markers(kind: &ElementKind) -> (&'static str, &'static str) {
    match kind {
        ElementKind::Strong => ("**", "**"),
        ElementKind::Emphasis => ("*", "*"),
        ElementKind::CodeSpan => ("`", "`"),
        _ => ("", ""),
    }
}

fn render_inline(span: &[SchemaElement], el: &SchemaElement, out: &mut String) {
    let (before, after) = inline_markers(&el.kind);
    out.push_str(before);
    out.push_str(&el.content);
    for child in span.iter().filter(|c| c.group_ids.last() == Some(&el.id)) {
        render_inline(span, child, out);
    }
    out.push_str(after);
}

fn render_line(span: &[SchemaElement]) -> String {
    let root = &span[0];
    let mut body = root.content.clone();
    for child in span.iter().filter(|c| c.group_ids.last() == Some(&root.id)) {
        render_inline(span, child, &mut body);
    }
    match &root.kind {
        ElementKind::Heading { level } => {
            format!("{} {body}", "#".repeat(usize::from(*level)))
        }
        ElementKind::Blockquote => body
            .lines()
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
        ElementKind::CodeFence => {
            let mut code = body;
            if !code.ends_with('\n') {
                code.push('\n');
            }
            format!("```\n{code}```")
        }
        _ => body,
    }
}

/// Serialize the flat element sequence back to markdown, one blank line
/// between view lines.
pub fn serialize(elements: &[SchemaElement]) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < elements.len() {
        let line = &elements[i];
        let mut end = i + 1;
        while end < elements.len() && elements[end].group_ids.first() == Some(&line.id) {
            end += 1;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&render_line(&elements[i..end]));
        i = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loaded(source: &str) -> (Schema, Vec<SchemaElement>) {
        let mut schema = Schema::new();
        let items = parse_source(&mut schema, source);
        for item in items.clone() {
            schema.append(item);
        }
        (schema, items)
    }

    #[test]
    fn parse_builds_root_first_chains() {
        let (schema, items) = loaded("# Title\n\nHello **bold** tail");

        assert_eq!(items.len(), 4);
        assert_eq!(items[0].kind, ElementKind::Heading { level: 1 });
        assert_eq!(items[0].content, "Title");

        let p = &items[1];
        assert_eq!(p.kind, ElementKind::Paragraph);
        assert_eq!(p.content, "Hello ");

        let strong = &items[2];
        assert_eq!(strong.kind, ElementKind::Strong);
        assert_eq!(strong.content, "bold");
        assert_eq!(strong.group_ids, vec![p.id]);

        let tail = &items[3];
        assert_eq!(tail.kind, ElementKind::Text);
        assert_eq!(tail.content, " tail");
        assert_eq!(tail.group_ids, vec![p.id]);

        schema.check_ancestor_contiguity().unwrap();
    }

    #[test]
    fn nested_emphasis_extends_the_chain() {
        let (schema, items) = loaded("***hello***");

        // paragraph > emphasis > strong (pulldown nests *** this way)
        assert_eq!(items.len(), 3);
        let leaf = &items[2];
        assert_eq!(leaf.content, "hello");
        assert_eq!(leaf.group_ids, vec![items[0].id, items[1].id]);
        schema.check_ancestor_contiguity().unwrap();
    }

    #[test]
    fn serialize_round_trips_common_markdown() {
        for source in [
            "# Title\n\nHello **bold** tail",
            "plain paragraph",
            "a *b* `c`",
            "> quoted",
        ] {
            let (schema, _) = loaded(source);
            assert_eq!(serialize(schema.elements()), source, "source: {source}");
        }
    }

    #[test]
    fn code_fence_keeps_its_body_verbatim() {
        let (schema, items) = loaded("```\nlet x = 1;\n```");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, ElementKind::CodeFence);
        assert_eq!(items[0].content, "let x = 1;\n");
        assert_eq!(serialize(schema.elements()), "```\nlet x = 1;\n```");
    }
}
