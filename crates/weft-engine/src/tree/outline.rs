use crate::models::{Character, MarkSet, Node};

/// Render a tree as an indented outline, one node per line.
///
/// Keys are left out so that outlines of trees with generated keys are
/// stable enough to snapshot:
///
/// ```text
/// document
///   block "paragraph"
///     text "hello " [bold]
///     inline "link" void
/// ```
pub fn format_tree(node: &Node) -> String {
    let mut lines = Vec::new();
    format_node(&mut lines, node, 0);
    lines.join("\n")
}

fn format_node(lines: &mut Vec<String>, node: &Node, indent: usize) {
    let prefix = "  ".repeat(indent);
    let line = match node {
        Node::Document(_) => format!("{prefix}document"),
        Node::Block(c) | Node::Inline(c) => {
            let kind = if node.is_block() { "block" } else { "inline" };
            let void = if c.is_void() { " void" } else { "" };
            format!("{prefix}{kind} {:?}{void}", c.node_type())
        }
        Node::Text(text) => format!(
            "{prefix}text {:?}{}",
            text.text(),
            format_marks(text.characters())
        ),
    };
    lines.push(line);
    for child in node.nodes() {
        format_node(lines, child, indent + 1);
    }
}

/// ` [bold]` when every character shares the same marks, otherwise one
/// `start..end: marks` entry per marked run
fn format_marks(characters: &[Character]) -> String {
    let mut runs: Vec<(usize, usize, &MarkSet)> = Vec::new();
    for (index, character) in characters.iter().enumerate() {
        if let Some((_, end, marks)) = runs.last_mut()
            && *marks == &character.marks
        {
            *end = index + 1;
            continue;
        }
        runs.push((index, index + 1, &character.marks));
    }

    let names = |marks: &MarkSet| {
        marks
            .iter()
            .map(|m| m.mark_type.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    match runs.as_slice() {
        [] => String::new(),
        [(_, _, marks)] if marks.is_empty() => String::new(),
        [(_, _, marks)] => format!(" [{}]", names(marks)),
        _ => {
            let entries: Vec<String> = runs
                .iter()
                .filter(|(_, _, marks)| !marks.is_empty())
                .map(|(start, end, marks)| format!("{start}..{end}: {}", names(marks)))
                .collect();
            format!(" [{}]", entries.join("; "))
        }
    }
}
