use crate::models::Node;

/// Block type given to every line read from plain text
pub const PARAGRAPH: &str = "paragraph";

/// Plain text with one leaf block per line
pub struct Plain;

impl Plain {
    /// A document with one `paragraph` block holding one text per line.
    /// The empty string still yields a single empty paragraph.
    pub fn deserialize(text: &str) -> Node {
        let blocks = text
            .split('\n')
            .map(|line| Node::block(PARAGRAPH, vec![Node::text(line)]))
            .collect();
        Node::document(blocks)
    }

    /// Text of every leaf block, one per line
    pub fn serialize(node: &Node) -> String {
        node.blocks()
            .iter()
            .map(|block| block.text_content())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
