use std::fmt;

use bitflags::bitflags;
use serde::Serialize;

/// Stable identifier of a node within one document.
///
/// Keys are never reused inside a document, so a key held across commits
/// either resolves to the same logical node or to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeKey(pub(crate) u64);

impl NodeKey {
    pub const ROOT: NodeKey = NodeKey(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "root")
        } else {
            write!(f, "n{}", self.0)
        }
    }
}

bitflags! {
    /// Inline formatting carried by text-like nodes and range selections.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextFormat: u8 {
        const BOLD          = 0b0001;
        const ITALIC        = 0b0010;
        const STRIKETHROUGH = 0b0100;
        const CODE          = 0b1000;
    }
}

/// List flavours understood by the document model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Bullet,
    Number,
    Check,
}

impl ListType {
    pub fn as_str(self) -> &'static str {
        match self {
            ListType::Bullet => "bullet",
            ListType::Number => "number",
            ListType::Check => "check",
        }
    }
}

/// The type tag of a node, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Paragraph,
    Heading,
    List,
    ListItem,
    Quote,
    Code,
    Link,
    Text,
    Hashtag,
    Mark,
    Overflow,
    Keyword,
    LineBreak,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Root => "root",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::List => "list",
            NodeType::ListItem => "listitem",
            NodeType::Quote => "quote",
            NodeType::Code => "code",
            NodeType::Link => "link",
            NodeType::Text => "text",
            NodeType::Hashtag => "hashtag",
            NodeType::Mark => "mark",
            NodeType::Overflow => "overflow",
            NodeType::Keyword => "keyword",
            NodeType::LineBreak => "linebreak",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node's type together with its type-specific data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Paragraph,
    Heading { level: u8 },
    List { list_type: ListType, start: usize },
    ListItem { checked: Option<bool> },
    Quote,
    Code { language: Option<String> },
    Link { url: String, title: Option<String> },
    /// Annotation wrapper; transparent for markdown.
    Mark { ids: Vec<String> },
    /// Wrapper for content past a length limit; transparent for markdown.
    Overflow,
    Text { text: String, format: TextFormat },
    /// `#word` token; `text` includes the leading `#`.
    Hashtag { text: String, format: TextFormat },
    /// `[[word]]` token; `text` excludes the brackets.
    Keyword { text: String, format: TextFormat },
    LineBreak,
}

impl NodeKind {
    pub fn text(text: impl Into<String>) -> Self {
        NodeKind::Text {
            text: text.into(),
            format: TextFormat::empty(),
        }
    }

    pub fn formatted(text: impl Into<String>, format: TextFormat) -> Self {
        NodeKind::Text {
            text: text.into(),
            format,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Root => NodeType::Root,
            NodeKind::Paragraph => NodeType::Paragraph,
            NodeKind::Heading { .. } => NodeType::Heading,
            NodeKind::List { .. } => NodeType::List,
            NodeKind::ListItem { .. } => NodeType::ListItem,
            NodeKind::Quote => NodeType::Quote,
            NodeKind::Code { .. } => NodeType::Code,
            NodeKind::Link { .. } => NodeType::Link,
            NodeKind::Mark { .. } => NodeType::Mark,
            NodeKind::Overflow => NodeType::Overflow,
            NodeKind::Text { .. } => NodeType::Text,
            NodeKind::Hashtag { .. } => NodeType::Hashtag,
            NodeKind::Keyword { .. } => NodeType::Keyword,
            NodeKind::LineBreak => NodeType::LineBreak,
        }
    }

    /// Nodes that may own children.
    pub fn is_element(&self) -> bool {
        !matches!(
            self,
            NodeKind::Text { .. }
                | NodeKind::Hashtag { .. }
                | NodeKind::Keyword { .. }
                | NodeKind::LineBreak
        )
    }

    /// Leaves that carry text and a format.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            NodeKind::Text { .. } | NodeKind::Hashtag { .. } | NodeKind::Keyword { .. }
        )
    }

    /// Element wrappers that live inside a block's inline content.
    pub fn is_inline_element(&self) -> bool {
        matches!(
            self,
            NodeKind::Link { .. } | NodeKind::Mark { .. } | NodeKind::Overflow
        )
    }

    /// Blocks whose children are inline content.
    pub fn is_text_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Heading { .. }
                | NodeKind::Quote
                | NodeKind::Code { .. }
                | NodeKind::ListItem { .. }
        )
    }

    pub fn text_content(&self) -> Option<&str> {
        match self {
            NodeKind::Text { text, .. }
            | NodeKind::Hashtag { text, .. }
            | NodeKind::Keyword { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut String> {
        match self {
            NodeKind::Text { text, .. }
            | NodeKind::Hashtag { text, .. }
            | NodeKind::Keyword { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn format(&self) -> Option<TextFormat> {
        match self {
            NodeKind::Text { format, .. }
            | NodeKind::Hashtag { format, .. }
            | NodeKind::Keyword { format, .. } => Some(*format),
            _ => None,
        }
    }

    pub fn set_format(&mut self, new_format: TextFormat) {
        if let NodeKind::Text { format, .. }
        | NodeKind::Hashtag { format, .. }
        | NodeKind::Keyword { format, .. } = self
        {
            *format = new_format;
        }
    }

    /// Length in chars of a text-like node; zero for everything else.
    pub fn text_len(&self) -> usize {
        self.text_content().map_or(0, |t| t.chars().count())
    }

    pub fn list_type(&self) -> Option<ListType> {
        match self {
            NodeKind::List { list_type, .. } => Some(*list_type),
            _ => None,
        }
    }
}

/// One node of the document arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) key: NodeKey,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeKey>,
}

impl Node {
    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }
}

/// Byte index of the `char_offset`-th char in `s` (or `s.len()` past the end).
pub(crate) fn byte_index(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map_or(s.len(), |(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_key_displays_as_root() {
        assert_eq!(NodeKey::ROOT.to_string(), "root");
        assert_eq!(NodeKey(7).to_string(), "n7");
    }

    #[test]
    fn test_text_like_nodes_expose_text_and_format() {
        let kind = NodeKind::Hashtag {
            text: "#rust".into(),
            format: TextFormat::BOLD,
        };
        assert_eq!(kind.text_content(), Some("#rust"));
        assert_eq!(kind.format(), Some(TextFormat::BOLD));
        assert_eq!(kind.text_len(), 5);
        assert!(!kind.is_element());
    }

    #[test]
    fn test_byte_index_handles_multibyte_chars() {
        let s = "héllo";
        assert_eq!(byte_index(s, 0), 0);
        assert_eq!(byte_index(s, 2), 3);
        assert_eq!(byte_index(s, 5), s.len());
        assert_eq!(byte_index(s, 99), s.len());
    }

    #[test]
    fn test_formats_compose() {
        let f = TextFormat::BOLD | TextFormat::ITALIC;
        assert!(f.contains(TextFormat::BOLD));
        assert!(!f.contains(TextFormat::CODE));
    }
}
