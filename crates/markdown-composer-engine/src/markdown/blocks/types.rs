use crate::editing::ListType;
use crate::markdown::rope::Span;

use super::kinds::FenceKind;

/// Position of a list item within its list run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMarkerInfo {
    pub list_type: ListType,
    pub checked: Option<bool>,
    pub number: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    Quote,
    FencedCode {
        kind: FenceKind,
        language: Option<String>,
    },
    ListItem(ListMarkerInfo),
}

/// A parsed block: its kind, source span and content lines with block
/// syntax already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    pub kind: BlockKind,
    pub span: Span,
    pub lines: Vec<String>,
}

impl BlockNode {
    /// Content lines joined by `\n`, ready for inline parsing.
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }
}
