use crate::markdown::rope::Span;

use super::{
    classify::{LineClass, LineOpener},
    indent::IndentStyle,
    kinds::{CodeFence, FenceKind, ListItemLine},
    types::{BlockKind, BlockNode, ListMarkerInfo},
};

#[derive(Debug, Clone)]
enum LeafState {
    None,
    Paragraph {
        span: Span,
        lines: Vec<String>,
    },
    Quote {
        span: Span,
        lines: Vec<String>,
    },
    Item {
        span: Span,
        marker: ListMarkerInfo,
        lines: Vec<String>,
    },
    Fence {
        kind: FenceKind,
        language: Option<String>,
        span: Span,
        lines: Vec<String>,
    },
}

/// Line-by-line block state machine.
///
/// Blank lines end the open block. Paragraph and list item lines continue
/// until a blank line or another opener; quote lines group while they keep
/// their prefix.
pub struct BlockBuilder {
    indent: IndentStyle,
    leaf: LeafState,
    /// Depth of the last list item, while a list run is open.
    last_item_depth: Option<usize>,
    out: Vec<BlockNode>,
}

impl BlockBuilder {
    pub fn new(indent: IndentStyle) -> Self {
        Self {
            indent,
            leaf: LeafState::None,
            last_item_depth: None,
            out: vec![],
        }
    }

    pub fn push(&mut self, c: &LineClass) {
        if matches!(self.leaf, LeafState::Fence { .. }) {
            self.consume_fence_line(c);
            return;
        }

        if c.is_blank {
            self.flush();
            return;
        }

        if c.quote_depth > 0 {
            let content = c.remainder_text.trim().to_string();
            match &mut self.leaf {
                LeafState::Quote { span, lines } => {
                    span.end = c.line.end;
                    lines.push(content);
                }
                _ => {
                    self.flush();
                    self.leaf = LeafState::Quote {
                        span: c.line,
                        lines: vec![content],
                    };
                }
            }
            return;
        }

        match &c.opener {
            Some(LineOpener::Fence { sig, language }) => {
                self.flush();
                self.leaf = LeafState::Fence {
                    kind: CodeFence::kind(*sig),
                    language: language.clone(),
                    span: c.line,
                    lines: vec![],
                };
            }
            Some(LineOpener::Heading { level, content }) => {
                self.flush();
                self.emit(BlockNode {
                    kind: BlockKind::Heading { level: *level },
                    span: c.line,
                    lines: vec![content.clone()],
                });
            }
            Some(LineOpener::ListItem(item)) => {
                self.flush();
                self.open_item(item, c.line);
            }
            None => self.extend_text(c),
        }
    }

    pub fn finish(mut self) -> Vec<BlockNode> {
        // An unterminated fence still becomes a code block.
        self.flush();
        self.out
    }

    fn open_item(&mut self, item: &ListItemLine, line: Span) {
        let indented = self.indent.calculate_depth(&item.indent);
        let depth = match self.last_item_depth {
            Some(previous) => indented.min(previous + 1),
            None => 0,
        };
        self.last_item_depth = Some(depth);
        self.leaf = LeafState::Item {
            span: line,
            marker: ListMarkerInfo {
                list_type: item.list_type,
                checked: item.checked,
                number: item.number,
                depth,
            },
            lines: vec![item.content.clone()],
        };
    }

    /// Plain text line: continues a paragraph or list item, else opens a paragraph.
    fn extend_text(&mut self, c: &LineClass) {
        let content = c.text.trim().to_string();
        match &mut self.leaf {
            LeafState::Paragraph { span, lines } | LeafState::Item { span, lines, .. } => {
                span.end = c.line.end;
                lines.push(content);
            }
            _ => {
                self.flush();
                self.leaf = LeafState::Paragraph {
                    span: c.line,
                    lines: vec![content],
                };
            }
        }
    }

    fn consume_fence_line(&mut self, c: &LineClass) {
        let LeafState::Fence {
            kind, span, lines, ..
        } = &mut self.leaf
        else {
            return;
        };
        span.end = c.line.end;
        if CodeFence::closes(*kind, &c.text) {
            self.flush();
        } else {
            lines.push(c.text.clone());
        }
    }

    fn flush(&mut self) {
        let block = match std::mem::replace(&mut self.leaf, LeafState::None) {
            LeafState::None => return,
            LeafState::Paragraph { span, lines } => BlockNode {
                kind: BlockKind::Paragraph,
                span,
                lines,
            },
            LeafState::Quote { span, lines } => BlockNode {
                kind: BlockKind::Quote,
                span,
                lines,
            },
            LeafState::Item {
                span,
                marker,
                lines,
            } => BlockNode {
                kind: BlockKind::ListItem(marker),
                span,
                lines,
            },
            LeafState::Fence {
                kind,
                language,
                span,
                lines,
            } => BlockNode {
                kind: BlockKind::FencedCode { kind, language },
                span,
                lines,
            },
        };
        self.emit(block);
    }

    fn emit(&mut self, block: BlockNode) {
        if !matches!(block.kind, BlockKind::ListItem(_)) {
            self.last_item_depth = None;
        }
        self.out.push(block);
    }
}
