use crate::markdown::rope::{LineRef, Span};
use crate::markdown::transformers::{Transformer, TransformerSet};

use super::kinds::{BlockQuote, CodeFence, FenceSig, Heading, ListItemLine, ListMarker, ListSyntax};

/// Block syntax a line opens, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOpener {
    Heading { level: u8, content: String },
    Fence { sig: FenceSig, language: Option<String> },
    ListItem(ListItemLine),
}

/// Local facts about one line, independent of its neighbours.
#[derive(Debug, Clone)]
pub struct LineClass {
    pub line: Span,
    /// Full line text; fenced code keeps it verbatim.
    pub text: String,
    pub is_blank: bool,
    pub quote_depth: u8,
    /// Text after the quote prefixes.
    pub remainder_text: String,
    pub opener: Option<LineOpener>,
}

/// Classifies lines against the enabled block transformers.
#[derive(Debug, Clone)]
pub struct MarkdownLineClassifier {
    heading_level: u8,
    headings: bool,
    quotes: bool,
    fences: bool,
    lists: ListSyntax,
}

impl MarkdownLineClassifier {
    pub fn new(transformers: &TransformerSet, heading_level: u8) -> Self {
        Self {
            heading_level,
            headings: transformers.contains(Transformer::Heading),
            quotes: transformers.contains(Transformer::Quote),
            fences: transformers.contains(Transformer::CodeBlock),
            lists: ListSyntax {
                bullets: transformers.contains(Transformer::UnorderedList),
                ordered: transformers.contains(Transformer::OrderedList),
                checks: transformers.contains(Transformer::CheckList),
            },
        }
    }

    pub fn classify(&self, lr: &LineRef) -> LineClass {
        let text = lr.text.as_str();
        let (quote_depth, offset) = if self.quotes {
            BlockQuote::strip_prefixes(text)
        } else {
            (0, 0)
        };
        let remainder = &text[offset..];
        let opener = if quote_depth > 0 {
            None
        } else {
            self.opener(text)
        };

        LineClass {
            line: lr.span,
            text: text.to_string(),
            is_blank: remainder.trim().is_empty(),
            quote_depth,
            remainder_text: remainder.to_string(),
            opener,
        }
    }

    fn opener(&self, text: &str) -> Option<LineOpener> {
        if self.fences
            && let Some(sig) = CodeFence::sig(text)
        {
            return Some(LineOpener::Fence {
                sig,
                language: CodeFence::info(text),
            });
        }
        if self.headings
            && let Some((level, content)) = Heading::parse(text)
        {
            if level == self.heading_level {
                return Some(LineOpener::Heading {
                    level,
                    content: content.to_string(),
                });
            }
            log::trace!("heading level {level} is not exposed; kept as text");
            return None;
        }
        ListMarker::parse(text, self.lists).map(LineOpener::ListItem)
    }
}
