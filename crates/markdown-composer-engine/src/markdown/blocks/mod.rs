//! # Block Parsing
//!
//! Markdown source is split into blocks in two phases:
//!
//! 1. **Line classification** (`classify`): each line gets a `LineClass` with
//!    its quote depth, blank status and the block syntax it opens, if any.
//! 2. **Block construction** (`builder`): a `BlockBuilder` state machine
//!    groups classified lines into `BlockNode`s.
//!
//! List nesting comes from indentation, measured with the document's own
//! `IndentStyle` (detected from the first indented list marker).
//!
//! Fenced code is a raw zone: its lines are kept verbatim and never
//! classified further.

pub mod builder;
pub mod classify;
pub mod indent;
pub mod kinds;
pub mod types;

use xi_rope::Rope;

pub use builder::BlockBuilder;
pub use classify::{LineClass, LineOpener, MarkdownLineClassifier};
pub use indent::{IndentStyle, detect_indent_style};
pub use types::{BlockKind, BlockNode, ListMarkerInfo};

use crate::markdown::rope::lines_with_spans;

/// Split `rope` into blocks.
///
/// `fallback_indent` is the spaces-per-level used when no list is indented.
pub fn parse_blocks(
    rope: &Rope,
    classifier: &MarkdownLineClassifier,
    fallback_indent: usize,
) -> Vec<BlockNode> {
    let lines: Vec<LineClass> = lines_with_spans(rope)
        .map(|lr| classifier.classify(&lr))
        .collect();
    let indent = detect_indent_style(
        lines.iter().filter_map(|c| match &c.opener {
            Some(LineOpener::ListItem(item)) => Some(item.indent.as_str()),
            _ => None,
        }),
        fallback_indent,
    );

    let mut builder = BlockBuilder::new(indent);
    for line in &lines {
        builder.push(line);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::ListType;
    use crate::markdown::TransformerSet;
    use crate::markdown::blocks::kinds::FenceKind;
    use crate::markdown::rope::Span;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Vec<BlockNode> {
        let classifier = MarkdownLineClassifier::new(&TransformerSet::default(), 2);
        parse_blocks(&Rope::from(text), &classifier, 2)
    }

    fn kinds(text: &str) -> Vec<BlockKind> {
        parse(text).into_iter().map(|b| b.kind).collect()
    }

    fn item(list_type: ListType, number: usize, depth: usize) -> BlockKind {
        BlockKind::ListItem(ListMarkerInfo {
            list_type,
            checked: None,
            number,
            depth,
        })
    }

    // ============ Paragraphs and headings ============

    #[test]
    fn test_empty_input_has_no_blocks() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n  \n").is_empty());
    }

    #[test]
    fn test_consecutive_lines_join_one_paragraph() {
        let blocks = parse("first\n  second\n\nthird");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines, vec!["first", "second"]);
        assert_eq!(blocks[1].content(), "third");
    }

    #[test]
    fn test_heading_scenario() {
        assert_eq!(
            kinds("# ignored\n## Heading\n- item1\n- item2\n"),
            vec![
                BlockKind::Paragraph,
                BlockKind::Heading { level: 2 },
                item(ListType::Bullet, 1, 0),
                item(ListType::Bullet, 1, 0),
            ]
        );
    }

    #[test]
    fn test_heading_interrupts_paragraph() {
        let blocks = parse("text\n## Title\nmore");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1].lines, vec!["Title"]);
    }

    // ============ Quotes and fences ============

    #[test]
    fn test_quote_lines_group_and_strip_prefix() {
        let blocks = parse("> one\n> two\n\n> three");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::Quote);
        assert_eq!(blocks[0].lines, vec!["one", "two"]);
    }

    #[test]
    fn test_fence_is_raw() {
        let blocks = parse("```rust\n# not heading\n\n- not list\n```\nafter");
        assert_eq!(
            blocks[0].kind,
            BlockKind::FencedCode {
                kind: FenceKind::Backticks,
                language: Some("rust".into())
            }
        );
        assert_eq!(blocks[0].lines, vec!["# not heading", "", "- not list"]);
        assert_eq!(blocks[1].lines, vec!["after"]);
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let blocks = parse("~~~\ncode");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec!["code"]);
    }

    // ============ Lists ============

    #[test]
    fn test_nesting_follows_detected_indent() {
        assert_eq!(
            kinds("- a\n    - b\n        1. c\n- d"),
            vec![
                item(ListType::Bullet, 1, 0),
                item(ListType::Bullet, 1, 1),
                item(ListType::Number, 1, 2),
                item(ListType::Bullet, 1, 0),
            ]
        );
    }

    #[test]
    fn test_depth_cannot_skip_levels() {
        assert_eq!(
            kinds("- a\n      - b"),
            vec![item(ListType::Bullet, 1, 0), item(ListType::Bullet, 1, 1)]
        );
    }

    #[test]
    fn test_first_item_after_paragraph_is_top_level() {
        assert_eq!(
            kinds("para\n\n  - a"),
            vec![BlockKind::Paragraph, item(ListType::Bullet, 1, 0)]
        );
    }

    #[test]
    fn test_item_continuation_lines() {
        let blocks = parse("- first\n  still first\n- second");
        assert_eq!(blocks[0].lines, vec!["first", "still first"]);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_block_spans_cover_their_lines() {
        let blocks = parse("a\nb\n\n## c\n");
        assert_eq!(blocks[0].span, Span::new(0, 4));
        assert_eq!(blocks[1].span, Span::new(5, 10));
    }
}
