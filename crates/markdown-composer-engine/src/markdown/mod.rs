//! # Markdown Bridge
//!
//! Converts between markdown text and the document tree.
//!
//! Import runs in three steps:
//!
//! 1. **Blocks** (`blocks`): the text is split into lines over a rope and
//!    grouped into headings, quotes, fenced code, list items and paragraphs.
//! 2. **Inline** (`inline`): each block's text is parsed for emphasis, code
//!    spans, links, keywords and hashtags.
//! 3. **Tree** (`import`): blocks and inline content become nodes; list items
//!    are nested by depth. The result is normalized.
//!
//! Export (`export`) walks the tree and writes each block back out.
//!
//! Markdown typed into a live editor is converted by `shortcuts`.
//!
//! Both directions only use the constructs in the session's
//! [`TransformerSet`]. Anything else is plain text.

pub mod blocks;
pub mod export;
pub mod import;
pub mod inline;
pub mod rope;
pub mod shortcuts;
pub mod transformers;

use xi_rope::Rope;

use crate::editing::Document;
use crate::error::{EditorError, MarkdownError};

use blocks::{MarkdownLineClassifier, kinds::Heading, parse_blocks};
use export::MarkdownWriter;
use inline::InlineParser;

pub use shortcuts::{ShortcutRules, register_markdown_shortcuts};
pub use transformers::{Transformer, TransformerSet};

pub const DEFAULT_HEADING_LEVEL: u8 = 2;
pub const DEFAULT_LIST_INDENT: usize = 2;

#[derive(Debug, Clone)]
pub struct MarkdownBridge {
    transformers: TransformerSet,
    heading_level: u8,
    list_indent: usize,
    classifier: MarkdownLineClassifier,
    inline: InlineParser,
}

impl MarkdownBridge {
    /// `heading_level` is the one heading level recognised on import.
    pub fn new(
        transformers: TransformerSet,
        heading_level: u8,
        list_indent: usize,
    ) -> Result<Self, MarkdownError> {
        if !(1..=Heading::MAX_LEVEL).contains(&heading_level) {
            return Err(MarkdownError::InvalidHeadingLevel(heading_level));
        }
        Ok(Self {
            classifier: MarkdownLineClassifier::new(&transformers, heading_level),
            inline: InlineParser::new(&transformers),
            transformers,
            heading_level,
            list_indent: list_indent.max(1),
        })
    }

    pub fn transformers(&self) -> &TransformerSet {
        &self.transformers
    }

    pub fn heading_level(&self) -> u8 {
        self.heading_level
    }

    pub fn list_indent(&self) -> usize {
        self.list_indent
    }

    pub fn import_markdown(&self, text: &str) -> Result<Document, EditorError> {
        let rope = Rope::from(text);
        let blocks = parse_blocks(&rope, &self.classifier, self.list_indent);
        log::debug!("markdown import: {} blocks", blocks.len());
        import::build_document(&blocks, &self.inline)
    }

    pub fn export_markdown(&self, doc: &Document) -> String {
        MarkdownWriter::new(&self.transformers, self.list_indent).write(doc)
    }
}

impl Default for MarkdownBridge {
    fn default() -> Self {
        let transformers = TransformerSet::default();
        Self {
            classifier: MarkdownLineClassifier::new(&transformers, DEFAULT_HEADING_LEVEL),
            inline: InlineParser::new(&transformers),
            transformers,
            heading_level: DEFAULT_HEADING_LEVEL,
            list_indent: DEFAULT_LIST_INDENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{ListType, NodeKey, NodeKind, NodeType, TextFormat};
    use pretty_assertions::assert_eq;

    fn bridge() -> MarkdownBridge {
        MarkdownBridge::default()
    }

    fn root_types(doc: &Document) -> Vec<NodeType> {
        doc.children(NodeKey::ROOT)
            .iter()
            .filter_map(|&k| doc.node_type(k))
            .collect()
    }

    fn assert_stable(text: &str) {
        let b = bridge();
        let first = b.import_markdown(text).unwrap();
        let exported = b.export_markdown(&first);
        let second = b.import_markdown(&exported).unwrap();
        assert_eq!(second.outline(), first.outline(), "exported as {exported:?}");
    }

    // ============ Import ============

    #[test]
    fn test_heading_and_list_scenario() {
        let doc = bridge()
            .import_markdown("# ignored\n## Heading\n- item1\n- item2\n")
            .unwrap();
        assert_eq!(
            root_types(&doc),
            vec![NodeType::Paragraph, NodeType::Heading, NodeType::List]
        );
        let root = doc.children(NodeKey::ROOT);
        assert_eq!(doc.text_content(root[0]), "# ignored");
        assert_eq!(doc.kind(root[1]), Some(&NodeKind::Heading { level: 2 }));
        assert_eq!(doc.text_content(root[1]), "Heading");
        let items = doc.children(root[2]);
        assert_eq!(items.len(), 2);
        assert_eq!(doc.kind(root[2]).and_then(NodeKind::list_type), Some(ListType::Bullet));
        assert_eq!(doc.text_content(items[1]), "item2");
    }

    #[test]
    fn test_scenario_exports_heading_and_list() {
        let b = bridge();
        let doc = b
            .import_markdown("# ignored\n## Heading\n- item1\n- item2\n")
            .unwrap();
        insta::assert_snapshot!(b.export_markdown(&doc).replace('\n', "|"), @r"\# ignored||## Heading||- item1|- item2");
    }

    #[test]
    fn test_empty_input_gives_one_empty_paragraph() {
        let doc = bridge().import_markdown("").unwrap();
        assert_eq!(root_types(&doc), vec![NodeType::Paragraph]);
        assert!(doc.is_empty());
        assert_eq!(bridge().export_markdown(&doc), "");
    }

    #[test]
    fn test_link_import() {
        let doc = bridge()
            .import_markdown("[site](https://example.com)")
            .unwrap();
        let paragraph = doc.children(NodeKey::ROOT)[0];
        let link = doc.children(paragraph)[0];
        assert_eq!(
            doc.kind(link),
            Some(&NodeKind::Link {
                url: "https://example.com".into(),
                title: None
            })
        );
        assert_eq!(doc.text_content(link), "site");
    }

    #[test]
    fn test_nested_list_import() {
        let doc = bridge()
            .import_markdown("1. one\n  - [x] done\n2. two")
            .unwrap();
        let list = doc.children(NodeKey::ROOT)[0];
        assert_eq!(
            doc.kind(list),
            Some(&NodeKind::List {
                list_type: ListType::Number,
                start: 1
            })
        );
        let first = doc.children(list)[0];
        let nested = *doc.children(first).last().unwrap();
        assert_eq!(doc.kind(nested).and_then(NodeKind::list_type), Some(ListType::Check));
        let done = doc.children(nested)[0];
        assert_eq!(
            doc.kind(done),
            Some(&NodeKind::ListItem {
                checked: Some(true)
            })
        );
    }

    #[test]
    fn test_list_type_change_starts_new_list() {
        let doc = bridge().import_markdown("- a\n1. b").unwrap();
        assert_eq!(root_types(&doc), vec![NodeType::List, NodeType::List]);
    }

    #[test]
    fn test_code_block_lines_are_raw() {
        let doc = bridge()
            .import_markdown("```rust\nlet *x* = 1;\n\nfn main() {}\n```")
            .unwrap();
        let code = doc.children(NodeKey::ROOT)[0];
        assert_eq!(
            doc.kind(code),
            Some(&NodeKind::Code {
                language: Some("rust".into())
            })
        );
        assert_eq!(doc.text_content(code), "let *x* = 1;\n\nfn main() {}");
    }

    #[test]
    fn test_quote_lines_join_with_breaks() {
        let doc = bridge().import_markdown("> a\n> **b**").unwrap();
        let quote = doc.children(NodeKey::ROOT)[0];
        let kinds: Vec<NodeKind> = doc
            .children(quote)
            .iter()
            .filter_map(|&k| doc.kind(k).cloned())
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::text("a"),
                NodeKind::LineBreak,
                NodeKind::formatted("b", TextFormat::BOLD)
            ]
        );
    }

    #[test]
    fn test_disabled_constructs_stay_text() {
        let set = TransformerSet::new(vec![Transformer::Heading, Transformer::BoldStar]).unwrap();
        let b = MarkdownBridge::new(set, 2, 2).unwrap();
        let doc = b.import_markdown("- item with [link](u)").unwrap();
        assert_eq!(root_types(&doc), vec![NodeType::Paragraph]);
        assert_eq!(doc.text_content(doc.children(NodeKey::ROOT)[0]), "- item with [link](u)");
    }

    #[test]
    fn test_invalid_heading_level_is_rejected() {
        assert_eq!(
            MarkdownBridge::new(TransformerSet::default(), 7, 2).unwrap_err(),
            MarkdownError::InvalidHeadingLevel(7)
        );
        assert!(MarkdownBridge::new(TransformerSet::default(), 0, 2).is_err());
    }

    #[test]
    fn test_imported_tree_holds_invariants() {
        let doc = bridge()
            .import_markdown("## T\n\n- a\n  - b\n    - c\n- d\n\n> q\n\n`x` **y** #z [[k]]")
            .unwrap();
        assert_eq!(doc.check_invariants(), Ok(()));
    }

    // ============ Round trip ============

    #[test]
    fn test_round_trip_blocks() {
        assert_stable("## Heading\n\nSome text\nsecond line\n\n> quoted\n\n```\ncode\n```");
    }

    #[test]
    fn test_round_trip_lists() {
        assert_stable("- a\n  - b\n    1. c\n    2. d\n- e\n\n- [ ] todo\n- [x] done");
    }

    #[test]
    fn test_round_trip_inline() {
        assert_stable(
            "**bold** *italic* ***both*** ~~gone~~ `code` [link](https://x.y \"T\") #tag [[key]]",
        );
    }

    #[test]
    fn test_round_trip_escapes() {
        assert_stable(r"2 \* 3 \_not italic\_ \# \[x\] C# rocks snake_case");
    }
}
