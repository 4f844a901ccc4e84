//! Markdown typed into the editor becomes formatting as it is typed.
//!
//! A space after a block marker at the very start of a paragraph converts the
//! paragraph: `## ` (at the session's heading level), `> `, `- `, `1. `,
//! `[ ] ` and a code fence. Typing the last character of a closing emphasis
//! delimiter, code span tick or link `)` converts the run it closes within the
//! text node under the caret. Only constructs in the session's
//! [`TransformerSet`] fire.

use std::sync::OnceLock;

use regex::Regex;

use crate::editing::node::byte_index;
use crate::editing::ops::{self, TextCaret};
use crate::editing::{
    BlockTarget, Command, CommandKind, CommandPriority, Editor, ListType, NodeKind, NodeType,
    Point, Registration, Selection, TextFormat,
};
use crate::error::EditorError;
use crate::markdown::inline::kinds::CodeSpan;
use crate::markdown::transformers::{Transformer, TransformerSet};
use crate::toolbar::sanitize_url;

/// Block conversion triggered by a space after a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockShortcut {
    Heading,
    Quote,
    Code { language: Option<String> },
    List { list_type: ListType, start: usize },
    Check { checked: bool },
}

/// Inline conversion triggered by the closing character of a construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineShortcut {
    /// Chars `open..close` of the caret's text, markers included, become
    /// `content` with `add` on top of the text's format.
    Format {
        open: usize,
        content: String,
        add: TextFormat,
    },
    Link {
        open: usize,
        label: String,
        url: String,
        title: Option<String>,
    },
}

impl InlineShortcut {
    fn open(&self) -> usize {
        match self {
            InlineShortcut::Format { open, .. } | InlineShortcut::Link { open, .. } => *open,
        }
    }
}

/// Which shortcuts fire, from the session's markdown settings.
#[derive(Debug, Clone)]
pub struct ShortcutRules {
    transformers: TransformerSet,
    heading_level: u8,
}

impl ShortcutRules {
    pub fn new(transformers: TransformerSet, heading_level: u8) -> Self {
        Self {
            transformers,
            heading_level,
        }
    }

    fn has(&self, transformer: Transformer) -> bool {
        self.transformers.contains(transformer)
    }

    /// Block shortcut for a paragraph whose text before the caret is `marker`.
    pub fn block(&self, marker: &str) -> Option<BlockShortcut> {
        static CODE_REGEX: OnceLock<Regex> = OnceLock::new();
        static CHECK_REGEX: OnceLock<Regex> = OnceLock::new();
        static ORDERED_REGEX: OnceLock<Regex> = OnceLock::new();
        let code_regex = CODE_REGEX
            .get_or_init(|| Regex::new(r"^```(\w{1,10})?$").expect("Invalid code fence regex"));
        let check_regex = CHECK_REGEX.get_or_init(|| {
            Regex::new(r"^(?:[-*+] )?\[([ xX])?\]$").expect("Invalid check marker regex")
        });
        let ordered_regex = ORDERED_REGEX
            .get_or_init(|| Regex::new(r"^(\d{1,9})\.$").expect("Invalid ordered marker regex"));

        if self.has(Transformer::Heading)
            && marker.len() == usize::from(self.heading_level)
            && marker.chars().all(|c| c == '#')
        {
            return Some(BlockShortcut::Heading);
        }
        if self.has(Transformer::Quote) && marker == ">" {
            return Some(BlockShortcut::Quote);
        }
        if self.has(Transformer::CodeBlock)
            && let Some(caps) = code_regex.captures(marker)
        {
            return Some(BlockShortcut::Code {
                language: caps.get(1).map(|m| m.as_str().to_string()),
            });
        }
        if self.has(Transformer::CheckList)
            && let Some(caps) = check_regex.captures(marker)
        {
            return Some(BlockShortcut::Check {
                checked: caps.get(1).is_some_and(|m| m.as_str().eq_ignore_ascii_case("x")),
            });
        }
        if self.has(Transformer::UnorderedList) && matches!(marker, "-" | "*" | "+") {
            return Some(BlockShortcut::List {
                list_type: ListType::Bullet,
                start: 1,
            });
        }
        if self.has(Transformer::OrderedList)
            && let Some(caps) = ordered_regex.captures(marker)
        {
            return Some(BlockShortcut::List {
                list_type: ListType::Number,
                start: caps[1].parse().ok()?,
            });
        }
        None
    }

    /// Inline shortcut closed by the last char of `text`.
    pub fn inline(&self, text: &[char]) -> Option<InlineShortcut> {
        let last = *text.last()?;
        if last == ')' && self.has(Transformer::Link) {
            return link_shortcut(text);
        }
        if last == CodeSpan::TICK && self.has(Transformer::InlineCode) {
            return code_shortcut(text);
        }
        self.transformers
            .inline()
            .into_iter()
            .filter_map(Transformer::emphasis)
            .find_map(|(marker, add)| emphasis_shortcut(text, marker, add))
    }
}

/// `marker content marker` ending the text, content tight against both markers.
fn emphasis_shortcut(text: &[char], marker: &str, add: TextFormat) -> Option<InlineShortcut> {
    let marker: Vec<char> = marker.chars().collect();
    let n = marker.len();
    let marker_char = marker[0];
    if text.len() < 2 * n + 1 || !text.ends_with(&marker) {
        return None;
    }
    let close = text.len() - n;
    let before_close = text[close - 1];
    if before_close.is_whitespace() || before_close == marker_char {
        return None;
    }
    let open = (0..close - n)
        .rev()
        .find(|&i| text[i..i + n] == marker[..])?;
    let first = text[open + n];
    if first.is_whitespace() || first == marker_char {
        return None;
    }
    if open > 0 {
        let prev = text[open - 1];
        if prev == marker_char || (marker_char == '_' && prev.is_alphanumeric()) {
            return None;
        }
    }
    Some(InlineShortcut::Format {
        open,
        content: text[open + n..close].iter().collect(),
        add,
    })
}

fn code_shortcut(text: &[char]) -> Option<InlineShortcut> {
    let close = text.len() - 1;
    let open = text[..close].iter().rposition(|&c| c == CodeSpan::TICK)?;
    if open + 1 == close {
        return None;
    }
    Some(InlineShortcut::Format {
        open,
        content: text[open + 1..close].iter().collect(),
        add: TextFormat::CODE,
    })
}

fn link_shortcut(text: &[char]) -> Option<InlineShortcut> {
    static LINK_REGEX: OnceLock<Regex> = OnceLock::new();
    let link_regex = LINK_REGEX.get_or_init(|| {
        Regex::new(r#"\[([^\[\]]+)\]\(([^()\s]+)(?: "([^"]*)")?\)$"#).expect("Invalid link regex")
    });
    let text: String = text.iter().collect();
    let caps = link_regex.captures(&text)?;
    let whole = caps.get(0)?;
    Some(InlineShortcut::Link {
        open: text[..whole.start()].chars().count(),
        label: caps[1].to_string(),
        url: sanitize_url(&caps[2]),
        title: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

/// Register the InsertText handler for markdown shortcuts.
///
/// Runs at [`CommandPriority::Low`] and claims the command only when a
/// shortcut fires; the typed text is consumed by the conversion.
pub fn register_markdown_shortcuts(editor: &mut Editor, rules: ShortcutRules) -> Vec<Registration> {
    let id = editor.register_command(CommandKind::InsertText, CommandPriority::Low, move |command, editor| {
        let Command::InsertText(typed) = command else {
            return Ok(false);
        };
        if !editor.is_editable() {
            return Ok(false);
        }
        let Some(caret) = ops::text_caret(editor.document(), editor.selection()) else {
            return Ok(false);
        };
        if typed == " "
            && let Some(shortcut) = block_trigger(editor, &rules, &caret)
        {
            log::debug!("markdown shortcut: {shortcut:?}");
            apply_block(editor, rules.heading_level, caret, shortcut)?;
            return Ok(true);
        }
        let mut chars = typed.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Ok(false);
        };
        let mut text = caret.before.clone();
        text.push(c);
        let Some(shortcut) = rules.inline(&text) else {
            return Ok(false);
        };
        if editor.document().nearest_of_type(caret.leaf, NodeType::Link).is_some()
            && matches!(shortcut, InlineShortcut::Link { .. })
        {
            return Ok(false);
        }
        log::debug!("markdown shortcut: {shortcut:?}");
        apply_inline(editor, caret, shortcut)?;
        Ok(true)
    });
    vec![Registration::Command(id)]
}

/// A block marker typed at the start of a top-level paragraph.
fn block_trigger(editor: &Editor, rules: &ShortcutRules, caret: &TextCaret) -> Option<BlockShortcut> {
    let doc = editor.document();
    if doc.kind(caret.block) != Some(&NodeKind::Paragraph)
        || doc.children(caret.block).first() != Some(&caret.leaf)
    {
        return None;
    }
    let marker: String = caret.before.iter().collect();
    rules.block(&marker)
}

fn apply_block(
    editor: &mut Editor,
    heading_level: u8,
    caret: TextCaret,
    shortcut: BlockShortcut,
) -> Result<(), EditorError> {
    editor.update(move |draft| {
        let (leaf, block) = (caret.leaf, caret.block);
        if let Some(text) = draft.document.kind_mut(leaf)?.text_mut() {
            let cut = byte_index(text, caret.offset);
            text.replace_range(..cut, "");
        }
        draft.set_selection(Some(Selection::caret(Point::text(leaf, 0))));

        match shortcut {
            BlockShortcut::Heading => ops::set_block_type(draft, BlockTarget::Heading(heading_level)),
            BlockShortcut::Quote => {
                *draft.document.kind_mut(block)? = NodeKind::Quote;
                Ok(())
            }
            BlockShortcut::Code { language } => {
                *draft.document.kind_mut(block)? = NodeKind::Code { language };
                Ok(())
            }
            BlockShortcut::List { list_type, start } => {
                ops::insert_list(draft, list_type)?;
                let doc = &mut draft.document;
                // A list merged into the one above keeps its numbering.
                if let Some(item) = doc.nearest_of_type(leaf, NodeType::ListItem)
                    && let Some(list) = doc.parent(item)
                    && doc.children(list).first() == Some(&item)
                    && let NodeKind::List { start: first, .. } = doc.kind_mut(list)?
                {
                    *first = start;
                }
                Ok(())
            }
            BlockShortcut::Check { checked } => {
                ops::insert_list(draft, ListType::Check)?;
                let doc = &mut draft.document;
                if let Some(item) = doc.nearest_of_type(leaf, NodeType::ListItem)
                    && let NodeKind::ListItem { checked: state } = doc.kind_mut(item)?
                {
                    *state = Some(checked);
                }
                Ok(())
            }
        }
    })?;
    Ok(())
}

fn apply_inline(
    editor: &mut Editor,
    caret: TextCaret,
    shortcut: InlineShortcut,
) -> Result<(), EditorError> {
    editor.update(move |draft| {
        let open = shortcut.open();
        let (_, rest) = match shortcut {
            InlineShortcut::Format { content, add, .. } => {
                let kind = NodeKind::formatted(content, caret.format | add);
                ops::splice_text(&mut draft.document, caret.leaf, open, caret.offset, kind)?
            }
            InlineShortcut::Link {
                label, url, title, ..
            } => {
                let (link, rest) = ops::splice_text(
                    &mut draft.document,
                    caret.leaf,
                    open,
                    caret.offset,
                    NodeKind::Link { url, title },
                )?;
                let text = draft.document.create(NodeKind::formatted(label, caret.format));
                draft.document.append(link, text)?;
                (link, rest)
            }
        };
        draft.set_selection(Some(Selection::caret(Point::text(rest, 0))));
        if let Some(range) = draft.range_selection_mut() {
            range.format = caret.format;
        }
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{Document, NodeKey, RangeSelection, register_rich_text};
    use crate::markdown::MarkdownBridge;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn rules() -> ShortcutRules {
        ShortcutRules::new(TransformerSet::default(), 2)
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    /// One paragraph holding `text`, caret at its end, shortcuts and defaults registered.
    fn typing_editor(text: &str) -> Editor {
        let mut doc = Document::empty_root();
        let paragraph = doc.create(NodeKind::Paragraph);
        doc.append(NodeKey::ROOT, paragraph).unwrap();
        let leaf = doc.create(NodeKind::text(text));
        doc.append(paragraph, leaf).unwrap();
        let caret = RangeSelection::collapsed(Point::text(leaf, text.chars().count()));
        let mut editor = Editor::with_state(doc, Some(Selection::Range(caret)), true);
        register_rich_text(&mut editor);
        register_markdown_shortcuts(&mut editor, rules());
        editor
    }

    fn type_all(editor: &mut Editor, typed: &str) {
        for c in typed.chars() {
            editor.dispatch(Command::InsertText(c.to_string())).unwrap();
        }
    }

    fn markdown(editor: &Editor) -> String {
        MarkdownBridge::default().export_markdown(editor.document())
    }

    // ============ Rules ============

    #[rstest]
    #[case("##", Some(BlockShortcut::Heading))]
    #[case("#", None)]
    #[case(">", Some(BlockShortcut::Quote))]
    #[case("```rust", Some(BlockShortcut::Code { language: Some("rust".into()) }))]
    #[case("-", Some(BlockShortcut::List { list_type: ListType::Bullet, start: 1 }))]
    #[case("7.", Some(BlockShortcut::List { list_type: ListType::Number, start: 7 }))]
    #[case("[x]", Some(BlockShortcut::Check { checked: true }))]
    #[case("- [ ]", Some(BlockShortcut::Check { checked: false }))]
    #[case("--", None)]
    fn test_block_rules(#[case] marker: &str, #[case] expected: Option<BlockShortcut>) {
        assert_eq!(rules().block(marker), expected);
    }

    #[test]
    fn test_disabled_block_rule_does_not_fire() {
        let rules = ShortcutRules::new(
            TransformerSet::new(vec![Transformer::Heading, Transformer::BoldStar]).unwrap(),
            2,
        );
        assert_eq!(rules.block("-"), None);
        assert_eq!(rules.block("##"), Some(BlockShortcut::Heading));
    }

    #[rstest]
    #[case("a **b**", Some((2, "b", TextFormat::BOLD)))]
    #[case("*it*", Some((0, "it", TextFormat::ITALIC)))]
    #[case("**b*", None)]
    #[case("a * b*", None)]
    #[case("~~gone~~", Some((0, "gone", TextFormat::STRIKETHROUGH)))]
    #[case("snake_case_", None)]
    #[case("run `ls`", Some((4, "ls", TextFormat::CODE)))]
    #[case("``", None)]
    fn test_inline_format_rules(
        #[case] text: &str,
        #[case] expected: Option<(usize, &str, TextFormat)>,
    ) {
        let found = rules().inline(&chars(text)).map(|shortcut| match shortcut {
            InlineShortcut::Format { open, content, add } => (open, content, add),
            other => panic!("unexpected {other:?}"),
        });
        assert_eq!(
            found,
            expected.map(|(open, content, add)| (open, content.to_string(), add))
        );
    }

    #[test]
    fn test_inline_link_rule() {
        assert_eq!(
            rules().inline(&chars(r#"see [docs](https://docs.rs "Docs")"#)),
            Some(InlineShortcut::Link {
                open: 4,
                label: "docs".into(),
                url: "https://docs.rs".into(),
                title: Some("Docs".into()),
            })
        );
        assert_eq!(
            rules().inline(&chars("[x](javascript:alert)")),
            Some(InlineShortcut::Link {
                open: 0,
                label: "x".into(),
                url: "about:blank".into(),
                title: None,
            })
        );
    }

    // ============ Typing ============

    #[rstest]
    #[case("## Title", "## Title")]
    #[case("> quoted", "> quoted")]
    #[case("- item", "- item")]
    #[case("3. third", "3. third")]
    #[case("[x] done", "- [x] done")]
    fn test_typing_block_marker_converts_paragraph(#[case] typed: &str, #[case] expected: &str) {
        let mut editor = typing_editor("");
        type_all(&mut editor, typed);
        assert_eq!(markdown(&editor), expected);
    }

    #[test]
    fn test_code_fence_shortcut() {
        let mut editor = typing_editor("");
        type_all(&mut editor, "```rust fn main() {}");
        assert_eq!(markdown(&editor), "```rust\nfn main() {}\n```");
    }

    #[test]
    fn test_marker_mid_paragraph_stays_text() {
        let mut editor = typing_editor("text ");
        type_all(&mut editor, "- not a list");
        assert_eq!(markdown(&editor), "text - not a list");
    }

    #[test]
    fn test_typing_closing_marker_formats_run() {
        let mut editor = typing_editor("");
        type_all(&mut editor, "say **loud** now");
        assert_eq!(markdown(&editor), "say **loud** now");

        let doc = editor.document();
        let paragraph = doc.children(NodeKey::ROOT)[0];
        let formats: Vec<_> = doc
            .children(paragraph)
            .iter()
            .map(|&k| (doc.text_content(k), doc.kind(k).and_then(NodeKind::format)))
            .collect();
        assert_eq!(
            formats,
            vec![
                ("say ".to_string(), Some(TextFormat::empty())),
                ("loud".to_string(), Some(TextFormat::BOLD)),
                (" now".to_string(), Some(TextFormat::empty())),
            ]
        );
    }

    #[test]
    fn test_typing_link_markdown_makes_link() {
        let mut editor = typing_editor("");
        type_all(&mut editor, "go [home](https://example.com) then");
        let doc = editor.document();
        let paragraph = doc.children(NodeKey::ROOT)[0];
        let link = doc.children(paragraph)[1];
        assert_eq!(
            doc.kind(link),
            Some(&NodeKind::Link {
                url: "https://example.com".into(),
                title: None
            })
        );
        assert_eq!(markdown(&editor), "go [home](https://example.com) then");
    }

    #[test]
    fn test_shortcut_is_one_commit() {
        let mut editor = typing_editor("##");
        let version = editor.version();
        assert!(editor.dispatch(Command::InsertText(" ".into())).unwrap());
        assert_eq!(editor.version(), version + 1);
        let heading = editor.document().children(NodeKey::ROOT)[0];
        assert_eq!(editor.document().kind(heading), Some(&NodeKind::Heading { level: 2 }));
        assert_eq!(editor.document().text_content(heading), "");
    }

    #[test]
    fn test_read_only_editor_ignores_shortcuts() {
        let mut editor = typing_editor("##");
        editor.set_editable(false);
        assert!(!editor.dispatch(Command::InsertText(" ".into())).unwrap());
        let paragraph = editor.document().children(NodeKey::ROOT)[0];
        assert_eq!(editor.document().kind(paragraph), Some(&NodeKind::Paragraph));
        assert_eq!(editor.document().text_content(paragraph), "##");
    }
}
