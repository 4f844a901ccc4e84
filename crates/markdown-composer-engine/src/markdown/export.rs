use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::editing::{Document, ListType, NodeKey, NodeKind, TextFormat};

use super::blocks::kinds::{BlockQuote, CodeFence, Heading, ListMarker};
use super::inline::kinds::{CodeSpan, Escape, Hashtag, Keyword, Link};
use super::transformers::{Transformer, TransformerSet};

/// Writes a document back to markdown using the enabled transformers.
///
/// Nodes without an enabled transformer are written as their plain text.
pub struct MarkdownWriter<'a> {
    set: &'a TransformerSet,
    list_indent: usize,
}

impl<'a> MarkdownWriter<'a> {
    pub fn new(set: &'a TransformerSet, list_indent: usize) -> Self {
        Self {
            set,
            list_indent: list_indent.max(1),
        }
    }

    /// Top-level blocks separated by a blank line, without a trailing newline.
    pub fn write(&self, doc: &Document) -> String {
        doc.root()
            .children()
            .iter()
            .map(|&key| self.write_block(doc, key))
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn write_block(&self, doc: &Document, key: NodeKey) -> String {
        match doc.kind(key) {
            Some(NodeKind::Heading { level }) if self.set.contains(Transformer::Heading) => {
                let content = self.write_inline(doc, key);
                if content.is_empty() {
                    return String::new();
                }
                format!("{}{}", Heading::prefix(*level), content)
            }
            Some(NodeKind::Quote) if self.set.contains(Transformer::Quote) => {
                let content = self.write_inline(doc, key);
                if content.trim().is_empty() {
                    return String::new();
                }
                content
                    .split('\n')
                    .map(|line| format!("{}{}", BlockQuote::EXPORT_PREFIX, guard_line_start(line)))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Some(NodeKind::Code { language }) if self.set.contains(Transformer::CodeBlock) => {
                let raw = code_text(doc, key);
                let lines: Vec<&str> = raw.split('\n').collect();
                let kind = CodeFence::kind_for(&lines);
                format!(
                    "{}\n{}\n{}",
                    CodeFence::open(kind, language.as_deref()),
                    raw,
                    CodeFence::fence(kind)
                )
            }
            Some(NodeKind::Code { .. }) => code_text(doc, key),
            Some(NodeKind::List { .. }) => {
                let mut lines = Vec::new();
                self.write_list(doc, key, 0, &mut lines);
                lines.join("\n")
            }
            _ => self
                .write_inline(doc, key)
                .split('\n')
                .map(guard_line_start)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn list_enabled(&self, list_type: ListType) -> bool {
        match list_type {
            ListType::Bullet => self.set.contains(Transformer::UnorderedList),
            ListType::Number => self.set.contains(Transformer::OrderedList),
            ListType::Check => self.set.contains(Transformer::CheckList),
        }
    }

    fn write_list(&self, doc: &Document, list: NodeKey, depth: usize, lines: &mut Vec<String>) {
        let Some(NodeKind::List { list_type, start }) = doc.kind(list) else {
            return;
        };
        let (list_type, start) = (*list_type, *start);
        let enabled = self.list_enabled(list_type);
        let indent = if enabled {
            " ".repeat(self.list_indent * depth)
        } else {
            String::new()
        };

        for (i, &item) in doc.children(list).iter().enumerate() {
            let checked = match doc.kind(item) {
                Some(NodeKind::ListItem { checked }) => *checked,
                _ => None,
            };
            let prefix = if enabled {
                ListMarker::prefix(list_type, start + i, checked)
            } else {
                String::new()
            };
            let continuation = " ".repeat(prefix.len());

            let content = self.write_inline(doc, item);
            for (n, line) in content.split('\n').enumerate() {
                let line = guard_line_start(line);
                if n == 0 {
                    lines.push(format!("{indent}{prefix}{line}"));
                } else {
                    lines.push(format!("{indent}{continuation}{line}"));
                }
            }

            for &child in doc.children(item) {
                if matches!(doc.kind(child), Some(NodeKind::List { .. })) {
                    self.write_list(doc, child, depth + 1, lines);
                }
            }
        }
    }

    /// Inline children of `block`, with nested lists left out.
    fn write_inline(&self, doc: &Document, block: NodeKey) -> String {
        let mut writer = InlineWriter::new(self.set);
        writer.children(doc, block);
        writer.finish()
    }
}

/// Raw code block text: text nodes verbatim, line breaks as newlines.
fn code_text(doc: &Document, key: NodeKey) -> String {
    doc.children(key)
        .iter()
        .map(|&child| match doc.kind(child) {
            Some(NodeKind::LineBreak) => "\n".to_string(),
            _ => doc.text_content(child),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Bold,
    Italic,
    Strike,
}

impl Mark {
    /// Canonical nesting order, outermost first.
    const ORDER: [Mark; 3] = [Mark::Bold, Mark::Italic, Mark::Strike];

    fn format(self) -> TextFormat {
        match self {
            Mark::Bold => TextFormat::BOLD,
            Mark::Italic => TextFormat::ITALIC,
            Mark::Strike => TextFormat::STRIKETHROUGH,
        }
    }
}

/// Emphasis delimiters available under the enabled transformers.
#[derive(Debug, Clone, Copy)]
struct Delimiters {
    bold: Option<&'static str>,
    italic: Option<&'static str>,
    strike: Option<&'static str>,
    code: bool,
    link: bool,
    keyword: bool,
}

impl Delimiters {
    fn new(set: &TransformerSet) -> Self {
        let pick = |star: Transformer, underscore: Transformer| {
            [star, underscore]
                .into_iter()
                .find(|t| set.contains(*t))
                .and_then(|t| t.emphasis())
                .map(|(marker, _)| marker)
        };
        Self {
            bold: pick(Transformer::BoldStar, Transformer::BoldUnderscore),
            italic: pick(Transformer::ItalicStar, Transformer::ItalicUnderscore),
            strike: set.contains(Transformer::Strikethrough).then_some("~~"),
            code: set.contains(Transformer::InlineCode),
            link: set.contains(Transformer::Link),
            keyword: set.contains(Transformer::Keyword),
        }
    }

    fn marker(&self, mark: Mark) -> Option<&'static str> {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Strike => self.strike,
        }
    }
}

/// Serializes inline nodes, keeping emphasis markers balanced and whitespace
/// outside of them.
struct InlineWriter {
    delimiters: Delimiters,
    out: String,
    open: Vec<Mark>,
    /// Formats of the sibling runs after the node being written.
    ahead: Vec<TextFormat>,
    pending_ws: String,
}

impl InlineWriter {
    fn new(set: &TransformerSet) -> Self {
        Self {
            delimiters: Delimiters::new(set),
            out: String::new(),
            open: Vec::new(),
            ahead: Vec::new(),
            pending_ws: String::new(),
        }
    }

    fn children(&mut self, doc: &Document, parent: NodeKey) {
        let children = doc.children(parent);
        let runs: Vec<Option<TextFormat>> =
            children.iter().map(|&k| self.run_format(doc, k)).collect();
        for (i, &child) in children.iter().enumerate() {
            self.ahead = runs[i + 1..].iter().flatten().copied().collect();
            self.node(doc, child);
        }
        self.ahead.clear();
    }

    /// Format a child writes its content under, `None` when it writes
    /// nothing but whitespace.
    fn run_format(&self, doc: &Document, key: NodeKey) -> Option<TextFormat> {
        match doc.kind(key)? {
            NodeKind::Text { text, .. } if text.trim().is_empty() => None,
            NodeKind::Link { .. } if self.delimiters.link => Some(shared_format(doc, key)),
            kind => Some(kind.format().unwrap_or_default()),
        }
    }

    fn node(&mut self, doc: &Document, key: NodeKey) {
        let Some(kind) = doc.kind(key) else {
            return;
        };
        match kind {
            NodeKind::Text { text, format } => self.text(text, *format),
            NodeKind::Hashtag { text, format } => self.atom(text, *format),
            NodeKind::Keyword { text, format } => {
                if self.delimiters.keyword {
                    self.atom(&format!("{}{text}{}", Keyword::OPEN, Keyword::CLOSE), *format);
                } else {
                    self.text(text, *format);
                }
            }
            NodeKind::LineBreak => {
                self.set_format(TextFormat::empty());
                self.flush_ws();
                self.out.push('\n');
            }
            NodeKind::Link { url, title } if self.delimiters.link => {
                self.link(doc, key, url, title.as_deref());
            }
            NodeKind::List { .. } => {}
            _ => self.children(doc, key),
        }
    }

    fn link(&mut self, doc: &Document, key: NodeKey, url: &str, title: Option<&str>) {
        let shared = shared_format(doc, key);
        self.set_format(shared);
        self.flush_ws();

        let mut label = InlineWriter {
            delimiters: Delimiters {
                link: false,
                ..self.delimiters
            },
            out: String::new(),
            open: self.open.clone(),
            ahead: Vec::new(),
            pending_ws: String::new(),
        };
        let base = label.open.clone();
        label.children(doc, key);
        label.set_open(&base);
        label.flush_ws();

        self.out.push(Link::LABEL_OPEN);
        self.out.push_str(&label.out);
        self.out.push(Link::LABEL_CLOSE);
        self.out.push(Link::DEST_OPEN);
        self.out.push_str(url);
        if let Some(title) = title {
            self.out.push(' ');
            self.out.push(Link::TITLE_QUOTE);
            self.out.push_str(title);
            self.out.push(Link::TITLE_QUOTE);
        }
        self.out.push(Link::DEST_CLOSE);
    }

    fn text(&mut self, text: &str, format: TextFormat) {
        let core = text.trim_matches(char::is_whitespace);
        if core.is_empty() {
            self.pending_ws.push_str(text);
            return;
        }
        let lead_len = text.len() - text.trim_start_matches(char::is_whitespace).len();
        let trail = &text[lead_len + core.len()..];
        self.pending_ws.push_str(&text[..lead_len]);

        self.set_format(format);
        self.flush_ws();
        if format.contains(TextFormat::CODE) && self.delimiters.code {
            self.out.push_str(&code_span(core));
        } else {
            self.out.push_str(&escape_text(core));
        }
        self.pending_ws.push_str(trail);
    }

    /// Token written verbatim under `format`.
    fn atom(&mut self, text: &str, format: TextFormat) {
        if text.is_empty() {
            return;
        }
        self.set_format(format);
        self.flush_ws();
        self.out.push_str(text);
    }

    /// Close and open markers so exactly `format` is in effect.
    fn set_format(&mut self, format: TextFormat) {
        let mut wanted: Vec<Mark> = Mark::ORDER
            .into_iter()
            .filter(|m| format.contains(m.format()) && self.delimiters.marker(*m).is_some())
            .collect();
        // Marks that run on longer open first so they close last; ties keep
        // the canonical order.
        wanted.sort_by_key(|&mark| {
            std::cmp::Reverse(
                self.ahead
                    .iter()
                    .take_while(|f| f.contains(mark.format()))
                    .count(),
            )
        });
        self.set_open(&wanted);
    }

    /// Close open marks down to the longest stack prefix still wanted, then
    /// open the missing ones in `wanted` order.
    fn set_open(&mut self, wanted: &[Mark]) {
        let keep = self
            .open
            .iter()
            .take_while(|mark| wanted.contains(mark))
            .count();
        while self.open.len() > keep {
            if let Some(mark) = self.open.pop()
                && let Some(marker) = self.delimiters.marker(mark)
            {
                self.out.push_str(marker);
            }
        }
        let missing: Vec<Mark> = wanted
            .iter()
            .copied()
            .filter(|mark| !self.open.contains(mark))
            .collect();
        if !missing.is_empty() {
            self.flush_ws();
        }
        for mark in missing {
            if let Some(marker) = self.delimiters.marker(mark) {
                self.out.push_str(marker);
            }
            self.open.push(mark);
        }
    }

    fn flush_ws(&mut self) {
        self.out.push_str(&self.pending_ws);
        self.pending_ws.clear();
    }

    fn finish(mut self) -> String {
        self.set_open(&[]);
        self.flush_ws();
        self.out
    }
}

/// Emphasis shared by every leaf of a link label, which the writer keeps
/// outside the brackets.
fn shared_format(doc: &Document, key: NodeKey) -> TextFormat {
    doc.text_leaves(key)
        .iter()
        .filter_map(|&leaf| doc.kind(leaf).and_then(NodeKind::format))
        .reduce(|a, b| a & b)
        .unwrap_or_default()
        - TextFormat::CODE
}

/// Code span with a backtick fence longer than any run inside it.
fn code_span(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == CodeSpan::TICK {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let fence = CodeSpan::TICK.to_string().repeat(longest + 1);
    if text.starts_with(CodeSpan::TICK) || text.ends_with(CodeSpan::TICK) {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

/// Backslash-escape characters the inline parser would read as syntax.
fn escape_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let escape = match c {
            '\\' | '*' | '`' | '[' | ']' | '~' => true,
            '_' => {
                !(prev.is_some_and(char::is_alphanumeric) && next.is_some_and(char::is_alphanumeric))
            }
            Hashtag::SIGIL => Hashtag::can_follow(prev) && next.is_some_and(Hashtag::is_body_char),
            _ => false,
        };
        if escape {
            out.push(Escape::CHAR);
        }
        out.push(c);
    }
    out
}

/// Escape a line opening that would be read back as block syntax.
fn guard_line_start(line: &str) -> Cow<'_, str> {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    static ORDERED: OnceLock<Regex> = OnceLock::new();
    let heading = HEADING.get_or_init(|| {
        Regex::new(r"^#{1,6}(?:[ \t]|$)").expect("Invalid heading guard regex")
    });
    let ordered = ORDERED.get_or_init(|| {
        Regex::new(r"^(\d{1,9})[.)](?:[ \t]|$)").expect("Invalid ordered guard regex")
    });

    if heading.is_match(line) || line.starts_with(BlockQuote::PREFIX) {
        return Cow::Owned(format!("{}{line}", Escape::CHAR));
    }
    if let Some(rest) = line.strip_prefix(['-', '+'])
        && (rest.is_empty() || rest.starts_with([' ', '\t']))
    {
        return Cow::Owned(format!("{}{line}", Escape::CHAR));
    }
    if let Some(caps) = ordered.captures(line) {
        let digits = caps.get(1).map_or("", |m| m.as_str());
        return Cow::Owned(format!("{digits}{}{}", Escape::CHAR, &line[digits.len()..]));
    }
    Cow::Borrowed(line)
}
