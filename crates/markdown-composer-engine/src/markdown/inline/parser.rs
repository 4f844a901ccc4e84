use super::cursor::Cursor;
use super::kinds::{CodeSpan, Escape, Hashtag, Keyword, Link};
use super::types::Inline;
use crate::editing::TextFormat;
use crate::markdown::transformers::{Transformer, TransformerSet};

/// Parses the text of one block into inline nodes.
///
/// Constructs are tried in the order of the transformer set; the first one
/// that matches at a position wins.
#[derive(Debug, Clone)]
pub struct InlineParser {
    rules: Vec<Transformer>,
}

impl InlineParser {
    pub fn new(set: &TransformerSet) -> Self {
        Self { rules: set.inline() }
    }

    pub fn parse(&self, s: &str) -> Vec<Inline> {
        self.parse_with(s, TextFormat::empty(), true)
    }

    fn has(&self, rule: Transformer) -> bool {
        self.rules.contains(&rule)
    }

    fn parse_with(&self, s: &str, format: TextFormat, allow_links: bool) -> Vec<Inline> {
        let mut out = Vec::new();
        let mut text = String::new();
        let mut cur = Cursor::new(s);

        while let Some(c) = cur.peek() {
            if c == Escape::CHAR && cur.peek_next().is_some_and(Escape::escapable) {
                cur.bump();
                if let Some(escaped) = cur.bump() {
                    text.push(escaped);
                }
                continue;
            }
            if c == '\n' {
                flush_text(&mut out, &mut text, format);
                out.push(Inline::LineBreak);
                cur.bump();
                continue;
            }
            if let Some(parsed) = self.try_rules(&mut cur, format, allow_links) {
                flush_text(&mut out, &mut text, format);
                for inline in parsed {
                    push_merged(&mut out, inline);
                }
                continue;
            }
            text.push(c);
            cur.bump();
        }
        flush_text(&mut out, &mut text, format);
        out
    }

    fn try_rules(
        &self,
        cur: &mut Cursor,
        format: TextFormat,
        allow_links: bool,
    ) -> Option<Vec<Inline>> {
        for rule in &self.rules {
            let parsed = match rule {
                Transformer::InlineCode => try_parse_code_span(cur, format).map(|i| vec![i]),
                Transformer::Keyword => try_parse_keyword(cur, format).map(|i| vec![i]),
                Transformer::Link if allow_links => {
                    self.try_parse_link(cur, format).map(|i| vec![i])
                }
                Transformer::Hashtag => try_parse_hashtag(cur, format).map(|i| vec![i]),
                other => match other.emphasis() {
                    Some((marker, add)) => {
                        self.try_parse_emphasis(cur, marker, add, format, allow_links)
                    }
                    None => None,
                },
            };
            if parsed.is_some() {
                return parsed;
            }
        }
        None
    }

    /// `[label](url "title")`; the label may carry formatting but no links.
    fn try_parse_link(&self, cur: &mut Cursor, format: TextFormat) -> Option<Inline> {
        if cur.peek() != Some(Link::LABEL_OPEN) {
            return None;
        }
        let start = cur.pos();
        cur.bump();
        let label_start = cur.pos();
        let mut depth = 0usize;
        let label_end = loop {
            match cur.peek() {
                None => {
                    cur.i = start;
                    return None;
                }
                Some(Escape::CHAR) => {
                    cur.bump();
                    cur.bump();
                }
                Some(Link::LABEL_OPEN) => {
                    depth += 1;
                    cur.bump();
                }
                Some(Link::LABEL_CLOSE) if depth == 0 => break cur.pos(),
                Some(Link::LABEL_CLOSE) => {
                    depth -= 1;
                    cur.bump();
                }
                Some(_) => {
                    cur.bump();
                }
            }
        };
        cur.bump();
        if label_end == label_start || cur.peek() != Some(Link::DEST_OPEN) {
            cur.i = start;
            return None;
        }
        cur.bump();
        skip_spaces(cur);

        let url_start = cur.pos();
        while cur
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != Link::DEST_CLOSE)
        {
            cur.bump();
        }
        let url = cur.s[url_start..cur.pos()].to_string();
        skip_spaces(cur);

        let mut title = None;
        if cur.peek() == Some(Link::TITLE_QUOTE) {
            cur.bump();
            let title_start = cur.pos();
            while cur.peek().is_some_and(|c| c != Link::TITLE_QUOTE) {
                cur.bump();
            }
            if cur.eof() {
                cur.i = start;
                return None;
            }
            title = Some(cur.s[title_start..cur.pos()].to_string());
            cur.bump();
            skip_spaces(cur);
        }
        if cur.peek() != Some(Link::DEST_CLOSE) {
            cur.i = start;
            return None;
        }
        cur.bump();

        let children = self.parse_with(&cur.s[label_start..label_end], format, false);
        Some(Inline::Link {
            url,
            title,
            children,
        })
    }

    fn try_parse_emphasis(
        &self,
        cur: &mut Cursor,
        marker: &str,
        add: TextFormat,
        format: TextFormat,
        allow_links: bool,
    ) -> Option<Vec<Inline>> {
        if !cur.starts_with(marker) {
            return None;
        }
        let marker_char = marker.chars().next()?;
        let n = marker.len();
        let start = cur.pos();
        let content_start = start + n;

        let after = cur.s.get(content_start..).and_then(|r| r.chars().next());
        if !after.is_some_and(|c| !c.is_whitespace()) {
            return None;
        }
        if marker_char == '_' && cur.prev().is_some_and(char::is_alphanumeric) {
            return None;
        }

        let closer = self.find_closer(cur.s, content_start, marker_char, n)?;
        if closer == content_start {
            return None;
        }
        let inner = self.parse_with(&cur.s[content_start..closer], format | add, allow_links);
        cur.i = closer + n;
        Some(inner)
    }

    /// Position of the run that closes an emphasis opened just before `from`.
    ///
    /// Runs that could open count as nested openers and must be closed
    /// first.
    fn find_closer(&self, s: &str, from: usize, marker: char, n: usize) -> Option<usize> {
        let mut cur = Cursor::at(s, from);
        let mut open = 0usize;
        let intraword_sensitive = marker == '_';

        while let Some(c) = cur.peek() {
            if c == Escape::CHAR && cur.peek_next().is_some_and(Escape::escapable) {
                cur.bump();
                cur.bump();
                continue;
            }
            if c == CodeSpan::TICK && self.has(Transformer::InlineCode) {
                match code_span_bounds(s, cur.pos()) {
                    Some((_, _, end)) => cur.i = end,
                    None => cur.bump_n(cur.run_len(CodeSpan::TICK)),
                }
                continue;
            }
            if c != marker {
                cur.bump();
                continue;
            }

            let i = cur.pos();
            let run = cur.run_len(marker);
            let before = cur.prev();
            let after = s.get(i + run..).and_then(|r| r.chars().next());
            // The rest of the opening run (`***` split as `*` + `**`) only opens.
            let can_close = i != from
                && before.is_some_and(|b| !b.is_whitespace())
                && !(intraword_sensitive && after.is_some_and(char::is_alphanumeric));
            let can_open = after.is_some_and(|a| !a.is_whitespace())
                && !(intraword_sensitive && before.is_some_and(char::is_alphanumeric));

            let mut rem = run;
            if can_close {
                let used = rem.min(open);
                open -= used;
                rem -= used;
                if rem >= n {
                    return Some(i + run - rem);
                }
            }
            if can_open {
                open += rem;
            }
            cur.bump_n(run);
        }
        None
    }
}

fn skip_spaces(cur: &mut Cursor) {
    while cur.peek().is_some_and(|c| c == ' ' || c == '\t') {
        cur.bump();
    }
}

fn flush_text(out: &mut Vec<Inline>, text: &mut String, format: TextFormat) {
    if text.is_empty() {
        return;
    }
    push_merged(
        out,
        Inline::Text {
            text: std::mem::take(text),
            format,
        },
    );
}

/// Append, joining with a preceding text run of the same format.
fn push_merged(out: &mut Vec<Inline>, inline: Inline) {
    if let Inline::Text { text, format } = &inline
        && let Some(Inline::Text {
            text: last,
            format: last_format,
        }) = out.last_mut()
        && *last_format == *format
    {
        last.push_str(text);
        return;
    }
    out.push(inline);
}

/// Byte offsets of a code span starting at `start`: content start, content
/// end and the end of the closing run.
fn code_span_bounds(s: &str, start: usize) -> Option<(usize, usize, usize)> {
    let open = Cursor::at(s, start).run_len(CodeSpan::TICK);
    if open == 0 {
        return None;
    }
    let content_start = start + open;
    let mut pos = content_start;
    while let Some(offset) = s.get(pos..)?.find(CodeSpan::TICK) {
        let j = pos + offset;
        let run = Cursor::at(s, j).run_len(CodeSpan::TICK);
        if run == open {
            return Some((content_start, j, j + run));
        }
        pos = j + run;
    }
    None
}

fn try_parse_code_span(cur: &mut Cursor, format: TextFormat) -> Option<Inline> {
    if cur.peek() != Some(CodeSpan::TICK) {
        return None;
    }
    let (content_start, content_end, end) = code_span_bounds(cur.s, cur.pos())?;
    let mut text = cur.s[content_start..content_end].replace('\n', " ");
    if text.len() >= 2 && text.starts_with(' ') && text.ends_with(' ') && !text.trim().is_empty()
    {
        text = text[1..text.len() - 1].to_string();
    }
    if text.is_empty() {
        return None;
    }
    cur.i = end;
    Some(Inline::Text {
        text,
        format: format | TextFormat::CODE,
    })
}

fn try_parse_keyword(cur: &mut Cursor, format: TextFormat) -> Option<Inline> {
    if !cur.starts_with(Keyword::OPEN) {
        return None;
    }
    let content_start = cur.pos() + Keyword::OPEN.len();
    let rest = cur.s.get(content_start..)?;
    let len = rest.find(Keyword::CLOSE)?;
    let text = &rest[..len];
    if text.is_empty() || text.contains(['[', ']', '\n']) {
        return None;
    }
    cur.i = content_start + len + Keyword::CLOSE.len();
    Some(Inline::Keyword {
        text: text.to_string(),
        format,
    })
}

fn try_parse_hashtag(cur: &mut Cursor, format: TextFormat) -> Option<Inline> {
    if cur.peek() != Some(Hashtag::SIGIL) || !Hashtag::can_follow(cur.prev()) {
        return None;
    }
    let start = cur.pos();
    cur.bump();
    let mut has_letter = false;
    while let Some(c) = cur.peek().filter(|c| Hashtag::is_body_char(*c)) {
        has_letter |= c.is_alphabetic();
        cur.bump();
    }
    if !has_letter {
        cur.i = start;
        return None;
    }
    Some(Inline::Hashtag {
        text: cur.s[start..cur.pos()].to_string(),
        format,
    })
}
