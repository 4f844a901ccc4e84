//! Turns a typed url or email address into a link once the word is finished.
//!
//! The word before the caret is checked when the typed text starts with
//! whitespace. Trailing punctuation stays outside the link, and text already
//! inside a link or code is left alone.

use std::sync::OnceLock;

use regex::Regex;

use crate::editing::commands::{Command, CommandKind, CommandPriority};
use crate::editing::editor::{Editor, Registration};
use crate::editing::node::{NodeKind, NodeType};
use crate::editing::ops::{self, TextCaret};
use crate::editing::selection::{Point, Selection};
use crate::error::EditorError;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '"', '\''];

/// Link target for `word`, or `None` when it is neither a url nor an email.
pub fn link_target(word: &str) -> Option<String> {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let url_regex = URL_REGEX.get_or_init(|| {
        Regex::new(
            r"^(?:https?://(?:www\.)?|www\.)[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b[-a-zA-Z0-9()@:%_+.~#?&/=]*$",
        )
        .expect("Invalid url regex")
    });
    let email_regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .expect("Invalid email regex")
    });

    if url_regex.is_match(word) {
        if word.starts_with("www.") {
            Some(format!("https://{word}"))
        } else {
            Some(word.to_string())
        }
    } else if email_regex.is_match(word) {
        Some(format!("mailto:{word}"))
    } else {
        None
    }
}

/// Char range of the linkable word ending at the caret, and its target.
fn word_before(caret: &TextCaret) -> Option<(usize, usize, String)> {
    let start = caret
        .before
        .iter()
        .rposition(|c| c.is_whitespace())
        .map_or(0, |i| i + 1);
    let word: String = caret.before[start..].iter().collect();
    let trimmed = word.trim_end_matches(TRAILING_PUNCTUATION);
    if trimmed.is_empty() {
        return None;
    }
    let target = link_target(trimmed)?;
    Some((start, start + trimmed.chars().count(), target))
}

/// Register the InsertText handler that links finished urls.
///
/// Runs at [`CommandPriority::Low`], ahead of the default insert, and claims
/// the command only when it links something.
pub fn register_auto_link(editor: &mut Editor) -> Vec<Registration> {
    let id = editor.register_command(CommandKind::InsertText, CommandPriority::Low, |command, editor| {
        let Command::InsertText(typed) = command else {
            return Ok(false);
        };
        if !editor.is_editable() || !typed.starts_with(char::is_whitespace) {
            return Ok(false);
        }
        let doc = editor.document();
        let Some(caret) = ops::text_caret(doc, editor.selection()) else {
            return Ok(false);
        };
        if doc.nearest_of_type(caret.leaf, NodeType::Link).is_some() {
            return Ok(false);
        }
        let Some((start, end, url)) = word_before(&caret) else {
            return Ok(false);
        };
        log::debug!("auto-linking {url}");

        let typed = typed.clone();
        editor.update(move |draft| {
            let word: String = caret.before[start..end].iter().collect();
            let (link, rest) = ops::splice_text(
                &mut draft.document,
                caret.leaf,
                start,
                end,
                NodeKind::Link { url, title: None },
            )?;
            let label = draft.document.create(NodeKind::formatted(word, caret.format));
            draft.document.append(link, label)?;
            // Punctuation cut from the word sits at the start of `rest`.
            let caret_at = Point::text(rest, caret.offset - end);
            draft.set_selection(Some(Selection::caret(caret_at)));
            if let Some(range) = draft.range_selection_mut() {
                range.format = caret.format;
            }
            ops::insert_text(draft, &typed)
        })?;
        Ok(true)
    });
    vec![Registration::Command(id)]
}
