//! Inline constructs with their delimiters.

/// `` `code` ``: a raw zone, nothing is parsed inside.
pub struct CodeSpan;

impl CodeSpan {
    pub const TICK: char = '`';
}

/// `[[word]]`
pub struct Keyword;

impl Keyword {
    pub const OPEN: &'static str = "[[";
    pub const CLOSE: &'static str = "]]";
}

/// `[label](url "title")`
pub struct Link;

impl Link {
    pub const LABEL_OPEN: char = '[';
    pub const LABEL_CLOSE: char = ']';
    pub const DEST_OPEN: char = '(';
    pub const DEST_CLOSE: char = ')';
    pub const TITLE_QUOTE: char = '"';
}

/// `#word`
pub struct Hashtag;

impl Hashtag {
    pub const SIGIL: char = '#';

    /// Characters allowed in the tag body.
    pub fn is_body_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    /// A tag may not follow a word character.
    pub fn can_follow(prev: Option<char>) -> bool {
        !prev.is_some_and(|p| Self::is_body_char(p) || p == Self::SIGIL)
    }
}

/// Backslash escape of ASCII punctuation.
pub struct Escape;

impl Escape {
    pub const CHAR: char = '\\';

    pub fn escapable(c: char) -> bool {
        c.is_ascii_punctuation()
    }
}
