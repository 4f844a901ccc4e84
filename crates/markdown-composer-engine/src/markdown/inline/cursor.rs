/// Position in a string being parsed for inline constructs.
///
/// Steps over whole characters; `i` is always on a char boundary.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    pub s: &'a str,
    pub i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn at(s: &'a str, i: usize) -> Self {
        Self { s, i }
    }

    pub fn pos(&self) -> usize {
        self.i
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    pub fn rest(&self) -> &'a str {
        self.s.get(self.i..).unwrap_or_default()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Character after the current one.
    pub fn peek_next(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    /// Character just before the cursor.
    pub fn prev(&self) -> Option<char> {
        self.s.get(..self.i).and_then(|before| before.chars().next_back())
    }

    pub fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.i += c.len_utf8();
        Some(c)
    }

    /// Advance by `n` bytes; callers only skip over ASCII delimiters.
    pub fn bump_n(&mut self, n: usize) {
        self.i = (self.i + n).min(self.s.len());
    }

    /// Length in bytes of the run of `c` starting here.
    pub fn run_len(&self, c: char) -> usize {
        self.rest().len() - self.rest().trim_start_matches(c).len()
    }
}
