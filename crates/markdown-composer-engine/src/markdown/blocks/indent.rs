/// How nested list items are indented in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentStyle {
    /// Spaces per nesting level.
    Spaces(usize),
    Tabs,
}

impl IndentStyle {
    /// Nesting depth of an indentation prefix.
    ///
    /// Under a spaces style a tab counts as one full level.
    pub fn calculate_depth(&self, indent: &str) -> usize {
        match self {
            IndentStyle::Tabs => indent.chars().take_while(|&c| c == '\t').count(),
            IndentStyle::Spaces(per_level) => {
                let per_level = (*per_level).max(1);
                let (spaces, tabs) = indent.chars().fold((0, 0), |(s, t), c| match c {
                    ' ' => (s + 1, t),
                    '\t' => (s, t + 1),
                    _ => (s, t),
                });
                spaces / per_level + tabs
            }
        }
    }
}

/// Style of the first indented list marker, or `Spaces(fallback)`.
pub fn detect_indent_style<'a>(indents: impl IntoIterator<Item = &'a str>, fallback: usize) -> IndentStyle {
    for indent in indents {
        if indent.starts_with('\t') {
            return IndentStyle::Tabs;
        }
        let spaces = indent.chars().take_while(|&c| c == ' ').count();
        if spaces > 0 {
            return IndentStyle::Spaces(spaces);
        }
    }
    IndentStyle::Spaces(fallback.max(1))
}
