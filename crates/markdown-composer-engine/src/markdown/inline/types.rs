use crate::editing::TextFormat;

/// Inline content produced by the parser, ready to become document nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text { text: String, format: TextFormat },
    Hashtag { text: String, format: TextFormat },
    Keyword { text: String, format: TextFormat },
    Link {
        url: String,
        title: Option<String>,
        children: Vec<Inline>,
    },
    LineBreak,
}
