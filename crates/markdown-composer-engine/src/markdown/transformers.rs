use std::fmt;
use std::str::FromStr;

use crate::editing::TextFormat;
use crate::error::MarkdownError;

/// One markdown construct the bridge knows how to read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transformer {
    Heading,
    Quote,
    CodeBlock,
    CheckList,
    UnorderedList,
    OrderedList,
    InlineCode,
    Keyword,
    Link,
    BoldItalicStar,
    BoldItalicUnderscore,
    BoldStar,
    BoldUnderscore,
    Strikethrough,
    ItalicStar,
    ItalicUnderscore,
    Hashtag,
}

impl Transformer {
    pub const ALL: [Transformer; 17] = [
        Transformer::Heading,
        Transformer::Quote,
        Transformer::CodeBlock,
        Transformer::CheckList,
        Transformer::UnorderedList,
        Transformer::OrderedList,
        Transformer::InlineCode,
        Transformer::Keyword,
        Transformer::Link,
        Transformer::BoldItalicStar,
        Transformer::BoldItalicUnderscore,
        Transformer::BoldStar,
        Transformer::BoldUnderscore,
        Transformer::Strikethrough,
        Transformer::ItalicStar,
        Transformer::ItalicUnderscore,
        Transformer::Hashtag,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Transformer::Heading => "heading",
            Transformer::Quote => "quote",
            Transformer::CodeBlock => "code-block",
            Transformer::CheckList => "check-list",
            Transformer::UnorderedList => "unordered-list",
            Transformer::OrderedList => "ordered-list",
            Transformer::InlineCode => "inline-code",
            Transformer::Keyword => "keyword",
            Transformer::Link => "link",
            Transformer::BoldItalicStar => "bold-italic-star",
            Transformer::BoldItalicUnderscore => "bold-italic-underscore",
            Transformer::BoldStar => "bold-star",
            Transformer::BoldUnderscore => "bold-underscore",
            Transformer::Strikethrough => "strikethrough",
            Transformer::ItalicStar => "italic-star",
            Transformer::ItalicUnderscore => "italic-underscore",
            Transformer::Hashtag => "hashtag",
        }
    }

    /// Block constructs own whole lines; everything else works inside a line.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            Transformer::Heading
                | Transformer::Quote
                | Transformer::CodeBlock
                | Transformer::CheckList
                | Transformer::UnorderedList
                | Transformer::OrderedList
        )
    }

    /// Delimiter and format for the emphasis constructs.
    pub fn emphasis(self) -> Option<(&'static str, TextFormat)> {
        let bold_italic = TextFormat::BOLD | TextFormat::ITALIC;
        match self {
            Transformer::BoldItalicStar => Some(("***", bold_italic)),
            Transformer::BoldItalicUnderscore => Some(("___", bold_italic)),
            Transformer::BoldStar => Some(("**", TextFormat::BOLD)),
            Transformer::BoldUnderscore => Some(("__", TextFormat::BOLD)),
            Transformer::Strikethrough => Some(("~~", TextFormat::STRIKETHROUGH)),
            Transformer::ItalicStar => Some(("*", TextFormat::ITALIC)),
            Transformer::ItalicUnderscore => Some(("_", TextFormat::ITALIC)),
            _ => None,
        }
    }
}

impl fmt::Display for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transformer {
    type Err = MarkdownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Transformer::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| MarkdownError::UnknownTransformer(s.to_string()))
    }
}

/// Pairs that must appear in this relative order when both are present.
const ORDERING: [(Transformer, Transformer); 8] = [
    (Transformer::CheckList, Transformer::UnorderedList),
    (Transformer::Keyword, Transformer::Link),
    (Transformer::BoldItalicStar, Transformer::BoldStar),
    (Transformer::BoldStar, Transformer::ItalicStar),
    (Transformer::BoldItalicStar, Transformer::ItalicStar),
    (Transformer::BoldItalicUnderscore, Transformer::BoldUnderscore),
    (Transformer::BoldUnderscore, Transformer::ItalicUnderscore),
    (Transformer::BoldItalicUnderscore, Transformer::ItalicUnderscore),
];

/// A validated, ordered list of transformers.
///
/// Order is precedence: when two constructs could match at the same place,
/// the one listed first wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformerSet {
    transformers: Vec<Transformer>,
}

impl TransformerSet {
    pub fn new(transformers: Vec<Transformer>) -> Result<Self, MarkdownError> {
        if transformers.is_empty() {
            return Err(MarkdownError::EmptyTransformers);
        }
        for (i, t) in transformers.iter().enumerate() {
            if transformers[..i].contains(t) {
                return Err(MarkdownError::DuplicateTransformer(*t));
            }
        }
        let position = |t: Transformer| transformers.iter().position(|x| *x == t);

        if let Some(first_block_after_inline) = transformers
            .iter()
            .skip_while(|t| t.is_block())
            .find(|t| t.is_block())
        {
            let earlier = transformers
                .iter()
                .find(|t| !t.is_block())
                .copied()
                .unwrap_or(*first_block_after_inline);
            return Err(MarkdownError::TransformerOrder {
                earlier,
                later: *first_block_after_inline,
            });
        }
        for (first, second) in ORDERING {
            if let (Some(a), Some(b)) = (position(first), position(second))
                && b < a
            {
                return Err(MarkdownError::TransformerOrder {
                    earlier: second,
                    later: first,
                });
            }
        }
        Ok(Self { transformers })
    }

    /// Parse a list of transformer names, as found in configuration.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, MarkdownError> {
        let transformers = names
            .iter()
            .map(|name| name.as_ref().trim().parse())
            .collect::<Result<Vec<Transformer>, _>>()?;
        Self::new(transformers)
    }

    pub fn contains(&self, transformer: Transformer) -> bool {
        self.transformers.contains(&transformer)
    }

    pub fn iter(&self) -> impl Iterator<Item = Transformer> + '_ {
        self.transformers.iter().copied()
    }

    /// Inline transformers in precedence order.
    pub fn inline(&self) -> Vec<Transformer> {
        self.iter().filter(|t| !t.is_block()).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Transformer::name).collect()
    }
}

impl Default for TransformerSet {
    fn default() -> Self {
        Self {
            transformers: Transformer::ALL.to_vec(),
        }
    }
}
