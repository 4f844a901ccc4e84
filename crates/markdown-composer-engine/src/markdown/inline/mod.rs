//! Inline markdown: emphasis, code spans, links, keywords and hashtags.

pub mod cursor;
pub mod kinds;
pub mod parser;
pub mod types;

pub use parser::InlineParser;
pub use types::Inline;
