//! Block constructs, each owning its own delimiters.
//!
//! Classifier and exporter go through these types; neither hardcodes `>`,
//! `#`, fences or list markers.

pub mod block_quote;
pub mod code_fence;
pub mod heading;
pub mod list;

pub use block_quote::BlockQuote;
pub use code_fence::{CodeFence, FenceKind, FenceSig};
pub use heading::Heading;
pub use list::{ListItemLine, ListMarker, ListSyntax};
