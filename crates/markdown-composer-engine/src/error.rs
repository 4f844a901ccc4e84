use thiserror::Error;

use crate::editing::{NodeKey, NodeType};
use crate::markdown::Transformer;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("selection point references {key}, which is not a live node of the matching kind")]
    InvalidSelection { key: NodeKey },

    #[error("node {0} not found")]
    NodeNotFound(NodeKey),

    #[error("node {key} is a {node_type} and cannot hold children")]
    NotAnElement { key: NodeKey, node_type: NodeType },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("markdown: {0}")]
    Markdown(#[from] MarkdownError),
}

/// Construction-time failures of the markdown bridge.
///
/// Malformed markdown never produces an error: unmatched constructs are kept
/// as plain text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkdownError {
    #[error("transformer set is empty")]
    EmptyTransformers,

    #[error("transformer {0} is listed more than once")]
    DuplicateTransformer(Transformer),

    #[error("transformer {later} must be listed before {earlier}")]
    TransformerOrder {
        earlier: Transformer,
        later: Transformer,
    },

    #[error("unknown transformer name: {0}")]
    UnknownTransformer(String),

    #[error("heading level {0} is outside 1..=6")]
    InvalidHeadingLevel(u8),
}
