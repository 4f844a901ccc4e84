pub mod editing;
pub mod error;
pub mod markdown;
pub mod session;
pub mod toolbar;

// Re-export key types for easier usage
pub use editing::*;
pub use error::{EditorError, MarkdownError};
pub use markdown::{MarkdownBridge, Transformer, TransformerSet};
pub use session::{Session, SessionOptions};
pub use toolbar::{BlockFormat, BlockType, ToolbarAction, ToolbarController, ToolbarState};
