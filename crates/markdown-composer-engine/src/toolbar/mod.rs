//! Toolbar state controller.
//!
//! Derives the control surface's display state from each committed snapshot
//! and turns clicks into commands on the editor's bus.

pub mod controller;
pub mod state;

pub use controller::{BlockFormat, ToolbarAction, ToolbarController};
pub use state::{BlockType, ToolbarState, sanitize_url};
