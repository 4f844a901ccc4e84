use std::sync::Arc;

use crate::editing::document::Document;
use crate::editing::patch::Patch;
use crate::editing::selection::{RangeSelection, Selection};

/// Immutable committed editor state.
///
/// Snapshots share their document through an `Arc`, so holding on to an old
/// snapshot is cheap and it never observes later edits.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub document: Arc<Document>,
    pub selection: Option<Selection>,
    pub editable: bool,
}

impl Snapshot {
    pub(crate) fn initial(document: Document, editable: bool) -> Self {
        Self {
            version: 0,
            document: Arc::new(document),
            selection: None,
            editable,
        }
    }

    /// Run a read-only query against this state.
    pub fn read<R>(&self, f: impl FnOnce(&Document, Option<&Selection>) -> R) -> R {
        f(&self.document, self.selection.as_ref())
    }

    pub fn range_selection(&self) -> Option<&RangeSelection> {
        self.selection.as_ref().and_then(Selection::as_range)
    }
}

/// Delivered to every update listener after a commit.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    pub snapshot: Snapshot,
    pub previous: Snapshot,
    pub patch: Patch,
}
