/// Markers attached to an update so listeners can tell where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateTag {
    /// Replay from the undo/redo history; history itself must not record it.
    Historic,
    /// Document replaced by an import.
    Import,
    /// Document reset to a single empty paragraph.
    Clear,
}

/// Result of committing an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub version: u64,
    pub content_changed: bool,
    pub selection_changed: bool,
    pub editable_changed: bool,
    pub tags: Vec<UpdateTag>,
}

impl Patch {
    pub fn has_tag(&self, tag: UpdateTag) -> bool {
        self.tags.contains(&tag)
    }

    /// True when anything observable changed.
    pub fn is_dirty(&self) -> bool {
        self.content_changed || self.selection_changed || self.editable_changed
    }
}

/// What happened to a requested update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A new version was committed and listeners ran.
    Committed { version: u64 },
    /// The mutation left content, selection and mode untouched.
    Unchanged,
    /// Requested from inside a listener; it runs once the current pass ends.
    Queued,
}

impl UpdateOutcome {
    pub fn committed(self) -> bool {
        matches!(self, UpdateOutcome::Committed { .. })
    }
}
