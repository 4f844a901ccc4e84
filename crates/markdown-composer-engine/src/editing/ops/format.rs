use crate::editing::editor::Draft;
use crate::editing::node::{NodeKind, TextFormat};
use crate::error::EditorError;

use super::isolate_selected;

/// Toggle `format` over the selection.
///
/// A caret only flips the pending format used for the next typed text. A
/// range removes the format when all covered text already has it and adds it
/// everywhere otherwise.
pub(crate) fn format_text(draft: &mut Draft, format: TextFormat) -> Result<(), EditorError> {
    let Some(range) = draft.range_selection().cloned() else {
        return Ok(());
    };
    let covered = range
        .segments(&draft.document)
        .iter()
        .any(|s| !s.is_empty());
    if range.is_collapsed() || !covered {
        if let Some(range) = draft.range_selection_mut() {
            range.format.toggle(format);
        }
        return Ok(());
    }

    let remove = range.has_format(&draft.document, format);
    let keys = isolate_selected(&mut draft.document, &mut draft.selection)?;
    for &key in &keys {
        let kind = draft.document.kind_mut(key)?;
        let mut current = kind.format().unwrap_or_default();
        current.set(format, !remove);
        kind.set_format(current);
    }

    let first_format = keys
        .first()
        .and_then(|&k| draft.document.kind(k))
        .and_then(NodeKind::format)
        .unwrap_or_default();
    if let Some(range) = draft.range_selection_mut() {
        range.format = first_format;
    }
    Ok(())
}
