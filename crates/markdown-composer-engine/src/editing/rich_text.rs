//! Default handlers for the rich-text commands.
//!
//! Installed at [`CommandPriority::Editor`], the lowest priority, so any other
//! handler can claim a command first.

use crate::editing::commands::{Command, CommandKind, CommandPriority};
use crate::editing::document::Document;
use crate::editing::editor::{Draft, Editor, Registration};
use crate::editing::ops;
use crate::editing::patch::UpdateTag;
use crate::editing::selection::{Point, Selection};
use crate::error::EditorError;

/// Run `op` in an update when the session accepts edits and has a range selection.
fn mutate(
    editor: &mut Editor,
    kind: CommandKind,
    op: impl FnOnce(&mut Draft) -> Result<(), EditorError> + 'static,
) -> Result<bool, EditorError> {
    if editor.snapshot().range_selection().is_none() {
        log::debug!("{kind} refused: no range selection");
        return Ok(false);
    }
    mutate_any(editor, kind, op)
}

/// Like [`mutate`], but a node selection is enough.
fn mutate_any(
    editor: &mut Editor,
    kind: CommandKind,
    op: impl FnOnce(&mut Draft) -> Result<(), EditorError> + 'static,
) -> Result<bool, EditorError> {
    if !editor.is_editable() {
        log::debug!("{kind} refused: session is read-only");
        return Ok(false);
    }
    if editor.snapshot().selection.is_none() {
        log::debug!("{kind} refused: no selection");
        return Ok(false);
    }
    editor.update(op)?;
    Ok(true)
}

pub fn register_rich_text(editor: &mut Editor) -> Vec<Registration> {
    let mut registrations = Vec::new();
    let mut register = |editor: &mut Editor,
                        kind: CommandKind,
                        handler: fn(&Command, &mut Editor) -> Result<bool, EditorError>| {
        registrations.push(Registration::Command(editor.register_command(
            kind,
            CommandPriority::Editor,
            handler,
        )));
    };

    register(editor, CommandKind::FormatText, |command, editor| {
        let Command::FormatText(format) = command else {
            return Ok(false);
        };
        let format = *format;
        mutate(editor, CommandKind::FormatText, move |draft| {
            ops::format_text(draft, format)
        })
    });

    register(editor, CommandKind::ToggleLink, |command, editor| {
        let Command::ToggleLink(url) = command else {
            return Ok(false);
        };
        let url = url.clone();
        mutate(editor, CommandKind::ToggleLink, move |draft| {
            ops::toggle_link(draft, url)
        })
    });

    register(editor, CommandKind::InsertList, |command, editor| {
        let Command::InsertList(list_type) = command else {
            return Ok(false);
        };
        let list_type = *list_type;
        mutate(editor, CommandKind::InsertList, move |draft| {
            ops::insert_list(draft, list_type)
        })
    });

    register(editor, CommandKind::RemoveList, |_, editor| {
        mutate(editor, CommandKind::RemoveList, ops::remove_list)
    });

    register(editor, CommandKind::SetBlockType, |command, editor| {
        let Command::SetBlockType(target) = command else {
            return Ok(false);
        };
        let target = *target;
        mutate(editor, CommandKind::SetBlockType, move |draft| {
            ops::set_block_type(draft, target)
        })
    });

    register(editor, CommandKind::InsertText, |command, editor| {
        let Command::InsertText(text) = command else {
            return Ok(false);
        };
        let text = text.clone();
        mutate_any(editor, CommandKind::InsertText, move |draft| {
            ops::insert_text(draft, &text)
        })
    });

    register(editor, CommandKind::ClearEditor, |_, editor| {
        if !editor.is_editable() {
            log::debug!("clear-editor refused: session is read-only");
            return Ok(false);
        }
        editor.update_with_tag(UpdateTag::Clear, |draft| {
            draft.replace(Document::new());
            let paragraph = draft.document().root().children().first().copied();
            draft.set_selection(paragraph.map(|p| Selection::caret(Point::element(p, 0))));
            Ok(())
        })?;
        Ok(true)
    });

    registrations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::node::{ListType, NodeKind, TextFormat};
    use crate::editing::selection::locate_text;

    fn editor_with_paragraph(text: &str) -> Editor {
        let mut doc = Document::new();
        let p = doc.root().children()[0];
        let leaf = doc.create(NodeKind::text(text));
        doc.append(p, leaf).unwrap();
        let mut editor = Editor::with_state(doc, None, true);
        register_rich_text(&mut editor);
        editor
    }

    fn select(editor: &mut Editor, needle: &'static str) {
        editor
            .update(move |draft| {
                let range = locate_text(draft.document(), needle);
                draft.set_selection(range.map(Selection::Range));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_commands_without_selection_stay_unclaimed() {
        let mut editor = editor_with_paragraph("text");
        assert!(!editor.dispatch(Command::FormatText(TextFormat::BOLD)).unwrap());
        assert_eq!(editor.version(), 0);
    }

    #[test]
    fn test_read_only_session_refuses_mutations() {
        let mut editor = editor_with_paragraph("text");
        select(&mut editor, "text");
        editor.set_editable(false);
        let version = editor.version();

        assert!(!editor.dispatch(Command::FormatText(TextFormat::BOLD)).unwrap());
        assert!(!editor.dispatch(Command::InsertList(ListType::Bullet)).unwrap());
        assert!(!editor.dispatch(Command::ClearEditor).unwrap());
        assert_eq!(editor.version(), version);
    }

    #[test]
    fn test_format_command_claims_and_commits() {
        let mut editor = editor_with_paragraph("some text");
        select(&mut editor, "text");
        let version = editor.version();
        assert!(editor.dispatch(Command::FormatText(TextFormat::ITALIC)).unwrap());
        assert_eq!(editor.version(), version + 1);
    }

    #[test]
    fn test_clear_editor_leaves_single_empty_paragraph() {
        let mut editor = editor_with_paragraph("some text");
        assert!(editor.dispatch(Command::ClearEditor).unwrap());
        assert!(editor.document().is_empty());
        assert_eq!(editor.document().root().children().len(), 1);
    }

    #[test]
    fn test_every_default_handler_is_registered_at_editor_priority() {
        let mut editor = Editor::new(Document::new());
        let registrations = register_rich_text(&mut editor);
        assert_eq!(registrations.len(), 7);
        for registration in registrations {
            assert!(editor.unregister(registration));
        }
        assert_eq!(editor.handler_count(CommandKind::FormatText), 0);
    }
}
