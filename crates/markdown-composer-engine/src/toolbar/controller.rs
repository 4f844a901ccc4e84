use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::editing::{
    BlockTarget, Command, CommandKind, CommandPriority, Editor, ListType, Registration, TextFormat,
};
use crate::error::EditorError;
use crate::toolbar::state::{BlockType, ToolbarState, derive_state, sanitize_url};

/// Entries of the block-format menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFormat {
    Normal,
    Heading,
}

/// A click on one of the toolbar controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarAction {
    Undo,
    Redo,
    ToggleBold,
    ToggleItalic,
    /// Link the selection to the url, or unlink it when already on a link.
    ToggleLink(String),
    ToggleBulletedList,
    ToggleNumberedList,
    FormatBlock(BlockFormat),
}

/// Keeps a [`ToolbarState`] in step with the editor and turns toolbar
/// actions into commands.
///
/// The state is only ever written by the editor's own notifications:
/// update listener, `SelectionChange`, `CanUndo` and `CanRedo`.
#[derive(Debug)]
pub struct ToolbarController {
    state: Rc<RefCell<ToolbarState>>,
    rebuilds: Rc<Cell<u64>>,
    heading_level: u8,
    registrations: Vec<Registration>,
}

impl ToolbarController {
    pub fn register(editor: &mut Editor, heading_level: u8) -> Self {
        let initial = derive_state(
            &ToolbarState::default(),
            editor.snapshot(),
            heading_level,
        );
        let state = Rc::new(RefCell::new(initial));
        let rebuilds = Rc::new(Cell::new(0));
        let mut registrations = Vec::new();

        let on_selection = Rc::clone(&state);
        let selection_rebuilds = Rc::clone(&rebuilds);
        registrations.push(Registration::Command(editor.register_command(
            CommandKind::SelectionChange,
            CommandPriority::Critical,
            move |_, editor| {
                refresh(&on_selection, &selection_rebuilds, editor, heading_level);
                Ok(false)
            },
        )));

        let on_update = Rc::clone(&state);
        let update_rebuilds = Rc::clone(&rebuilds);
        // Selection moves are picked up by the SelectionChange handler, which
        // the editor dispatches right after this pass.
        registrations.push(Registration::Listener(editor.on_update(move |event, editor| {
            if !event.patch.selection_changed {
                refresh(&on_update, &update_rebuilds, editor, heading_level);
            }
        })));

        let can_undo = Rc::clone(&state);
        registrations.push(Registration::Command(editor.register_command(
            CommandKind::CanUndo,
            CommandPriority::Critical,
            move |command, _| {
                if let Command::CanUndo(available) = command {
                    can_undo.borrow_mut().can_undo = *available;
                }
                Ok(false)
            },
        )));

        let can_redo = Rc::clone(&state);
        registrations.push(Registration::Command(editor.register_command(
            CommandKind::CanRedo,
            CommandPriority::Critical,
            move |command, _| {
                if let Command::CanRedo(available) = command {
                    can_redo.borrow_mut().can_redo = *available;
                }
                Ok(false)
            },
        )));

        // Undo/redo reported unavailable: claim the command so nothing below runs.
        let undo_gate = Rc::clone(&state);
        registrations.push(Registration::Command(editor.register_command(
            CommandKind::Undo,
            CommandPriority::Critical,
            move |_, _| {
                let blocked = !undo_gate.borrow().can_undo;
                if blocked {
                    log::debug!("undo swallowed: nothing to undo");
                }
                Ok(blocked)
            },
        )));

        let redo_gate = Rc::clone(&state);
        registrations.push(Registration::Command(editor.register_command(
            CommandKind::Redo,
            CommandPriority::Critical,
            move |_, _| {
                let blocked = !redo_gate.borrow().can_redo;
                if blocked {
                    log::debug!("redo swallowed: nothing to redo");
                }
                Ok(blocked)
            },
        )));

        Self {
            state,
            rebuilds,
            heading_level,
            registrations,
        }
    }

    pub fn state(&self) -> ToolbarState {
        self.state.borrow().clone()
    }

    /// How many times the state has been rebuilt since registration.
    ///
    /// Hosts can compare it between frames to skip redraws.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds.get()
    }

    pub fn heading_level(&self) -> u8 {
        self.heading_level
    }

    /// Whether the control behind `action` accepts clicks right now.
    pub fn is_enabled(&self, action: &ToolbarAction) -> bool {
        let state = self.state.borrow();
        match action {
            ToolbarAction::Undo => state.undo_enabled(),
            ToolbarAction::Redo => state.redo_enabled(),
            _ => state.is_editable,
        }
    }

    /// Translate a toolbar click into at most one command.
    ///
    /// Returns `Ok(false)` without dispatching when the control is disabled
    /// or the action would not change anything.
    pub fn perform(&self, editor: &mut Editor, action: ToolbarAction) -> Result<bool, EditorError> {
        if !self.is_enabled(&action) {
            log::debug!("{action:?} ignored: control disabled");
            return Ok(false);
        }
        let Some(command) = self.command_for(editor, &action) else {
            return Ok(false);
        };
        editor.dispatch(command)
    }

    fn command_for(&self, editor: &Editor, action: &ToolbarAction) -> Option<Command> {
        let state = self.state.borrow();
        let command = match action {
            ToolbarAction::Undo => Command::Undo,
            ToolbarAction::Redo => Command::Redo,
            ToolbarAction::ToggleBold => Command::FormatText(TextFormat::BOLD),
            ToolbarAction::ToggleItalic => Command::FormatText(TextFormat::ITALIC),
            ToolbarAction::ToggleLink(url) => {
                if state.is_link {
                    Command::ToggleLink(None)
                } else {
                    Command::ToggleLink(Some(sanitize_url(url)))
                }
            }
            ToolbarAction::ToggleBulletedList => list_toggle(&state, ListType::Bullet),
            ToolbarAction::ToggleNumberedList => list_toggle(&state, ListType::Number),
            ToolbarAction::FormatBlock(format) => {
                let (current, target) = match format {
                    BlockFormat::Normal => (BlockType::Paragraph, BlockTarget::Paragraph),
                    BlockFormat::Heading => {
                        (BlockType::Heading, BlockTarget::Heading(self.heading_level))
                    }
                };
                if state.block_type == current || editor.document().is_empty() {
                    return None;
                }
                Command::SetBlockType(target)
            }
        };
        Some(command)
    }

    pub fn unregister(self, editor: &mut Editor) {
        for registration in self.registrations {
            editor.unregister(registration);
        }
    }
}

fn list_toggle(state: &ToolbarState, list_type: ListType) -> Command {
    if state.list_type == Some(list_type) {
        Command::RemoveList
    } else {
        Command::InsertList(list_type)
    }
}

fn refresh(
    state: &Rc<RefCell<ToolbarState>>,
    rebuilds: &Cell<u64>,
    editor: &Editor,
    heading_level: u8,
) {
    let next = derive_state(&state.borrow(), editor.snapshot(), heading_level);
    *state.borrow_mut() = next;
    rebuilds.set(rebuilds.get() + 1);
}
