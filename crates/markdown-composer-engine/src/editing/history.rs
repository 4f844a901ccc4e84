use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::editing::commands::{Command, CommandKind, CommandPriority};
use crate::editing::document::Document;
use crate::editing::editor::{Editor, Registration};
use crate::editing::patch::UpdateTag;
use crate::editing::selection::Selection;
use crate::editing::snapshot::Snapshot;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone)]
struct Entry {
    document: Arc<Document>,
    selection: Option<Selection>,
}

impl Entry {
    fn of(snapshot: &Snapshot) -> Self {
        Self {
            document: Arc::clone(&snapshot.document),
            selection: snapshot.selection.clone(),
        }
    }
}

#[derive(Debug)]
struct HistoryState {
    undo: Vec<Entry>,
    redo: Vec<Entry>,
    limit: usize,
}

impl HistoryState {
    fn push_undo(&mut self, entry: Entry) {
        self.undo.push(entry);
        if self.undo.len() > self.limit {
            let excess = self.undo.len() - self.limit;
            self.undo.drain(..excess);
        }
    }
}

/// Undo/redo stacks fed by an update listener.
///
/// Every content commit that is not itself a history replay records the
/// state it replaced. Availability is published through `CanUndo` and
/// `CanRedo` after each stack change.
#[derive(Debug, Clone)]
pub struct History {
    state: Rc<RefCell<HistoryState>>,
    registrations: Vec<Registration>,
}

impl History {
    pub fn register(editor: &mut Editor, limit: usize) -> Self {
        let state = Rc::new(RefCell::new(HistoryState {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }));
        let mut registrations = Vec::new();

        let recorder = Rc::clone(&state);
        registrations.push(Registration::Listener(editor.on_update(move |event, editor| {
            if !event.patch.content_changed || event.patch.has_tag(UpdateTag::Historic) {
                return;
            }
            {
                let mut state = recorder.borrow_mut();
                state.push_undo(Entry::of(&event.previous));
                state.redo.clear();
            }
            publish(&recorder, editor);
        })));

        let undo = Rc::clone(&state);
        registrations.push(Registration::Command(editor.register_command(
            CommandKind::Undo,
            CommandPriority::Editor,
            move |_, editor| Ok(step(&undo, editor, Direction::Back)),
        )));

        let redo = Rc::clone(&state);
        registrations.push(Registration::Command(editor.register_command(
            CommandKind::Redo,
            CommandPriority::Editor,
            move |_, editor| Ok(step(&redo, editor, Direction::Forward)),
        )));

        let clear = Rc::clone(&state);
        registrations.push(Registration::Command(editor.register_command(
            CommandKind::ClearHistory,
            CommandPriority::Editor,
            move |_, editor| {
                {
                    let mut state = clear.borrow_mut();
                    state.undo.clear();
                    state.redo.clear();
                }
                publish(&clear, editor);
                Ok(true)
            },
        )));

        Self {
            state,
            registrations,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.state.borrow().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.state.borrow().redo.is_empty()
    }

    pub fn unregister(self, editor: &mut Editor) {
        for registration in self.registrations {
            editor.unregister(registration);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Back,
    Forward,
}

/// Replay one entry; false when read-only or there is nothing to replay.
fn step(state: &Rc<RefCell<HistoryState>>, editor: &mut Editor, direction: Direction) -> bool {
    if !editor.is_editable() {
        log::debug!("{direction:?} refused: session is read-only");
        return false;
    }
    let entry = {
        let mut stacks = state.borrow_mut();
        let current = Entry::of(editor.snapshot());
        let (from, to) = match direction {
            Direction::Back => {
                let HistoryState { undo, redo, .. } = &mut *stacks;
                (undo, redo)
            }
            Direction::Forward => {
                let HistoryState { undo, redo, .. } = &mut *stacks;
                (redo, undo)
            }
        };
        let Some(entry) = from.pop() else {
            return false;
        };
        to.push(current);
        entry
    };
    let replay = editor.update_with_tag(UpdateTag::Historic, move |draft| {
        draft.restore(&entry.document, entry.selection);
        Ok(())
    });
    if let Err(err) = replay {
        log::warn!("history replay failed: {err}");
    }
    publish(state, editor);
    true
}

fn publish(state: &Rc<RefCell<HistoryState>>, editor: &mut Editor) {
    let (can_undo, can_redo) = {
        let state = state.borrow();
        (!state.undo.is_empty(), !state.redo.is_empty())
    };
    for command in [Command::CanUndo(can_undo), Command::CanRedo(can_redo)] {
        if let Err(err) = editor.dispatch(command) {
            log::warn!("history availability handler failed: {err}");
        }
    }
}
