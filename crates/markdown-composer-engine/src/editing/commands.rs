use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::editing::editor::Editor;
use crate::editing::node::{ListType, TextFormat};
use crate::error::EditorError;

/// Block-level formats a `SetBlockType` command may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTarget {
    Paragraph,
    Heading(u8),
}

/// Every command the bus understands, with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Notification that the selection moved; nothing to mutate.
    SelectionChange,
    FormatText(TextFormat),
    /// `Some(url)` links the selection, `None` unlinks it.
    ToggleLink(Option<String>),
    InsertList(ListType),
    RemoveList,
    SetBlockType(BlockTarget),
    InsertText(String),
    ClearEditor,
    Undo,
    Redo,
    CanUndo(bool),
    CanRedo(bool),
    ClearHistory,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SelectionChange => CommandKind::SelectionChange,
            Command::FormatText(_) => CommandKind::FormatText,
            Command::ToggleLink(_) => CommandKind::ToggleLink,
            Command::InsertList(_) => CommandKind::InsertList,
            Command::RemoveList => CommandKind::RemoveList,
            Command::SetBlockType(_) => CommandKind::SetBlockType,
            Command::InsertText(_) => CommandKind::InsertText,
            Command::ClearEditor => CommandKind::ClearEditor,
            Command::Undo => CommandKind::Undo,
            Command::Redo => CommandKind::Redo,
            Command::CanUndo(_) => CommandKind::CanUndo,
            Command::CanRedo(_) => CommandKind::CanRedo,
            Command::ClearHistory => CommandKind::ClearHistory,
        }
    }
}

/// Payload-free command tag; each tag owns one handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    SelectionChange,
    FormatText,
    ToggleLink,
    InsertList,
    RemoveList,
    SetBlockType,
    InsertText,
    ClearEditor,
    Undo,
    Redo,
    CanUndo,
    CanRedo,
    ClearHistory,
}

impl CommandKind {
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::SelectionChange => "selection-change",
            CommandKind::FormatText => "format-text",
            CommandKind::ToggleLink => "toggle-link",
            CommandKind::InsertList => "insert-list",
            CommandKind::RemoveList => "remove-list",
            CommandKind::SetBlockType => "set-block-type",
            CommandKind::InsertText => "insert-text",
            CommandKind::ClearEditor => "clear-editor",
            CommandKind::Undo => "undo",
            CommandKind::Redo => "redo",
            CommandKind::CanUndo => "can-undo",
            CommandKind::CanRedo => "can-redo",
            CommandKind::ClearHistory => "clear-history",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handler priority; higher priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandPriority {
    /// Default behaviour installed by the editor itself.
    Editor,
    Low,
    Normal,
    High,
    Critical,
}

/// Returns `Ok(true)` to claim the command and stop propagation.
pub type CommandHandler = Rc<dyn Fn(&Command, &mut Editor) -> Result<bool, EditorError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId {
    pub(crate) kind: CommandKind,
    pub(crate) id: u64,
}

struct Registered {
    id: u64,
    priority: CommandPriority,
    handler: CommandHandler,
}

/// Per-command handler chains.
///
/// Chains are ordered by priority, highest first; handlers of equal priority
/// keep registration order.
#[derive(Default)]
pub struct CommandBus {
    chains: HashMap<CommandKind, Vec<Registered>>,
    next_id: u64,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: CommandKind,
        priority: CommandPriority,
        handler: CommandHandler,
    ) -> HandlerId {
        self.next_id += 1;
        let id = self.next_id;
        let chain = self.chains.entry(kind).or_default();
        // Insert after every handler of the same or higher priority.
        let at = chain
            .iter()
            .position(|r| r.priority < priority)
            .unwrap_or(chain.len());
        chain.insert(
            at,
            Registered {
                id,
                priority,
                handler,
            },
        );
        HandlerId { kind, id }
    }

    /// Returns false when the id was already gone.
    pub fn unregister(&mut self, handler: HandlerId) -> bool {
        let Some(chain) = self.chains.get_mut(&handler.kind) else {
            return false;
        };
        let before = chain.len();
        chain.retain(|r| r.id != handler.id);
        chain.len() != before
    }

    /// Snapshot of a chain, so handlers may (un)register while it runs.
    pub(crate) fn chain(&self, kind: CommandKind) -> Vec<CommandHandler> {
        self.chains
            .get(&kind)
            .map(|chain| chain.iter().map(|r| Rc::clone(&r.handler)).collect())
            .unwrap_or_default()
    }

    pub fn handler_count(&self, kind: CommandKind) -> usize {
        self.chains.get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (kind, chain) in &self.chains {
            map.entry(kind, &chain.len());
        }
        map.finish()
    }
}
