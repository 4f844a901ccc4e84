use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::editing::commands::{
    Command, CommandBus, CommandHandler, CommandKind, CommandPriority, HandlerId,
};
use crate::editing::document::Document;
use crate::editing::normalize::normalize;
use crate::editing::patch::{Patch, UpdateOutcome, UpdateTag};
use crate::editing::selection::{PointKind, RangeSelection, Selection};
use crate::editing::snapshot::{Snapshot, UpdateEvent};
use crate::error::EditorError;

/// Called once per commit, after the new snapshot is in place.
pub type UpdateListener = Rc<dyn Fn(&UpdateEvent, &mut Editor)>;

type Mutation = Box<dyn FnOnce(&mut Draft) -> Result<(), EditorError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Token returned by any registration on the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Registration {
    Command(HandlerId),
    Listener(ListenerId),
}

enum Pending {
    Update { tags: Vec<UpdateTag>, mutation: Mutation },
    SetEditable(bool),
}

/// Writable copy of the editor state handed to a mutation.
///
/// Nothing written here is visible to anyone until the mutation returns `Ok`
/// and the editor commits it.
pub struct Draft {
    pub(crate) document: Document,
    pub(crate) selection: Option<Selection>,
    editable: bool,
}

impl Draft {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn range_selection(&self) -> Option<&RangeSelection> {
        self.selection.as_ref().and_then(Selection::as_range)
    }

    pub fn range_selection_mut(&mut self) -> Option<&mut RangeSelection> {
        match &mut self.selection {
            Some(Selection::Range(range)) => Some(range),
            _ => None,
        }
    }

    /// Replace the selection, taking a range's format from the text under its anchor.
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        let mut selection = selection;
        if let Some(Selection::Range(range)) = &mut selection
            && range.anchor.kind == PointKind::Text
            && let Some(format) = self.document.kind(range.anchor.key).and_then(|k| k.format())
        {
            range.format = format;
        }
        self.selection = selection;
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Swap in a whole new document; the selection is cleared.
    pub fn replace(&mut self, document: Document) {
        self.document = document;
        self.selection = None;
    }

    pub(crate) fn restore(&mut self, document: &Document, selection: Option<Selection>) {
        self.document = document.clone();
        self.selection = selection;
    }
}

/// The update pipeline: committed state, command bus and listeners.
///
/// All mutation goes through [`Editor::update`]. A commit replaces the
/// snapshot wholesale and then notifies listeners in registration order.
/// Updates requested while listeners run are queued and committed, in FIFO
/// order, once the current pass has finished.
pub struct Editor {
    snapshot: Snapshot,
    bus: CommandBus,
    listeners: Vec<(ListenerId, UpdateListener)>,
    next_listener: u64,
    pending: VecDeque<Pending>,
    notifying: bool,
}

impl Editor {
    pub fn new(document: Document) -> Self {
        Self::with_state(document, None, true)
    }

    /// Start from a given state; it becomes version 0 without notifying anyone.
    pub fn with_state(document: Document, selection: Option<Selection>, editable: bool) -> Self {
        let mut document = document;
        let mut selection = selection;
        normalize(&mut document, &mut selection);
        if let Some(sel) = &selection
            && let Err(err) = sel.validate(&document)
        {
            log::warn!("dropping initial selection: {err}");
            selection = None;
        }
        let mut snapshot = Snapshot::initial(document, editable);
        snapshot.selection = selection;
        Self {
            snapshot,
            bus: CommandBus::new(),
            listeners: Vec::new(),
            next_listener: 0,
            pending: VecDeque::new(),
            notifying: false,
        }
    }

    // ============ Read access ============

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn version(&self) -> u64 {
        self.snapshot.version
    }

    pub fn document(&self) -> &Document {
        &self.snapshot.document
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.snapshot.selection.as_ref()
    }

    pub fn is_editable(&self) -> bool {
        self.snapshot.editable
    }

    pub fn read<R>(&self, f: impl FnOnce(&Document, Option<&Selection>) -> R) -> R {
        self.snapshot.read(f)
    }

    // ============ Registration ============

    pub fn register_command(
        &mut self,
        kind: CommandKind,
        priority: CommandPriority,
        handler: impl Fn(&Command, &mut Editor) -> Result<bool, EditorError> + 'static,
    ) -> HandlerId {
        let handler: CommandHandler = Rc::new(handler);
        self.bus.register(kind, priority, handler)
    }

    pub fn on_update(&mut self, listener: impl Fn(&UpdateEvent, &mut Editor) + 'static) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, Rc::new(listener)));
        id
    }

    /// Remove a handler or listener; unknown or already removed ids are ignored.
    pub fn unregister(&mut self, registration: Registration) -> bool {
        match registration {
            Registration::Command(id) => self.bus.unregister(id),
            Registration::Listener(id) => {
                let before = self.listeners.len();
                self.listeners.retain(|(l, _)| *l != id);
                self.listeners.len() != before
            }
        }
    }

    pub fn handler_count(&self, kind: CommandKind) -> usize {
        self.bus.handler_count(kind)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ============ Commands ============

    /// Run the chain for `command` until a handler claims it.
    ///
    /// Returns `Ok(false)` when nobody claimed it, including when no handler
    /// is registered. A handler error aborts the chain and is returned.
    pub fn dispatch(&mut self, command: Command) -> Result<bool, EditorError> {
        let kind = command.kind();
        for handler in self.bus.chain(kind) {
            if handler(&command, self)? {
                log::trace!("{kind} claimed");
                return Ok(true);
            }
        }
        log::trace!("{kind} unclaimed");
        Ok(false)
    }

    // ============ Updates ============

    pub fn update(
        &mut self,
        mutation: impl FnOnce(&mut Draft) -> Result<(), EditorError> + 'static,
    ) -> Result<UpdateOutcome, EditorError> {
        self.update_tagged(Vec::new(), Box::new(mutation))
    }

    pub fn update_with_tag(
        &mut self,
        tag: UpdateTag,
        mutation: impl FnOnce(&mut Draft) -> Result<(), EditorError> + 'static,
    ) -> Result<UpdateOutcome, EditorError> {
        self.update_tagged(vec![tag], Box::new(mutation))
    }

    fn update_tagged(
        &mut self,
        tags: Vec<UpdateTag>,
        mutation: Mutation,
    ) -> Result<UpdateOutcome, EditorError> {
        if self.notifying {
            log::debug!("update requested during listener pass; queued");
            self.pending.push_back(Pending::Update { tags, mutation });
            return Ok(UpdateOutcome::Queued);
        }
        let outcome = self.apply(tags, mutation)?;
        self.drain_pending();
        Ok(outcome)
    }

    /// Toggle the session-wide editable flag; a change is a commit of its own.
    pub fn set_editable(&mut self, editable: bool) -> UpdateOutcome {
        if self.notifying {
            self.pending.push_back(Pending::SetEditable(editable));
            return UpdateOutcome::Queued;
        }
        let outcome = self.apply_editable(editable);
        self.drain_pending();
        outcome
    }

    fn apply(&mut self, tags: Vec<UpdateTag>, mutation: Mutation) -> Result<UpdateOutcome, EditorError> {
        let mut draft = Draft {
            document: (*self.snapshot.document).clone(),
            selection: self.snapshot.selection.clone(),
            editable: self.snapshot.editable,
        };
        // On error the draft is dropped and the committed snapshot stays as it was.
        mutation(&mut draft)?;

        normalize(&mut draft.document, &mut draft.selection);
        if let Some(sel) = &draft.selection
            && let Err(err) = sel.validate(&draft.document)
        {
            log::warn!("selection invalid after update, clearing it: {err}");
            draft.selection = None;
        }

        let content_changed = draft.document != *self.snapshot.document;
        let selection_changed = draft.selection != self.snapshot.selection;
        if !content_changed && !selection_changed {
            return Ok(UpdateOutcome::Unchanged);
        }

        let document = if content_changed {
            Arc::new(draft.document)
        } else {
            Arc::clone(&self.snapshot.document)
        };
        let snapshot = Snapshot {
            version: self.snapshot.version + 1,
            document,
            selection: draft.selection,
            editable: self.snapshot.editable,
        };
        let patch = Patch {
            version: snapshot.version,
            content_changed,
            selection_changed,
            editable_changed: false,
            tags,
        };
        Ok(self.commit(snapshot, patch))
    }

    fn apply_editable(&mut self, editable: bool) -> UpdateOutcome {
        if self.snapshot.editable == editable {
            return UpdateOutcome::Unchanged;
        }
        let snapshot = Snapshot {
            version: self.snapshot.version + 1,
            editable,
            ..self.snapshot.clone()
        };
        let patch = Patch {
            version: snapshot.version,
            content_changed: false,
            selection_changed: false,
            editable_changed: true,
            tags: Vec::new(),
        };
        self.commit(snapshot, patch)
    }

    fn commit(&mut self, snapshot: Snapshot, patch: Patch) -> UpdateOutcome {
        let version = snapshot.version;
        let previous = std::mem::replace(&mut self.snapshot, snapshot);
        log::debug!(
            "commit v{version}: content={} selection={} editable={} tags={:?}",
            patch.content_changed,
            patch.selection_changed,
            patch.editable_changed,
            patch.tags
        );
        let event = UpdateEvent {
            snapshot: self.snapshot.clone(),
            previous,
            patch,
        };
        self.notify(&event);
        UpdateOutcome::Committed { version }
    }

    fn notify(&mut self, event: &UpdateEvent) {
        self.notifying = true;
        let listeners: Vec<(ListenerId, UpdateListener)> = self
            .listeners
            .iter()
            .map(|(id, l)| (*id, Rc::clone(l)))
            .collect();
        for (id, listener) in listeners {
            // A listener removed earlier in this pass must not run.
            if self.listeners.iter().any(|(l, _)| *l == id) {
                listener(event, self);
            }
        }
        if event.patch.selection_changed
            && let Err(err) = self.dispatch(Command::SelectionChange)
        {
            log::warn!("selection-change handler failed: {err}");
        }
        self.notifying = false;
    }

    fn drain_pending(&mut self) {
        while let Some(next) = self.pending.pop_front() {
            let result = match next {
                Pending::Update { tags, mutation } => self.apply(tags, mutation).map(|_| ()),
                Pending::SetEditable(editable) => {
                    self.apply_editable(editable);
                    Ok(())
                }
            };
            if let Err(err) = result {
                log::warn!("queued update failed and was dropped: {err}");
            }
        }
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("version", &self.snapshot.version)
            .field("editable", &self.snapshot.editable)
            .field("bus", &self.bus)
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::node::{NodeKey, NodeKind};
    use crate::editing::selection::Point;
    use std::cell::RefCell;

    fn append_paragraph(text: &'static str) -> impl FnOnce(&mut Draft) -> Result<(), EditorError> {
        move |draft| {
            let doc = draft.document_mut();
            let p = doc.create(NodeKind::Paragraph);
            doc.append(NodeKey::ROOT, p)?;
            let t = doc.create(NodeKind::text(text));
            doc.append(p, t)
        }
    }

    #[test]
    fn test_commit_advances_version_and_notifies_once() {
        let mut editor = Editor::new(Document::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = Rc::clone(&seen);
        editor.on_update(move |event, _| seen_in.borrow_mut().push(event.patch.clone()));

        let outcome = editor.update(append_paragraph("hi")).unwrap();

        assert_eq!(outcome, UpdateOutcome::Committed { version: 1 });
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].content_changed);
        assert!(!seen[0].selection_changed);
    }

    #[test]
    fn test_no_op_update_notifies_nobody() {
        let mut editor = Editor::new(Document::new());
        let count = Rc::new(RefCell::new(0));
        let count_in = Rc::clone(&count);
        editor.on_update(move |_, _| *count_in.borrow_mut() += 1);

        let outcome = editor.update(|_| Ok(())).unwrap();

        assert_eq!(outcome, UpdateOutcome::Unchanged);
        assert_eq!(editor.version(), 0);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_failed_update_leaves_snapshot_intact() {
        let mut editor = Editor::new(Document::new());
        let before = editor.snapshot().clone();

        let result = editor.update(|draft| {
            let doc = draft.document_mut();
            let p = doc.create(NodeKind::Paragraph);
            doc.append(NodeKey::ROOT, p)?;
            Err(EditorError::Rejected("boom".into()))
        });

        assert!(result.is_err());
        assert_eq!(editor.snapshot(), &before);
    }

    #[test]
    fn test_updates_from_listeners_are_queued_in_fifo_order() {
        let mut editor = Editor::new(Document::new());
        let order = Rc::new(RefCell::new(Vec::new()));

        let order_a = Rc::clone(&order);
        editor.on_update(move |event, editor| {
            order_a.borrow_mut().push(format!("a@{}", event.patch.version));
            if event.patch.version == 1 {
                let outcome = editor.update(append_paragraph("second")).unwrap();
                assert_eq!(outcome, UpdateOutcome::Queued);
                editor.update(append_paragraph("third")).unwrap();
            }
        });
        let order_b = Rc::clone(&order);
        editor.on_update(move |event, editor| {
            // Every listener of one pass sees the same committed version.
            assert_eq!(editor.version(), event.patch.version);
            order_b.borrow_mut().push(format!("b@{}", event.patch.version));
        });

        editor.update(append_paragraph("first")).unwrap();

        assert_eq!(
            *order.borrow(),
            vec!["a@1", "b@1", "a@2", "b@2", "a@3", "b@3"]
        );
        assert_eq!(editor.version(), 3);
    }

    #[test]
    fn test_set_editable_commits_and_flags_patch() {
        let mut editor = Editor::new(Document::new());
        let flags = Rc::new(RefCell::new(Vec::new()));
        let flags_in = Rc::clone(&flags);
        editor.on_update(move |event, _| {
            flags_in
                .borrow_mut()
                .push((event.patch.editable_changed, event.snapshot.editable));
        });

        assert!(editor.set_editable(false).committed());
        assert_eq!(editor.set_editable(false), UpdateOutcome::Unchanged);
        assert!(!editor.is_editable());
        assert_eq!(*flags.borrow(), vec![(true, false)]);
    }

    #[test]
    fn test_stale_selection_is_cleared_on_commit() {
        let mut editor = Editor::new(Document::new());
        editor
            .update(|draft| {
                draft.set_selection(Some(Selection::caret(Point::text(NodeKey(77), 0))));
                Ok(())
            })
            .unwrap();
        assert_eq!(editor.selection(), None);
    }

    #[test]
    fn test_selection_change_is_dispatched_after_selection_commits() {
        let mut editor = Editor::new(Document::new());
        let hits = Rc::new(RefCell::new(0));
        let hits_in = Rc::clone(&hits);
        editor.register_command(
            CommandKind::SelectionChange,
            CommandPriority::Normal,
            move |_, _| {
                *hits_in.borrow_mut() += 1;
                Ok(false)
            },
        );
        let paragraph = editor.document().root().children()[0];
        editor
            .update(move |draft| {
                draft.set_selection(Some(Selection::caret(Point::element(paragraph, 0))));
                Ok(())
            })
            .unwrap();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_unregistered_listener_is_skipped() {
        let mut editor = Editor::new(Document::new());
        let count = Rc::new(RefCell::new(0));
        let count_in = Rc::clone(&count);
        let id = editor.on_update(move |_, _| *count_in.borrow_mut() += 1);
        assert!(editor.unregister(Registration::Listener(id)));
        assert!(!editor.unregister(Registration::Listener(id)));
        editor.update(append_paragraph("x")).unwrap();
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_dispatch_without_handlers_is_unclaimed() {
        let mut editor = Editor::new(Document::new());
        assert!(!editor.dispatch(Command::RemoveList).unwrap());
    }

    #[test]
    fn test_handler_error_surfaces_and_stops_chain() {
        let mut editor = Editor::new(Document::new());
        let later = Rc::new(RefCell::new(false));
        let later_in = Rc::clone(&later);
        editor.register_command(CommandKind::Undo, CommandPriority::High, |_, _| {
            Err(EditorError::Rejected("nope".into()))
        });
        editor.register_command(CommandKind::Undo, CommandPriority::Low, move |_, _| {
            *later_in.borrow_mut() = true;
            Ok(true)
        });
        assert!(editor.dispatch(Command::Undo).is_err());
        assert!(!*later.borrow());
    }
}
