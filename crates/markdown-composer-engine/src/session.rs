//! One editing session: an editor seeded from markdown, the default rich-text
//! behaviour, history, a toolbar and an export listener that reports every
//! visible change back to the host as markdown.

use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use crate::editing::{
    Command, DEFAULT_HISTORY_LIMIT, Document, Editor, History, ListenerId, NodeKey, NodeKind,
    Point, Registration, Selection, Snapshot, UpdateOutcome, locate_atom, locate_text,
    register_auto_link, register_rich_text,
};
use crate::error::EditorError;
use crate::markdown::{
    DEFAULT_HEADING_LEVEL, DEFAULT_LIST_INDENT, MarkdownBridge, ShortcutRules, TransformerSet,
    register_markdown_shortcuts,
};
use crate::toolbar::{ToolbarAction, ToolbarController, ToolbarState};

/// Host callback: exported markdown plus the session label, if any.
pub type ChangeCallback = Box<dyn FnMut(&str, Option<&str>)>;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub initial_markdown: String,
    pub label: Option<String>,
    pub editable_by_default: bool,
    /// Place a caret at the end of the document on start.
    pub autofocus: bool,
    /// Skip the change callback for commits that only move the selection.
    pub ignore_selection_change: bool,
    pub heading_level: u8,
    pub list_indent: usize,
    pub history_limit: usize,
    pub transformers: TransformerSet,
    /// Link urls and email addresses once they are typed.
    pub auto_link: bool,
    /// Convert markdown syntax as it is typed.
    pub markdown_shortcuts: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            initial_markdown: String::new(),
            label: None,
            editable_by_default: true,
            autofocus: true,
            ignore_selection_change: true,
            heading_level: DEFAULT_HEADING_LEVEL,
            list_indent: DEFAULT_LIST_INDENT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            transformers: TransformerSet::default(),
            auto_link: true,
            markdown_shortcuts: true,
        }
    }
}

pub struct Session {
    id: Uuid,
    label: Option<String>,
    editor: Editor,
    bridge: Rc<MarkdownBridge>,
    toolbar: ToolbarController,
    history: History,
    rich_text: Vec<Registration>,
    export_listener: ListenerId,
}

impl Session {
    /// Import `options.initial_markdown` and wire up the session.
    ///
    /// Fails when the markdown settings are invalid; nothing is reported to
    /// `on_change` until the first commit.
    pub fn new(
        options: SessionOptions,
        on_change: impl FnMut(&str, Option<&str>) + 'static,
    ) -> Result<Self, EditorError> {
        let id = Uuid::new_v4();
        let shortcut_rules = ShortcutRules::new(options.transformers.clone(), options.heading_level);
        let bridge = Rc::new(MarkdownBridge::new(
            options.transformers,
            options.heading_level,
            options.list_indent,
        )?);
        let document = bridge.import_markdown(&options.initial_markdown)?;
        let selection = options.autofocus.then(|| end_caret(&document));
        log::info!(
            "session {id} started ({} nodes, editable: {})",
            document.len(),
            options.editable_by_default
        );

        let mut editor = Editor::with_state(document, selection, options.editable_by_default);
        let mut rich_text = register_rich_text(&mut editor);
        if options.markdown_shortcuts {
            rich_text.extend(register_markdown_shortcuts(&mut editor, shortcut_rules));
        }
        if options.auto_link {
            rich_text.extend(register_auto_link(&mut editor));
        }
        let history = History::register(&mut editor, options.history_limit);
        let toolbar = ToolbarController::register(&mut editor, options.heading_level);

        let callback: Rc<RefCell<ChangeCallback>> = Rc::new(RefCell::new(Box::new(on_change)));
        let exporter = Rc::clone(&bridge);
        let label = options.label.clone();
        let report_selection = !options.ignore_selection_change;
        let export_listener = editor.on_update(move |event, _| {
            let patch = &event.patch;
            if !patch.content_changed && !(report_selection && patch.selection_changed) {
                return;
            }
            let markdown = exporter.export_markdown(&event.snapshot.document);
            log::debug!("session {id}: exporting v{} ({} bytes)", patch.version, markdown.len());
            match callback.try_borrow_mut() {
                Ok(mut callback) => (&mut **callback)(&markdown, label.as_deref()),
                Err(_) => log::warn!(
                    "session {id}: change callback re-entered, v{} not reported",
                    patch.version
                ),
            }
        });

        Ok(Self {
            id,
            label: options.label,
            editor,
            bridge,
            toolbar,
            history,
            rich_text,
            export_listener,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Run a toolbar click; `Ok(false)` when it was refused or changed nothing.
    pub fn perform(&mut self, action: ToolbarAction) -> Result<bool, EditorError> {
        log::debug!("session {}: {action:?}", self.id);
        self.toolbar.perform(&mut self.editor, action)
    }

    pub fn dispatch(&mut self, command: Command) -> Result<bool, EditorError> {
        self.editor.dispatch(command)
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) -> Result<UpdateOutcome, EditorError> {
        self.editor.update(move |draft| {
            draft.set_selection(selection);
            Ok(())
        })
    }

    /// Select the first occurrence of `needle` within a single block.
    ///
    /// Returns `Ok(false)` when the text is not found.
    pub fn select_text(&mut self, needle: &str) -> Result<bool, EditorError> {
        let Some(range) = locate_text(self.editor.document(), needle) else {
            log::debug!("session {}: {needle:?} not found", self.id);
            return Ok(false);
        };
        self.set_selection(Some(Selection::Range(range)))?;
        Ok(true)
    }

    /// Select the first hashtag or keyword with this text as a whole node.
    pub fn select_atom(&mut self, needle: &str) -> Result<bool, EditorError> {
        let Some(nodes) = locate_atom(self.editor.document(), needle) else {
            log::debug!("session {}: no atom {needle:?}", self.id);
            return Ok(false);
        };
        self.set_selection(Some(Selection::Node(nodes)))?;
        Ok(true)
    }

    pub fn set_editable(&mut self, editable: bool) -> UpdateOutcome {
        log::info!("session {}: editable = {editable}", self.id);
        self.editor.set_editable(editable)
    }

    pub fn is_editable(&self) -> bool {
        self.editor.is_editable()
    }

    pub fn toolbar_state(&self) -> ToolbarState {
        self.toolbar.state()
    }

    pub fn toolbar(&self) -> &ToolbarController {
        &self.toolbar
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Current document as markdown.
    pub fn markdown(&self) -> String {
        self.bridge.export_markdown(self.editor.document())
    }

    pub fn bridge(&self) -> &MarkdownBridge {
        &self.bridge
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.editor.snapshot()
    }

    pub fn document(&self) -> &Document {
        self.editor.document()
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    /// Detach every handler and listener the session installed and hand back
    /// the bare editor.
    pub fn close(mut self) -> Editor {
        log::info!("session {} closed", self.id);
        self.editor
            .unregister(Registration::Listener(self.export_listener));
        self.toolbar.unregister(&mut self.editor);
        self.history.unregister(&mut self.editor);
        for registration in self.rich_text {
            self.editor.unregister(registration);
        }
        self.editor
    }
}

/// Collapsed selection after the last character of the document.
fn end_caret(doc: &Document) -> Selection {
    let last = doc.last_descendant(NodeKey::ROOT);
    let point = match doc.kind(last) {
        Some(kind) if kind.is_text_like() => Point::text(last, kind.text_len()),
        Some(NodeKind::LineBreak) => match (doc.parent(last), doc.index_in_parent(last)) {
            (Some(parent), Some(index)) => Point::element(parent, index + 1),
            _ => Point::element(last, 0),
        },
        _ => Point::element(last, doc.children(last).len()),
    };
    Selection::caret(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{CommandKind, ListType, NodeType, PointKind};
    use crate::toolbar::{BlockFormat, BlockType};
    use pretty_assertions::assert_eq;

    type Reports = Rc<RefCell<Vec<(String, Option<String>)>>>;

    fn session(markdown: &str) -> (Session, Reports) {
        session_with(SessionOptions {
            initial_markdown: markdown.to_string(),
            label: Some("notes".into()),
            ..SessionOptions::default()
        })
    }

    fn session_with(options: SessionOptions) -> (Session, Reports) {
        let reports: Reports = Rc::default();
        let sink = Rc::clone(&reports);
        let session = Session::new(options, move |markdown, label| {
            sink.borrow_mut()
                .push((markdown.to_string(), label.map(str::to_string)));
        })
        .unwrap();
        (session, reports)
    }

    #[test]
    fn test_construction_does_not_report() {
        let (session, reports) = session("hello");
        assert!(reports.borrow().is_empty());
        assert_eq!(session.markdown(), "hello");
        assert_eq!(session.label(), Some("notes"));
    }

    #[test]
    fn test_autofocus_puts_caret_at_end() {
        let (session, _) = session("one\n\ntwo");
        let range = session.snapshot().range_selection().unwrap().clone();
        assert!(range.is_collapsed());
        assert_eq!(range.anchor.kind, PointKind::Text);
        assert_eq!(session.document().text_content(range.anchor.key), "two");
        assert_eq!(range.anchor.offset, 3);
    }

    #[test]
    fn test_without_autofocus_there_is_no_selection() {
        let (session, _) = session_with(SessionOptions {
            initial_markdown: "x".into(),
            autofocus: false,
            ..SessionOptions::default()
        });
        assert_eq!(session.snapshot().selection, None);
    }

    #[test]
    fn test_content_change_reports_markdown_and_label() {
        let (mut session, reports) = session("make this bold");
        assert!(session.select_text("bold").unwrap());
        assert!(reports.borrow().is_empty());
        assert!(session.perform(ToolbarAction::ToggleBold).unwrap());
        assert_eq!(
            reports.borrow().as_slice(),
            &[("make this **bold**".to_string(), Some("notes".to_string()))]
        );
    }

    #[test]
    fn test_selection_changes_reported_when_asked() {
        let (mut session, reports) = session_with(SessionOptions {
            initial_markdown: "abc".into(),
            ignore_selection_change: false,
            ..SessionOptions::default()
        });
        session.select_text("b").unwrap();
        assert_eq!(reports.borrow().len(), 1);
        assert_eq!(reports.borrow()[0], ("abc".to_string(), None));
    }

    #[test]
    fn test_read_only_session_refuses_toolbar_actions() {
        let (mut session, reports) = session_with(SessionOptions {
            initial_markdown: "text".into(),
            editable_by_default: false,
            ..SessionOptions::default()
        });
        session.select_text("text").unwrap();
        assert!(!session.toolbar_state().is_editable);
        assert!(!session.perform(ToolbarAction::ToggleBold).unwrap());
        assert_eq!(session.markdown(), "text");
        assert!(reports.borrow().is_empty());

        session.set_editable(true);
        assert!(session.toolbar_state().is_editable);
        assert!(session.perform(ToolbarAction::ToggleBold).unwrap());
        assert_eq!(session.markdown(), "**text**");
    }

    #[test]
    fn test_undo_and_redo_restore_markdown() {
        let (mut session, reports) = session("plain");
        session.select_text("plain").unwrap();
        session.perform(ToolbarAction::ToggleItalic).unwrap();
        assert!(session.toolbar_state().can_undo);

        assert!(session.perform(ToolbarAction::Undo).unwrap());
        assert_eq!(session.markdown(), "plain");
        assert!(session.toolbar_state().can_redo);

        assert!(session.perform(ToolbarAction::Redo).unwrap());
        assert_eq!(session.markdown(), "*plain*");
        let last = reports.borrow().last().cloned().unwrap();
        assert_eq!(last.0, "*plain*");
    }

    #[test]
    fn test_list_toolbar_flow() {
        let (mut session, _) = session("item");
        session.select_text("item").unwrap();
        session.perform(ToolbarAction::ToggleBulletedList).unwrap();
        assert_eq!(session.markdown(), "- item");
        let state = session.toolbar_state();
        assert_eq!(state.block_type, BlockType::Paragraph);
        assert_eq!(state.list_type, Some(ListType::Bullet));

        assert!(!session
            .perform(ToolbarAction::FormatBlock(BlockFormat::Normal))
            .unwrap());
        assert_eq!(session.markdown(), "- item");
    }

    #[test]
    fn test_invalid_heading_level_fails_construction() {
        let result = Session::new(
            SessionOptions {
                heading_level: 9,
                ..SessionOptions::default()
            },
            |_, _| {},
        );
        assert!(matches!(result, Err(EditorError::Markdown(_))));
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let (a, _) = session("");
        let (b, _) = session("");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_close_detaches_everything() {
        let (session, reports) = session("x");
        let mut editor = session.close();
        assert_eq!(editor.listener_count(), 0);
        assert_eq!(editor.handler_count(CommandKind::FormatText), 0);
        assert_eq!(editor.handler_count(CommandKind::Undo), 0);
        assert_eq!(editor.handler_count(CommandKind::InsertText), 0);
        assert!(!editor.dispatch(Command::ClearEditor).unwrap());
        assert!(reports.borrow().is_empty());
    }

    #[test]
    fn test_empty_session_has_one_paragraph() {
        let (session, _) = session("");
        let root = session.document().root().children().to_vec();
        assert_eq!(root.len(), 1);
        assert_eq!(session.document().node_type(root[0]), Some(NodeType::Paragraph));
    }
}
