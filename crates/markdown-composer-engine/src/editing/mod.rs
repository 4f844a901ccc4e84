/*!
 * # Editing Core Module
 *
 * The document engine and the synchronisation pipeline built on top of it.
 *
 * ## Architecture Overview
 *
 * ### 1. Node Tree
 * - A [`Document`] is an arena of typed nodes addressed by stable [`NodeKey`]s
 * - Node types form a closed set ([`NodeKind`]); behaviour is chosen by matching
 * - Text-like leaves carry a [`TextFormat`] bitmask
 *
 * ### 2. Transactions
 * - All mutation runs inside [`Editor::update`] against a private [`Draft`]
 * - A successful mutation is normalised and committed as a new [`Snapshot`]
 * - A failing mutation is dropped; the previous snapshot stays current
 *
 * ### 3. Listeners
 * - Listeners run after each commit, in registration order, with an [`UpdateEvent`]
 * - The [`Patch`] says what changed: content, selection, editability
 * - Updates requested from a listener are queued and committed after the pass
 *
 * ### 4. Command Bus
 * - Commands are a closed enum ([`Command`]) with one handler chain per [`CommandKind`]
 * - Chains run highest [`CommandPriority`] first and stop at the first claim
 * - Default rich-text behaviour sits at the lowest priority ([`rich_text`])
 *
 * ## Module Structure
 *
 * - **`node`**: keys, node kinds, formats
 * - **`document`**: the node arena and its structural primitives
 * - **`selection`**: points, range/node selections, segments, format queries
 * - **`normalize`**: canonical-form cleanup run before each commit
 * - **`commands`**: command enum, priorities, handler chains
 * - **`editor`**: the update pipeline and listener registry
 * - **`ops`**: the document transformations behind each rich-text command
 * - **`rich_text`**: default command handlers
 * - **`autolink`**: links urls and emails as they are typed
 * - **`history`**: undo/redo stacks
 * - **`snapshot`** / **`patch`**: committed state and change descriptions
 *
 * ## Usage Pattern
 *
 * ```rust
 * use markdown_composer_engine::editing::*;
 *
 * let mut editor = Editor::new(Document::new());
 * register_rich_text(&mut editor);
 *
 * editor.on_update(|event, _editor| {
 *     println!("committed v{}", event.patch.version);
 * });
 *
 * let paragraph = editor.document().root().children()[0];
 * editor
 *     .update(move |draft| {
 *         draft.set_selection(Some(Selection::caret(Point::element(paragraph, 0))));
 *         Ok(())
 *     })
 *     .unwrap();
 * editor.dispatch(Command::InsertText("hello".into())).unwrap();
 * assert_eq!(editor.document().text_content(paragraph), "hello");
 * ```
 */

pub mod autolink;
pub mod commands;
pub mod document;
pub mod editor;
pub mod history;
pub mod node;
pub(crate) mod normalize;
pub(crate) mod ops;
pub mod patch;
pub mod rich_text;
pub mod selection;
pub mod snapshot;

pub use autolink::register_auto_link;
pub use commands::{
    BlockTarget, Command, CommandBus, CommandHandler, CommandKind, CommandPriority, HandlerId,
};
pub use document::{Document, OutlineNode};
pub use editor::{Draft, Editor, ListenerId, Registration, UpdateListener};
pub use history::{DEFAULT_HISTORY_LIMIT, History};
pub use node::{ListType, Node, NodeKey, NodeKind, NodeType, TextFormat};
pub use patch::{Patch, UpdateOutcome, UpdateTag};
pub use rich_text::register_rich_text;
pub use selection::{
    NodeSelection, Point, PointKind, RangeSelection, Segment, Selection, locate_atom,
    locate_text,
};
pub use snapshot::{Snapshot, UpdateEvent};
