use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::editing::{
    Document, ListType, NodeKey, NodeKind, NodeType, Point, PointKind, RangeSelection, Snapshot,
    TextFormat,
};

/// Block types the toolbar can show.
///
/// Only one heading level is exposed; headings at other levels are outside
/// this vocabulary and leave the displayed type as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    #[default]
    Paragraph,
    Heading,
    BulletedList,
    NumberedList,
    #[serde(rename = "checklist")]
    CheckList,
}

impl BlockType {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading => "heading",
            BlockType::BulletedList => "bulleted-list",
            BlockType::NumberedList => "numbered-list",
            BlockType::CheckList => "checklist",
        }
    }

    /// Label shown on the block-format control.
    pub fn label(self) -> &'static str {
        match self {
            BlockType::Paragraph => "Normal",
            BlockType::Heading => "Heading",
            BlockType::BulletedList => "Bulleted List",
            BlockType::NumberedList => "Numbered List",
            BlockType::CheckList => "Check List",
        }
    }

    fn of_list(list_type: ListType) -> Self {
        match list_type {
            ListType::Bullet => BlockType::BulletedList,
            ListType::Number => BlockType::NumberedList,
            ListType::Check => BlockType::CheckList,
        }
    }

    /// Vocabulary entry for a non-list block, if it has one.
    fn of_block(kind: &NodeKind, heading_level: u8) -> Option<Self> {
        match kind {
            NodeKind::Paragraph => Some(BlockType::Paragraph),
            NodeKind::Heading { level } if *level == heading_level => Some(BlockType::Heading),
            _ => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the control surface displays.
///
/// Rebuilt wholesale from each snapshot; only fields that cannot be derived
/// carry over from the previous state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ToolbarState {
    pub block_type: BlockType,
    pub list_type: Option<ListType>,
    pub is_link: bool,
    pub is_bold: bool,
    pub is_italic: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub is_editable: bool,
}

impl ToolbarState {
    pub fn undo_enabled(&self) -> bool {
        self.is_editable && self.can_undo
    }

    pub fn redo_enabled(&self) -> bool {
        self.is_editable && self.can_redo
    }
}

/// Recompute the toolbar state for `snapshot`.
///
/// `previous` supplies undo/redo availability and whatever cannot be derived:
/// without a range selection the formatting flags and block type stay as
/// they were.
pub(crate) fn derive_state(
    previous: &ToolbarState,
    snapshot: &Snapshot,
    heading_level: u8,
) -> ToolbarState {
    let mut next = ToolbarState {
        is_editable: snapshot.editable,
        ..previous.clone()
    };
    let Some(range) = snapshot.range_selection() else {
        return next;
    };
    let doc: &Document = &snapshot.document;
    if let Err(err) = range.validate(doc) {
        log::warn!("toolbar ignoring stale selection: {err}");
        return next;
    }

    next.is_bold = range.has_format(doc, TextFormat::BOLD);
    next.is_italic = range.has_format(doc, TextFormat::ITALIC);

    let node = selected_node(doc, range);
    let is_link = |key: Option<NodeKey>| {
        key.and_then(|k| doc.kind(k))
            .is_some_and(|kind| matches!(kind, NodeKind::Link { .. }))
    };
    next.is_link = is_link(Some(node)) || is_link(doc.parent(node));

    let anchor = range.anchor.key;
    let Some(element) = enclosing_block(doc, anchor) else {
        return next;
    };
    match doc.kind(element) {
        Some(NodeKind::List { list_type, .. }) => {
            let nearest = doc
                .nearest_of_type(anchor, NodeType::List)
                .and_then(|list| doc.kind(list))
                .and_then(NodeKind::list_type)
                .unwrap_or(*list_type);
            // Bullet and number lists only move `list_type`; other list
            // variants show up as the block type instead.
            match nearest {
                ListType::Bullet | ListType::Number => next.list_type = Some(nearest),
                ListType::Check => {
                    next.block_type = BlockType::of_list(nearest);
                    next.list_type = None;
                }
            }
        }
        Some(kind) => {
            next.list_type = None;
            match BlockType::of_block(kind, heading_level) {
                Some(block_type) => next.block_type = block_type,
                None => log::trace!("{} is not a toolbar block type", kind.node_type()),
            }
        }
        None => {}
    }
    next
}

/// The direct child of the root holding `anchor`, or the root itself.
pub(crate) fn enclosing_block(doc: &Document, anchor: NodeKey) -> Option<NodeKey> {
    if anchor.is_root() {
        return Some(anchor);
    }
    doc.find_matching_parent(anchor, |_, node| node.parent().is_some_and(NodeKey::is_root))
        .or_else(|| {
            log::debug!("no root child above {anchor}; using its top-level element");
            doc.top_level_element(anchor)
        })
}

/// The node a range selection is considered to be "on".
///
/// For a selection spanning nodes, the start node wins unless the selection
/// starts at its very end, in which case the end node wins.
pub(crate) fn selected_node(doc: &Document, range: &RangeSelection) -> NodeKey {
    let (anchor, focus) = (range.anchor.key, range.focus.key);
    if anchor == focus {
        return anchor;
    }
    if range.is_backward(doc) {
        if at_node_end(doc, &range.focus) { anchor } else { focus }
    } else if at_node_end(doc, &range.anchor) {
        focus
    } else {
        anchor
    }
}

fn at_node_end(doc: &Document, point: &Point) -> bool {
    match point.kind {
        PointKind::Text => point.offset >= doc.kind(point.key).map_or(0, NodeKind::text_len),
        PointKind::Element => point.offset >= doc.children(point.key).len(),
    }
}

const SAFE_SCHEMES: [&str; 5] = ["http", "https", "mailto", "sms", "tel"];

/// Replace urls with an unsupported scheme by `about:blank`.
///
/// Urls without a scheme are left alone.
pub fn sanitize_url(url: &str) -> String {
    static SCHEME_REGEX: OnceLock<Regex> = OnceLock::new();
    let scheme_regex = SCHEME_REGEX
        .get_or_init(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").expect("Invalid scheme regex"));

    let trimmed = url.trim();
    match scheme_regex.captures(trimmed) {
        Some(caps) => {
            let scheme = caps[1].to_ascii_lowercase();
            if SAFE_SCHEMES.contains(&scheme.as_str()) {
                trimmed.to_string()
            } else {
                log::debug!("link with scheme {scheme:?} replaced by about:blank");
                "about:blank".to_string()
            }
        }
        None => trimmed.to_string(),
    }
}
