use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::editing::document::Document;
use crate::editing::node::{NodeKey, NodeKind, TextFormat, byte_index};
use crate::error::EditorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointKind {
    /// Offset counts chars inside a text-like node.
    Text,
    /// Offset counts children of an element.
    Element,
}

/// One end of a range selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
    pub kind: PointKind,
}

impl Point {
    pub fn text(key: NodeKey, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Text,
        }
    }

    pub fn element(key: NodeKey, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Element,
        }
    }

    pub fn validate(&self, doc: &Document) -> Result<(), EditorError> {
        let invalid = EditorError::InvalidSelection { key: self.key };
        let node = doc.get(self.key).ok_or(invalid)?;
        let in_bounds = match self.kind {
            PointKind::Text => {
                node.kind().is_text_like() && self.offset <= node.kind().text_len()
            }
            PointKind::Element => {
                node.kind().is_element() && self.offset <= node.children().len()
            }
        };
        if in_bounds {
            Ok(())
        } else {
            Err(EditorError::InvalidSelection { key: self.key })
        }
    }
}

/// A caret or a contiguous range between two points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSelection {
    pub anchor: Point,
    pub focus: Point,
    /// Format applied to text typed at a collapsed caret.
    pub format: TextFormat,
}

/// A set of whole nodes, such as a selected image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeSelection {
    pub keys: BTreeSet<NodeKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Range(RangeSelection),
    Node(NodeSelection),
}

impl Selection {
    pub fn caret(point: Point) -> Self {
        Selection::Range(RangeSelection::collapsed(point))
    }

    pub fn as_range(&self) -> Option<&RangeSelection> {
        match self {
            Selection::Range(range) => Some(range),
            Selection::Node(_) => None,
        }
    }

    pub fn validate(&self, doc: &Document) -> Result<(), EditorError> {
        match self {
            Selection::Range(range) => range.validate(doc),
            Selection::Node(nodes) => match nodes.keys.iter().find(|&&k| !doc.contains(k)) {
                Some(&key) => Err(EditorError::InvalidSelection { key }),
                None => Ok(()),
            },
        }
    }
}

/// Chars `start..end` of one text-like leaf covered by a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub key: NodeKey,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Pre-order index of every attached node, used to order points.
pub(crate) struct DocumentOrder<'a> {
    doc: &'a Document,
    index: HashMap<NodeKey, usize>,
}

impl<'a> DocumentOrder<'a> {
    pub(crate) fn new(doc: &'a Document) -> Self {
        let index = doc
            .preorder()
            .into_iter()
            .enumerate()
            .map(|(i, k)| (k, i))
            .collect();
        Self { doc, index }
    }

    pub(crate) fn index_of(&self, key: NodeKey) -> usize {
        self.index.get(&key).copied().unwrap_or(usize::MAX)
    }

    /// Canonical `(node index, offset)` position of a point.
    ///
    /// Element points resolve to the start of the child at their offset, or to
    /// the very end of the element's last descendant when the offset is past
    /// the last child.
    pub(crate) fn position(&self, point: &Point) -> (usize, usize) {
        match point.kind {
            PointKind::Text => (self.index_of(point.key), point.offset),
            PointKind::Element => {
                let children = self.doc.children(point.key);
                if let Some(&child) = children.get(point.offset) {
                    (self.index_of(child), 0)
                } else if children.is_empty() {
                    (self.index_of(point.key), 0)
                } else {
                    (
                        self.index_of(self.doc.last_descendant(point.key)),
                        usize::MAX,
                    )
                }
            }
        }
    }

    pub(crate) fn compare(&self, a: &Point, b: &Point) -> Ordering {
        self.position(a).cmp(&self.position(b))
    }
}

impl RangeSelection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self {
            anchor,
            focus,
            format: TextFormat::empty(),
        }
    }

    pub fn collapsed(point: Point) -> Self {
        Self::new(point, point)
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    pub fn validate(&self, doc: &Document) -> Result<(), EditorError> {
        self.anchor.validate(doc)?;
        self.focus.validate(doc)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self, doc: &Document) -> bool {
        DocumentOrder::new(doc).compare(&self.focus, &self.anchor) == Ordering::Less
    }

    /// The two points in document order.
    pub fn start_end(&self, doc: &Document) -> (Point, Point) {
        if self.is_backward(doc) {
            (self.focus, self.anchor)
        } else {
            (self.anchor, self.focus)
        }
    }

    /// Per-leaf char ranges covered by the selection, in document order.
    ///
    /// A collapsed selection covers nothing.
    pub fn segments(&self, doc: &Document) -> Vec<Segment> {
        if self.is_collapsed() {
            return Vec::new();
        }
        let order = DocumentOrder::new(doc);
        let (start, end) = self.start_end(doc);
        let (start, end) = (order.position(&start), order.position(&end));

        doc.text_leaves(NodeKey::ROOT)
            .into_iter()
            .filter_map(|key| {
                let index = order.index_of(key);
                let len = doc.kind(key).map_or(0, NodeKind::text_len);
                let seg_start = match index.cmp(&start.0) {
                    Ordering::Less => return None,
                    Ordering::Equal => start.1.min(len),
                    Ordering::Greater => 0,
                };
                let seg_end = match index.cmp(&end.0) {
                    Ordering::Greater => return None,
                    Ordering::Equal => end.1.min(len),
                    Ordering::Less => len,
                };
                (seg_start <= seg_end).then_some(Segment {
                    key,
                    start: seg_start,
                    end: seg_end,
                })
            })
            .collect()
    }

    /// Whether the selection carries `format`.
    ///
    /// A caret answers from its own format. A range answers from the text it
    /// covers: every covered non-empty segment must carry the format.
    pub fn has_format(&self, doc: &Document, format: TextFormat) -> bool {
        if self.is_collapsed() {
            return self.format.contains(format);
        }
        let covered: Vec<TextFormat> = self
            .segments(doc)
            .into_iter()
            .filter(|s| !s.is_empty())
            .filter_map(|s| doc.kind(s.key).and_then(NodeKind::format))
            .collect();
        if covered.is_empty() {
            self.format.contains(format)
        } else {
            covered.iter().all(|f| f.contains(format))
        }
    }

    /// Selected plain text; leaves of different blocks are joined by newlines.
    pub fn text(&self, doc: &Document) -> String {
        let mut out = String::new();
        let mut last_block = None;
        for segment in self.segments(doc) {
            let block = doc.nearest_text_block(segment.key);
            if last_block.is_some() && block != last_block {
                out.push('\n');
            }
            last_block = block;
            if let Some(text) = doc.kind(segment.key).and_then(NodeKind::text_content) {
                let from = byte_index(text, segment.start);
                let to = byte_index(text, segment.end);
                out.push_str(&text[from..to]);
            }
        }
        out
    }
}

/// Select the first hashtag or keyword whose text is `needle` as a whole node.
///
/// Keywords match on their inner text, without the brackets.
pub fn locate_atom(doc: &Document, needle: &str) -> Option<NodeSelection> {
    doc.preorder()
        .into_iter()
        .find(|&k| {
            matches!(
                doc.kind(k),
                Some(NodeKind::Hashtag { text, .. } | NodeKind::Keyword { text, .. }) if text == needle
            )
        })
        .map(|key| NodeSelection {
            keys: [key].into_iter().collect(),
        })
}

/// Find the first occurrence of `needle` inside a single text block and
/// return a forward selection over it.
pub fn locate_text(doc: &Document, needle: &str) -> Option<RangeSelection> {
    if needle.is_empty() {
        return None;
    }
    let needle_chars = needle.chars().count();
    for block in doc.preorder() {
        if !doc.kind(block).is_some_and(NodeKind::is_text_block) {
            continue;
        }
        // (key, first char, char len) for text leaves; line breaks count one char.
        let mut pieces: Vec<(Option<NodeKey>, usize, usize)> = Vec::new();
        let mut text = String::new();
        let mut chars = 0;
        for leaf in doc.inline_leaves(block) {
            match doc.kind(leaf) {
                Some(NodeKind::LineBreak) => {
                    pieces.push((None, chars, 1));
                    text.push('\n');
                    chars += 1;
                }
                Some(kind) => {
                    let content = kind.text_content().unwrap_or_default();
                    let len = content.chars().count();
                    pieces.push((Some(leaf), chars, len));
                    text.push_str(content);
                    chars += len;
                }
                None => {}
            }
        }
        let Some(byte_start) = text.find(needle) else {
            continue;
        };
        let start = text[..byte_start].chars().count();
        let end = start + needle_chars;

        let anchor = pieces.iter().find_map(|&(key, first, len)| {
            let key = key?;
            (start >= first && start < first + len).then(|| Point::text(key, start - first))
        });
        let focus = pieces.iter().rev().find_map(|&(key, first, len)| {
            let key = key?;
            (end > first && end <= first + len).then(|| Point::text(key, end - first))
        });
        if let (Some(anchor), Some(focus)) = (anchor, focus) {
            return Some(RangeSelection::new(anchor, focus));
        }
    }
    None
}
