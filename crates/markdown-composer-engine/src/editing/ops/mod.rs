//! Document transformations behind the rich-text commands.
//!
//! Each operation works on a [`Draft`](crate::editing::Draft) inside an update
//! and leaves normalisation to the commit.

mod block;
mod format;
mod link;
mod list;
mod text;

pub(crate) use block::set_block_type;
pub(crate) use format::format_text;
pub(crate) use link::toggle_link;
pub(crate) use list::{insert_list, remove_list};
pub(crate) use text::insert_text;

use crate::editing::document::Document;
use crate::editing::node::{NodeKey, NodeKind, TextFormat, byte_index};
use crate::editing::selection::{DocumentOrder, Point, PointKind, RangeSelection, Selection};
use crate::error::EditorError;

/// Split a plain text node at a char offset strictly inside it.
///
/// The original keeps the left half; the returned key holds the right half.
pub(crate) fn split_text(
    doc: &mut Document,
    key: NodeKey,
    offset: usize,
) -> Result<NodeKey, EditorError> {
    let (text, format) = match doc.kind(key) {
        Some(NodeKind::Text { text, format }) => (text.clone(), *format),
        Some(other) => {
            return Err(EditorError::Rejected(format!(
                "cannot split {} node {key}",
                other.node_type()
            )));
        }
        None => return Err(EditorError::NodeNotFound(key)),
    };
    let at = byte_index(&text, offset);
    if let Some(left) = doc.kind_mut(key)?.text_mut() {
        left.truncate(at);
    }
    let right = doc.create(NodeKind::formatted(&text[at..], format));
    doc.insert_after(key, right)?;
    Ok(right)
}

/// Split text so every selected segment is a whole node, then reselect them.
///
/// Hashtags and keywords are atomic and are taken whole. Returns the selected
/// leaves in document order.
pub(crate) fn isolate_selected(
    doc: &mut Document,
    selection: &mut Option<Selection>,
) -> Result<Vec<NodeKey>, EditorError> {
    let Some(Selection::Range(range)) = selection else {
        return Ok(Vec::new());
    };
    let backward = range.is_backward(doc);
    let segments: Vec<_> = range
        .segments(doc)
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

    let mut keys = Vec::with_capacity(segments.len());
    for segment in segments {
        let mut key = segment.key;
        if let Some(NodeKind::Text { .. }) = doc.kind(key) {
            let len = doc.kind(key).map_or(0, NodeKind::text_len);
            if segment.end < len {
                split_text(doc, key, segment.end)?;
            }
            if segment.start > 0 {
                key = split_text(doc, key, segment.start)?;
            }
        }
        keys.push(key);
    }

    if let (Some(&first), Some(&last)) = (keys.first(), keys.last()) {
        let start = Point::text(first, 0);
        let end = Point::text(last, doc.kind(last).map_or(0, NodeKind::text_len));
        (range.anchor, range.focus) = if backward { (end, start) } else { (start, end) };
    }
    Ok(keys)
}

/// Text blocks touched by the selection, in document order.
///
/// A block counts as touched when the range overlaps its inline content, so a
/// caret in an empty paragraph still selects that paragraph, and a list item
/// is not touched by a selection inside its nested list.
pub(crate) fn selected_blocks(doc: &Document, range: &RangeSelection) -> Vec<NodeKey> {
    let order = DocumentOrder::new(doc);
    let (start, end) = range.start_end(doc);
    let (start, end) = (order.position(&start), order.position(&end));

    doc.preorder()
        .into_iter()
        .filter(|&block| {
            if !doc.kind(block).is_some_and(NodeKind::is_text_block) {
                return false;
            }
            let index = order.index_of(block);
            let inline_end = doc
                .inline_leaves(block)
                .last()
                .map_or(index, |&leaf| order.index_of(leaf));
            (index, 0) <= end && (inline_end, usize::MAX) >= start
        })
        .collect()
}

/// Point every element point on `from` at `to`, clamping the offset.
pub(crate) fn retarget_element_points(
    doc: &Document,
    selection: &mut Option<Selection>,
    from: NodeKey,
    to: NodeKey,
) {
    let Some(Selection::Range(range)) = selection else {
        return;
    };
    let limit = doc.children(to).len();
    for point in [&mut range.anchor, &mut range.focus] {
        if point.key == from && point.kind == PointKind::Element {
            *point = Point::element(to, point.offset.min(limit));
        }
    }
}

/// Move the inline children of `from` (everything except nested lists) to the end of `to`.
pub(crate) fn move_inline_children(
    doc: &mut Document,
    from: NodeKey,
    to: NodeKey,
) -> Result<(), EditorError> {
    for child in doc.children(from).to_vec() {
        if !matches!(doc.kind(child), Some(NodeKind::List { .. })) {
            doc.append(to, child)?;
        }
    }
    Ok(())
}

/// A collapsed caret inside a plain or emphasised text node, outside code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextCaret {
    pub block: NodeKey,
    pub leaf: NodeKey,
    pub offset: usize,
    pub format: TextFormat,
    /// Chars of the leaf before the caret.
    pub before: Vec<char>,
}

pub(crate) fn text_caret(doc: &Document, selection: Option<&Selection>) -> Option<TextCaret> {
    let range = selection?.as_range()?;
    if !range.is_collapsed() || range.anchor.kind != PointKind::Text {
        return None;
    }
    let leaf = range.anchor.key;
    let Some(NodeKind::Text { text, format }) = doc.kind(leaf) else {
        return None;
    };
    if format.contains(TextFormat::CODE) {
        return None;
    }
    let block = doc.nearest_text_block(leaf)?;
    if matches!(doc.kind(block), Some(NodeKind::Code { .. })) {
        return None;
    }
    Some(TextCaret {
        block,
        leaf,
        offset: range.anchor.offset,
        format: *format,
        before: text.chars().take(range.anchor.offset).collect(),
    })
}

/// Put `node` in place of chars `start..end` of text `leaf`.
///
/// The leaf keeps the text before the cut; the text after it moves to a new
/// node following `node`, whose key is returned with `node`'s. Either side
/// may end up empty and is left for normalisation.
pub(crate) fn splice_text(
    doc: &mut Document,
    leaf: NodeKey,
    start: usize,
    end: usize,
    node: NodeKind,
) -> Result<(NodeKey, NodeKey), EditorError> {
    let Some(NodeKind::Text { text, format }) = doc.kind(leaf).cloned() else {
        return Err(EditorError::Rejected(format!("cannot splice into node {leaf}")));
    };
    let right: String = text.chars().skip(end).collect();
    if let Some(left) = doc.kind_mut(leaf)?.text_mut() {
        left.truncate(byte_index(&text, start));
    }
    let inserted = doc.create(node);
    doc.insert_after(leaf, inserted)?;
    let rest = doc.create(NodeKind::formatted(right, format));
    doc.insert_after(inserted, rest)?;
    Ok((inserted, rest))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::editing::document::Document;
    use crate::editing::node::{NodeKey, NodeKind};

    /// Append a block of `kind` under the root holding one text node per entry.
    pub fn block(doc: &mut Document, kind: NodeKind, texts: &[&str]) -> (NodeKey, Vec<NodeKey>) {
        let block = doc.create(kind);
        doc.append(NodeKey::ROOT, block).unwrap();
        let leaves = texts
            .iter()
            .map(|t| {
                let leaf = doc.create(NodeKind::text(*t));
                doc.append(block, leaf).unwrap();
                leaf
            })
            .collect();
        (block, leaves)
    }
}
