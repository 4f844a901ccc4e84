//! Post-mutation cleanup run before every commit.
//!
//! Normalisation keeps the tree in canonical form: no empty text, no adjacent
//! text nodes sharing a format, no empty inline wrappers or lists, and at least
//! one block under the root. Selection points are carried along as nodes merge
//! and disappear.

use crate::editing::document::Document;
use crate::editing::node::{NodeKey, NodeKind};
use crate::editing::selection::{Point, PointKind, Selection};

pub(crate) fn normalize(doc: &mut Document, selection: &mut Option<Selection>) {
    loop {
        let mut changed = false;
        changed |= remove_empty_leaves(doc, selection);
        changed |= merge_adjacent_text(doc, selection);
        changed |= remove_empty_wrappers(doc, selection);
        if !changed {
            break;
        }
    }
    if doc.root().children().is_empty() {
        let paragraph = doc.create(NodeKind::Paragraph);
        if doc.append(NodeKey::ROOT, paragraph).is_ok() {
            log::trace!("normalize: inserted empty paragraph into empty root");
        }
    }
    doc.collect_garbage();
}

fn for_each_point(selection: &mut Option<Selection>, mut f: impl FnMut(&mut Point)) {
    if let Some(Selection::Range(range)) = selection {
        f(&mut range.anchor);
        f(&mut range.focus);
    }
}

/// Remove `key` from its parent, pointing any selection point that referenced
/// it at the gap it leaves behind.
fn remove_and_remap(doc: &mut Document, selection: &mut Option<Selection>, key: NodeKey) -> bool {
    let (Some(parent), Some(index)) = (doc.parent(key), doc.index_in_parent(key)) else {
        return false;
    };
    let removed = doc.descendants_inclusive(key);
    if doc.remove(key).is_err() {
        return false;
    }
    for_each_point(selection, |point| {
        if removed.contains(&point.key) {
            *point = Point::element(parent, index);
        } else if point.key == parent && point.kind == PointKind::Element && point.offset > index
        {
            point.offset -= 1;
        }
    });
    true
}

fn remove_empty_leaves(doc: &mut Document, selection: &mut Option<Selection>) -> bool {
    let empty: Vec<NodeKey> = doc
        .preorder()
        .into_iter()
        .filter(|&k| doc.kind(k).is_some_and(|kind| kind.is_text_like() && kind.text_len() == 0))
        .collect();
    let mut changed = false;
    for key in empty {
        changed |= remove_and_remap(doc, selection, key);
    }
    changed
}

fn merge_adjacent_text(doc: &mut Document, selection: &mut Option<Selection>) -> bool {
    let mut changed = false;
    for parent in doc.preorder() {
        let mut index = 1;
        while index < doc.children(parent).len() {
            let children = doc.children(parent);
            let (left, right) = (children[index - 1], children[index]);
            let mergeable = match (doc.kind(left), doc.kind(right)) {
                (
                    Some(NodeKind::Text { format: a, .. }),
                    Some(NodeKind::Text { format: b, .. }),
                ) => a == b,
                _ => false,
            };
            if !mergeable {
                index += 1;
                continue;
            }
            let right_text = doc
                .kind(right)
                .and_then(NodeKind::text_content)
                .unwrap_or_default()
                .to_string();
            let left_len = doc.kind(left).map_or(0, NodeKind::text_len);
            if let Ok(kind) = doc.kind_mut(left)
                && let Some(text) = kind.text_mut()
            {
                text.push_str(&right_text);
            }
            if doc.remove(right).is_err() {
                index += 1;
                continue;
            }
            for_each_point(selection, |point| {
                if point.key == right {
                    *point = Point::text(left, left_len + point.offset);
                } else if point.key == parent
                    && point.kind == PointKind::Element
                    && point.offset > index
                {
                    point.offset -= 1;
                }
            });
            changed = true;
        }
    }
    changed
}

fn remove_empty_wrappers(doc: &mut Document, selection: &mut Option<Selection>) -> bool {
    let empty: Vec<NodeKey> = doc
        .preorder()
        .into_iter()
        .filter(|&k| {
            doc.kind(k).is_some_and(|kind| {
                kind.is_inline_element() || matches!(kind, NodeKind::List { .. })
            }) && doc.children(k).is_empty()
        })
        .collect();
    let mut changed = false;
    for key in empty {
        changed |= remove_and_remap(doc, selection, key);
    }
    changed
}
