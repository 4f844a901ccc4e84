use crate::editing::commands::BlockTarget;
use crate::editing::document::Document;
use crate::editing::editor::Draft;
use crate::editing::node::{NodeKey, NodeKind};
use crate::editing::selection::Selection;
use crate::error::EditorError;

use super::{move_inline_children, retarget_element_points, selected_blocks};

impl BlockTarget {
    pub(crate) fn kind(self) -> NodeKind {
        match self {
            BlockTarget::Paragraph => NodeKind::Paragraph,
            BlockTarget::Heading(level) => NodeKind::Heading { level },
        }
    }
}

/// Convert every touched block to `target`.
///
/// Paragraphs, headings and quotes change in place. Items of a top-level
/// list are lifted out, splitting the list around them; items of nested
/// lists and code blocks are left as they are.
pub(crate) fn set_block_type(draft: &mut Draft, target: BlockTarget) -> Result<(), EditorError> {
    let Some(range) = draft.range_selection().cloned() else {
        return Ok(());
    };
    if let BlockTarget::Heading(level) = target
        && !(1..=6).contains(&level)
    {
        return Err(EditorError::Rejected(format!("heading level {level}")));
    }
    let new_kind = target.kind();

    for block in selected_blocks(&draft.document, &range) {
        let Some(kind) = draft.document.kind(block).cloned() else {
            continue;
        };
        match kind {
            NodeKind::Paragraph | NodeKind::Heading { .. } | NodeKind::Quote => {
                if kind != new_kind {
                    *draft.document.kind_mut(block)? = new_kind.clone();
                }
            }
            NodeKind::ListItem { .. } => {
                lift_item(&mut draft.document, &mut draft.selection, block, &new_kind)?;
            }
            _ => log::trace!("set-block-type skips {} block {block}", kind.node_type()),
        }
    }
    Ok(())
}

/// Move a top-level list item out of its list as a `kind` block.
///
/// Items after it, and the items of its nested lists, continue in a new list
/// of the same type placed after the lifted block.
fn lift_item(
    doc: &mut Document,
    selection: &mut Option<Selection>,
    item: NodeKey,
    kind: &NodeKind,
) -> Result<(), EditorError> {
    let list = doc.parent(item).ok_or(EditorError::NodeNotFound(item))?;
    if doc.parent(list) != Some(NodeKey::ROOT) {
        log::debug!("set-block-type leaves nested list item {item} in place");
        return Ok(());
    }
    let Some(NodeKind::List { list_type, start }) = doc.kind(list).cloned() else {
        return Ok(());
    };
    let index = doc
        .index_in_parent(item)
        .ok_or(EditorError::NodeNotFound(item))?;
    let following: Vec<NodeKey> = doc.children(list)[index + 1..].to_vec();
    let nested_items: Vec<NodeKey> = doc
        .children(item)
        .iter()
        .filter(|&&c| matches!(doc.kind(c), Some(NodeKind::List { .. })))
        .flat_map(|&nested| doc.children(nested).to_vec())
        .collect();

    let block = doc.create(kind.clone());
    move_inline_children(doc, item, block)?;
    doc.insert_after(list, block)?;

    if !following.is_empty() || !nested_items.is_empty() {
        let tail = doc.create(NodeKind::List {
            list_type,
            start: start + index + 1,
        });
        doc.insert_after(block, tail)?;
        for moved in nested_items.into_iter().chain(following) {
            doc.append(tail, moved)?;
        }
    }

    doc.remove(item)?;
    retarget_element_points(doc, selection, item, block);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::editor::Editor;
    use crate::editing::node::ListType;
    use crate::editing::ops::fixtures::block;
    use crate::editing::selection::{Point, RangeSelection};
    use pretty_assertions::assert_eq;

    fn bullet_list(doc: &mut Document, texts: &[&str]) -> Vec<NodeKey> {
        let list = doc.create(NodeKind::List {
            list_type: ListType::Bullet,
            start: 1,
        });
        doc.append(NodeKey::ROOT, list).unwrap();
        texts
            .iter()
            .map(|t| {
                let item = doc.create(NodeKind::ListItem { checked: None });
                doc.append(list, item).unwrap();
                let leaf = doc.create(NodeKind::text(*t));
                doc.append(item, leaf).unwrap();
                leaf
            })
            .collect()
    }

    #[test]
    fn test_paragraph_becomes_heading_in_place() {
        let mut doc = Document::empty_root();
        let (p, leaves) = block(&mut doc, NodeKind::Paragraph, &["title"]);
        let caret = RangeSelection::collapsed(Point::text(leaves[0], 0));
        let mut editor = Editor::with_state(doc, Some(Selection::Range(caret)), true);

        editor
            .update(|draft| set_block_type(draft, BlockTarget::Heading(2)))
            .unwrap();

        assert_eq!(
            editor.document().kind(p),
            Some(&NodeKind::Heading { level: 2 })
        );
    }

    #[test]
    fn test_middle_item_splits_list() {
        let mut doc = Document::empty_root();
        let leaves = bullet_list(&mut doc, &["a", "b", "c"]);
        let caret = RangeSelection::collapsed(Point::text(leaves[1], 0));
        let mut editor = Editor::with_state(doc, Some(Selection::Range(caret)), true);

        editor
            .update(|draft| set_block_type(draft, BlockTarget::Paragraph))
            .unwrap();

        assert_eq!(
            editor.document().outline().to_string(),
            "root\n  list bullet 1\n    listitem\n      text \"a\"\n  paragraph\n    text \"b\"\n  list bullet 3\n    listitem\n      text \"c\"\n"
        );
        editor.document().check_invariants().unwrap();
    }

    #[test]
    fn test_invalid_heading_level_is_rejected() {
        let mut doc = Document::empty_root();
        let (_, leaves) = block(&mut doc, NodeKind::Paragraph, &["x"]);
        let caret = RangeSelection::collapsed(Point::text(leaves[0], 0));
        let mut editor = Editor::with_state(doc, Some(Selection::Range(caret)), true);
        assert!(
            editor
                .update(|draft| set_block_type(draft, BlockTarget::Heading(9)))
                .is_err()
        );
        assert_eq!(editor.version(), 0);
    }
}
