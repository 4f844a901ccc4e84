use crate::editing::document::Document;
use crate::editing::editor::Draft;
use crate::editing::node::{ListType, NodeKey, NodeKind, NodeType};
use crate::error::EditorError;

use super::{move_inline_children, retarget_element_points, selected_blocks};

fn checked_for(list_type: ListType, current: Option<bool>) -> Option<bool> {
    match list_type {
        ListType::Check => Some(current.unwrap_or(false)),
        ListType::Bullet | ListType::Number => None,
    }
}

/// Turn the touched blocks into list items of `list_type`.
///
/// Items already in a list switch that list's type. New lists merge with
/// neighbouring lists of the same type. Code blocks are left alone.
pub(crate) fn insert_list(draft: &mut Draft, list_type: ListType) -> Result<(), EditorError> {
    let Some(range) = draft.range_selection().cloned() else {
        return Ok(());
    };
    let blocks = selected_blocks(&draft.document, &range);
    let mut retyped: Vec<NodeKey> = Vec::new();
    let mut created: Vec<NodeKey> = Vec::new();

    for block in blocks {
        let Some(kind) = draft.document.kind(block).cloned() else {
            continue;
        };
        match kind {
            NodeKind::ListItem { .. } => {
                let Some(list) = draft.document.parent(block) else {
                    continue;
                };
                if retyped.contains(&list) {
                    continue;
                }
                retyped.push(list);
                retype_list(&mut draft.document, list, list_type)?;
            }
            NodeKind::Paragraph | NodeKind::Heading { .. } | NodeKind::Quote => {
                let doc = &mut draft.document;
                let item = doc.create(NodeKind::ListItem {
                    checked: checked_for(list_type, None),
                });
                move_inline_children(doc, block, item)?;
                let list = doc.create(NodeKind::List {
                    list_type,
                    start: 1,
                });
                doc.append(list, item)?;
                doc.replace_with(block, list)?;
                doc.remove(block)?;
                retarget_element_points(doc, &mut draft.selection, block, item);
                created.push(list);
            }
            _ => log::trace!("insert-list skips {} block {block}", kind.node_type()),
        }
    }

    for list in created {
        if draft.document.contains(list) {
            merge_with_neighbours(&mut draft.document, list)?;
        }
    }
    Ok(())
}

fn retype_list(doc: &mut Document, list: NodeKey, list_type: ListType) -> Result<(), EditorError> {
    if let NodeKind::List { list_type: t, .. } = doc.kind_mut(list)? {
        *t = list_type;
    }
    for item in doc.children(list).to_vec() {
        if let NodeKind::ListItem { checked } = doc.kind_mut(item)? {
            *checked = checked_for(list_type, *checked);
        }
    }
    Ok(())
}

fn same_list_type(doc: &Document, a: NodeKey, b: NodeKey) -> bool {
    match (doc.kind(a), doc.kind(b)) {
        (Some(NodeKind::List { list_type: x, .. }), Some(NodeKind::List { list_type: y, .. })) => {
            x == y
        }
        _ => false,
    }
}

fn merge_with_neighbours(doc: &mut Document, list: NodeKey) -> Result<(), EditorError> {
    let Some(parent) = doc.parent(list) else {
        return Ok(());
    };
    let Some(index) = doc.index_in_parent(list) else {
        return Ok(());
    };
    let mut target = list;
    if index > 0 {
        let previous = doc.children(parent)[index - 1];
        if same_list_type(doc, previous, list) {
            doc.move_children(list, previous)?;
            doc.remove(list)?;
            target = previous;
        }
    }
    if let Some(index) = doc.index_in_parent(target)
        && let Some(&next) = doc.children(parent).get(index + 1)
        && same_list_type(doc, target, next)
    {
        doc.move_children(next, target)?;
        doc.remove(next)?;
    }
    Ok(())
}

/// Flatten every list touched by the selection into paragraphs.
///
/// The outermost list is flattened, nested items included, in document order.
pub(crate) fn remove_list(draft: &mut Draft) -> Result<(), EditorError> {
    let Some(range) = draft.range_selection().cloned() else {
        return Ok(());
    };
    let mut lists: Vec<NodeKey> = Vec::new();
    for block in selected_blocks(&draft.document, &range) {
        if draft.document.node_type(block) != Some(NodeType::ListItem) {
            continue;
        }
        if let Some(top) = draft.document.top_level_element(block)
            && draft.document.node_type(top) == Some(NodeType::List)
            && !lists.contains(&top)
        {
            lists.push(top);
        }
    }

    for list in lists {
        let doc = &mut draft.document;
        let items: Vec<NodeKey> = doc
            .descendants_inclusive(list)
            .into_iter()
            .filter(|&k| doc.node_type(k) == Some(NodeType::ListItem))
            .collect();
        for item in items {
            let paragraph = doc.create(NodeKind::Paragraph);
            move_inline_children(doc, item, paragraph)?;
            doc.insert_before(list, paragraph)?;
            retarget_element_points(doc, &mut draft.selection, item, paragraph);
        }
        doc.remove(list)?;
    }
    Ok(())
}
