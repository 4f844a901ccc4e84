use crate::editing::document::Document;
use crate::editing::editor::Draft;
use crate::editing::node::{NodeKey, NodeKind, TextFormat, byte_index};
use crate::editing::selection::{
    DocumentOrder, NodeSelection, Point, PointKind, RangeSelection, Selection,
};
use crate::error::EditorError;

use super::split_text;

/// Replace the selection with `text`; `\n` becomes a line break.
///
/// Inserted text takes the selection's format. The caret ends up right after
/// the inserted text.
pub(crate) fn insert_text(draft: &mut Draft, text: &str) -> Result<(), EditorError> {
    let (point, format) = match draft.selection.clone() {
        Some(Selection::Range(range)) => {
            let point = if range.is_collapsed() {
                range.anchor
            } else {
                delete_range(&mut draft.document, &range)?
            };
            (point, range.format)
        }
        Some(Selection::Node(nodes)) => remove_nodes(&mut draft.document, &nodes)?,
        None => return Ok(()),
    };
    let doc = &mut draft.document;

    let caret = if text.is_empty() {
        point
    } else {
        let (parent, mut index) = insertion_site(doc, point)?;
        let mut caret = Point::element(parent, index);
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                let line_break = doc.create(NodeKind::LineBreak);
                doc.insert_at(parent, index, line_break)?;
                index += 1;
                caret = Point::element(parent, index);
            }
            if !part.is_empty() {
                let leaf = doc.create(NodeKind::formatted(part, format));
                doc.insert_at(parent, index, leaf)?;
                index += 1;
                caret = Point::text(leaf, part.chars().count());
            }
        }
        caret
    };
    draft.selection = Some(Selection::Range(
        RangeSelection::collapsed(caret).with_format(format),
    ));
    Ok(())
}

/// Remove selected whole nodes; typing lands where the first one was and
/// takes its format.
fn remove_nodes(
    doc: &mut Document,
    nodes: &NodeSelection,
) -> Result<(Point, TextFormat), EditorError> {
    let order = DocumentOrder::new(doc);
    let mut keys: Vec<NodeKey> = nodes.keys.iter().copied().filter(|&k| !k.is_root()).collect();
    keys.sort_by_key(|&k| order.index_of(k));

    let Some(&first) = keys.first() else {
        return Err(EditorError::Rejected("node selection is empty".into()));
    };
    let parent = doc.parent(first).ok_or(EditorError::NodeNotFound(first))?;
    let index = doc.index_in_parent(first).ok_or(EditorError::NodeNotFound(first))?;
    let format = doc.node(first)?.kind().format().unwrap_or_default();
    for key in keys {
        // Already gone with a removed ancestor.
        if doc.contains(key) {
            doc.remove(key)?;
        }
    }
    Ok((Point::element(parent, index), format))
}

/// Where new inline content goes for a caret at `point`: a parent and child index.
fn insertion_site(doc: &mut Document, point: Point) -> Result<(NodeKey, usize), EditorError> {
    match point.kind {
        PointKind::Text => {
            let parent = doc
                .parent(point.key)
                .ok_or(EditorError::NodeNotFound(point.key))?;
            let index = doc
                .index_in_parent(point.key)
                .ok_or(EditorError::NodeNotFound(point.key))?;
            let kind = doc.node(point.key)?.kind();
            let len = kind.text_len();
            let splittable = matches!(kind, NodeKind::Text { .. });
            if point.offset == 0 {
                Ok((parent, index))
            } else if point.offset >= len || !splittable {
                Ok((parent, index + 1))
            } else {
                split_text(doc, point.key, point.offset)?;
                Ok((parent, index + 1))
            }
        }
        PointKind::Element => {
            let kind = doc.node(point.key)?.kind().clone();
            if kind.is_text_block() || kind.is_inline_element() {
                return Ok((point.key, point.offset));
            }
            // Root or list: find or make a block to type into.
            let children = doc.children(point.key).to_vec();
            let near = children
                .get(point.offset)
                .or_else(|| children.last())
                .copied();
            if let Some(child) = near
                && doc.kind(child).is_some_and(NodeKind::is_text_block)
            {
                let at_end = point.offset >= children.len();
                let offset = if at_end { doc.children(child).len() } else { 0 };
                return Ok((child, offset));
            }
            let block = match kind {
                NodeKind::List { .. } => doc.create(NodeKind::ListItem { checked: None }),
                _ => doc.create(NodeKind::Paragraph),
            };
            doc.insert_at(point.key, point.offset, block)?;
            Ok((block, 0))
        }
    }
}

/// Delete the content between the selection's ends and return the collapsed point.
///
/// When the range spans blocks, what remains of the last block joins the
/// first one and the blocks in between are dropped.
pub(crate) fn delete_range(doc: &mut Document, range: &RangeSelection) -> Result<Point, EditorError> {
    let (mut start, end) = range.start_end(doc);
    let order = DocumentOrder::new(doc);
    let (start_pos, end_pos) = (order.position(&start), order.position(&end));

    let start_block = doc.nearest_text_block(start.key);
    let end_block = end_text_block(doc, &end);
    let between: Vec<NodeKey> = doc
        .preorder()
        .into_iter()
        .filter(|&k| {
            let index = order.index_of(k);
            doc.kind(k).is_some_and(NodeKind::is_text_block)
                && start_block.is_some_and(|s| index > order.index_of(s))
                && end_block.is_some_and(|e| index < order.index_of(e))
        })
        .collect();
    let line_breaks: Vec<NodeKey> = doc
        .preorder()
        .into_iter()
        .filter(|&k| {
            let at = (order.index_of(k), 0);
            doc.kind(k) == Some(&NodeKind::LineBreak) && start_pos <= at && at < end_pos
        })
        .collect();
    let segments = range.segments(doc);

    for segment in segments.into_iter().filter(|s| !s.is_empty()) {
        match doc.kind(segment.key) {
            Some(NodeKind::Text { .. }) => {
                if let Some(text) = doc.kind_mut(segment.key)?.text_mut() {
                    let from = byte_index(text, segment.start);
                    let to = byte_index(text, segment.end);
                    text.replace_range(from..to, "");
                }
            }
            Some(_) => {
                // Atomic tokens go as a whole.
                if start.key == segment.key {
                    let parent = doc
                        .parent(segment.key)
                        .ok_or(EditorError::NodeNotFound(segment.key))?;
                    let index = doc.index_in_parent(segment.key).unwrap_or(0);
                    start = Point::element(parent, index);
                }
                doc.remove(segment.key)?;
            }
            None => {}
        }
    }
    for line_break in line_breaks {
        if doc.contains(line_break) {
            doc.remove(line_break)?;
        }
    }

    if let (Some(first), Some(last)) = (start_block, end_block)
        && first != last
        && !doc.ancestors(first).contains(&last)
    {
        for child in doc.children(last).to_vec() {
            if matches!(doc.kind(child), Some(NodeKind::List { .. }))
                && !matches!(doc.kind(first), Some(NodeKind::ListItem { .. }))
            {
                let anchor = doc.top_level_element(first).unwrap_or(first);
                doc.insert_after(anchor, child)?;
            } else {
                doc.append(first, child)?;
            }
        }
        doc.remove(last)?;
        for block in between {
            if !doc.contains(block) {
                continue;
            }
            for child in doc.children(block).to_vec() {
                if !matches!(doc.kind(child), Some(NodeKind::List { .. })) {
                    doc.remove(child)?;
                }
            }
            if doc.children(block).is_empty() {
                doc.remove(block)?;
            }
        }
    }
    Ok(start)
}

/// The text block a range ending at `end` ends in.
///
/// An element point on a container (list, root) ends after its child at
/// `offset - 1`, so it resolves to the last text block inside that child.
fn end_text_block(doc: &Document, end: &Point) -> Option<NodeKey> {
    if end.kind == PointKind::Element && !doc.kind(end.key).is_some_and(NodeKind::is_text_block) {
        let children = doc.children(end.key);
        let before = &children[..end.offset.min(children.len())];
        let last = before.iter().rev().find_map(|&child| {
            doc.descendants_inclusive(child)
                .into_iter()
                .rev()
                .find(|&k| doc.kind(k).is_some_and(NodeKind::is_text_block))
        });
        if last.is_some() {
            return last;
        }
    }
    doc.nearest_text_block(end.key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::editor::Editor;
    use crate::editing::node::ListType;
    use crate::editing::ops::fixtures::block;
    use pretty_assertions::assert_eq;

    fn caret_editor(text: &str, offset: usize) -> (Editor, NodeKey) {
        let mut doc = Document::empty_root();
        let (p, leaves) = block(&mut doc, NodeKind::Paragraph, &[text]);
        let caret = RangeSelection::collapsed(Point::text(leaves[0], offset));
        (
            Editor::with_state(doc, Some(Selection::Range(caret)), true),
            p,
        )
    }

    #[test]
    fn test_typing_at_caret_inserts_and_moves_caret() {
        let (mut editor, p) = caret_editor("helo", 3);
        editor.update(|draft| insert_text(draft, "l")).unwrap();
        editor.update(|draft| insert_text(draft, "!")).unwrap();
        assert_eq!(editor.document().text_content(p), "hell!o");
    }

    #[test]
    fn test_pending_format_applies_to_typed_text() {
        let (mut editor, p) = caret_editor("ab", 1);
        editor
            .update(|draft| {
                if let Some(range) = draft.range_selection_mut() {
                    range.format = TextFormat::BOLD;
                }
                insert_text(draft, "X")
            })
            .unwrap();
        let doc = editor.document();
        let formats: Vec<_> = doc
            .children(p)
            .iter()
            .filter_map(|&k| doc.kind(k).and_then(NodeKind::format))
            .collect();
        assert_eq!(
            formats,
            vec![TextFormat::empty(), TextFormat::BOLD, TextFormat::empty()]
        );
    }

    #[test]
    fn test_newline_becomes_line_break() {
        let (mut editor, p) = caret_editor("", 0);
        editor.update(|draft| insert_text(draft, "a\nb")).unwrap();
        assert_eq!(editor.document().text_content(p), "a\nb");
        assert_eq!(editor.document().children(p).len(), 3);
    }

    #[test]
    fn test_replacing_range_across_blocks_joins_them() {
        let mut doc = Document::empty_root();
        let (p1, a) = block(&mut doc, NodeKind::Paragraph, &["first line"]);
        block(&mut doc, NodeKind::Paragraph, &["middle"]);
        let (_, c) = block(&mut doc, NodeKind::Paragraph, &["last line"]);
        let range = RangeSelection::new(Point::text(a[0], 6), Point::text(c[0], 5));
        let mut editor = Editor::with_state(doc, Some(Selection::Range(range)), true);

        editor.update(|draft| insert_text(draft, "& ")).unwrap();

        let doc = editor.document();
        assert_eq!(doc.root().children(), &[p1]);
        assert_eq!(doc.text_content(p1), "first & line");
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_typing_into_empty_document() {
        let mut editor = Editor::new(Document::new());
        let p = editor.document().root().children()[0];
        editor
            .update(move |draft| {
                draft.set_selection(Some(Selection::caret(Point::element(p, 0))));
                insert_text(draft, "hello")
            })
            .unwrap();
        assert_eq!(editor.document().text_content(p), "hello");
        let caret = editor.snapshot().range_selection().unwrap();
        assert!(caret.is_collapsed());
        assert_eq!(caret.anchor.offset, 5);
    }

    #[test]
    fn test_range_ending_after_nested_list_stays_in_its_item() {
        // - outer
        //   1. nest
        let mut doc = Document::empty_root();
        let list = doc.create(NodeKind::List {
            list_type: ListType::Bullet,
            start: 1,
        });
        doc.append(NodeKey::ROOT, list).unwrap();
        let item = doc.create(NodeKind::ListItem { checked: None });
        doc.append(list, item).unwrap();
        let outer = doc.create(NodeKind::text("outer"));
        doc.append(item, outer).unwrap();
        let nested = doc.create(NodeKind::List {
            list_type: ListType::Number,
            start: 1,
        });
        doc.append(item, nested).unwrap();
        let nested_item = doc.create(NodeKind::ListItem { checked: None });
        doc.append(nested, nested_item).unwrap();
        let text = doc.create(NodeKind::text("nëst tail"));
        doc.append(nested_item, text).unwrap();

        let range = RangeSelection::new(Point::text(text, 3), Point::element(nested, 1));
        let mut editor = Editor::with_state(doc, Some(Selection::Range(range)), true);
        editor.update(|draft| insert_text(draft, "Z")).unwrap();

        let doc = editor.document();
        assert_eq!(doc.text_content(nested_item), "nësZ");
        assert_eq!(doc.children(item), &[outer, nested]);
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_typing_over_selected_hashtag_replaces_it() {
        let mut doc = Document::empty_root();
        let (p, _) = block(&mut doc, NodeKind::Paragraph, &["see "]);
        let tag = doc.create(NodeKind::Hashtag {
            text: "#todo".into(),
            format: TextFormat::ITALIC,
        });
        doc.append(p, tag).unwrap();
        let tail = doc.create(NodeKind::text(" now"));
        doc.append(p, tail).unwrap();

        let nodes = NodeSelection {
            keys: [tag].into_iter().collect(),
        };
        let mut editor = Editor::with_state(doc, Some(Selection::Node(nodes)), true);
        editor.update(|draft| insert_text(draft, "done")).unwrap();

        let doc = editor.document();
        assert_eq!(doc.text_content(p), "see done now");
        assert!(!doc.contains(tag));
        let typed = doc
            .children(p)
            .iter()
            .find(|&&k| doc.kind(k).and_then(NodeKind::text_content) == Some("done"))
            .copied()
            .unwrap();
        assert_eq!(doc.kind(typed).and_then(NodeKind::format), Some(TextFormat::ITALIC));
        assert!(editor.snapshot().range_selection().unwrap().is_collapsed());
    }
}
