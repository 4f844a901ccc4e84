use crate::editing::document::Document;
use crate::editing::editor::Draft;
use crate::editing::node::{NodeKey, NodeKind, NodeType};
use crate::editing::selection::{Point, PointKind, Selection};
use crate::error::EditorError;

use super::isolate_selected;

/// Link the selection to `url`, or unlink it when `url` is `None`.
pub(crate) fn toggle_link(draft: &mut Draft, url: Option<String>) -> Result<(), EditorError> {
    let Some(range) = draft.range_selection().cloned() else {
        return Ok(());
    };
    let touched: Vec<NodeKey> = if range.is_collapsed() {
        vec![range.anchor.key]
    } else {
        range
            .segments(&draft.document)
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.key)
            .collect()
    };

    let Some(url) = url else {
        let mut links: Vec<NodeKey> = Vec::new();
        for key in touched {
            if let Some(link) = draft.document.nearest_of_type(key, NodeType::Link)
                && !links.contains(&link)
            {
                links.push(link);
            }
        }
        for link in links {
            unwrap_link(&mut draft.document, &mut draft.selection, link)?;
        }
        return Ok(());
    };

    if range.is_collapsed() {
        // A caret can only retarget the link it sits in.
        if let Some(link) = draft.document.nearest_of_type(range.anchor.key, NodeType::Link) {
            set_url(&mut draft.document, link, &url)?;
        }
        return Ok(());
    }

    let keys = isolate_selected(&mut draft.document, &mut draft.selection)?;
    let mut run: Vec<NodeKey> = Vec::new();
    let mut updated: Vec<NodeKey> = Vec::new();
    for key in keys {
        if let Some(link) = draft.document.nearest_of_type(key, NodeType::Link) {
            wrap_run(&mut draft.document, &mut run, &url)?;
            if !updated.contains(&link) {
                set_url(&mut draft.document, link, &url)?;
                updated.push(link);
            }
            continue;
        }
        if let Some(&last) = run.last() {
            let doc = &draft.document;
            let adjacent = doc.parent(last) == doc.parent(key)
                && doc.index_in_parent(last).map(|i| i + 1) == doc.index_in_parent(key);
            if !adjacent {
                wrap_run(&mut draft.document, &mut run, &url)?;
            }
        }
        run.push(key);
    }
    wrap_run(&mut draft.document, &mut run, &url)
}

fn set_url(doc: &mut Document, link: NodeKey, new_url: &str) -> Result<(), EditorError> {
    if let NodeKind::Link { url, .. } = doc.kind_mut(link)? {
        *url = new_url.to_string();
    }
    Ok(())
}

/// Wrap consecutive siblings in a new link and empty the run.
fn wrap_run(doc: &mut Document, run: &mut Vec<NodeKey>, url: &str) -> Result<(), EditorError> {
    let Some(&first) = run.first() else {
        return Ok(());
    };
    let link = doc.create(NodeKind::Link {
        url: url.to_string(),
        title: None,
    });
    doc.insert_before(first, link)?;
    for key in run.drain(..) {
        doc.append(link, key)?;
    }
    Ok(())
}

/// Replace a link by its children.
fn unwrap_link(
    doc: &mut Document,
    selection: &mut Option<Selection>,
    link: NodeKey,
) -> Result<(), EditorError> {
    let parent = doc.parent(link).ok_or(EditorError::NodeNotFound(link))?;
    let index = doc
        .index_in_parent(link)
        .ok_or(EditorError::NodeNotFound(link))?;
    let children = doc.children(link).to_vec();
    let moved = children.len();
    for (i, child) in children.into_iter().enumerate() {
        doc.insert_at(parent, index + i, child)?;
    }
    doc.remove(link)?;

    if let Some(Selection::Range(range)) = selection {
        for point in [&mut range.anchor, &mut range.focus] {
            if point.kind != PointKind::Element {
                continue;
            }
            if point.key == link {
                *point = Point::element(parent, index + point.offset);
            } else if point.key == parent && point.offset > index {
                point.offset = point.offset + moved - 1;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::editor::Editor;
    use crate::editing::ops::fixtures::block;
    use crate::editing::selection::{RangeSelection, locate_text};
    use pretty_assertions::assert_eq;

    fn editor_selecting(text: &str, needle: &str) -> (Editor, NodeKey) {
        let mut doc = Document::empty_root();
        let (p, _) = block(&mut doc, NodeKind::Paragraph, &[text]);
        let range = locate_text(&doc, needle).unwrap();
        (
            Editor::with_state(doc, Some(Selection::Range(range)), true),
            p,
        )
    }

    fn link_url(editor: &Editor, p: NodeKey) -> Option<(String, String)> {
        let doc = editor.document();
        doc.children(p).iter().find_map(|&k| match doc.kind(k) {
            Some(NodeKind::Link { url, .. }) => Some((url.clone(), doc.text_content(k))),
            _ => None,
        })
    }

    #[test]
    fn test_wraps_selected_text_in_link() {
        let (mut editor, p) = editor_selecting("visit my site today", "site");
        editor
            .update(|draft| toggle_link(draft, Some("https://example.com".into())))
            .unwrap();
        assert_eq!(
            link_url(&editor, p),
            Some(("https://example.com".to_string(), "site".to_string()))
        );
        assert_eq!(editor.document().text_content(p), "visit my site today");
    }

    #[test]
    fn test_relinking_inside_link_updates_url() {
        let (mut editor, p) = editor_selecting("site", "site");
        editor
            .update(|draft| toggle_link(draft, Some("https://a.example".into())))
            .unwrap();
        editor
            .update(|draft| toggle_link(draft, Some("https://b.example".into())))
            .unwrap();
        assert_eq!(
            link_url(&editor, p).map(|(url, _)| url),
            Some("https://b.example".to_string())
        );
        assert_eq!(editor.document().children(p).len(), 1);
    }

    #[test]
    fn test_unlink_restores_plain_paragraph() {
        let (mut editor, p) = editor_selecting("visit my site today", "site");
        editor
            .update(|draft| toggle_link(draft, Some("https://example.com".into())))
            .unwrap();
        editor.update(|draft| toggle_link(draft, None)).unwrap();

        assert_eq!(link_url(&editor, p), None);
        // Text nodes merge back once the wrapper is gone.
        assert_eq!(editor.document().children(p).len(), 1);
        assert_eq!(editor.document().text_content(p), "visit my site today");
    }

    #[test]
    fn test_caret_outside_link_changes_nothing() {
        let mut doc = Document::empty_root();
        let (_, leaves) = block(&mut doc, NodeKind::Paragraph, &["plain"]);
        let caret = Selection::Range(RangeSelection::collapsed(Point::text(leaves[0], 2)));
        let mut editor = Editor::with_state(doc, Some(caret), true);
        let outcome = editor
            .update(|draft| toggle_link(draft, Some("https://x".into())))
            .unwrap();
        assert!(!outcome.committed());
    }
}
