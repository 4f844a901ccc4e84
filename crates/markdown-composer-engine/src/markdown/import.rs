use crate::editing::normalize::normalize;
use crate::editing::{Document, ListType, NodeKey, NodeKind};
use crate::error::EditorError;

use super::blocks::{BlockKind, BlockNode, ListMarkerInfo};
use super::inline::{Inline, InlineParser};

/// An open list while a run of list items is being placed.
struct OpenList {
    depth: usize,
    list: NodeKey,
    list_type: ListType,
    last_item: Option<NodeKey>,
}

/// Build a normalized document from parsed blocks.
pub fn build_document(blocks: &[BlockNode], inline: &InlineParser) -> Result<Document, EditorError> {
    let mut doc = Document::empty_root();
    let mut lists: Vec<OpenList> = Vec::new();

    for block in blocks {
        let kind = match &block.kind {
            BlockKind::ListItem(marker) => {
                let item = place_list_item(&mut doc, &mut lists, marker)?;
                append_inline(&mut doc, item, &inline.parse(&block.content()))?;
                continue;
            }
            BlockKind::Paragraph => NodeKind::Paragraph,
            BlockKind::Heading { level } => NodeKind::Heading { level: *level },
            BlockKind::Quote => NodeKind::Quote,
            BlockKind::FencedCode { language, .. } => NodeKind::Code {
                language: language.clone(),
            },
        };
        lists.clear();
        let is_code = matches!(kind, NodeKind::Code { .. });
        let key = doc.create(kind);
        doc.append(NodeKey::ROOT, key)?;
        if is_code {
            append_raw_lines(&mut doc, key, &block.lines)?;
        } else {
            append_inline(&mut doc, key, &inline.parse(&block.content()))?;
        }
    }

    normalize(&mut doc, &mut None);
    Ok(doc)
}

/// Create the item for `marker`, opening or closing lists to reach its depth.
fn place_list_item(
    doc: &mut Document,
    lists: &mut Vec<OpenList>,
    marker: &ListMarkerInfo,
) -> Result<NodeKey, EditorError> {
    while lists.last().is_some_and(|open| open.depth > marker.depth) {
        lists.pop();
    }
    if lists
        .last()
        .is_some_and(|open| open.depth == marker.depth && open.list_type != marker.list_type)
    {
        let replaced = lists.pop();
        let list = new_list(doc, marker);
        match replaced.and_then(|open| doc.parent(open.list)) {
            Some(parent) => doc.append(parent, list)?,
            None => doc.append(NodeKey::ROOT, list)?,
        }
        lists.push(OpenList {
            depth: marker.depth,
            list,
            list_type: marker.list_type,
            last_item: None,
        });
    }

    let needs_new_list = lists.last().is_none_or(|open| open.depth < marker.depth);
    if needs_new_list {
        let list = new_list(doc, marker);
        let parent = match lists.last() {
            Some(open) => match open.last_item {
                Some(item) => item,
                None => open.list,
            },
            None => NodeKey::ROOT,
        };
        doc.append(parent, list)?;
        lists.push(OpenList {
            depth: marker.depth,
            list,
            list_type: marker.list_type,
            last_item: None,
        });
    }

    let item = doc.create(NodeKind::ListItem {
        checked: (marker.list_type == ListType::Check).then_some(marker.checked.unwrap_or(false)),
    });
    if let Some(open) = lists.last_mut() {
        doc.append(open.list, item)?;
        open.last_item = Some(item);
    }
    Ok(item)
}

fn new_list(doc: &mut Document, marker: &ListMarkerInfo) -> NodeKey {
    doc.create(NodeKind::List {
        list_type: marker.list_type,
        start: if marker.list_type == ListType::Number {
            marker.number
        } else {
            1
        },
    })
}

fn append_raw_lines(doc: &mut Document, parent: NodeKey, lines: &[String]) -> Result<(), EditorError> {
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            let br = doc.create(NodeKind::LineBreak);
            doc.append(parent, br)?;
        }
        let text = doc.create(NodeKind::text(line.clone()));
        doc.append(parent, text)?;
    }
    Ok(())
}

fn append_inline(doc: &mut Document, parent: NodeKey, inlines: &[Inline]) -> Result<(), EditorError> {
    for inline in inlines {
        let key = match inline {
            Inline::Text { text, format } => doc.create(NodeKind::formatted(text.clone(), *format)),
            Inline::Hashtag { text, format } => doc.create(NodeKind::Hashtag {
                text: text.clone(),
                format: *format,
            }),
            Inline::Keyword { text, format } => doc.create(NodeKind::Keyword {
                text: text.clone(),
                format: *format,
            }),
            Inline::LineBreak => doc.create(NodeKind::LineBreak),
            Inline::Link {
                url,
                title,
                children,
            } => {
                let link = doc.create(NodeKind::Link {
                    url: url.clone(),
                    title: title.clone(),
                });
                append_inline(doc, link, children)?;
                link
            }
        };
        doc.append(parent, key)?;
    }
    Ok(())
}
