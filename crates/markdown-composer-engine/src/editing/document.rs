use std::collections::BTreeMap;
use std::fmt;

use crate::editing::node::{Node, NodeKey, NodeKind, NodeType};
use crate::error::EditorError;

/// Tree of typed nodes rooted at a single root element.
///
/// The document is an arena keyed by [`NodeKey`]. Every structural change goes
/// through the primitives below so parent and child links always agree.
///
/// ## Structure
///
/// - The root owns block nodes: paragraphs, headings, quotes, code blocks and lists
/// - Lists own list items; a list item owns inline content and optionally one
///   nested list
/// - Text blocks own inline content: text, hashtags, keywords, line breaks and
///   inline wrappers (links, marks, overflow)
///
/// Equality compares the nodes only, so two documents built the same way compare
/// equal regardless of how many keys were allocated along the way.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: BTreeMap<NodeKey, Node>,
    next_key: u64,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl Eq for Document {}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding one empty paragraph.
    pub fn new() -> Self {
        let mut doc = Self::empty_root();
        let paragraph = doc.create(NodeKind::Paragraph);
        doc.push_child(NodeKey::ROOT, paragraph);
        doc
    }

    /// Create a document with a bare root; callers fill it in.
    pub(crate) fn empty_root() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            NodeKey::ROOT,
            Node {
                key: NodeKey::ROOT,
                parent: None,
                kind: NodeKind::Root,
                children: Vec::new(),
            },
        );
        Self { nodes, next_key: 1 }
    }

    // ============ Lookup ============

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(&key)
    }

    pub fn node(&self, key: NodeKey) -> Result<&Node, EditorError> {
        self.nodes.get(&key).ok_or(EditorError::NodeNotFound(key))
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.nodes.get(&key).map(|n| &n.kind)
    }

    pub fn node_type(&self, key: NodeKey) -> Option<NodeType> {
        self.kind(key).map(NodeKind::node_type)
    }

    pub fn kind_mut(&mut self, key: NodeKey) -> Result<&mut NodeKind, EditorError> {
        self.nodes
            .get_mut(&key)
            .map(|n| &mut n.kind)
            .ok_or(EditorError::NodeNotFound(key))
    }

    pub fn root(&self) -> &Node {
        &self.nodes[&NodeKey::ROOT]
    }

    /// Children of `key`; empty for leaves and unknown keys.
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(&key).map_or(&[], |n| n.children.as_slice())
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(&key).and_then(|n| n.parent)
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|&k| k == key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the document holds no text and no atomic inline content.
    pub fn is_empty(&self) -> bool {
        self.nodes
            .values()
            .all(|n| n.kind.text_len() == 0 && n.kind != NodeKind::LineBreak)
    }

    // ============ Structural primitives ============

    /// Allocate a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        self.nodes.insert(
            key,
            Node {
                key,
                parent: None,
                kind,
                children: Vec::new(),
            },
        );
        key
    }

    pub fn append(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), EditorError> {
        let index = self.children(parent).len();
        self.insert_at(parent, index, child)
    }

    /// Insert `child` into `parent` at `index`, detaching it from any previous parent.
    pub fn insert_at(
        &mut self,
        parent: NodeKey,
        index: usize,
        child: NodeKey,
    ) -> Result<(), EditorError> {
        let parent_node = self.node(parent)?;
        if !parent_node.kind.is_element() {
            return Err(EditorError::NotAnElement {
                key: parent,
                node_type: parent_node.node_type(),
            });
        }
        self.node(child)?;
        if child.is_root() || self.is_ancestor_or_self(child, parent) {
            return Err(EditorError::Rejected(format!(
                "cannot move {child} beneath {parent}"
            )));
        }

        let mut index = index;
        if self.parent(child) == Some(parent)
            && let Some(current) = self.index_in_parent(child)
            && current < index
        {
            index -= 1;
        }
        self.detach(child)?;

        let parent_node = self.nodes.get_mut(&parent).ok_or(EditorError::NodeNotFound(parent))?;
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    pub fn insert_before(&mut self, sibling: NodeKey, child: NodeKey) -> Result<(), EditorError> {
        let parent = self.parent(sibling).ok_or(EditorError::NodeNotFound(sibling))?;
        let index = self
            .index_in_parent(sibling)
            .ok_or(EditorError::NodeNotFound(sibling))?;
        self.insert_at(parent, index, child)
    }

    pub fn insert_after(&mut self, sibling: NodeKey, child: NodeKey) -> Result<(), EditorError> {
        let parent = self.parent(sibling).ok_or(EditorError::NodeNotFound(sibling))?;
        let index = self
            .index_in_parent(sibling)
            .ok_or(EditorError::NodeNotFound(sibling))?;
        self.insert_at(parent, index + 1, child)
    }

    /// Unlink `key` from its parent, keeping the node and its subtree alive.
    pub fn detach(&mut self, key: NodeKey) -> Result<(), EditorError> {
        let parent = self.node(key)?.parent;
        if let Some(parent) = parent
            && let Some(parent_node) = self.nodes.get_mut(&parent)
        {
            parent_node.children.retain(|&k| k != key);
        }
        if let Some(node) = self.nodes.get_mut(&key) {
            node.parent = None;
        }
        Ok(())
    }

    /// Remove `key` and its whole subtree.
    pub fn remove(&mut self, key: NodeKey) -> Result<(), EditorError> {
        if key.is_root() {
            return Err(EditorError::Rejected("the root cannot be removed".into()));
        }
        self.detach(key)?;
        let mut stack = vec![key];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    /// Move every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeKey, to: NodeKey) -> Result<(), EditorError> {
        for child in self.children(from).to_vec() {
            self.append(to, child)?;
        }
        Ok(())
    }

    /// Replace `old` with `new` at the same position; `old` stays alive but detached.
    pub fn replace_with(&mut self, old: NodeKey, new: NodeKey) -> Result<(), EditorError> {
        self.insert_before(old, new)?;
        self.detach(old)
    }

    fn push_child(&mut self, parent: NodeKey, child: NodeKey) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    // ============ Navigation ============

    fn is_ancestor_or_self(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.parent(k);
        }
        false
    }

    /// Ancestors of `key`, nearest first, excluding `key` itself.
    pub fn ancestors(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut current = self.parent(key);
        while let Some(k) = current {
            out.push(k);
            current = self.parent(k);
        }
        out
    }

    /// The ancestor-or-self of `key` whose parent is the root.
    pub fn top_level_element(&self, key: NodeKey) -> Option<NodeKey> {
        let mut current = key;
        loop {
            let parent = self.parent(current)?;
            if parent.is_root() {
                return Some(current);
            }
            current = parent;
        }
    }

    /// First of `key` and its ancestors matching `pred`.
    pub fn find_matching_parent(
        &self,
        key: NodeKey,
        pred: impl Fn(&Document, &Node) -> bool,
    ) -> Option<NodeKey> {
        let mut current = Some(key);
        while let Some(k) = current {
            let node = self.get(k)?;
            if pred(self, node) {
                return Some(k);
            }
            current = node.parent;
        }
        None
    }

    /// Nearest ancestor-or-self of the given type.
    pub fn nearest_of_type(&self, key: NodeKey, node_type: NodeType) -> Option<NodeKey> {
        self.find_matching_parent(key, |_, n| n.node_type() == node_type)
    }

    /// Nearest ancestor-or-self that is a text block.
    pub fn nearest_text_block(&self, key: NodeKey) -> Option<NodeKey> {
        self.find_matching_parent(key, |_, n| n.kind.is_text_block())
    }

    /// All attached nodes in pre-order, starting at the root.
    pub fn preorder(&self) -> Vec<NodeKey> {
        self.descendants_inclusive(NodeKey::ROOT)
    }

    /// `key` followed by its descendants in pre-order.
    pub fn descendants_inclusive(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(next) = stack.pop() {
            if !self.contains(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    pub fn last_descendant(&self, key: NodeKey) -> NodeKey {
        let mut current = key;
        while let Some(&last) = self.children(current).last() {
            current = last;
        }
        current
    }

    /// Text-like leaves under `key` in document order.
    pub fn text_leaves(&self, key: NodeKey) -> Vec<NodeKey> {
        self.descendants_inclusive(key)
            .into_iter()
            .filter(|&k| self.kind(k).is_some_and(NodeKind::is_text_like))
            .collect()
    }

    /// Inline children of a text block, flattened through inline wrappers.
    ///
    /// Nested lists under a list item are not part of its inline content.
    pub fn inline_leaves(&self, block: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.collect_inline(block, &mut out);
        out
    }

    fn collect_inline(&self, key: NodeKey, out: &mut Vec<NodeKey>) {
        for &child in self.children(key) {
            match self.kind(child) {
                Some(kind) if kind.is_inline_element() => self.collect_inline(child, out),
                Some(kind) if !kind.is_element() => out.push(child),
                _ => {}
            }
        }
    }

    /// Plain text of a subtree; blocks are separated by blank lines.
    pub fn text_content(&self, key: NodeKey) -> String {
        let Some(node) = self.get(key) else {
            return String::new();
        };
        match &node.kind {
            NodeKind::LineBreak => "\n".to_string(),
            kind if kind.is_text_like() => kind.text_content().unwrap_or_default().to_string(),
            NodeKind::Root | NodeKind::List { .. } => node
                .children
                .iter()
                .map(|&c| self.text_content(c))
                .collect::<Vec<_>>()
                .join("\n\n"),
            _ => {
                let mut text = String::new();
                for &child in &node.children {
                    if self.kind(child).is_some_and(|k| k.node_type() == NodeType::List) {
                        text.push_str("\n\n");
                    }
                    text.push_str(&self.text_content(child));
                }
                text
            }
        }
    }

    // ============ Structural checks ============

    /// Verify parent/child links, reachability and the root's shape.
    pub fn check_invariants(&self) -> Result<(), String> {
        let root = self.root();
        if root.parent.is_some() {
            return Err("root has a parent".into());
        }
        if root.children.is_empty() {
            return Err("root has no children".into());
        }
        for node in self.nodes.values() {
            for &child in &node.children {
                let child_node = self
                    .get(child)
                    .ok_or_else(|| format!("{} lists missing child {child}", node.key))?;
                if child_node.parent != Some(node.key) {
                    return Err(format!("{child} does not point back at {}", node.key));
                }
            }
            if !node.kind.is_element() && !node.children.is_empty() {
                return Err(format!("leaf {} has children", node.key));
            }
        }
        let reachable = self.preorder();
        if reachable.len() != self.nodes.len() {
            return Err(format!(
                "{} nodes allocated but only {} reachable from the root",
                self.nodes.len(),
                reachable.len()
            ));
        }
        Ok(())
    }

    /// Key-free copy of the tree for structural comparisons.
    pub fn outline(&self) -> OutlineNode {
        self.outline_of(NodeKey::ROOT)
    }

    fn outline_of(&self, key: NodeKey) -> OutlineNode {
        OutlineNode {
            kind: self.kind(key).cloned().unwrap_or(NodeKind::Root),
            children: self
                .children(key)
                .iter()
                .map(|&c| self.outline_of(c))
                .collect(),
        }
    }

    /// Drop detached nodes left behind by structural edits.
    pub(crate) fn collect_garbage(&mut self) {
        let reachable: std::collections::HashSet<NodeKey> = self.preorder().into_iter().collect();
        self.nodes.retain(|k, _| reachable.contains(k));
    }
}

/// A document subtree without keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub kind: NodeKind,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{}{}", "  ".repeat(depth), self.kind.node_type())?;
        match &self.kind {
            NodeKind::Heading { level } => write!(f, " h{level}")?,
            NodeKind::List { list_type, start } => write!(f, " {} {start}", list_type.as_str())?,
            NodeKind::ListItem { checked: Some(c) } => write!(f, " checked={c}")?,
            NodeKind::Code { language: Some(lang) } => write!(f, " {lang}")?,
            NodeKind::Link { url, .. } => write!(f, " {url}")?,
            kind => {
                if let (Some(text), Some(format)) = (kind.text_content(), kind.format()) {
                    write!(f, " {text:?}")?;
                    if !format.is_empty() {
                        write!(f, " {format:?}")?;
                    }
                }
            }
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for OutlineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::node::TextFormat;

    fn paragraph_with(doc: &mut Document, texts: &[&str]) -> NodeKey {
        let p = doc.create(NodeKind::Paragraph);
        doc.append(NodeKey::ROOT, p).unwrap();
        for text in texts {
            let t = doc.create(NodeKind::text(*text));
            doc.append(p, t).unwrap();
        }
        p
    }

    #[test]
    fn test_new_document_has_one_empty_paragraph() {
        let doc = Document::new();
        assert_eq!(doc.root().children().len(), 1);
        let p = doc.root().children()[0];
        assert_eq!(doc.node_type(p), Some(NodeType::Paragraph));
        assert!(doc.is_empty());
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_and_detach_keep_links_consistent() {
        let mut doc = Document::empty_root();
        let p = paragraph_with(&mut doc, &["a", "b"]);
        let c = doc.create(NodeKind::text("c"));
        doc.insert_at(p, 1, c).unwrap();
        assert_eq!(doc.text_content(p), "acb");

        doc.detach(c).unwrap();
        assert_eq!(doc.parent(c), None);
        assert_eq!(doc.text_content(p), "ab");
        doc.remove(c).unwrap();
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_moving_within_same_parent_lands_at_requested_slot() {
        let mut doc = Document::empty_root();
        let p = paragraph_with(&mut doc, &["a", "b", "c"]);
        let first = doc.children(p)[0];
        doc.insert_at(p, 3, first).unwrap();
        assert_eq!(doc.text_content(p), "bca");
    }

    #[test]
    fn test_cannot_insert_into_leaf() {
        let mut doc = Document::empty_root();
        let p = paragraph_with(&mut doc, &["a"]);
        let leaf = doc.children(p)[0];
        let other = doc.create(NodeKind::text("x"));
        let err = doc.append(leaf, other).unwrap_err();
        assert!(matches!(err, EditorError::NotAnElement { .. }));
    }

    #[test]
    fn test_cannot_create_cycle() {
        let mut doc = Document::empty_root();
        let p = paragraph_with(&mut doc, &[]);
        let link = doc.create(NodeKind::Link {
            url: "u".into(),
            title: None,
        });
        doc.append(p, link).unwrap();
        assert!(doc.append(link, p).is_err());
    }

    #[test]
    fn test_remove_drops_whole_subtree() {
        let mut doc = Document::empty_root();
        let p = paragraph_with(&mut doc, &["a", "b"]);
        let before = doc.len();
        doc.remove(p).unwrap();
        assert_eq!(doc.len(), before - 3);
    }

    #[test]
    fn test_top_level_element_and_matching_parent() {
        let mut doc = Document::empty_root();
        let list = doc.create(NodeKind::List {
            list_type: crate::editing::ListType::Bullet,
            start: 1,
        });
        doc.append(NodeKey::ROOT, list).unwrap();
        let item = doc.create(NodeKind::ListItem { checked: None });
        doc.append(list, item).unwrap();
        let text = doc.create(NodeKind::text("x"));
        doc.append(item, text).unwrap();

        assert_eq!(doc.top_level_element(text), Some(list));
        assert_eq!(doc.top_level_element(NodeKey::ROOT), None);
        assert_eq!(doc.nearest_of_type(text, NodeType::List), Some(list));
        assert_eq!(doc.nearest_of_type(text, NodeType::Text), Some(text));
        assert_eq!(doc.nearest_text_block(text), Some(item));
    }

    #[test]
    fn test_equality_ignores_key_allocation_history() {
        let mut a = Document::new();
        let scratch = a.create(NodeKind::text("tmp"));
        a.remove(scratch).unwrap();
        let b = Document::new();
        assert_eq!(a, b);
    }

    #[test]
    fn test_outline_renders_indented_tree() {
        let mut doc = Document::empty_root();
        let p = paragraph_with(&mut doc, &["plain"]);
        let bold = doc.create(NodeKind::formatted("bold", TextFormat::BOLD));
        doc.append(p, bold).unwrap();
        let rendered = doc.outline().to_string();
        assert_eq!(
            rendered,
            "root\n  paragraph\n    text \"plain\"\n    text \"bold\" TextFormat(BOLD)\n"
        );
    }

    #[test]
    fn test_invariants_catch_unreachable_nodes() {
        let mut doc = Document::new();
        doc.create(NodeKind::text("orphan"));
        assert!(doc.check_invariants().is_err());
        doc.collect_garbage();
        doc.check_invariants().unwrap();
    }
}
