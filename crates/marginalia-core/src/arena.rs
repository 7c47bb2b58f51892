//! In-memory document tree.
//!
//! `ArenaDocument` is an index-addressed arena implementing [`DocumentTree`].
//! It backs the test suite and any host that renders content outside a
//! browser. Nodes are never freed: detaching a node only unlinks it, so stale
//! handles keep resolving and report `is_attached == false`.

use std::fmt::Write as _;
use std::ops::Range;

use miette::Diagnostic;
use smol_str::SmolStr;

use crate::error::TreeError;
use crate::offset_map::{Bias, offset_of, point_at_offset};
use crate::tree::{DocumentTree, DomPoint, HostSnapshot, NodeKind};

/// Handle into an [`ArenaDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Markup could not be imported.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("invalid markup: {0}")]
#[diagnostic(
    code(marginalia::arena::markup),
    help("markup must be well-formed XHTML, e.g. `<br/>` rather than `<br>`")
)]
pub struct MarkupError(#[from] roxmltree::Error);

#[derive(Clone, Debug)]
enum NodeData {
    Element {
        tag: SmolStr,
        attributes: Vec<(SmolStr, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct ArenaNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document with a `body` root.
#[derive(Clone, Debug)]
pub struct ArenaDocument {
    nodes: Vec<ArenaNode>,
    spellcheck: bool,
    edit_mode: bool,
    scroll: (f64, f64),
    selection: Option<(DomPoint<NodeId>, DomPoint<NodeId>)>,
}

impl Default for ArenaDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaDocument {
    /// Create an empty document containing only the `body` root.
    pub fn new() -> Self {
        let root = ArenaNode {
            data: NodeData::Element {
                tag: SmolStr::new_static("body"),
                attributes: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            spellcheck: true,
            edit_mode: false,
            scroll: (0.0, 0.0),
            selection: None,
        }
    }

    /// Build a document from an XHTML fragment placed inside the root.
    pub fn parse(markup: &str) -> Result<Self, MarkupError> {
        let wrapped = format!("<body>{markup}</body>");
        let parsed = roxmltree::Document::parse(&wrapped)?;
        let mut doc = Self::new();
        let root = doc.root();
        for child in parsed.root_element().children() {
            doc.import(root, child);
        }
        Ok(doc)
    }

    fn import(&mut self, parent: NodeId, source: roxmltree::Node<'_, '_>) {
        let id = if source.is_element() {
            let id = self.push(NodeData::Element {
                tag: SmolStr::new(source.tag_name().name()),
                attributes: source
                    .attributes()
                    .map(|a| (SmolStr::new(a.name()), a.value().to_string()))
                    .collect(),
            });
            for child in source.children() {
                self.import(id, child);
            }
            id
        } else if source.is_text() {
            self.push(NodeData::Text(source.text().unwrap_or_default().to_string()))
        } else if source.is_comment() {
            self.push(NodeData::Comment(
                source.text().unwrap_or_default().to_string(),
            ))
        } else {
            return;
        };
        self.link(parent, id, None);
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(ArenaNode {
            data,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> &ArenaNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ArenaNode {
        &mut self.nodes[id.0]
    }

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId, at: Option<usize>) {
        self.unlink(child);
        let children = &mut self.nodes[parent.0].children;
        match at {
            Some(idx) => children.insert(idx, child),
            None => children.push(child),
        }
        self.nodes[child.0].parent = Some(parent);
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    /// Append `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.insert_before(&parent, &child, None)
    }

    /// Tag name of an element, lowercase as written.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// First element (document order) whose `attribute` equals `value`.
    pub fn find_by_attribute(&self, attribute: &str, value: &str) -> Option<NodeId> {
        self.descendant_elements(&self.root())
            .into_iter()
            .find(|n| self.attribute(n, attribute).as_deref() == Some(value))
    }

    /// Number of nodes in the subtree rooted at `id`, inclusive.
    pub fn subtree_len(&self, id: NodeId) -> usize {
        1 + self
            .node(id)
            .children
            .iter()
            .map(|c| self.subtree_len(*c))
            .sum::<usize>()
    }

    /// Serialize a node and its subtree.
    pub fn markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    /// Serialize only the children of a node.
    pub fn inner_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in &self.node(id).children {
            self.write_markup(*child, &mut out);
        }
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match &node.data {
            NodeData::Text(text) => escape_into(text, false, out),
            NodeData::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            NodeData::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    let _ = write!(out, " {name}=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                if node.children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in &node.children {
                    self.write_markup(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    pub fn spellcheck(&self) -> bool {
        self.spellcheck
    }

    pub fn set_spellcheck(&mut self, enabled: bool) {
        self.spellcheck = enabled;
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn scroll(&self) -> (f64, f64) {
        self.scroll
    }

    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.scroll = (x, y);
    }

    /// Current document selection, if any.
    pub fn selection(&self) -> Option<&(DomPoint<NodeId>, DomPoint<NodeId>)> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, start: DomPoint<NodeId>, end: DomPoint<NodeId>) {
        self.selection = Some((start, end));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Current selection as flattened offsets relative to the root.
    pub fn selection_offsets(&self) -> Option<Range<usize>> {
        let (start, end) = self.selection.as_ref()?;
        let root = self.root();
        Some(offset_of(self, &root, start)?..offset_of(self, &root, end)?)
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

impl DocumentTree for ArenaDocument {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn kind(&self, node: &NodeId) -> NodeKind {
        match self.node(*node).data {
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Other,
        }
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.node(*node).parent
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.node(*node).children.clone()
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        match &self.node(*node).data {
            NodeData::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        self.tag(*node).map(str::to_ascii_lowercase)
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        match &self.node(*node).data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    fn is_attached(&self, node: &NodeId) -> bool {
        let root = self.root();
        let mut current = *node;
        loop {
            if current == root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn split_text(&mut self, node: &NodeId, char_offset: usize) -> Result<NodeId, TreeError> {
        let NodeData::Text(text) = &self.node(*node).data else {
            return Err(TreeError::NotText);
        };
        let len = text.chars().count();
        if char_offset > len {
            return Err(TreeError::OffsetOutOfBounds {
                offset: char_offset,
                len,
            });
        }
        let byte = text
            .char_indices()
            .nth(char_offset)
            .map(|(b, _)| b)
            .unwrap_or(text.len());
        let right_text = text[byte..].to_string();
        if let NodeData::Text(text) = &mut self.node_mut(*node).data {
            text.truncate(byte);
        }
        let right = self.push(NodeData::Text(right_text));
        if let Some(parent) = self.node(*node).parent {
            let idx = self.node(parent).children.iter().position(|c| c == node);
            self.link(parent, right, idx.map(|i| i + 1));
        }
        Ok(right)
    }

    fn join_text(&mut self, left: &NodeId, right: &NodeId) -> Result<(), TreeError> {
        if self.next_sibling(left) != Some(*right) {
            return Err(TreeError::NotAdjacent);
        }
        let NodeData::Text(right_text) = &self.node(*right).data else {
            return Err(TreeError::NotText);
        };
        let right_text = right_text.clone();
        match &mut self.node_mut(*left).data {
            NodeData::Text(text) => text.push_str(&right_text),
            _ => return Err(TreeError::NotText),
        }
        self.unlink(*right);
        Ok(())
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, TreeError> {
        Ok(self.push(NodeData::Element {
            tag: SmolStr::new(tag),
            attributes: Vec::new(),
        }))
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        let NodeData::Element { attributes, .. } = &mut self.node_mut(*node).data else {
            return Err(TreeError::NotElement);
        };
        match attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attributes.push((SmolStr::new(name), value.to_string())),
        }
        Ok(())
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) -> Result<(), TreeError> {
        let NodeData::Element { attributes, .. } = &mut self.node_mut(*node).data else {
            return Err(TreeError::NotElement);
        };
        attributes.retain(|(n, _)| n != name);
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        new: &NodeId,
        reference: Option<&NodeId>,
    ) -> Result<(), TreeError> {
        if self.kind(parent) != NodeKind::Element {
            return Err(TreeError::NotElement);
        }
        if self.contains(new, parent) {
            return Err(TreeError::Platform(
                "cannot insert a node into its own subtree".into(),
            ));
        }
        // Unlink first so the reference index accounts for a move within the same parent.
        self.unlink(*new);
        let at = match reference {
            Some(r) => Some(
                self.node(*parent)
                    .children
                    .iter()
                    .position(|c| c == r)
                    .ok_or(TreeError::NotAChild)?,
            ),
            None => None,
        };
        self.link(*parent, *new, at);
        Ok(())
    }

    fn detach(&mut self, node: &NodeId) -> Result<(), TreeError> {
        self.unlink(*node);
        Ok(())
    }

    fn capture_host_state(&self) -> HostSnapshot {
        HostSnapshot {
            spellcheck: Some(self.spellcheck),
            edit_mode: Some(self.edit_mode),
            scroll: Some(self.scroll),
            selection: self.selection_offsets(),
        }
    }

    fn restore_host_state(&mut self, snapshot: HostSnapshot) {
        if let Some(spellcheck) = snapshot.spellcheck {
            self.spellcheck = spellcheck;
        }
        if let Some(edit_mode) = snapshot.edit_mode {
            self.edit_mode = edit_mode;
        }
        if let Some(scroll) = snapshot.scroll {
            self.scroll = scroll;
        }
        let root = self.root();
        self.selection = snapshot.selection.and_then(|range| {
            let start = point_at_offset(self, &root, range.start, Bias::Forward)?;
            let end = point_at_offset(self, &root, range.end, Bias::Backward)?;
            Some((start, end))
        });
    }

    fn enter_search_mode(&mut self) {
        self.spellcheck = false;
        self.edit_mode = true;
    }
}
