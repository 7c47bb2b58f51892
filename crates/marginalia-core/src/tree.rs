//! Document tree abstraction.
//!
//! The anchoring engine never talks to a concrete DOM. Everything it reads or
//! mutates goes through [`DocumentTree`], which is implemented by the in-memory
//! [`ArenaDocument`](crate::arena::ArenaDocument) and by the browser layer over
//! live `web_sys` nodes.
//!
//! All text offsets at this level are in Unicode scalar values (chars), not
//! bytes or UTF-16 code units.

use std::fmt::Debug;
use std::ops::{Deref, DerefMut, Range};

use crate::error::TreeError;

/// Coarse node classification. Only text leaves contribute characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    /// Comments, processing instructions and anything else without text.
    Other,
}

/// A position in the tree.
///
/// For text nodes `offset` is a char offset into the node's text. For element
/// nodes it is a child index, matching DOM `Range` boundary semantics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomPoint<N> {
    pub node: N,
    pub offset: usize,
}

impl<N> DomPoint<N> {
    pub fn new(node: N, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Document-level host state that overlay mutations must leave untouched.
///
/// The selection is stored as flattened offsets relative to
/// [`DocumentTree::root`], which stay valid across wrap/unwrap because those
/// never change text content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostSnapshot {
    pub spellcheck: Option<bool>,
    pub edit_mode: Option<bool>,
    pub scroll: Option<(f64, f64)>,
    pub selection: Option<Range<usize>>,
}

/// A mutable tree of element and text nodes.
///
/// Implementations must keep node handles stable across mutations: a handle
/// obtained before `split_text` still refers to the left half afterwards.
pub trait DocumentTree {
    /// Opaque node handle.
    type Node: Clone + PartialEq + Debug;

    /// The document root. Host selection snapshots are relative to it.
    fn root(&self) -> Self::Node;

    fn kind(&self, node: &Self::Node) -> NodeKind;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Text payload of a text node. `None` for anything else.
    fn text(&self, node: &Self::Node) -> Option<String>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Lowercase local name of an element. `None` for anything else.
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    /// Whether the node is still reachable from [`root`](Self::root).
    fn is_attached(&self, node: &Self::Node) -> bool;

    /// Split a text node at `char_offset`, returning the new right-hand node
    /// which is inserted as the next sibling.
    fn split_text(&mut self, node: &Self::Node, char_offset: usize)
    -> Result<Self::Node, TreeError>;

    /// Append the text of `right` to `left` and detach `right`.
    fn join_text(&mut self, left: &Self::Node, right: &Self::Node) -> Result<(), TreeError>;

    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> Result<Self::Node, TreeError>;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str)
    -> Result<(), TreeError>;

    fn remove_attribute(&mut self, node: &Self::Node, name: &str) -> Result<(), TreeError>;

    /// Insert `new` into `parent` before `reference`, or at the end when
    /// `reference` is `None`. Moves `new` if it is already in the tree.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        new: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<(), TreeError>;

    /// Remove a node (and its subtree) from its parent.
    fn detach(&mut self, node: &Self::Node) -> Result<(), TreeError>;

    /// Snapshot spellcheck, edit-mode, scroll and selection state.
    fn capture_host_state(&self) -> HostSnapshot {
        HostSnapshot::default()
    }

    /// Put back state captured by [`capture_host_state`](Self::capture_host_state).
    fn restore_host_state(&mut self, _snapshot: HostSnapshot) {}

    /// Prepare the host for overlay mutation (e.g. suppress spellcheck
    /// repaints). Undone by `restore_host_state`.
    fn enter_search_mode(&mut self) {}

    fn add_class(&mut self, node: &Self::Node, class: &str) -> Result<(), TreeError> {
        let current = self.attribute(node, "class").unwrap_or_default();
        if current.split_whitespace().any(|c| c == class) {
            return Ok(());
        }
        let updated = if current.trim().is_empty() {
            class.to_string()
        } else {
            format!("{} {}", current.trim(), class)
        };
        self.set_attribute(node, "class", &updated)
    }

    fn remove_class(&mut self, node: &Self::Node, class: &str) -> Result<(), TreeError> {
        let Some(current) = self.attribute(node, "class") else {
            return Ok(());
        };
        let remaining: Vec<&str> = current.split_whitespace().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attribute(node, "class")
        } else {
            self.set_attribute(node, "class", &remaining.join(" "))
        }
    }

    fn has_class(&self, node: &Self::Node, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    fn text_len(&self, node: &Self::Node) -> usize {
        self.text(node).map(|t| t.chars().count()).unwrap_or(0)
    }

    fn index_in_parent(&self, node: &Self::Node) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(&parent).iter().position(|c| c == node)
    }

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node> {
        let parent = self.parent(node)?;
        let siblings = self.children(&parent);
        let idx = siblings.iter().position(|c| c == node)?;
        siblings.get(idx + 1).cloned()
    }

    /// Inclusive ancestry check.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if &n == ancestor {
                return true;
            }
            current = self.parent(&n);
        }
        false
    }

    /// Deepest node that contains both `a` and `b` (inclusive).
    fn common_ancestor(&self, a: &Self::Node, b: &Self::Node) -> Option<Self::Node> {
        let mut ancestors = Vec::new();
        let mut current = Some(a.clone());
        while let Some(n) = current {
            current = self.parent(&n);
            ancestors.push(n);
        }
        let mut current = Some(b.clone());
        while let Some(n) = current {
            if ancestors.contains(&n) {
                return Some(n);
            }
            current = self.parent(&n);
        }
        None
    }

    /// Nearest inclusive ancestor of `node` carrying `attribute`.
    fn closest_with_attribute(&self, node: &Self::Node, attribute: &str) -> Option<Self::Node> {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if self.kind(&n) == NodeKind::Element && self.attribute(&n, attribute).is_some() {
                return Some(n);
            }
            current = self.parent(&n);
        }
        None
    }

    /// All element descendants of `root` (inclusive) in document order.
    fn descendant_elements(&self, root: &Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            if self.kind(&node) != NodeKind::Element {
                continue;
            }
            let children = self.children(&node);
            out.push(node);
            stack.extend(children.into_iter().rev());
        }
        out
    }
}

/// Scoped "search mode" over a tree.
///
/// Captures host state on acquisition, switches the host into search mode,
/// and restores the captured state when dropped, on every exit path
/// including early returns and errors.
pub struct HostStateGuard<'a, T: DocumentTree + ?Sized> {
    tree: &'a mut T,
    snapshot: Option<HostSnapshot>,
}

impl<'a, T: DocumentTree + ?Sized> HostStateGuard<'a, T> {
    pub fn acquire(tree: &'a mut T) -> Self {
        let snapshot = tree.capture_host_state();
        tree.enter_search_mode();
        Self {
            tree,
            snapshot: Some(snapshot),
        }
    }
}

impl<T: DocumentTree + ?Sized> Deref for HostStateGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.tree
    }
}

impl<T: DocumentTree + ?Sized> DerefMut for HostStateGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.tree
    }
}

impl<T: DocumentTree + ?Sized> Drop for HostStateGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.tree.restore_host_state(snapshot);
        }
    }
}
