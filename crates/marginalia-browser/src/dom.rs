//! [`DocumentTree`] over the live browser DOM.
//!
//! The core counts offsets in chars; the DOM counts UTF-16 code units. Every
//! text offset crossing this module is converted at the boundary.

use marginalia_core::{
    Bias, DocumentTree, DomPoint, HostSnapshot, NodeKind, Rect, SelectionSnapshot, TreeError,
    offset_of, point_at_offset,
};
use wasm_bindgen::JsCast;
use web_sys::{CharacterData, Document, Element, HtmlDocument, HtmlElement, Node, Text, Window};

use crate::error::{BrowserError, tree_err};

/// Char offset for a UTF-16 offset into `text`. Offsets inside a surrogate
/// pair round down; offsets past the end clamp.
pub fn utf16_to_char_offset(text: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (chars, c) in text.chars().enumerate() {
        let next = units + c.len_utf16();
        if next > utf16_offset {
            return chars;
        }
        units = next;
    }
    text.chars().count()
}

/// UTF-16 offset for a char offset into `text`, clamped to the end.
pub fn char_to_utf16_offset(text: &str, char_offset: usize) -> usize {
    text.chars().take(char_offset).map(char::len_utf16).sum()
}

/// A browser document scoped to one root node.
///
/// The root is usually `document.body`; host selection offsets are relative
/// to it.
pub struct BrowserDocument {
    window: Window,
    document: Document,
    root: Node,
}

impl BrowserDocument {
    pub fn new(root: Node) -> Result<Self, BrowserError> {
        let window = web_sys::window().ok_or(BrowserError::NoWindow)?;
        let document = window.document().ok_or(BrowserError::NoDocument)?;
        Ok(Self {
            window,
            document,
            root,
        })
    }

    /// Scope to `document.body`.
    pub fn from_body() -> Result<Self, BrowserError> {
        let window = web_sys::window().ok_or(BrowserError::NoWindow)?;
        let document = window.document().ok_or(BrowserError::NoDocument)?;
        let body = document.body().ok_or(BrowserError::NoBody)?;
        Ok(Self {
            window,
            document,
            root: body.into(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn scroll_offset(&self) -> (f64, f64) {
        (
            self.window.scroll_x().unwrap_or(0.0),
            self.window.scroll_y().unwrap_or(0.0),
        )
    }

    /// Viewport rectangle of an element.
    pub fn client_rect(&self, element: &Element) -> Rect {
        let r = element.get_bounding_client_rect();
        Rect::new(r.x(), r.y(), r.width(), r.height())
    }

    /// The current non-collapsed selection, if any.
    pub fn selection_snapshot(&self) -> Option<SelectionSnapshot<Node>> {
        let selection = self.window.get_selection().ok()??;
        if selection.range_count() == 0 || selection.is_collapsed() {
            return None;
        }
        let text = String::from(selection.to_string());
        let range = selection.get_range_at(0).ok()?;
        let start = self.char_point(range.start_container().ok()?, range.start_offset().ok()?);
        let common_ancestor = range.common_ancestor_container().ok()?;
        let r = range.get_bounding_client_rect();
        Some(SelectionSnapshot {
            text,
            start,
            common_ancestor,
            bounds: Rect::new(r.x(), r.y(), r.width(), r.height()),
        })
    }

    /// Convert a DOM boundary point into a char-based point.
    fn char_point(&self, node: Node, dom_offset: u32) -> DomPoint<Node> {
        let offset = match self.text(&node) {
            Some(text) => utf16_to_char_offset(&text, dom_offset as usize),
            None => dom_offset as usize,
        };
        DomPoint::new(node, offset)
    }

    /// Convert a char-based point back into a DOM boundary offset.
    fn dom_offset(&self, point: &DomPoint<Node>) -> u32 {
        let offset = match self.text(&point.node) {
            Some(text) => char_to_utf16_offset(&text, point.offset),
            None => point.offset,
        };
        u32::try_from(offset).unwrap_or(u32::MAX)
    }

    fn body(&self) -> Option<HtmlElement> {
        self.document.body()
    }

    fn selection_offsets(&self) -> Option<std::ops::Range<usize>> {
        let selection = self.window.get_selection().ok()??;
        if selection.range_count() == 0 {
            return None;
        }
        let range = selection.get_range_at(0).ok()?;
        let start = self.char_point(range.start_container().ok()?, range.start_offset().ok()?);
        let end = self.char_point(range.end_container().ok()?, range.end_offset().ok()?);
        let start = offset_of(self, &self.root, &start)?;
        let end = offset_of(self, &self.root, &end)?;
        Some(start..end)
    }

    fn restore_selection(&self, offsets: std::ops::Range<usize>) -> Result<(), wasm_bindgen::JsValue> {
        let Some(selection) = self.window.get_selection()? else {
            return Ok(());
        };
        let (Some(start), Some(end)) = (
            point_at_offset(self, &self.root, offsets.start, Bias::Forward),
            point_at_offset(self, &self.root, offsets.end, Bias::Backward),
        ) else {
            return Ok(());
        };
        let range = self.document.create_range()?;
        range.set_start(&start.node, self.dom_offset(&start))?;
        range.set_end(&end.node, self.dom_offset(&end))?;
        selection.remove_all_ranges()?;
        selection.add_range(&range)
    }
}

impl DocumentTree for BrowserDocument {
    type Node = Node;

    fn root(&self) -> Node {
        self.root.clone()
    }

    fn kind(&self, node: &Node) -> NodeKind {
        match node.node_type() {
            Node::ELEMENT_NODE => NodeKind::Element,
            Node::TEXT_NODE | Node::CDATA_SECTION_NODE => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.get(i)).collect()
    }

    fn text(&self, node: &Node) -> Option<String> {
        match self.kind(node) {
            NodeKind::Text => node.text_content(),
            _ => None,
        }
    }

    fn attribute(&self, node: &Node, name: &str) -> Option<String> {
        node.dyn_ref::<Element>()?.get_attribute(name)
    }

    fn tag_name(&self, node: &Node) -> Option<String> {
        Some(node.dyn_ref::<Element>()?.local_name().to_ascii_lowercase())
    }

    fn is_attached(&self, node: &Node) -> bool {
        self.root.contains(Some(node))
    }

    fn split_text(&mut self, node: &Node, char_offset: usize) -> Result<Node, TreeError> {
        let text_node = node.dyn_ref::<Text>().ok_or(TreeError::NotText)?;
        let text = node.text_content().unwrap_or_default();
        let len = text.chars().count();
        if char_offset > len {
            return Err(TreeError::OffsetOutOfBounds {
                offset: char_offset,
                len,
            });
        }
        let at = u32::try_from(char_to_utf16_offset(&text, char_offset)).unwrap_or(u32::MAX);
        text_node.split_text(at).map(Into::into).map_err(tree_err)
    }

    fn join_text(&mut self, left: &Node, right: &Node) -> Result<(), TreeError> {
        if left.next_sibling().as_ref() != Some(right) {
            return Err(TreeError::NotAdjacent);
        }
        let left_data = left.dyn_ref::<CharacterData>().ok_or(TreeError::NotText)?;
        let right_text = self.text(right).ok_or(TreeError::NotText)?;
        left_data.append_data(&right_text).map_err(tree_err)?;
        self.detach(right)
    }

    fn create_element(&mut self, tag: &str) -> Result<Node, TreeError> {
        self.document
            .create_element(tag)
            .map(Into::into)
            .map_err(tree_err)
    }

    fn set_attribute(&mut self, node: &Node, name: &str, value: &str) -> Result<(), TreeError> {
        node.dyn_ref::<Element>()
            .ok_or(TreeError::NotElement)?
            .set_attribute(name, value)
            .map_err(tree_err)
    }

    fn remove_attribute(&mut self, node: &Node, name: &str) -> Result<(), TreeError> {
        node.dyn_ref::<Element>()
            .ok_or(TreeError::NotElement)?
            .remove_attribute(name)
            .map_err(tree_err)
    }

    fn insert_before(
        &mut self,
        parent: &Node,
        new: &Node,
        reference: Option<&Node>,
    ) -> Result<(), TreeError> {
        if reference.is_some_and(|r| r.parent_node().as_ref() != Some(parent)) {
            return Err(TreeError::NotAChild);
        }
        parent
            .insert_before(new, reference)
            .map(|_| ())
            .map_err(tree_err)
    }

    fn detach(&mut self, node: &Node) -> Result<(), TreeError> {
        match node.parent_node() {
            Some(parent) => parent.remove_child(node).map(|_| ()).map_err(tree_err),
            None => Ok(()),
        }
    }

    fn capture_host_state(&self) -> HostSnapshot {
        HostSnapshot {
            spellcheck: self.body().map(|b| b.spellcheck()),
            edit_mode: Some(self.document.unchecked_ref::<HtmlDocument>().design_mode().eq_ignore_ascii_case("on")),
            scroll: Some(self.scroll_offset()),
            selection: self.selection_offsets(),
        }
    }

    fn restore_host_state(&mut self, snapshot: HostSnapshot) {
        if let (Some(spellcheck), Some(body)) = (snapshot.spellcheck, self.body()) {
            body.set_spellcheck(spellcheck);
        }
        if let Some(edit_mode) = snapshot.edit_mode {
            let mode = if edit_mode { "on" } else { "off" };
            if self.document.unchecked_ref::<HtmlDocument>().design_mode() != mode {
                self.document.unchecked_ref::<HtmlDocument>().set_design_mode(mode);
            }
        }
        if let Some(offsets) = snapshot.selection {
            if let Err(e) = self.restore_selection(offsets) {
                tracing::debug!(target: "marginalia::highlight", error = ?e, "could not restore selection");
            }
        }
        // Restoring the selection can scroll, so scroll goes last.
        if let Some((x, y)) = snapshot.scroll {
            self.window.scroll_to_with_x_and_y(x, y);
        }
    }

    fn enter_search_mode(&mut self) {
        if let Some(body) = self.body() {
            body.set_spellcheck(false);
        }
    }

    fn contains(&self, ancestor: &Node, node: &Node) -> bool {
        ancestor.contains(Some(node))
    }
}
