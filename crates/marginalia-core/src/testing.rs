//! Test-only tree that fails chosen mutations on request.

use crate::arena::{ArenaDocument, NodeId};
use crate::error::TreeError;
use crate::tree::{DocumentTree, HostSnapshot, NodeKind};

/// An [`ArenaDocument`] whose mutations can be made to fail.
pub(crate) struct FaultyTree {
    pub inner: ArenaDocument,
    pub fail_create_element: bool,
    pub fail_detach: bool,
}

impl FaultyTree {
    pub fn new(inner: ArenaDocument) -> Self {
        Self {
            inner,
            fail_create_element: false,
            fail_detach: false,
        }
    }
}

impl DocumentTree for FaultyTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.inner.root()
    }

    fn kind(&self, node: &NodeId) -> NodeKind {
        self.inner.kind(node)
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.inner.parent(node)
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.inner.children(node)
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        self.inner.text(node)
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.inner.attribute(node, name)
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        self.inner.tag_name(node)
    }

    fn is_attached(&self, node: &NodeId) -> bool {
        self.inner.is_attached(node)
    }

    fn split_text(&mut self, node: &NodeId, char_offset: usize) -> Result<NodeId, TreeError> {
        self.inner.split_text(node, char_offset)
    }

    fn join_text(&mut self, left: &NodeId, right: &NodeId) -> Result<(), TreeError> {
        self.inner.join_text(left, right)
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, TreeError> {
        if self.fail_create_element {
            return Err(TreeError::Platform("create_element refused".into()));
        }
        self.inner.create_element(tag)
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        self.inner.set_attribute(node, name, value)
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) -> Result<(), TreeError> {
        self.inner.remove_attribute(node, name)
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        new: &NodeId,
        reference: Option<&NodeId>,
    ) -> Result<(), TreeError> {
        self.inner.insert_before(parent, new, reference)
    }

    fn detach(&mut self, node: &NodeId) -> Result<(), TreeError> {
        if self.fail_detach {
            return Err(TreeError::Platform("detach refused".into()));
        }
        self.inner.detach(node)
    }

    fn capture_host_state(&self) -> HostSnapshot {
        self.inner.capture_host_state()
    }

    fn restore_host_state(&mut self, snapshot: HostSnapshot) {
        self.inner.restore_host_state(snapshot)
    }

    fn enter_search_mode(&mut self) {
        self.inner.enter_search_mode()
    }
}
