use std::{cell::RefCell, rc::Rc};

use super::node::{Node, NodeConnection, NodeRef};

/// Implementation of [NodeList](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-536297177)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
///
/// This is also the storage of the children of a node.\
/// Since the data is shared by [`Rc`], [`clone`](NodeList::clone) means shallow copy of
/// the handle, and a list returned by [`Node::child_nodes`] is live.
///
/// # Specification
/// ```text
/// The NodeList interface provides the abstraction of an ordered collection of nodes,
/// without defining or constraining how this collection is implemented. NodeList objects
/// in the DOM are live.
///
/// The items in the NodeList are accessible via an integral index, starting from 0.
/// ```
#[derive(Clone, Default)]
pub struct NodeList {
    nodes: Rc<RefCell<Vec<NodeRef>>>,
}

impl NodeList {
    /// Create new empty [`NodeList`].
    ///
    /// A shallow clone of a node starts with this empty list.
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Implementation of [item](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-844377136) method.
    ///
    /// # Specification
    /// ```text
    /// Returns the indexth item in the collection. If index is greater than or equal to the
    /// number of nodes in the list, this returns null.
    /// ```
    pub fn item(&self, index: usize) -> Option<NodeRef> {
        self.nodes.borrow().get(index).cloned()
    }

    /// Implementation of [length](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-203510337) attribute.
    pub fn length(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Check if this list is empty.
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    pub fn first(&self) -> Option<NodeRef> {
        self.nodes.borrow().first().cloned()
    }

    pub fn last(&self) -> Option<NodeRef> {
        self.nodes.borrow().last().cloned()
    }

    /// Return the position of `node` in this list.\
    /// Nodes are compared by identity, not by equality.
    pub fn index_of(&self, node: &NodeRef) -> Option<usize> {
        self.nodes
            .borrow()
            .iter()
            .position(|child| child.is_same_node(node))
    }

    /// Take a snapshot of this list.
    ///
    /// The returned vector is not live. Mutating the tree while walking it is safe.
    pub fn to_vec(&self) -> Vec<NodeRef> {
        self.nodes.borrow().clone()
    }

    pub(super) fn insert(&self, index: usize, node: NodeRef) {
        self.nodes.borrow_mut().insert(index, node);
    }

    pub(super) fn push(&self, node: NodeRef) {
        self.nodes.borrow_mut().push(node);
    }

    pub(super) fn remove(&self, index: usize) -> NodeRef {
        self.nodes.borrow_mut().remove(index)
    }

    /// Remove all nodes and clear their parent.
    pub(super) fn clear(&self) {
        let nodes = std::mem::take(&mut *self.nodes.borrow_mut());
        for mut node in nodes {
            node.set_parent_node(None);
        }
    }

    /// Deep-clone every node of this list, in order, as children of `new_owner`.
    pub(super) fn deep_clone(&self, new_owner: &NodeRef) -> Self {
        let new = Self::new();
        for child in self.to_vec() {
            let mut child = child.clone_node(true);
            child.set_parent_node(Some(new_owner.clone()));
            new.push(child);
        }
        new
    }
}
