use std::{
    cell::RefCell,
    mem::replace,
    rc::{Rc, Weak},
};

use super::{
    NodeType,
    document::{DocumentRef, DocumentWeakRef},
    events::EventListenerMap,
    node::{Node, NodeConnection, NodeRef, SourceLocation},
    node_list::NodeList,
};

/// Implementation of [DocumentFragment](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-B63ED1A3)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
///
/// When a fragment is inserted into a node, its children are moved and the fragment
/// itself becomes empty.
pub struct DocumentFragment {
    // /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    // /// - no parent
    // parent_node: Option<NodeWeakRef>,
    /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    /// - `Element`
    /// - `ProcessingInstruction`
    /// - `Comment`
    /// - `Text`
    /// - `CDATASection`
    /// - `EntityReference`
    children: NodeList,
    owner_document: DocumentWeakRef,

    listeners: EventListenerMap,
    location: Option<SourceLocation>,
}

/// Wrapper of `Rc<RefCell<DocumentFragment>>`.
#[derive(Clone)]
pub struct DocumentFragmentRef(Rc<RefCell<DocumentFragment>>);

impl DocumentFragmentRef {
    /// Create new [`DocumentFragmentRef`] whose ownerDocument is `doc`.
    pub(super) fn new(doc: DocumentWeakRef) -> Self {
        Self(Rc::new(RefCell::new(DocumentFragment {
            children: NodeList::new(),
            owner_document: doc,
            listeners: EventListenerMap::default(),
            location: None,
        })))
    }

    /// Generate [`DocumentFragmentWeakRef`] from `self`.
    pub fn downgrade(&self) -> DocumentFragmentWeakRef {
        DocumentFragmentWeakRef(Rc::downgrade(&self.0))
    }
}

impl Node for DocumentFragmentRef {
    fn node_name(&self) -> Rc<str> {
        "#document-fragment".into()
    }

    fn node_type(&self) -> NodeType {
        NodeType::DocumentFragment
    }

    fn owner_document(&self) -> Option<DocumentRef> {
        self.0.borrow().owner_document.upgrade()
    }

    fn clone_node(&self, deep: bool) -> NodeRef {
        let frag = self.0.borrow();
        let new = Self::new(frag.owner_document.clone());
        new.0.borrow_mut().location = frag.location;
        if deep {
            let children = frag.children.deep_clone(&new.clone().into());
            new.0.borrow_mut().children = children;
        }
        new.into()
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        let NodeRef::DocumentFragment(other) = other else {
            return false;
        };
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn lookup_prefix(&self, _ns_uri: &str) -> Option<Rc<str>> {
        None
    }

    fn is_default_namespace(&self, _ns_uri: &str) -> bool {
        false
    }

    fn lookup_namespace_uri(&self, _prefix: Option<&str>) -> Option<Rc<str>> {
        None
    }
}

impl NodeConnection for DocumentFragmentRef {
    fn set_parent_node(&mut self, _: Option<NodeRef>) -> Option<NodeRef> {
        None
    }

    fn children(&self) -> Option<NodeList> {
        Some(self.0.borrow().children.clone())
    }

    fn set_owner_document(&mut self, new_doc: DocumentRef) -> Option<DocumentRef> {
        replace(&mut self.0.borrow_mut().owner_document, new_doc.downgrade()).upgrade()
    }

    fn adopted_to(&mut self, new_doc: DocumentRef) {
        self.set_owner_document(new_doc.clone());
        for mut child in self.child_nodes().to_vec() {
            child.adopted_to(new_doc.clone());
        }
    }

    fn event_listeners(&self) -> EventListenerMap {
        self.0.borrow().listeners.clone()
    }

    fn location(&self) -> Option<SourceLocation> {
        self.0.borrow().location
    }

    fn set_location(&mut self, location: Option<SourceLocation>) {
        self.0.borrow_mut().location = location;
    }
}

impl From<DocumentFragmentRef> for NodeRef {
    fn from(value: DocumentFragmentRef) -> Self {
        NodeRef::DocumentFragment(value)
    }
}

/// Wrapper of `Weak<RefCell<DocumentFragment>>`.
#[derive(Clone)]
pub struct DocumentFragmentWeakRef(Weak<RefCell<DocumentFragment>>);

impl DocumentFragmentWeakRef {
    /// Generate [`DocumentFragmentRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<DocumentFragmentRef> {
        self.0.upgrade().map(DocumentFragmentRef)
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::DOMException;

    use super::*;

    #[test]
    fn insert_fragment_moves_children() {
        let doc = DocumentRef::new(None, Some("root"), None).unwrap();
        let mut root = doc.document_element().unwrap();
        let last = doc.create_comment("last");
        root.append_child(last.clone().into()).unwrap();

        let mut frag = doc.create_document_fragment();
        let a = doc.create_element("a").unwrap();
        let b = doc.create_text_node("b");
        frag.append_child(a.clone().into()).unwrap();
        frag.append_child(b.clone().into()).unwrap();

        let ret = root
            .insert_before(frag.clone().into(), Some(last.clone().into()))
            .unwrap();
        assert!(ret.is_same_node(&frag.clone().into()));
        assert!(!frag.has_child_nodes());

        let names = root
            .child_nodes()
            .to_vec()
            .iter()
            .map(|child| child.node_name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["a", "#text", "#comment"]);
        let root: NodeRef = root.into();
        assert!(a.parent_node().unwrap().is_same_node(&root));
        assert!(b.parent_node().unwrap().is_same_node(&root));
    }

    #[test]
    fn fragment_is_never_a_child() {
        let mut doc = DocumentRef::new(None, Some("root"), None).unwrap();
        let frag = doc.create_document_fragment();
        let mut inner = doc.create_document_fragment();
        assert!(inner.append_child(frag.into()).is_ok());
        assert!(!inner.has_child_nodes());

        // Only the children of the fragment are checked against the parent.
        let mut frag = doc.create_document_fragment();
        frag.append_child(doc.create_text_node("t").into()).unwrap();
        assert!(matches!(
            doc.append_child(frag.clone().into()),
            Err(DOMException::HierarchyRequestErr { .. })
        ));
        assert_eq!(frag.child_nodes().length(), 1);
    }

    #[test]
    fn clone_fragment() {
        let doc = DocumentRef::new(None, Some("root"), None).unwrap();
        let mut frag = doc.create_document_fragment();
        frag.append_child(doc.create_element("a").unwrap().into())
            .unwrap();
        assert!(!frag.clone_node(false).has_child_nodes());

        let deep = frag.clone_node(true);
        assert_eq!(deep.child_nodes().length(), 1);
        assert!(
            deep.first_child()
                .unwrap()
                .parent_node()
                .unwrap()
                .is_same_node(&deep)
        );
        assert!(deep.is_equal_node(&frag.into()));
    }
}
