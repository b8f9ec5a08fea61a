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
};

/// Implementation of [Notation](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-5431D1B9)
/// interface on [1.5 Extended Interfaces: XML Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-E067D597)
pub struct Notation {
    // /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    // /// - no parent
    // parent_node: Option<NodeWeakRef>,
    // /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    // /// - no children
    // children: NodeList,
    owner_document: DocumentWeakRef,
    /// Notation name. as same as `nodeName` for `Node`.
    name: Rc<str>,

    /// Implementation of `publicId` attribute.
    public_id: Option<Rc<str>>,
    /// Implementation of `systemId` attribute.
    system_id: Option<Rc<str>>,

    listeners: EventListenerMap,
    location: Option<SourceLocation>,
}

/// Wrapper of `Rc<RefCell<Notation>>`.
#[derive(Clone)]
pub struct NotationRef(Rc<RefCell<Notation>>);

impl NotationRef {
    /// The format of `name` must have been validated by the caller.
    pub(super) fn new(
        doc: DocumentWeakRef,
        name: Rc<str>,
        public_id: Option<Rc<str>>,
        system_id: Option<Rc<str>>,
    ) -> Self {
        Self(Rc::new(RefCell::new(Notation {
            owner_document: doc,
            name,
            public_id,
            system_id,
            listeners: EventListenerMap::default(),
            location: None,
        })))
    }

    /// Get `name` attribute of this notation.
    pub fn name(&self) -> Rc<str> {
        self.0.borrow().name.clone()
    }

    /// Implementation of `publicId` attribute.
    ///
    /// # Specification
    /// ```text
    /// The public identifier of this notation. If the public identifier was not specified,
    /// this is null.
    /// ```
    pub fn public_id(&self) -> Option<Rc<str>> {
        self.0.borrow().public_id.clone()
    }

    /// Implementation of `systemId` attribute.
    ///
    /// # Specification
    /// ```text
    /// The system identifier of this notation. If the system identifier was not specified,
    /// this is null. This may be an absolute URI or not.
    /// ```
    pub fn system_id(&self) -> Option<Rc<str>> {
        self.0.borrow().system_id.clone()
    }

    pub(super) fn clone_notation(&self) -> NotationRef {
        let nota = self.0.borrow();
        let new = Self::new(
            nota.owner_document.clone(),
            nota.name.clone(),
            nota.public_id.clone(),
            nota.system_id.clone(),
        );
        new.0.borrow_mut().location = nota.location;
        new
    }

    /// Generate [`NotationWeakRef`] from `self`.
    pub fn downgrade(&self) -> NotationWeakRef {
        NotationWeakRef(Rc::downgrade(&self.0))
    }
}

impl Node for NotationRef {
    fn node_name(&self) -> Rc<str> {
        self.name()
    }

    fn node_type(&self) -> NodeType {
        NodeType::Notation
    }

    fn owner_document(&self) -> Option<DocumentRef> {
        self.0.borrow().owner_document.upgrade()
    }

    fn clone_node(&self, _deep: bool) -> NodeRef {
        self.clone_notation().into()
    }

    fn text_content(&self) -> Option<String> {
        None
    }

    fn set_text_content(&mut self, _text: &str) -> Result<(), super::DOMException> {
        Ok(())
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        let NodeRef::Notation(other) = other else {
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

impl NodeConnection for NotationRef {
    fn set_parent_node(&mut self, _: Option<NodeRef>) -> Option<NodeRef> {
        None
    }

    fn set_owner_document(&mut self, new_doc: DocumentRef) -> Option<DocumentRef> {
        replace(&mut self.0.borrow_mut().owner_document, new_doc.downgrade()).upgrade()
    }

    fn adopted_to(&mut self, new_doc: DocumentRef) {
        self.set_owner_document(new_doc);
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

impl From<NotationRef> for NodeRef {
    fn from(value: NotationRef) -> Self {
        NodeRef::Notation(value)
    }
}

/// Wrapper of `Weak<RefCell<Notation>>`.
#[derive(Clone)]
pub struct NotationWeakRef(Weak<RefCell<Notation>>);

impl NotationWeakRef {
    /// Generate [`NotationRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<NotationRef> {
        self.0.upgrade().map(NotationRef)
    }
}
