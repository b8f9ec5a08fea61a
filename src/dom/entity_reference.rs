use std::{
    cell::RefCell,
    mem::replace,
    rc::{Rc, Weak},
};

use super::{
    NodeType,
    document::{DocumentRef, DocumentWeakRef},
    events::EventListenerMap,
    node::{Node, NodeConnection, NodeRef, NodeWeakRef, SourceLocation},
    node_list::NodeList,
};

/// Implementation of [EntityReference](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-11C98490)
/// interface on [1.5 Extended Interfaces: XML Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-E067D597)
///
/// The children of an entity reference are the replacement of the referenced entity,
/// so they are read-only.
pub struct EntityReference {
    /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    /// - `DocumentFragment`
    /// - `EntityReference`
    /// - `Element`
    /// - `Attr`
    /// - `Entity`
    parent_node: Option<NodeWeakRef>,
    /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    /// - `Element`
    /// - `ProcessingInstruction`
    /// - `Comment`
    /// - `Text`
    /// - `CDATASection`
    /// - `EntityReference`
    children: NodeList,
    owner_document: DocumentWeakRef,

    /// Name of entity referenced. as same as `nodeName` for `Node`.
    name: Rc<str>,

    listeners: EventListenerMap,
    location: Option<SourceLocation>,
}

/// Wrapper of `Rc<RefCell<EntityReference>>`.
#[derive(Clone)]
pub struct EntityReferenceRef(Rc<RefCell<EntityReference>>);

impl EntityReferenceRef {
    /// Create new [`EntityReferenceRef`] whose ownerDocument is `doc`.
    ///
    /// This method neither validates `name` nor expands the referenced entity.
    pub(super) fn new(doc: DocumentWeakRef, name: Rc<str>) -> Self {
        Self(Rc::new(RefCell::new(EntityReference {
            parent_node: None,
            children: NodeList::new(),
            owner_document: doc,
            name,
            listeners: EventListenerMap::default(),
            location: None,
        })))
    }

    /// Append `child` without any checks or events.
    ///
    /// This is used to build the replacement of the referenced entity.
    pub(super) fn push_replacement(&self, mut child: NodeRef) {
        child.set_parent_node(Some(self.clone().into()));
        self.0.borrow().children.push(child);
    }

    /// Generate [`EntityReferenceWeakRef`] from `self`.
    pub fn downgrade(&self) -> EntityReferenceWeakRef {
        EntityReferenceWeakRef(Rc::downgrade(&self.0))
    }
}

impl Node for EntityReferenceRef {
    fn node_name(&self) -> Rc<str> {
        self.0.borrow().name.clone()
    }

    fn node_type(&self) -> NodeType {
        NodeType::EntityReference
    }

    fn parent_node(&self) -> Option<NodeRef> {
        self.0
            .borrow()
            .parent_node
            .as_ref()
            .and_then(|par| par.upgrade())
    }

    fn owner_document(&self) -> Option<DocumentRef> {
        self.0.borrow().owner_document.upgrade()
    }

    fn clone_node(&self, deep: bool) -> NodeRef {
        let entref = self.0.borrow();
        let new = Self::new(entref.owner_document.clone(), entref.name.clone());
        new.0.borrow_mut().location = entref.location;
        if deep {
            let children = entref.children.deep_clone(&new.clone().into());
            new.0.borrow_mut().children = children;
        }
        new.into()
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        let NodeRef::EntityReference(other) = other else {
            return false;
        };
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl NodeConnection for EntityReferenceRef {
    fn set_parent_node(&mut self, new_parent: Option<NodeRef>) -> Option<NodeRef> {
        replace(
            &mut self.0.borrow_mut().parent_node,
            new_parent.map(|par| par.downgrade()),
        )
        .and_then(|old| old.upgrade())
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

impl From<EntityReferenceRef> for NodeRef {
    fn from(value: EntityReferenceRef) -> Self {
        NodeRef::EntityReference(value)
    }
}

/// Wrapper of `Weak<RefCell<EntityReference>>`.
#[derive(Clone)]
pub struct EntityReferenceWeakRef(Weak<RefCell<EntityReference>>);

impl EntityReferenceWeakRef {
    /// Generate [`EntityReferenceRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<EntityReferenceRef> {
        self.0.upgrade().map(EntityReferenceRef)
    }
}
