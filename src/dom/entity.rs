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

/// Implementation of [Entity](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-527DCFF2)
/// interface on [1.5 Extended Interfaces: XML Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-E067D597)
///
/// An entity is a declaration held by a [`DocumentType`](crate::dom::document_type::DocumentType).
/// It is not a part of the document tree, but its children are the replacement
/// that is copied into an [`EntityReference`](crate::dom::entity_reference::EntityReference)
/// created for this entity.
pub struct Entity {
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

    /// Entity name. as same as `nodeName` for `Node`.
    name: Rc<str>,
    /// Implementation of `publicId` attribute.
    public_id: Option<Rc<str>>,
    /// Implementation of `systemId` attribute.
    system_id: Option<Rc<str>>,
    /// Implementation of `notationName` attribute.
    notation_name: Option<Rc<str>>,

    listeners: EventListenerMap,
    location: Option<SourceLocation>,
}

/// Wrapper of `Rc<RefCell<Entity>>`.
#[derive(Clone)]
pub struct EntityRef(Rc<RefCell<Entity>>);

impl EntityRef {
    /// The format of `name` must have been validated by the caller.
    pub(super) fn new(
        doc: DocumentWeakRef,
        name: Rc<str>,
        public_id: Option<Rc<str>>,
        system_id: Option<Rc<str>>,
        notation_name: Option<Rc<str>>,
    ) -> Self {
        Self(Rc::new(RefCell::new(Entity {
            children: NodeList::new(),
            owner_document: doc,
            name,
            public_id,
            system_id,
            notation_name,
            listeners: EventListenerMap::default(),
            location: None,
        })))
    }

    /// Implementation of `publicId` attribute.
    pub fn public_id(&self) -> Option<Rc<str>> {
        self.0.borrow().public_id.clone()
    }

    /// Implementation of `systemId` attribute.
    pub fn system_id(&self) -> Option<Rc<str>> {
        self.0.borrow().system_id.clone()
    }

    /// Implementation of `notationName` attribute.
    ///
    /// # Specification
    /// ```text
    /// For unparsed entities, the name of the notation for the entity.
    /// For parsed entities, this is null.
    /// ```
    pub fn notation_name(&self) -> Option<Rc<str>> {
        self.0.borrow().notation_name.clone()
    }

    pub(super) fn clone_entity(&self, deep: bool) -> EntityRef {
        let ent = self.0.borrow();
        let new = Self::new(
            ent.owner_document.clone(),
            ent.name.clone(),
            ent.public_id.clone(),
            ent.system_id.clone(),
            ent.notation_name.clone(),
        );
        new.0.borrow_mut().location = ent.location;
        if deep {
            let children = ent.children.deep_clone(&new.clone().into());
            new.0.borrow_mut().children = children;
        }
        new
    }

    /// Generate [`EntityWeakRef`] from `self`.
    pub fn downgrade(&self) -> EntityWeakRef {
        EntityWeakRef(Rc::downgrade(&self.0))
    }
}

impl Node for EntityRef {
    fn node_name(&self) -> Rc<str> {
        self.0.borrow().name.clone()
    }

    fn node_type(&self) -> NodeType {
        NodeType::Entity
    }

    fn owner_document(&self) -> Option<DocumentRef> {
        self.0.borrow().owner_document.upgrade()
    }

    fn clone_node(&self, deep: bool) -> NodeRef {
        self.clone_entity(deep).into()
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        let NodeRef::Entity(other) = other else {
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

impl NodeConnection for EntityRef {
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

impl From<EntityRef> for NodeRef {
    fn from(value: EntityRef) -> Self {
        NodeRef::Entity(value)
    }
}

/// Wrapper of `Weak<RefCell<Entity>>`.
#[derive(Clone)]
pub struct EntityWeakRef(Weak<RefCell<Entity>>);

impl EntityWeakRef {
    /// Generate [`EntityRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<EntityRef> {
        self.0.upgrade().map(EntityRef)
    }
}
