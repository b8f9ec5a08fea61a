use std::{
    cell::RefCell,
    mem::replace,
    rc::{Rc, Weak},
};

use crate::qname::{validate_name, validate_qname};

use super::{
    DOMException, NodeType,
    document::{DocumentRef, DocumentWeakRef},
    entity::EntityRef,
    events::EventListenerMap,
    named_node_map::NamedNodeMap,
    node::{Node, NodeConnection, NodeRef, NodeWeakRef, SourceLocation},
    notation::NotationRef,
};

/// Implementation of [DocumentType](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-412266927)
/// interface on [1.5 Extended Interfaces: XML Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-E067D597)
pub struct DocumentType {
    /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    /// - `Document`
    parent_node: Option<NodeWeakRef>,
    // /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    // /// - no children
    // children: NodeList,
    /// `None` until this node is used by a document.
    owner_document: DocumentWeakRef,

    /// Implementation of `name` for `DocumentType`.
    /// as same as `nodeName` for `Node`.
    name: Rc<str>,
    /// Implementation of `publicId` for `DocumentType`.
    public_id: Option<Rc<str>>,
    /// Implementation of `systemId` for `DocumentType`.
    system_id: Option<Rc<str>>,
    /// Implementation of `internalSubset` for `DocumentType`.
    internal_subset: Option<Rc<str>>,

    /// General entities. The first declaration of each name is kept.
    entities: NamedNodeMap<EntityRef>,
    /// Notations. The first declaration of each name is kept.
    notations: NamedNodeMap<NotationRef>,

    listeners: EventListenerMap,
    location: Option<SourceLocation>,
}

/// Wrapper of `Rc<RefCell<DocumentType>>`.
#[derive(Clone)]
pub struct DocumentTypeRef(Rc<RefCell<DocumentType>>);

impl DocumentTypeRef {
    /// Implementation of [`createDocumentType`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Level-2-Core-DOM-createDocType) method
    /// of `DOMImplementation`.
    ///
    /// The created node does not belong to any document until it is passed to
    /// [`DocumentRef::new`] or inserted into a document.
    ///
    /// # Specification
    /// ```text
    /// Creates an empty DocumentType node. Entity declarations and notations are not made
    /// available. Entity reference expansions and default attribute additions do not occur.
    ///
    /// Parameters
    ///     qualifiedName of type DOMString
    ///         The qualified name of the document type to be created.
    ///     publicId of type DOMString
    ///         The external subset public identifier.
    ///     systemId of type DOMString
    ///         The external subset system identifier.
    ///
    /// Return Value
    ///     DocumentType A new DocumentType node with Node.ownerDocument set to null.
    ///
    /// Exceptions
    ///     DOMException
    ///     INVALID_CHARACTER_ERR: Raised if the specified qualified name is not an XML name
    ///                            according to [XML 1.0].
    ///     NAMESPACE_ERR:         Raised if the qualifiedName is malformed.
    /// ```
    pub fn new(
        qualified_name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<Self, DOMException> {
        if validate_name(qualified_name).is_err() {
            return Err(DOMException::InvalidCharacterErr);
        }
        if validate_qname(qualified_name).is_err() {
            return Err(DOMException::NamespaceErr);
        }

        Ok(Self::with_owner(
            DocumentWeakRef::default(),
            qualified_name.into(),
            public_id.map(Rc::from),
            system_id.map(Rc::from),
        ))
    }

    pub(super) fn with_owner(
        doc: DocumentWeakRef,
        name: Rc<str>,
        public_id: Option<Rc<str>>,
        system_id: Option<Rc<str>>,
    ) -> Self {
        Self(Rc::new(RefCell::new(DocumentType {
            parent_node: None,
            owner_document: doc,
            name,
            public_id,
            system_id,
            internal_subset: None,
            entities: NamedNodeMap::new(),
            notations: NamedNodeMap::new(),
            listeners: EventListenerMap::default(),
            location: None,
        })))
    }

    /// Implementation of [`name`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1844763134) attribute.
    ///
    /// # Specification
    /// ```text
    /// name of type DOMString, readonly
    ///     The name of DTD; i.e., the name immediately following the DOCTYPE keyword.
    /// ```
    pub fn name(&self) -> Rc<str> {
        self.0.borrow().name.clone()
    }

    /// Implementation of `publicId` attribute.
    pub fn public_id(&self) -> Option<Rc<str>> {
        self.0.borrow().public_id.clone()
    }

    /// Implementation of `systemId` attribute.
    pub fn system_id(&self) -> Option<Rc<str>> {
        self.0.borrow().system_id.clone()
    }

    /// Implementation of `internalSubset` attribute.
    ///
    /// # Specification
    /// ```text
    /// The internal subset as a string, or null if there is none.
    /// This is does not contain the delimiting square brackets.
    /// ```
    pub fn internal_subset(&self) -> Option<Rc<str>> {
        self.0.borrow().internal_subset.clone()
    }

    /// Set the text of the internal subset.
    ///
    /// This is not a required method by the DOM specification.
    pub fn set_internal_subset(&mut self, subset: Option<&str>) {
        self.0.borrow_mut().internal_subset = subset.map(Rc::from);
    }

    /// Implementation of [`entities`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1788794630) attribute.
    ///
    /// # Specification
    /// ```text
    /// entities of type NamedNodeMap, readonly
    ///     A NamedNodeMap containing the general entities, both external and internal,
    ///     declared in the DTD. Parameter entities are not contained. Duplicates are
    ///     discarded.
    ///     (..snip..)
    ///     The DOM Level 2 does not support editing entities, therefore entities cannot
    ///     be altered in any way.
    /// ```
    pub fn entities(&self) -> NamedNodeMap<EntityRef> {
        self.0.borrow().entities.clone()
    }

    /// Implementation of [`notations`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-D46829EF) attribute.
    ///
    /// # Specification
    /// ```text
    /// notations of type NamedNodeMap, readonly
    ///     A NamedNodeMap containing the notations declared in the DTD. Duplicates are
    ///     discarded. Every node in this map also implements the Notation interface.
    /// ```
    pub fn notations(&self) -> NamedNodeMap<NotationRef> {
        self.0.borrow().notations.clone()
    }

    /// Create a new [`EntityRef`] that has `name` as the entity name.
    ///
    /// The new entity belongs to the owner document of this node, but it is not declared
    /// until it is passed to [`add_entity`](DocumentTypeRef::add_entity).\
    /// This is not a required method by the DOM specification.
    ///
    /// # Errors
    /// - If `name` is not a valid XML Name, return `Err(DOMException::InvalidCharacterErr)`
    pub fn create_entity(
        &self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        notation_name: Option<&str>,
    ) -> Result<EntityRef, DOMException> {
        if validate_name(name).is_err() {
            return Err(DOMException::InvalidCharacterErr);
        }
        Ok(EntityRef::new(
            self.0.borrow().owner_document.clone(),
            name.into(),
            public_id.map(Rc::from),
            system_id.map(Rc::from),
            notation_name.map(Rc::from),
        ))
    }

    /// Create a new [`NotationRef`] that has `name` as the notation name.
    ///
    /// This is not a required method by the DOM specification.
    ///
    /// # Errors
    /// - If `name` is not a valid XML Name, return `Err(DOMException::InvalidCharacterErr)`
    pub fn create_notation(
        &self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<NotationRef, DOMException> {
        if validate_name(name).is_err() {
            return Err(DOMException::InvalidCharacterErr);
        }
        Ok(NotationRef::new(
            self.0.borrow().owner_document.clone(),
            name.into(),
            public_id.map(Rc::from),
            system_id.map(Rc::from),
        ))
    }

    /// Declare `entity` in this document type.
    ///
    /// If an entity with the same name has already been declared,
    /// `entity` is discarded and the first declaration is kept.
    ///
    /// # Errors
    /// - `entity` belongs to a different document: `WrongDocumentErr`
    pub fn add_entity(&mut self, entity: EntityRef) -> Result<(), DOMException> {
        if !self.owns(&entity) {
            return Err(DOMException::WrongDocumentErr);
        }
        let mut entities = self.entities();
        if entities.get_named_item(&entity.node_name()).is_some() {
            tracing::debug!(name = %entity.node_name(), "duplicate entity declaration");
            return Ok(());
        }
        entities.set_named_item(entity);
        Ok(())
    }

    /// Declare `notation` in this document type.
    ///
    /// If a notation with the same name has already been declared,
    /// `notation` is discarded and the first declaration is kept.
    ///
    /// # Errors
    /// - `notation` belongs to a different document: `WrongDocumentErr`
    pub fn add_notation(&mut self, notation: NotationRef) -> Result<(), DOMException> {
        if !self.owns(&notation) {
            return Err(DOMException::WrongDocumentErr);
        }
        let mut notations = self.notations();
        if notations.get_named_item(&notation.name()).is_some() {
            tracing::debug!(name = %notation.name(), "duplicate notation declaration");
            return Ok(());
        }
        notations.set_named_item(notation);
        Ok(())
    }

    fn owns(&self, decl: &impl Node) -> bool {
        match (self.owner_document(), decl.owner_document()) {
            (Some(l), Some(r)) => l.is_same_node(&r.into()),
            (None, None) => true,
            _ => false,
        }
    }

    /// Generate [`DocumentTypeWeakRef`] from `self`.
    pub fn downgrade(&self) -> DocumentTypeWeakRef {
        DocumentTypeWeakRef(Rc::downgrade(&self.0))
    }
}

impl Node for DocumentTypeRef {
    fn node_name(&self) -> Rc<str> {
        self.name()
    }

    fn node_type(&self) -> NodeType {
        NodeType::DocumentType
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

    /// The declared entities and notations are always copied.
    fn clone_node(&self, _deep: bool) -> NodeRef {
        let doctype = self.0.borrow();
        let new = DocumentTypeRef(Rc::new(RefCell::new(DocumentType {
            parent_node: None,
            owner_document: doctype.owner_document.clone(),
            name: doctype.name.clone(),
            public_id: doctype.public_id.clone(),
            system_id: doctype.system_id.clone(),
            internal_subset: doctype.internal_subset.clone(),
            entities: doctype.entities.deep_clone(|ent| ent.clone_entity(true)),
            notations: doctype.notations.deep_clone(|nota| nota.clone_notation()),
            listeners: EventListenerMap::default(),
            location: doctype.location,
        })));
        new.into()
    }

    fn text_content(&self) -> Option<String> {
        None
    }

    fn set_text_content(&mut self, _text: &str) -> Result<(), DOMException> {
        Ok(())
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        let NodeRef::DocumentType(other) = other else {
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

    /// # Specification
    /// ```text
    /// For two DocumentType nodes to be equal, the following conditions must also be
    /// satisfied:
    ///
    /// - The following string attributes are equal: publicId, systemId, internalSubset.
    /// - The entities NamedNodeMaps are equal.
    /// - The notations NamedNodeMaps are equal.
    /// ```
    fn is_equal_node(&self, arg: &NodeRef) -> bool {
        if self.is_same_node(arg) {
            return true;
        }
        let NodeRef::DocumentType(other) = arg else {
            return false;
        };
        if self.name() != other.name()
            || self.public_id() != other.public_id()
            || self.system_id() != other.system_id()
            || self.internal_subset() != other.internal_subset()
        {
            return false;
        }

        let (lents, rents) = (self.entities(), other.entities());
        let (lnotas, rnotas) = (self.notations(), other.notations());
        lents.length() == rents.length()
            && lents.to_vec().into_iter().all(|ent| {
                rents
                    .get_named_item(&ent.node_name())
                    .is_some_and(|r| r.is_equal_node(&ent.into()))
            })
            && lnotas.length() == rnotas.length()
            && lnotas.to_vec().into_iter().all(|nota| {
                rnotas
                    .get_named_item(&nota.name())
                    .is_some_and(|r| r.is_equal_node(&nota.into()))
            })
    }
}

impl NodeConnection for DocumentTypeRef {
    fn set_parent_node(&mut self, new_parent: Option<NodeRef>) -> Option<NodeRef> {
        replace(
            &mut self.0.borrow_mut().parent_node,
            new_parent.map(|par| par.downgrade()),
        )
        .and_then(|old| old.upgrade())
    }

    fn set_owner_document(&mut self, new_doc: DocumentRef) -> Option<DocumentRef> {
        replace(&mut self.0.borrow_mut().owner_document, new_doc.downgrade()).upgrade()
    }

    fn adopted_to(&mut self, new_doc: DocumentRef) {
        self.set_owner_document(new_doc.clone());
        for mut ent in self.entities().to_vec() {
            ent.adopted_to(new_doc.clone());
        }
        for mut nota in self.notations().to_vec() {
            nota.adopted_to(new_doc.clone());
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

impl From<DocumentTypeRef> for NodeRef {
    fn from(value: DocumentTypeRef) -> Self {
        NodeRef::DocumentType(value)
    }
}

/// Wrapper of `Weak<RefCell<DocumentType>>`.
#[derive(Clone)]
pub struct DocumentTypeWeakRef(Weak<RefCell<DocumentType>>);

impl DocumentTypeWeakRef {
    /// Generate [`DocumentTypeRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<DocumentTypeRef> {
        self.0.upgrade().map(DocumentTypeRef)
    }
}
