use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use crate::qname::validate_name;

use super::{
    DOMException, NodeType,
    attr::AttrRef,
    character_data::{CDATASectionRef, CommentRef, TextRef},
    document_fragment::DocumentFragmentRef,
    document_type::DocumentTypeRef,
    element::{ElementRef, collect_elements, collect_elements_ns},
    entity_reference::EntityReferenceRef,
    events::EventListenerMap,
    node::{Node, NodeConnection, NodeRef, SourceLocation},
    node_list::NodeList,
    pi::ProcessingInstructionRef,
    resolve_qname,
};

/// Enable the read-only check if set.
const READ_ONLY_CHECK: u32 = 0b01;
/// Dispatch mutation events if set.
const EVENTS_ENABLED: u32 = 0b10;

/// Implementation of [Document](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-i-Document)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
pub struct Document {
    // /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    // /// - no parent
    // parent_node: Option<NodeWeakRef>,
    /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    /// - `Element` (maximum of one)
    /// - `ProcessingInstruction`
    /// - `Comment`
    /// - `DocumentType` (maximum of one)
    children: NodeList,
    /// Implementation of `documentURI` attribute.
    document_uri: Option<Rc<str>>,
    /// 0      : enable modification check if set
    /// 1      : dispatch mutation events if set
    /// 2 - 31 : unused
    flag: u32,

    listeners: EventListenerMap,
    location: Option<SourceLocation>,
}

/// Wrapper of `Rc<RefCell<Document>>`.
///
/// A document owns its children, and every other node refers to its owner document
/// weakly. Therefore, the document must be kept alive while its nodes are used.
#[derive(Clone)]
pub struct DocumentRef(Rc<RefCell<Document>>);

impl DocumentRef {
    fn empty(document_uri: Option<Rc<str>>, flag: u32) -> Self {
        Self(Rc::new(RefCell::new(Document {
            children: NodeList::new(),
            document_uri,
            flag,
            listeners: EventListenerMap::default(),
            location: None,
        })))
    }

    /// Implementation of [`createDocument`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Level-2-Core-DOM-createDocument) method
    /// of `DOMImplementation`.
    ///
    /// Mutation events are enabled and the read-only check is disabled on the new document.
    ///
    /// # Specification
    /// ```text
    /// Creates a DOM Document object of the specified type with its document element.
    ///
    /// Parameters
    ///     namespaceURI of type DOMString
    ///         The namespace URI of the document element to create or null.
    ///     qualifiedName of type DOMString
    ///         The qualified name of the document element or null.
    ///     doctype of type DocumentType
    ///         The type of document to be created or null.
    ///         When doctype is not null, its Node.ownerDocument attribute is set to
    ///         the document being created.
    ///
    /// Return Value
    ///     Document A new Document object with its document element. If the NamespaceURI,
    ///              qualifiedName, and doctype are null, the returned Document is empty with
    ///              no document element.
    ///
    /// Exceptions
    ///     DOMException
    ///     INVALID_CHARACTER_ERR: Raised if the specified qualified name is not an XML name
    ///                            according to [XML 1.0].
    ///     NAMESPACE_ERR:         Raised if the qualifiedName is malformed, if the
    ///                            qualifiedName has a prefix and the namespaceURI is null,
    ///                            or if the qualifiedName is null and the namespaceURI is
    ///                            different from null, or if the qualifiedName has a prefix
    ///                            that is "xml" and the namespaceURI is different from
    ///                            "http://www.w3.org/XML/1998/namespace" [XML Namespaces].
    ///     WRONG_DOCUMENT_ERR:    Raised if doctype has already been used with a different
    ///                            document or was created from a different implementation.
    /// ```
    pub fn new(
        namespace_uri: Option<&str>,
        qualified_name: Option<&str>,
        doctype: Option<DocumentTypeRef>,
    ) -> Result<Self, DOMException> {
        if doctype
            .as_ref()
            .is_some_and(|doctype| doctype.owner_document().is_some())
        {
            return Err(DOMException::WrongDocumentErr);
        }
        let name = match qualified_name {
            Some(qname) => Some(resolve_qname(namespace_uri, qname)?),
            // ... or if the qualifiedName is null and the namespaceURI is different from null
            None if namespace_uri.is_some() => return Err(DOMException::NamespaceErr),
            None => None,
        };

        let mut new = Self::empty(None, EVENTS_ENABLED);
        if let Some(doctype) = doctype {
            new.append_child(doctype.into())?;
        }
        if let Some((prefix, local_name)) = name {
            let elem =
                ElementRef::with_namespace(&new, namespace_uri.map(Rc::from), prefix, local_name);
            new.append_child(elem.into())?;
        }
        Ok(new)
    }

    /// Implementation of [`createElement`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-2141741547) method.
    ///
    /// # Specification
    /// ```text
    /// Creates an element of the type specified. Note that the instance returned implements
    /// the Element interface, so attributes can be specified directly on the returned object.
    ///
    /// Parameters
    ///     tagName of type DOMString
    ///         The name of the element type to instantiate. For XML, this is case-sensitive.
    ///
    /// Return Value
    ///     Element A new Element object with the nodeName attribute set to tagName,
    ///             and localName, prefix, and namespaceURI set to null.
    ///
    /// Exceptions
    ///     DOMException
    ///     INVALID_CHARACTER_ERR: Raised if the specified name is not an XML name according
    ///                            to the XML version in use specified in the
    ///                            Document.xmlVersion attribute.
    /// ```
    pub fn create_element(&self, tag_name: &str) -> Result<ElementRef, DOMException> {
        if validate_name(tag_name).is_err() {
            return Err(DOMException::InvalidCharacterErr);
        }
        Ok(ElementRef::new(self, tag_name.into()))
    }

    /// Implementation of [`createElementNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-DocCrElNS) method.
    ///
    /// # Specification
    /// ```text
    /// Creates an element of the given qualified name and namespace URI.
    /// Per [XML Namespaces], applications must use the value null as the namespaceURI
    /// parameter for methods if they wish to have no namespace.
    ///
    /// Exceptions
    ///     DOMException
    ///     INVALID_CHARACTER_ERR: Raised if the specified qualifiedName is not an XML name
    ///                            according to the XML version in use specified in the
    ///                            Document.xmlVersion attribute.
    ///     NAMESPACE_ERR:         Raised if the qualifiedName is a malformed qualified name,
    ///                            if the qualifiedName has a prefix and the namespaceURI
    ///                            is null, or if the qualifiedName has a prefix that is "xml"
    ///                            and the namespaceURI is different from
    ///                            "http://www.w3.org/XML/1998/namespace" [XML Namespaces],
    ///                            or if the qualifiedName or its prefix is "xmlns" and the
    ///                            namespaceURI is different from
    ///                            "http://www.w3.org/2000/xmlns/", or if the namespaceURI
    ///                            is "http://www.w3.org/2000/xmlns/" and neither
    ///                            the qualifiedName nor its prefix is "xmlns".
    /// ```
    pub fn create_element_ns(
        &self,
        namespace_uri: Option<&str>,
        qualified_name: &str,
    ) -> Result<ElementRef, DOMException> {
        let (prefix, local_name) = resolve_qname(namespace_uri, qualified_name)?;
        Ok(ElementRef::with_namespace(
            self,
            namespace_uri.map(Rc::from),
            prefix,
            local_name,
        ))
    }

    /// Implementation of [`createDocumentFragment`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-35CB04B5) method.
    pub fn create_document_fragment(&self) -> DocumentFragmentRef {
        DocumentFragmentRef::new(self.downgrade())
    }

    /// Implementation of [`createTextNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1975348127) method.
    pub fn create_text_node(&self, data: &str) -> TextRef {
        TextRef::new(self.downgrade(), data)
    }

    /// Implementation of [`createComment`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1334481328) method.
    pub fn create_comment(&self, data: &str) -> CommentRef {
        CommentRef::new(self.downgrade(), data)
    }

    /// Implementation of [`createCDATASection`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-D26C0AF8) method.
    ///
    /// # Note
    /// The specification raises `NOT_SUPPORTED_ERR` for HTML documents,
    /// but every document of this crate is an XML document.
    pub fn create_cdata_section(&self, data: &str) -> CDATASectionRef {
        CDATASectionRef::new(self.downgrade(), data)
    }

    /// Implementation of [`createProcessingInstruction`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-135944439) method.
    ///
    /// # Specification
    /// ```text
    /// Creates a ProcessingInstruction node given the specified name and data strings.
    ///
    /// Parameters
    ///     target of type DOMString
    ///         The target part of the processing instruction.
    ///         Unlike Document.createElementNS or Document.createAttributeNS,
    ///         no namespace well-formed checking is done on the target name.
    ///     data of type DOMString
    ///         The data for the node.
    ///
    /// Exceptions
    ///     DOMException
    ///     INVALID_CHARACTER_ERR: Raised if the specified target is not
    ///                            an XML name according to the XML version in use
    ///                            specified in the Document.xmlVersion attribute.
    /// ```
    pub fn create_processing_instruction(
        &self,
        target: &str,
        data: &str,
    ) -> Result<ProcessingInstructionRef, DOMException> {
        // [17] PITarget ::= Name - (('X' | 'x') ('M' | 'm') ('L' | 'l'))
        if target.eq_ignore_ascii_case("xml") || validate_name(target).is_err() {
            return Err(DOMException::InvalidCharacterErr);
        }
        Ok(ProcessingInstructionRef::new(
            self.downgrade(),
            target.into(),
            data.into(),
        ))
    }

    /// Implementation of [`createAttribute`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1084891198) method.
    ///
    /// # Specification
    /// ```text
    /// Creates an Attr of the given name. Note that the Attr instance can then be set
    /// on an Element using the setAttributeNode method.
    ///
    /// Return Value
    ///     Attr A new Attr object with the nodeName attribute set to name, and localName,
    ///          prefix, and namespaceURI set to null. The value of the attribute
    ///          is the empty string.
    ///
    /// Exceptions
    ///     DOMException
    ///     INVALID_CHARACTER_ERR: Raised if the specified name is not an XML name
    ///                            according to the XML version in use specified in
    ///                            the Document.xmlVersion attribute.
    /// ```
    pub fn create_attribute(&self, name: &str) -> Result<AttrRef, DOMException> {
        if validate_name(name).is_err() {
            return Err(DOMException::InvalidCharacterErr);
        }
        Ok(AttrRef::new(self, name.into()))
    }

    /// Implementation of [`createAttributeNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-DocCrAttrNS) method.
    ///
    /// Unlike the specification, this method also sets `value` to the new attribute,
    /// so the new attribute is always specified.\
    /// If `value` is empty, the new attribute has no children.
    ///
    /// # Errors
    /// Same as [`create_element_ns`](DocumentRef::create_element_ns).
    pub fn create_attribute_ns(
        &self,
        namespace_uri: Option<&str>,
        qualified_name: &str,
        value: &str,
    ) -> Result<AttrRef, DOMException> {
        let (prefix, local_name) = resolve_qname(namespace_uri, qualified_name)?;
        let mut attr =
            AttrRef::with_namespace(self, namespace_uri.map(Rc::from), prefix, local_name);
        attr.set_value(value)?;
        Ok(attr)
    }

    /// Implementation of [`createEntityReference`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-392B75AE) method.
    ///
    /// If the document type of this document declares the entity `name`,
    /// the children of the entity are copied into the new reference without
    /// dispatching any events.
    ///
    /// # Specification
    /// ```text
    /// Creates an EntityReference object. In addition, if the referenced entity is known,
    /// the child list of the EntityReference node is made the same as that of
    /// the corresponding Entity node.
    ///
    /// Exceptions
    ///     DOMException
    ///     INVALID_CHARACTER_ERR: Raised if the specified name is not an XML name according
    ///                            to the XML version in use specified in the
    ///                            Document.xmlVersion attribute.
    /// ```
    pub fn create_entity_reference(&self, name: &str) -> Result<EntityReferenceRef, DOMException> {
        if validate_name(name).is_err() {
            return Err(DOMException::InvalidCharacterErr);
        }
        let entref = EntityReferenceRef::new(self.downgrade(), name.into());
        if let Some(entity) = self
            .doctype()
            .and_then(|doctype| doctype.entities().get_named_item(name))
        {
            for child in entity.child_nodes().to_vec() {
                let mut child = child.clone_node(true);
                child.adopted_to(self.clone());
                entref.push_replacement(child);
            }
        }
        Ok(entref)
    }

    /// Create a new [`DocumentTypeRef`] whose ownerDocument is this document.
    ///
    /// The new node is not inserted into this document.
    ///
    /// # Errors
    /// Same as [`DocumentTypeRef::new`].
    pub fn create_document_type(
        &self,
        qualified_name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<DocumentTypeRef, DOMException> {
        let mut doctype = DocumentTypeRef::new(qualified_name, public_id, system_id)?;
        doctype.set_owner_document(self.clone());
        Ok(doctype)
    }

    /// Implementation of [`getElementsByTagName`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-A6C9094) method.
    ///
    /// Unlike the specification, the returned list is not live.
    ///
    /// # Specification
    /// ```text
    /// Returns a NodeList of all the Elements in document order with a given tag name
    /// and are contained in the document.
    ///
    /// Parameters
    ///     tagname of type DOMString
    ///         The name of the tag to match on. The special value "*" matches all tags.
    /// ```
    pub fn get_elements_by_tag_name(&self, tag_name: &str) -> Vec<ElementRef> {
        let mut res = vec![];
        collect_elements(&self.clone().into(), &mut res, &|elem| {
            tag_name == "*" || elem.tag_name().as_ref() == tag_name
        });
        res
    }

    /// Implementation of [`getElementsByTagNameNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-getElBTNNS) method.
    ///
    /// Unlike the specification, the returned list is not live.\
    /// The special value `"*"` matches all namespaces or all local names.
    pub fn get_elements_by_tag_name_ns(
        &self,
        namespace_uri: Option<&str>,
        local_name: &str,
    ) -> Vec<ElementRef> {
        collect_elements_ns(&self.clone().into(), namespace_uri, local_name)
    }

    /// Implementation of [`importNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Core-Document-importNode) method.
    ///
    /// The source node is not altered.\
    /// An `EntityReference` is rebuilt from the entity declared in this document,
    /// and an `Attr` always carries its value regardless of `deep`.
    ///
    /// # Specification
    /// ```text
    /// Imports a node from another document to this document, without altering
    /// or removing the source node from the original document; this method creates
    /// a new copy of the source node. The returned node has no parent; (parentNode is null).
    /// (..snip..)
    ///
    /// Exceptions
    ///     DOMException
    ///     NOT_SUPPORTED_ERR:     Raised if the type of node being imported is not supported.
    /// ```
    pub fn import_node(&mut self, imported_node: NodeRef, deep: bool) -> Result<NodeRef, DOMException> {
        match imported_node {
            NodeRef::Document(_) | NodeRef::DocumentType(_) => {
                tracing::debug!(node = %imported_node.node_name(), "import of an unsupported node");
                Err(DOMException::NotSupportedErr)
            }
            NodeRef::EntityReference(entref) => Ok(self
                .create_entity_reference(&entref.node_name())?
                .into()),
            node => {
                let mut new = node.clone_node(deep);
                new.adopted_to(self.clone());
                Ok(new)
            }
        }
    }

    /// Implementation of [`adoptNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Document3-adoptNode) method.
    ///
    /// This operation is not supported. Use [`import_node`](DocumentRef::import_node)
    /// instead.
    pub fn adopt_node(&mut self, source: NodeRef) -> Result<NodeRef, DOMException> {
        let _ = source;
        Err(DOMException::NotSupportedErr)
    }

    /// Implementation of [`renameNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Document3-renameNode) method.
    ///
    /// This operation is not supported.
    pub fn rename_node(
        &mut self,
        node: NodeRef,
        namespace_uri: Option<&str>,
        qualified_name: &str,
    ) -> Result<NodeRef, DOMException> {
        let _ = (node, namespace_uri, qualified_name);
        Err(DOMException::NotSupportedErr)
    }

    /// Implementation of [`normalizeDocument`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Document3-normalizeDocument) method.
    ///
    /// This operation needs a `DOMConfiguration`, so it is not supported.\
    /// [`Node::normalize`] is available instead.
    pub fn normalize_document(&mut self) -> Result<(), DOMException> {
        Err(DOMException::NotSupportedErr)
    }

    /// Implementation of `doctype` attribute.
    pub fn doctype(&self) -> Option<DocumentTypeRef> {
        self.0
            .borrow()
            .children
            .to_vec()
            .into_iter()
            .find_map(|child| child.as_document_type())
    }

    /// Implementation of `documentElement` attribute.
    pub fn document_element(&self) -> Option<ElementRef> {
        self.0
            .borrow()
            .children
            .to_vec()
            .into_iter()
            .find_map(|child| child.as_element())
    }

    /// Implementation of `documentURI` attribute.
    pub fn document_uri(&self) -> Option<Rc<str>> {
        self.0.borrow().document_uri.clone()
    }

    /// Implementation of `documentURI` attribute.
    ///
    /// No lexical checking is performed.
    pub fn set_document_uri(&mut self, uri: Option<&str>) {
        self.0.borrow_mut().document_uri = uri.map(Rc::from);
    }

    /// Enable check for read-only node.\
    /// As a result, editing of nodes specified as read-only in the DOM specification
    /// becomes impossible.
    pub fn enable_read_only_check(&mut self) {
        self.0.borrow_mut().flag |= READ_ONLY_CHECK;
    }

    /// Disable check for read-only node.\
    /// It allows editing of nodes that are not editable in the DOM specification
    /// (e.g., the children of entity references).
    pub fn disable_read_only_check(&mut self) {
        self.0.borrow_mut().flag &= !READ_ONLY_CHECK;
    }

    /// Check if read-only check is enabled.
    pub fn is_enabled_read_only_check(&self) -> bool {
        self.0.borrow().flag & READ_ONLY_CHECK != 0
    }

    /// Check if `DOMNodeInserted` and `DOMNodeRemoved` are dispatched
    /// by the mutations of the nodes of this document.
    pub fn events_enabled(&self) -> bool {
        self.0.borrow().flag & EVENTS_ENABLED != 0
    }

    /// Enable or disable the mutation events of this document.
    pub fn set_events_enabled(&mut self, enabled: bool) {
        let mut doc = self.0.borrow_mut();
        if enabled {
            doc.flag |= EVENTS_ENABLED;
        } else {
            doc.flag &= !EVENTS_ENABLED;
        }
    }

    /// Generate [`DocumentWeakRef`] from `self`.
    pub fn downgrade(&self) -> DocumentWeakRef {
        DocumentWeakRef(Rc::downgrade(&self.0))
    }
}

impl Node for DocumentRef {
    fn node_name(&self) -> Rc<str> {
        "#document".into()
    }

    fn node_type(&self) -> NodeType {
        NodeType::Document
    }

    /// The clone has the same flags and URI as this document.\
    /// If `deep` is `true`, every child is imported into the clone without events.
    fn clone_node(&self, deep: bool) -> NodeRef {
        let doc = self.0.borrow();
        let new = Self::empty(doc.document_uri.clone(), doc.flag);
        new.0.borrow_mut().location = doc.location;
        if deep {
            let parent: NodeRef = new.clone().into();
            for child in doc.children.to_vec() {
                let mut child = child.clone_node(true);
                child.adopted_to(new.clone());
                child.set_parent_node(Some(parent.clone()));
                new.0.borrow().children.push(child);
            }
        }
        new.into()
    }

    fn text_content(&self) -> Option<String> {
        None
    }

    fn set_text_content(&mut self, _text: &str) -> Result<(), DOMException> {
        Ok(())
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        let NodeRef::Document(other) = other else {
            return false;
        };
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn lookup_prefix(&self, ns_uri: &str) -> Option<Rc<str>> {
        self.document_element()?.lookup_prefix(ns_uri)
    }

    fn is_default_namespace(&self, ns_uri: &str) -> bool {
        self.document_element()
            .is_some_and(|elem| elem.is_default_namespace(ns_uri))
    }

    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<Rc<str>> {
        self.document_element()?.lookup_namespace_uri(prefix)
    }

    fn is_read_only(&self) -> bool {
        false
    }
}

impl NodeConnection for DocumentRef {
    fn set_parent_node(&mut self, _: Option<NodeRef>) -> Option<NodeRef> {
        None
    }

    fn children(&self) -> Option<NodeList> {
        Some(self.0.borrow().children.clone())
    }

    fn set_owner_document(&mut self, _: DocumentRef) -> Option<DocumentRef> {
        None
    }

    fn adopted_to(&mut self, _new_doc: DocumentRef) {
        // `Document` nodes cannot be adopted.
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

impl From<DocumentRef> for NodeRef {
    fn from(value: DocumentRef) -> Self {
        NodeRef::Document(value)
    }
}

/// Wrapper of `Weak<RefCell<Document>>`.
///
/// [`DocumentWeakRef::default`] refers to no document.
#[derive(Clone, Default)]
pub struct DocumentWeakRef(Weak<RefCell<Document>>);

impl DocumentWeakRef {
    /// Generate [`DocumentRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<DocumentRef> {
        self.0.upgrade().map(DocumentRef)
    }
}
