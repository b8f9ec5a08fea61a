use std::{
    cell::RefCell,
    mem::replace,
    rc::{Rc, Weak},
};

use super::{
    DOMException, NodeType, check_new_prefix, check_no_modification_allowed_err,
    character_data::TextRef,
    document::{DocumentRef, DocumentWeakRef},
    element::{ElementRef, ElementWeakRef},
    events::EventListenerMap,
    node::{Node, NodeConnection, NodeRef, SourceLocation},
    node_list::NodeList,
};

/// Implementation of [Attr](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-637646024)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
pub struct Attr {
    // [Interface Attr](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-637646024)
    // ```
    // Attr objects inherit the Node interface,
    // but since they are not actually child nodes of the element they describe,
    // the DOM does not consider them part of the document tree.
    // Thus, the Node attributes parentNode, previousSibling, and nextSibling have
    // a null value for Attr objects.
    // ```
    // parent_node: Option<NodeWeakRef>,
    /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    /// - `Text`
    /// - `EntityReference`
    children: NodeList,
    owner_document: DocumentWeakRef,

    /// Implementation of `name` attribute of `Attr`.
    /// as same as `nodeName` for `Node`.
    name: Rc<str>,
    /// Implementation of `ownerElement` attribute of `Attr`.
    owner_element: Option<ElementWeakRef>,
    /// Implementation of `namespaceURI` for `Node`.
    namespace_uri: Option<Rc<str>>,
    /// Implementation of `prefix` for `Node`.
    prefix: Option<Rc<str>>,
    /// Implementation of `localName` for `Node`.
    local_name: Option<Rc<str>>,

    /// Implementation of `specified` attribute of `Attr`.
    specified: bool,

    listeners: EventListenerMap,
    location: Option<SourceLocation>,
}

/// Wrapper of `Rc<RefCell<Attr>>`.
#[derive(Clone)]
pub struct AttrRef(Rc<RefCell<Attr>>);

impl AttrRef {
    /// Create new [`AttrRef`] without value.
    ///
    /// The format of `name` must have been validated by the caller.
    pub(super) fn new(doc: &DocumentRef, name: Rc<str>) -> Self {
        Self(Rc::new(RefCell::new(Attr {
            children: NodeList::new(),
            owner_document: doc.downgrade(),
            name,
            owner_element: None,
            namespace_uri: None,
            prefix: None,
            local_name: None,
            specified: false,
            listeners: EventListenerMap::default(),
            location: None,
        })))
    }

    /// Create new [`AttrRef`] with namespace whose URI is `namespace_uri`.
    ///
    /// The namespace constraints must have been validated by the caller.
    pub(super) fn with_namespace(
        doc: &DocumentRef,
        namespace_uri: Option<Rc<str>>,
        prefix: Option<Rc<str>>,
        local_name: Rc<str>,
    ) -> Self {
        let name = match prefix.as_deref() {
            Some(prefix) => format!("{prefix}:{local_name}").into(),
            None => local_name.clone(),
        };
        let new = Self::new(doc, name);
        {
            let mut attr = new.0.borrow_mut();
            attr.namespace_uri = namespace_uri;
            attr.prefix = prefix;
            attr.local_name = Some(local_name);
        }
        new
    }

    /// Implementation of `ownerElement` attribute of `Attr`.
    pub fn owner_element(&self) -> Option<ElementRef> {
        self.0
            .borrow()
            .owner_element
            .as_ref()
            .and_then(|elem| elem.upgrade())
    }

    pub(super) fn set_owner_element(&mut self, elem: Option<ElementRef>) {
        self.0.borrow_mut().owner_element = elem.map(|elem| elem.downgrade());
    }

    /// Implementation of `name` attribute of `Attr`.
    pub fn name(&self) -> Rc<str> {
        self.0.borrow().name.clone()
    }

    /// Implementation of `specified` attribute of `Attr`.
    ///
    /// # Specification
    /// ```text
    /// True if this attribute was explicitly given a value in the instance document,
    /// false otherwise. If the application changed the value of this attribute node
    /// (even if it ends up having the same value as the default value) then it is set
    /// to true.
    /// ```
    pub fn specified(&self) -> bool {
        self.0.borrow().specified
    }

    /// Return `value` attribute of `Attr` interface.
    ///
    /// The value is the concatenation of the text of the children.
    ///
    /// # Specification
    /// [value of type DOMString](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-221662474)
    /// ```text
    /// On retrieval, the value of the attribute is returned as a string.
    /// Character and general entity references are replaced with their values.
    /// See also the method getAttribute on the Element interface.
    /// ```
    pub fn value(&self) -> String {
        self.text_content().unwrap_or_default()
    }

    /// Set `value` attribute of `Attr` interface.
    ///
    /// The children are replaced with one `Text` node, or removed if `value` is empty.
    ///
    /// # Specification
    /// ```text
    /// On setting, this creates a Text node with the unparsed contents of the string,
    /// i.e. any characters that an XML processor would recognize as markup are instead
    /// treated as literal text. See also the method Element.setAttribute().
    ///
    /// Exceptions on setting
    ///     DOMException
    ///     NO_MODIFICATION_ALLOWED_ERR: Raised when the node is readonly.
    /// ```
    pub fn set_value(&mut self, value: &str) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;

        let children = self.0.borrow().children.clone();
        children.clear();
        if !value.is_empty() {
            let doc = self.0.borrow().owner_document.clone();
            let mut text = TextRef::new(doc, value);
            text.set_parent_node(Some(self.clone().into()));
            children.push(text.into());
        }
        self.0.borrow_mut().specified = true;
        Ok(())
    }

    /// Generate [`AttrWeakRef`] from `self`.
    pub fn downgrade(&self) -> AttrWeakRef {
        AttrWeakRef(Rc::downgrade(&self.0))
    }

    /// Clone this attribute as an unowned attribute.
    ///
    /// The value is always copied.\
    /// If `direct` is `true`, the clone is specified. Otherwise, the clone keeps
    /// `specified` of this attribute, as the attributes copied by an element clone.
    pub(super) fn clone_attribute(&self, direct: bool) -> AttrRef {
        let attr = self.0.borrow();
        let new = AttrRef(Rc::new(RefCell::new(Attr {
            children: NodeList::new(),
            owner_document: attr.owner_document.clone(),
            name: attr.name.clone(),
            owner_element: None,
            namespace_uri: attr.namespace_uri.clone(),
            prefix: attr.prefix.clone(),
            local_name: attr.local_name.clone(),
            specified: direct || attr.specified,
            listeners: EventListenerMap::default(),
            location: attr.location,
        })));
        let children = attr.children.deep_clone(&new.clone().into());
        new.0.borrow_mut().children = children;
        new
    }
}

impl Node for AttrRef {
    fn node_name(&self) -> Rc<str> {
        self.name()
    }

    fn node_value(&self) -> Option<Rc<str>> {
        Some(self.value().into())
    }

    fn set_node_value(&mut self, value: &str) -> Result<(), DOMException> {
        self.set_value(value)
    }

    fn node_type(&self) -> NodeType {
        NodeType::Attribute
    }

    fn owner_document(&self) -> Option<DocumentRef> {
        self.0.borrow().owner_document.upgrade()
    }

    /// # Specification
    /// ```text
    /// Cloning an Attr directly, as opposed to be cloned as part of an Element cloning
    /// operation, returns a specified attribute (specified is true). Cloning an Attr
    /// always clones its children, since they represent its value, no matter whether
    /// this is a deep clone or not.
    /// ```
    fn clone_node(&self, _deep: bool) -> NodeRef {
        self.clone_attribute(true).into()
    }

    fn namespace_uri(&self) -> Option<Rc<str>> {
        self.0.borrow().namespace_uri.clone()
    }

    fn prefix(&self) -> Option<Rc<str>> {
        self.0.borrow().prefix.clone()
    }

    fn set_prefix(&mut self, prefix: Option<&str>) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;
        let Some(local_name) = self.local_name() else {
            // This should have been created with DOM Level 1 method.
            return Ok(());
        };
        if self.prefix().as_deref() == prefix {
            return Ok(());
        }
        check_new_prefix(self.namespace_uri().as_deref(), prefix, &local_name)?;

        let mut attr = self.0.borrow_mut();
        match prefix {
            Some(prefix) => {
                attr.prefix = Some(prefix.into());
                attr.name = format!("{prefix}:{local_name}").into();
            }
            None => {
                attr.prefix = None;
                attr.name = local_name;
            }
        }
        Ok(())
    }

    fn local_name(&self) -> Option<Rc<str>> {
        self.0.borrow().local_name.clone()
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        let NodeRef::Attribute(other) = other else {
            return false;
        };
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn lookup_prefix(&self, ns_uri: &str) -> Option<Rc<str>> {
        self.owner_element()?.lookup_prefix(ns_uri)
    }

    fn is_default_namespace(&self, ns_uri: &str) -> bool {
        self.owner_element()
            .is_some_and(|elem| elem.is_default_namespace(ns_uri))
    }

    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<Rc<str>> {
        self.owner_element()?.lookup_namespace_uri(prefix)
    }
}

impl NodeConnection for AttrRef {
    fn set_parent_node(&mut self, _: Option<NodeRef>) -> Option<NodeRef> {
        // Attributes never have parents.
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

impl From<AttrRef> for NodeRef {
    fn from(value: AttrRef) -> Self {
        NodeRef::Attribute(value)
    }
}

/// Wrapper of `Weak<RefCell<Attr>>`.
#[derive(Clone)]
pub struct AttrWeakRef(Weak<RefCell<Attr>>);

impl AttrWeakRef {
    /// Generate [`AttrRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<AttrRef> {
        self.0.upgrade().map(AttrRef)
    }
}
