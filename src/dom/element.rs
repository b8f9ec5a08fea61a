use std::{
    cell::RefCell,
    mem::replace,
    rc::{Rc, Weak},
};

use crate::qname::validate_name;

use super::{
    DOMException, NodeType, XML_NS_NAMESPACE,
    attr::AttrRef,
    check_new_prefix, check_no_modification_allowed_err, check_owner_document_sameness,
    document::{DocumentRef, DocumentWeakRef},
    events::EventListenerMap,
    named_node_map::NamedNodeMap,
    node::{Node, NodeConnection, NodeRef, NodeWeakRef, SourceLocation},
    node_list::NodeList,
};

/// Implementation of [Element](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-745549614)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
pub struct Element {
    /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    /// - `Document`
    /// - `DocumentFragment`
    /// - `EntityReference`
    /// - `Element`
    /// - `Entity`
    parent_node: Option<NodeWeakRef>,
    /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    /// - `Element`
    /// - `Text`
    /// - `Comment`
    /// - `ProcessingInstruction`
    /// - `CDATASection`
    /// - `EntityReference`
    children: NodeList,
    /// Implementation of `attributes` attribute.
    attributes: NamedNodeMap<AttrRef>,
    owner_document: DocumentWeakRef,

    /// Implementation of `tagName` for `Element`.
    /// as same as `nodeName` for `Node`.
    ///
    /// If `local_name` is `Some`, this field represents a QName.
    tag_name: Rc<str>,
    /// Implementation of `namespaceURI` for `Node`.
    namespace_uri: Option<Rc<str>>,
    /// Implementation of `prefix` for `Node`.
    prefix: Option<Rc<str>>,
    /// Implementation of `localName` for `Node`.
    /// `None` if this element was created by a DOM Level 1 method.
    local_name: Option<Rc<str>>,

    listeners: EventListenerMap,
    location: Option<SourceLocation>,
}

/// Wrapper of `Rc<RefCell<Element>>`.
#[derive(Clone)]
pub struct ElementRef(Rc<RefCell<Element>>);

impl ElementRef {
    /// Create new [`ElementRef`].
    ///
    /// The format of `tag_name` must have been validated by the caller.
    pub(super) fn new(doc: &DocumentRef, tag_name: Rc<str>) -> Self {
        Self(Rc::new(RefCell::new(Element {
            parent_node: None,
            children: NodeList::new(),
            attributes: NamedNodeMap::new(),
            owner_document: doc.downgrade(),
            tag_name,
            namespace_uri: None,
            prefix: None,
            local_name: None,
            listeners: EventListenerMap::default(),
            location: None,
        })))
    }

    /// Create new [`ElementRef`] with namespace whose URI is `namespace_uri`.
    ///
    /// The namespace constraints must have been validated by the caller.
    pub(super) fn with_namespace(
        doc: &DocumentRef,
        namespace_uri: Option<Rc<str>>,
        prefix: Option<Rc<str>>,
        local_name: Rc<str>,
    ) -> Self {
        let tag_name = match prefix.as_deref() {
            Some(prefix) => format!("{prefix}:{local_name}").into(),
            None => local_name.clone(),
        };
        let new = Self::new(doc, tag_name);
        {
            let mut elem = new.0.borrow_mut();
            elem.namespace_uri = namespace_uri;
            elem.prefix = prefix;
            elem.local_name = Some(local_name);
        }
        new
    }

    /// Get `tagName` attribute of this element.
    pub fn tag_name(&self) -> Rc<str> {
        self.0.borrow().tag_name.clone()
    }

    /// Generate [`ElementWeakRef`] from `self`.
    pub fn downgrade(&self) -> ElementWeakRef {
        ElementWeakRef(Rc::downgrade(&self.0))
    }

    fn attribute_map(&self) -> NamedNodeMap<AttrRef> {
        self.0.borrow().attributes.clone()
    }

    /// Implementation of [`getAttribute`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-666EE0F9) method.
    ///
    /// # Note
    /// The DOM specification returns an empty string if the attribute is not found,
    /// but this method returns `None` so that an empty value can be distinguished
    /// from a missing attribute.
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.get_attribute_node(name).map(|attr| attr.value())
    }

    /// Implementation of [`setAttribute`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-F68F082) method.
    ///
    /// # Specification
    /// ```text
    /// Adds a new attribute. If an attribute with that name is already present in the
    /// element, its value is changed to be that of the value parameter. This value is
    /// a simple string; it is not parsed as it is being set.
    ///
    /// Exceptions
    ///     DOMException
    ///     INVALID_CHARACTER_ERR:       Raised if the specified name is not an XML name
    ///                                  according to the XML version in use specified in
    ///                                  the Document.xmlVersion attribute.
    ///     NO_MODIFICATION_ALLOWED_ERR: Raised if this node is readonly.
    /// ```
    pub fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;
        if validate_name(name).is_err() {
            return Err(DOMException::InvalidCharacterErr);
        }

        if let Some(mut attr) = self.get_attribute_node(name) {
            return attr.set_value(value);
        }
        let Some(doc) = self.owner_document() else {
            return Err(DOMException::WrongDocumentErr);
        };
        let mut attr = doc.create_attribute(name)?;
        attr.set_value(value)?;
        self.set_attribute_node(attr)?;
        Ok(())
    }

    /// Implementation of [`removeAttribute`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-6D6AC0F9) method.
    ///
    /// If no attribute with this name is found, this method has no effect.
    pub fn remove_attribute(&mut self, name: &str) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;
        if let Ok(mut attr) = self.attribute_map().remove_named_item(name) {
            attr.set_owner_element(None);
        }
        Ok(())
    }

    /// Implementation of [`getAttributeNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-217A91B8) method.
    pub fn get_attribute_node(&self, name: &str) -> Option<AttrRef> {
        self.attribute_map().get_named_item(name)
    }

    /// Implementation of [`setAttributeNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-887236154) method.
    ///
    /// Return the replaced attribute if exists.\
    /// Replacing an attribute node by itself has no effect and returns `None`.
    ///
    /// # Specification
    /// ```text
    /// Adds a new attribute node. If an attribute with that name (nodeName) is already
    /// present in the element, it is replaced by the new one. Replacing an attribute
    /// node by itself has no effect.
    ///
    /// Exceptions
    ///     DOMException
    ///     WRONG_DOCUMENT_ERR:          Raised if newAttr was created from a different
    ///                                  document than the one that created the element.
    ///     NO_MODIFICATION_ALLOWED_ERR: Raised if this node is readonly.
    ///     INUSE_ATTRIBUTE_ERR:         Raised if newAttr is already an attribute of
    ///                                  another Element object. The DOM user must explicitly
    ///                                  clone Attr nodes to re-use them in other elements.
    /// ```
    pub fn set_attribute_node(
        &mut self,
        new_attr: AttrRef,
    ) -> Result<Option<AttrRef>, DOMException> {
        self.attach_attribute(new_attr, false)
    }

    /// Implementation of [`removeAttributeNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-D589198) method.
    ///
    /// # Errors
    /// - If `old_attr` is not an attribute of this element, return `NotFoundErr`.
    pub fn remove_attribute_node(&mut self, mut old_attr: AttrRef) -> Result<AttrRef, DOMException> {
        check_no_modification_allowed_err(self)?;

        let mut attrs = self.attribute_map();
        if attrs.index_of(&old_attr).is_none() {
            return Err(DOMException::NotFoundErr);
        }
        let old: NodeRef = old_attr.clone().into();
        attrs.retain(|attr| !attr.is_same_node(&old));
        old_attr.set_owner_element(None);
        Ok(old_attr)
    }

    /// Implementation of [`getAttributeNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-ElGetAttrNS) method.
    ///
    /// As [`ElementRef::get_attribute`], return `None` if the attribute is not found.
    pub fn get_attribute_ns(&self, namespace_uri: Option<&str>, local_name: &str) -> Option<String> {
        self.get_attribute_node_ns(namespace_uri, local_name)
            .map(|attr| attr.value())
    }

    /// Implementation of [`setAttributeNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-ElSetAttrNS) method.
    ///
    /// # Specification
    /// ```text
    /// Adds a new attribute. If an attribute with the same local name and namespace
    /// URI is already present on the element, its prefix is changed to be the prefix
    /// part of the qualifiedName, and its value is changed to be the value parameter.
    ///
    /// Exceptions
    ///     DOMException
    ///     INVALID_CHARACTER_ERR:       Raised if the specified qualified name is not
    ///                                  an XML name according to the XML version in use
    ///                                  specified in the Document.xmlVersion attribute.
    ///     NO_MODIFICATION_ALLOWED_ERR: Raised if this node is readonly.
    ///     NAMESPACE_ERR:               Raised if the qualifiedName is malformed per the
    ///                                  Namespaces in XML specification, if the
    ///                                  qualifiedName has a prefix and the namespaceURI
    ///                                  is null, if the qualifiedName has a prefix that
    ///                                  is "xml" and the namespaceURI is different from
    ///                                  "http://www.w3.org/XML/1998/namespace", if the
    ///                                  qualifiedName or its prefix is "xmlns" and the
    ///                                  namespaceURI is different from
    ///                                  "http://www.w3.org/2000/xmlns/", or if the
    ///                                  namespaceURI is "http://www.w3.org/2000/xmlns/"
    ///                                  and neither the qualifiedName nor its prefix is
    ///                                  "xmlns".
    /// ```
    pub fn set_attribute_ns(
        &mut self,
        namespace_uri: Option<&str>,
        qualified_name: &str,
        value: &str,
    ) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;

        let Some(doc) = self.owner_document() else {
            return Err(DOMException::WrongDocumentErr);
        };
        // `INVALID_CHARACTER_ERR` and `NAMESPACE_ERR` are checked
        // by `DocumentRef::create_attribute_ns`.
        let attr = doc.create_attribute_ns(namespace_uri, qualified_name, value)?;
        let local_name = attr.local_name().unwrap_or_else(|| attr.name());
        if let Some(mut old) = self.get_attribute_node_ns(namespace_uri, &local_name) {
            old.set_prefix(attr.prefix().as_deref())?;
            return old.set_value(value);
        }
        self.set_attribute_node_ns(attr)?;
        Ok(())
    }

    /// Implementation of [`removeAttributeNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-ElRemAtNS) method.
    ///
    /// If no attribute with this local name and namespace URI is found,
    /// this method has no effect.
    pub fn remove_attribute_ns(
        &mut self,
        namespace_uri: Option<&str>,
        local_name: &str,
    ) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;
        if let Ok(mut attr) = self
            .attribute_map()
            .remove_named_item_ns(namespace_uri, local_name)
        {
            attr.set_owner_element(None);
        }
        Ok(())
    }

    /// Implementation of [`getAttributeNodeNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-ElGetAtNodeNS) method.
    pub fn get_attribute_node_ns(
        &self,
        namespace_uri: Option<&str>,
        local_name: &str,
    ) -> Option<AttrRef> {
        self.attribute_map()
            .get_named_item_ns(namespace_uri, local_name)
    }

    /// Implementation of [`setAttributeNodeNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-ElSetAtNodeNS) method.
    ///
    /// The errors are the same as [`ElementRef::set_attribute_node`].
    pub fn set_attribute_node_ns(
        &mut self,
        new_attr: AttrRef,
    ) -> Result<Option<AttrRef>, DOMException> {
        self.attach_attribute(new_attr, true)
    }

    fn attach_attribute(
        &mut self,
        mut new_attr: AttrRef,
        ns: bool,
    ) -> Result<Option<AttrRef>, DOMException> {
        check_no_modification_allowed_err(self)?;

        if !check_owner_document_sameness(self, &new_attr) {
            return Err(DOMException::WrongDocumentErr);
        }
        if let Some(owner) = new_attr.owner_element() {
            // Replacing an attribute node by itself has no effect.
            if self.is_same_node(&owner.into()) {
                return Ok(None);
            }
            tracing::debug!(attr = %new_attr.name(), "attribute in use by another element");
            return Err(DOMException::InuseAttributeErr);
        }

        let mut attrs = self.attribute_map();
        let old = if ns {
            attrs.set_named_item_ns(new_attr.clone())
        } else {
            attrs.set_named_item(new_attr.clone())
        };
        new_attr.set_owner_element(Some(self.clone()));
        Ok(old.map(|mut old| {
            old.set_owner_element(None);
            old
        }))
    }

    /// Implementation of [`hasAttribute`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-ElHasAttr) method.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute_node(name).is_some()
    }

    /// Implementation of [`hasAttributeNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-ElHasAttrNS) method.
    pub fn has_attribute_ns(&self, namespace_uri: Option<&str>, local_name: &str) -> bool {
        self.get_attribute_node_ns(namespace_uri, local_name)
            .is_some()
    }

    /// Implementation of [`getElementsByTagName`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1938918D) method.
    ///
    /// Unlike the specification, the returned list is not live.
    ///
    /// # Specification
    /// ```text
    /// Returns a NodeList of all descendant Elements with a given tag name, in document order.
    ///
    /// Parameters
    ///     name of type DOMString
    ///         The name of the tag to match on. The special value "*" matches all tags.
    /// ```
    pub fn get_elements_by_tag_name(&self, name: &str) -> Vec<ElementRef> {
        let mut res = vec![];
        collect_elements(&self.clone().into(), &mut res, &|elem| {
            name == "*" || elem.tag_name().as_ref() == name
        });
        res
    }

    /// Implementation of [`getElementsByTagNameNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-A6C90942) method.
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

    /// Implementation of [`lookupNamespacePrefix`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#namespaces-algorithms-lookupNamespacePrefixAlgo)
    fn lookup_namespace_prefix(&self, namespace_uri: &str, orig: &ElementRef) -> Option<Rc<str>> {
        if self.namespace_uri().as_deref() == Some(namespace_uri)
            && self.prefix().is_some()
            && orig
                .lookup_namespace_uri(self.prefix().as_deref())
                .as_deref()
                == Some(namespace_uri)
        {
            return self.prefix();
        }

        for attr in self.attribute_map().to_vec() {
            if attr.prefix().as_deref() == Some("xmlns")
                && attr.value() == namespace_uri
                && orig
                    .lookup_namespace_uri(attr.local_name().as_deref())
                    .as_deref()
                    == Some(namespace_uri)
            {
                return attr.local_name();
            }
        }

        let mut ancestor = self.parent_node();
        while let Some(par) = ancestor {
            ancestor = par.parent_node();
            if let Some(element) = par.as_element() {
                return element.lookup_namespace_prefix(namespace_uri, orig);
            }
        }
        None
    }

    fn default_namespace_declaration(&self) -> Option<AttrRef> {
        self.get_attribute_node_ns(Some(XML_NS_NAMESPACE), "xmlns")
            .or_else(|| self.get_attribute_node("xmlns"))
    }

    fn set_owner_element_of_attributes(&self) {
        for mut attr in self.attribute_map().to_vec() {
            attr.set_owner_element(Some(self.clone()));
        }
    }
}

fn matches_ns(elem: &ElementRef, namespace_uri: Option<&str>, local_name: &str) -> bool {
    (local_name == "*"
        || elem
            .local_name()
            .is_some_and(|ln| ln.as_ref() == local_name))
        && (namespace_uri == Some("*") || elem.namespace_uri().as_deref() == namespace_uri)
}

/// Collect the descendant elements of `root` that satisfy `filter` in document order.
pub(super) fn collect_elements(
    root: &NodeRef,
    res: &mut Vec<ElementRef>,
    filter: &dyn Fn(&ElementRef) -> bool,
) {
    for child in root.child_nodes().to_vec() {
        if let NodeRef::Element(elem) = &child {
            if filter(elem) {
                res.push(elem.clone());
            }
        }
        collect_elements(&child, res, filter);
    }
}

/// Collect the elements of the subtree rooted at `root` that match the namespace
/// and the local name, in document order.
pub(super) fn collect_elements_ns(
    root: &NodeRef,
    namespace_uri: Option<&str>,
    local_name: &str,
) -> Vec<ElementRef> {
    let mut res = vec![];
    collect_elements(root, &mut res, &|elem| {
        matches_ns(elem, namespace_uri, local_name)
    });
    res
}

impl Node for ElementRef {
    fn node_name(&self) -> Rc<str> {
        self.0.borrow().tag_name.clone()
    }

    fn node_type(&self) -> NodeType {
        NodeType::Element
    }

    fn parent_node(&self) -> Option<NodeRef> {
        self.0
            .borrow()
            .parent_node
            .as_ref()
            .and_then(|par| par.upgrade())
    }

    fn attributes(&self) -> Option<NamedNodeMap<AttrRef>> {
        Some(self.attribute_map())
    }

    fn owner_document(&self) -> Option<DocumentRef> {
        self.0.borrow().owner_document.upgrade()
    }

    fn clone_node(&self, deep: bool) -> NodeRef {
        let elem = self.0.borrow();
        let new = ElementRef(Rc::new(RefCell::new(Element {
            parent_node: None,
            children: NodeList::new(),
            attributes: elem
                .attributes
                .deep_clone(|attr| attr.clone_attribute(false)),
            owner_document: elem.owner_document.clone(),
            tag_name: elem.tag_name.clone(),
            namespace_uri: elem.namespace_uri.clone(),
            prefix: elem.prefix.clone(),
            local_name: elem.local_name.clone(),
            listeners: EventListenerMap::default(),
            location: elem.location,
        })));
        new.set_owner_element_of_attributes();

        if deep {
            let children = elem.children.deep_clone(&new.clone().into());
            new.0.borrow_mut().children = children;
        }
        new.into()
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

        let mut elem = self.0.borrow_mut();
        match prefix {
            Some(prefix) => {
                elem.prefix = Some(prefix.into());
                elem.tag_name = format!("{prefix}:{local_name}").into();
            }
            None => {
                elem.prefix = None;
                elem.tag_name = local_name;
            }
        }
        Ok(())
    }

    fn local_name(&self) -> Option<Rc<str>> {
        self.0.borrow().local_name.clone()
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        let NodeRef::Element(other) = other else {
            return false;
        };
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn lookup_prefix(&self, ns_uri: &str) -> Option<Rc<str>> {
        if ns_uri.is_empty() {
            return None;
        }
        self.lookup_namespace_prefix(ns_uri, self)
    }

    fn is_default_namespace(&self, ns_uri: &str) -> bool {
        if self.prefix().is_none() {
            return self
                .namespace_uri()
                .is_some_and(|uri| uri.as_ref() == ns_uri);
        }

        if let Some(attr) = self.default_namespace_declaration() {
            return attr.value() == ns_uri;
        }

        let mut ancestor = self.parent_node();
        while let Some(par) = ancestor {
            ancestor = par.parent_node();
            if let NodeRef::Element(elem) = par {
                return elem.is_default_namespace(ns_uri);
            }
        }
        false
    }

    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<Rc<str>> {
        if self.namespace_uri().is_some() && self.prefix().as_deref() == prefix {
            return self.namespace_uri();
        }

        let decl = match prefix {
            Some(prefix) => self
                .get_attribute_node_ns(Some(XML_NS_NAMESPACE), prefix)
                .filter(|attr| attr.prefix().as_deref() == Some("xmlns"))
                .or_else(|| self.get_attribute_node(&format!("xmlns:{prefix}"))),
            None => self.default_namespace_declaration(),
        };
        if let Some(attr) = decl {
            let value = attr.value();
            return (!value.is_empty()).then(|| value.into());
        }

        let mut par = self.parent_node();
        while let Some(now) = par {
            if let Some(elem) = now.as_element() {
                return elem.lookup_namespace_uri(prefix);
            }
            par = now.parent_node();
        }
        None
    }
}

impl NodeConnection for ElementRef {
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

    /// # Specification
    /// ```text
    /// ELEMENT_NODE
    ///     Specified attribute nodes of the source element are adopted. Default attributes
    ///     are discarded, though if the document being adopted into defines default attributes
    ///     for this element name, those are assigned. The descendants of the source element
    ///     are recursively adopted.
    /// ```
    fn adopted_to(&mut self, new_doc: DocumentRef) {
        self.set_owner_document(new_doc.clone());
        for mut attr in self.attribute_map().to_vec() {
            attr.adopted_to(new_doc.clone());
        }
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

impl From<ElementRef> for NodeRef {
    fn from(value: ElementRef) -> Self {
        NodeRef::Element(value)
    }
}

/// Wrapper of `Weak<RefCell<Element>>`.
#[derive(Clone)]
pub struct ElementWeakRef(Weak<RefCell<Element>>);

impl ElementWeakRef {
    /// Generate [`ElementRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<ElementRef> {
        self.0.upgrade().map(ElementRef)
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::XML_XML_NAMESPACE;

    use super::*;

    fn document() -> (DocumentRef, ElementRef) {
        let doc = DocumentRef::new(Some("urn:root"), Some("r:root"), None).unwrap();
        let root = doc.document_element().unwrap();
        (doc, root)
    }

    #[test]
    fn level1_attributes() {
        let (_doc, mut root) = document();
        assert!(root.get_attribute("a").is_none());
        root.set_attribute("a", "1").unwrap();
        assert_eq!(root.get_attribute("a").as_deref(), Some("1"));
        root.set_attribute("a", "2").unwrap();
        assert_eq!(root.get_attribute("a").as_deref(), Some("2"));
        assert_eq!(root.attributes().unwrap().length(), 1);
        assert!(root.has_attribute("a"));
        assert!(root.has_attributes());
        assert!(matches!(
            root.set_attribute("1a", "x"),
            Err(DOMException::InvalidCharacterErr)
        ));

        root.remove_attribute("a").unwrap();
        root.remove_attribute("a").unwrap();
        assert!(!root.has_attribute("a"));
    }

    #[test]
    fn namespaced_attributes() {
        let (_doc, mut root) = document();
        root.set_attribute_ns(Some("urn:x"), "x:a", "1").unwrap();
        root.set_attribute_ns(Some("urn:x"), "y:a", "2").unwrap();
        let attr = root.get_attribute_node_ns(Some("urn:x"), "a").unwrap();
        assert_eq!(attr.value(), "2");
        assert_eq!(attr.prefix().as_deref(), Some("y"));
        assert_eq!(attr.name().as_ref(), "y:a");
        assert_eq!(root.attributes().unwrap().length(), 1);
        assert!(root.has_attribute_ns(Some("urn:x"), "a"));
        assert_eq!(root.get_attribute_ns(Some("urn:x"), "a").as_deref(), Some("2"));

        assert!(matches!(
            root.set_attribute_ns(Some("urn:x"), "xml:a", "1"),
            Err(DOMException::NamespaceErr)
        ));
        root.set_attribute_ns(Some(XML_XML_NAMESPACE), "xml:lang", "en")
            .unwrap();
        root.remove_attribute_ns(Some("urn:x"), "a").unwrap();
        assert!(attr.owner_element().is_none());
        assert!(!root.has_attribute_ns(Some("urn:x"), "a"));
    }

    #[test]
    fn attribute_nodes() {
        let (doc, mut root) = document();
        let mut other = doc.create_element("other").unwrap();
        let attr = doc.create_attribute("a").unwrap();
        assert!(root.set_attribute_node(attr.clone()).unwrap().is_none());
        assert!(root.set_attribute_node(attr.clone()).unwrap().is_none());
        assert!(
            attr.owner_element()
                .unwrap()
                .is_same_node(&root.clone().into())
        );
        assert!(matches!(
            other.set_attribute_node(attr.clone()),
            Err(DOMException::InuseAttributeErr)
        ));

        let replacing = doc.create_attribute("a").unwrap();
        let replaced = root.set_attribute_node(replacing.clone()).unwrap().unwrap();
        assert!(replaced.is_same_node(&attr.clone().into()));
        assert!(attr.owner_element().is_none());
        other.set_attribute_node(attr.clone()).unwrap();

        let removed = root.remove_attribute_node(replacing.clone()).unwrap();
        assert!(removed.owner_element().is_none());
        assert!(matches!(
            root.remove_attribute_node(replacing),
            Err(DOMException::NotFoundErr)
        ));

        let foreign = DocumentRef::new(None, Some("f"), None).unwrap();
        let foreign_attr = foreign.create_attribute("a").unwrap();
        assert!(matches!(
            root.set_attribute_node(foreign_attr),
            Err(DOMException::WrongDocumentErr)
        ));
    }

    #[test]
    fn elements_by_tag_name() {
        let (doc, mut root) = document();
        let mut a = doc.create_element("a").unwrap();
        let b = doc.create_element_ns(Some("urn:b"), "p:b").unwrap();
        let a2 = doc.create_element("a").unwrap();
        a.append_child(b.clone().into()).unwrap();
        root.append_child(a.clone().into()).unwrap();
        root.append_child(a2.clone().into()).unwrap();

        let found = root.get_elements_by_tag_name("a");
        assert_eq!(found.len(), 2);
        assert!(found[0].is_same_node(&a.clone().into()));
        assert!(found[1].is_same_node(&a2.into()));
        assert_eq!(root.get_elements_by_tag_name("*").len(), 3);
        assert_eq!(root.get_elements_by_tag_name("p:b").len(), 1);
        assert_eq!(root.get_elements_by_tag_name_ns(Some("urn:b"), "b").len(), 1);
        assert_eq!(root.get_elements_by_tag_name_ns(Some("*"), "b").len(), 1);
        assert!(root.get_elements_by_tag_name_ns(None, "b").is_empty());
        assert!(a.get_elements_by_tag_name("a").is_empty());
    }

    #[test]
    fn namespace_lookup() {
        let (doc, mut root) = document();
        root.set_attribute_ns(Some(XML_NS_NAMESPACE), "xmlns:p", "urn:p")
            .unwrap();
        root.set_attribute_ns(Some(XML_NS_NAMESPACE), "xmlns", "urn:default")
            .unwrap();
        let mut child = doc.create_element_ns(Some("urn:p"), "p:child").unwrap();
        let text = doc.create_text_node("t");
        child.append_child(text.clone().into()).unwrap();
        root.append_child(child.clone().into()).unwrap();

        assert_eq!(child.lookup_namespace_uri(Some("p")).as_deref(), Some("urn:p"));
        assert_eq!(child.lookup_namespace_uri(Some("r")).as_deref(), Some("urn:root"));
        assert_eq!(
            text.lookup_namespace_uri(None).as_deref(),
            Some("urn:default")
        );
        assert!(child.lookup_namespace_uri(Some("q")).is_none());
        assert_eq!(child.lookup_prefix("urn:p").as_deref(), Some("p"));
        assert_eq!(root.lookup_prefix("urn:root").as_deref(), Some("r"));
        assert!(child.lookup_prefix("urn:none").is_none());
        assert!(text.is_default_namespace("urn:default"));
        assert!(!root.is_default_namespace("urn:root"));
    }

    #[test]
    fn set_prefix() {
        let (doc, mut root) = document();
        root.set_prefix(Some("s")).unwrap();
        assert_eq!(root.tag_name().as_ref(), "s:root");
        root.set_prefix(None).unwrap();
        assert_eq!(root.node_name().as_ref(), "root");
        assert!(matches!(
            root.set_prefix(Some("xml")),
            Err(DOMException::NamespaceErr)
        ));
        assert!(matches!(
            root.set_prefix(Some("a b")),
            Err(DOMException::InvalidCharacterErr)
        ));

        // level 1 nodes have no prefix
        let mut plain = doc.create_element("plain").unwrap();
        plain.set_prefix(Some("p")).unwrap();
        assert!(plain.prefix().is_none());
    }

    #[test]
    fn clone_copies_attributes() {
        let (doc, mut root) = document();
        root.set_attribute("a", "1").unwrap();
        root.append_child(doc.create_text_node("t").into()).unwrap();

        let shallow = root.clone_node(false).as_element().unwrap();
        assert!(shallow.parent_node().is_none());
        assert!(!shallow.has_child_nodes());
        let attr = shallow.get_attribute_node("a").unwrap();
        assert!(
            attr.owner_element()
                .unwrap()
                .is_same_node(&shallow.clone().into())
        );
        assert!(!attr.is_same_node(&root.get_attribute_node("a").unwrap().into()));

        let deep = root.clone_node(true);
        assert!(deep.is_equal_node(&root.clone().into()));
        root.set_attribute("a", "2").unwrap();
        assert_eq!(shallow.get_attribute("a").as_deref(), Some("1"));
        assert!(!deep.is_equal_node(&root.into()));
    }
}
