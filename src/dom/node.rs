use std::{fmt, rc::Rc};

use super::{
    DOMException, NodeType,
    attr::{AttrRef, AttrWeakRef},
    character_data::{
        CDATASectionRef, CDATASectionWeakRef, CharacterData, CommentRef, CommentWeakRef, TextRef,
        TextWeakRef,
    },
    check_insertion, check_no_modification_allowed_err,
    document::{DocumentRef, DocumentWeakRef},
    document_fragment::{DocumentFragmentRef, DocumentFragmentWeakRef},
    document_type::{DocumentTypeRef, DocumentTypeWeakRef},
    element::{ElementRef, ElementWeakRef},
    entity::{EntityRef, EntityWeakRef},
    entity_reference::{EntityReferenceRef, EntityReferenceWeakRef},
    events::{DOM_NODE_INSERTED, DOM_NODE_REMOVED, EventListenerMap, dispatch_mutation_event},
    named_node_map::NamedNodeMap,
    node_list::NodeList,
    notation::{NotationRef, NotationWeakRef},
    pi::{ProcessingInstructionRef, ProcessingInstructionWeakRef},
};

/// The position in the source text where a node was built.
///
/// The core carries it (and copies it to clones) but never validates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

/// Implementation of [Node](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1950641247)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
///
/// Actual node representations are implemented as `NodeRef` and `NodeWeakRef`.
#[allow(private_bounds)]
pub trait Node: NodeConnection {
    /// Implementation of `nodeName` attribute.
    fn node_name(&self) -> Rc<str>;
    /// Implementation of `nodeValue` attribute.
    fn node_value(&self) -> Option<Rc<str>> {
        None
    }
    /// Implementation of `nodeValue` attribute.
    ///
    /// When `nodeValue` is defined to be null, setting it has no effect.
    fn set_node_value(&mut self, value: &str) -> Result<(), DOMException> {
        let _ = value;
        Ok(())
    }

    /// Implementation of `nodeType` attribute.
    fn node_type(&self) -> NodeType;
    /// Implementation of `parentNode` attribute.
    fn parent_node(&self) -> Option<NodeRef> {
        None
    }
    /// Implementation of `childNodes` attribute.
    ///
    /// The returned list is live.\
    /// If this node cannot have children, the list is always empty.
    fn child_nodes(&self) -> NodeList {
        self.children().unwrap_or_default()
    }
    /// Implementation of `firstChild` attribute.
    fn first_child(&self) -> Option<NodeRef> {
        self.children()?.first()
    }
    /// Implementation of `lastChild` attribute.
    fn last_child(&self) -> Option<NodeRef> {
        self.children()?.last()
    }
    /// Implementation of `previousSibling` attribute.
    fn previous_sibling(&self) -> Option<NodeRef> {
        let siblings = self.parent_node()?.children()?;
        let index = siblings.index_of(&self.clone().into())?;
        siblings.item(index.checked_sub(1)?)
    }
    /// Implementation of `nextSibling` attribute.
    fn next_sibling(&self) -> Option<NodeRef> {
        let siblings = self.parent_node()?.children()?;
        let index = siblings.index_of(&self.clone().into())?;
        siblings.item(index + 1)
    }
    /// Implementation of `attributes` attribute.
    fn attributes(&self) -> Option<NamedNodeMap<AttrRef>> {
        None
    }
    /// Implementation of `ownerDocument` attribute.
    fn owner_document(&self) -> Option<DocumentRef> {
        None
    }

    /// Implementation of [`insertBefore`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-952280727) method.
    ///
    /// If `new_child` and `ref_child` are same nodes,
    /// this method does nothing and return `Ok(new_child)`.
    ///
    /// If the owner document enables events, `DOMNodeRemoved` is dispatched at `new_child`
    /// before it is removed from its old parent, and `DOMNodeInserted` is dispatched
    /// at each inserted node after it is linked.
    ///
    /// # Specification
    /// ```text
    /// Inserts the node newChild before the existing child node refChild.
    /// If refChild is null, insert newChild at the end of the list of children.
    /// If newChild is a DocumentFragment object, all of its children are inserted,
    /// in the same order, before refChild.
    /// If the newChild is already in the tree, it is first removed.
    ///
    /// Note: Inserting a node before itself is implementation dependent.
    ///
    /// Parameters
    ///     newChild of type Node
    ///         The node to insert.
    ///     refChild of type Node
    ///         The reference node, i.e., the node before which the new node must be inserted.
    ///
    /// Return Value
    ///     Node The node being inserted.
    /// ```
    fn insert_before(
        &mut self,
        new_child: NodeRef,
        ref_child: Option<NodeRef>,
    ) -> Result<NodeRef, DOMException> {
        // NO_MODIFICATION_ALLOWED_ERR: Raised if this node is readonly (..snip..)
        check_no_modification_allowed_err(self)?;

        // In this implementation, if `new_child` and `ref_child` are same node,
        // do nothing and return `new_child`.
        if ref_child
            .as_ref()
            .is_some_and(|ref_child| new_child.is_same_node(ref_child))
        {
            return Ok(new_child);
        }

        let parent: NodeRef = self.clone().into();
        check_insertion(&parent, &new_child, None)?;
        // NOT_FOUND_ERR: Raised if refChild is not a child of this node.
        if ref_child.as_ref().is_some_and(|ref_child| {
            ref_child
                .parent_node()
                .is_none_or(|par| !self.is_same_node(&par))
        }) {
            return Err(DOMException::NotFoundErr);
        }

        link_before(&parent, new_child.clone(), ref_child)?;
        Ok(new_child)
    }

    /// Implementation of [`replaceChild`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-785887307) method.
    ///
    /// The replacement is a removal of `old_child` followed by an insertion of `new_child`
    /// at the same position. Therefore, `DOMNodeRemoved` and `DOMNodeInserted` are dispatched
    /// in this order.
    ///
    /// # Specification
    /// ```text
    /// Replaces the child node oldChild with newChild in the list of children,
    /// and returns the oldChild node.
    /// If newChild is a DocumentFragment object, oldChild is replaced by all of
    /// the DocumentFragment children, which are inserted in the same order.
    /// If the newChild is already in the tree, it is first removed.
    ///
    /// Note: Replacing a node with itself is implementation dependent.
    ///
    /// Parameters
    ///     newChild of type Node
    ///         The new node to put in the child list.
    ///     oldChild of type Node
    ///         The node being replaced in the list.
    ///
    /// Return Value
    ///     Node The node replaced.
    /// ```
    fn replace_child(
        &mut self,
        new_child: NodeRef,
        old_child: NodeRef,
    ) -> Result<NodeRef, DOMException> {
        check_no_modification_allowed_err(self)?;

        // In this implementation, if `new_child` and `old_child` are same node,
        // do nothing and return `old_child`.
        if new_child.is_same_node(&old_child) {
            return Ok(old_child);
        }

        let parent: NodeRef = self.clone().into();
        check_insertion(&parent, &new_child, Some(&old_child))?;
        // NOT_FOUND_ERR: Raised if oldChild is not a child of this node.
        if old_child
            .parent_node()
            .is_none_or(|par| !self.is_same_node(&par))
        {
            return Err(DOMException::NotFoundErr);
        }

        let mut next = old_child.next_sibling();
        if next
            .as_ref()
            .is_some_and(|next| next.is_same_node(&new_child))
        {
            next = new_child.next_sibling();
        }
        let mut old = old_child.clone();
        detach(&mut old)?;
        link_before(&parent, new_child, next)?;
        Ok(old_child)
    }

    /// Implementation of [`removeChild`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1734834066) method.
    ///
    /// `DOMNodeRemoved` is dispatched at `old_child` before it is unlinked.
    ///
    /// # Note
    /// The document element of a Document cannot be removed by this method.\
    /// Use [`replace_child`](Node::replace_child) to change it.
    ///
    /// # Specification
    /// ```text
    /// Removes the child node indicated by oldChild from the list of children, and returns it.
    ///
    /// Parameters
    ///     oldChild of type Node
    ///         The node being removed.
    ///
    /// Return Value
    ///     Node The node removed.
    /// ```
    fn remove_child(&mut self, old_child: NodeRef) -> Result<NodeRef, DOMException> {
        check_no_modification_allowed_err(self)?;

        // NOT_FOUND_ERR: Raised if oldChild is not a child of this node.
        if old_child
            .parent_node()
            .is_none_or(|par| !self.is_same_node(&par))
        {
            return Err(DOMException::NotFoundErr);
        }
        if self.node_type() == NodeType::Document && old_child.node_type() == NodeType::Element {
            tracing::debug!(child = %old_child.node_name(), "removal of the document element");
            return Err(DOMException::hierarchy_request(&old_child));
        }

        let mut old = old_child.clone();
        detach(&mut old)?;
        Ok(old_child)
    }

    /// Implementation of [`appendChild`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-184E7107) method.
    ///
    /// # Specification
    /// ```text
    /// Adds the node newChild to the end of the list of children of this node.
    /// If the newChild is already in the tree, it is first removed.
    ///
    /// Parameters
    ///     newChild of type Node
    ///         The node to add.
    ///         If it is a DocumentFragment object, the entire contents of
    ///         the document fragment are moved into the child list of this node
    ///
    /// Return Value
    ///     Node The node added.
    /// ```
    fn append_child(&mut self, new_child: NodeRef) -> Result<NodeRef, DOMException> {
        self.insert_before(new_child, None)
    }

    /// Implementation of `hasChildNodes` method.
    fn has_child_nodes(&self) -> bool {
        self.children().is_some_and(|children| !children.is_empty())
    }

    /// Implementation of [`cloneNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-3A0ED0A4) method.
    ///
    /// The duplicate node has no parent and no event listeners.
    ///
    /// # Specification
    /// ```text
    /// Returns a duplicate of this node, i.e., serves as a generic copy constructor for nodes.
    /// The duplicate node has no parent (parentNode is null) and no user data.
    /// (..snip..)
    /// Cloning an Element copies all attributes and their values,
    /// including those generated by the XML processor to represent defaulted attributes,
    /// but this method does not copy any children it contains unless it is a deep clone.
    /// This includes text contained in an the Element since the text is contained
    /// in a child Text node. Cloning an Attr directly, as opposed to be cloned as part of
    /// an Element cloning operation, returns a specified attribute (specified is true).
    /// Cloning an Attr always clones its children, since they represent its value,
    /// no matter whether this is a deep clone or not.
    /// (..snip..)
    /// Cloning any other type of node simply returns a copy of this node.
    ///
    /// Parameters
    ///     deep of type boolean
    ///         If true, recursively clone the subtree under the specified node;
    ///         if false, clone only the node itself (and its attributes, if it is an Element).
    ///
    /// Return Value
    ///     Node The duplicate node.
    /// ```
    fn clone_node(&self, deep: bool) -> NodeRef;

    /// Implementation of [`normalize`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-normalize) method.
    ///
    /// Every run of adjacent character data leaves (`Text`, `CDATASection` and `Comment`)
    /// is merged into the first leaf of the run, and a leaf whose data is empty is removed
    /// even if it has no adjacent leaf.\
    /// The removals are ordinary removals, so `DOMNodeRemoved` may be dispatched.
    ///
    /// # Specification
    /// ```text
    /// Puts all Text nodes in the full depth of the sub-tree underneath this Node, including
    /// attribute nodes, into a "normal" form where only structure (e.g., elements, comments,
    /// processing instructions, CDATA sections, and entity references) separates Text nodes,
    /// i.e., there are neither adjacent Text nodes nor empty Text nodes.
    /// ```
    fn normalize(&mut self) -> Result<(), DOMException> {
        let Some(children) = self.children() else {
            return Ok(());
        };

        let mut index = 0;
        while let Some(mut child) = children.item(index) {
            let Some(mut data) = character_data_of(&child) else {
                child.normalize()?;
                index += 1;
                continue;
            };
            while let Some(next) = children.item(index + 1) {
                let Some(tail) = character_data_of(&next) else {
                    break;
                };
                append_character_data(&mut child, &tail)?;
                data.push_str(&tail);
                self.remove_child(next)?;
            }
            if data.is_empty() {
                self.remove_child(child)?;
                continue;
            }
            index += 1;
        }

        if let Some(attrs) = self.attributes() {
            for mut attr in attrs.to_vec() {
                attr.normalize()?;
            }
        }
        Ok(())
    }

    /// Implementation of [`namespaceURI`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-NodeNSname) attribute.
    ///
    /// # Specification
    /// ```text
    /// The namespace URI of this node, or null if it is unspecified (see XML Namespaces).
    /// This is not a computed value that is the result of a namespace lookup
    /// based on an examination of the namespace declarations in scope.
    /// It is merely the namespace URI given at creation time.
    /// For nodes of any type other than ELEMENT_NODE and ATTRIBUTE_NODE and
    /// nodes created with a DOM Level 1 method, such as Document.createElement(),
    /// this is always null.
    /// ```
    fn namespace_uri(&self) -> Option<Rc<str>> {
        None
    }

    /// Implementation of [`prefix`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-NodeNSPrefix) attribute.
    fn prefix(&self) -> Option<Rc<str>> {
        None
    }

    /// Implementation of [`prefix`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-NodeNSPrefix) attribute.
    ///
    /// The reserved bindings of `xml` and `xmlns` are checked again before the prefix
    /// is updated.
    ///
    /// # Specification
    /// ```text
    /// The namespace prefix of this node, or null if it is unspecified.
    /// When it is defined to be null, setting it has no effect,
    /// including if the node is read-only.
    /// Note that setting this attribute, when permitted, changes the nodeName attribute,
    /// which holds the qualified name, as well as the tagName and name attributes
    /// of the Element and Attr interfaces, when applicable.
    ///
    /// Exceptions on setting
    ///     DOMException
    ///     INVALID_CHARACTER_ERR:       Raised if the specified prefix contains an illegal
    ///                                  character according to the XML version in use
    ///                                  specified in the Document.xmlVersion attribute.
    ///     NO_MODIFICATION_ALLOWED_ERR: Raised if this node is readonly.
    ///     NAMESPACE_ERR:               Raised if the specified prefix is malformed per the
    ///                                  Namespaces in XML specification, if the namespaceURI
    ///                                  of this node is null, if the specified prefix is "xml"
    ///                                  and the namespaceURI of this node is different from
    ///                                  "http://www.w3.org/XML/1998/namespace", if this node
    ///                                  is an attribute and the specified prefix is "xmlns"
    ///                                  and the namespaceURI of this node is different from
    ///                                  "http://www.w3.org/2000/xmlns/", or if this node is
    ///                                  an attribute and the qualifiedName of this node is
    ///                                  "xmlns" [XML Namespaces].
    /// ```
    fn set_prefix(&mut self, prefix: Option<&str>) -> Result<(), DOMException> {
        let _ = prefix;
        Ok(())
    }

    /// Implementation of [`localName`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-NodeNSLocalN) attribute.
    fn local_name(&self) -> Option<Rc<str>> {
        None
    }

    /// Implementation of [`hasAttributes`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-NodeHasAttrs) method.
    fn has_attributes(&self) -> bool {
        self.attributes().is_some_and(|attr| !attr.is_empty())
    }

    /// Implementation of [`textContent`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Node3-textContent) attribute.
    ///
    /// # Specification
    /// ```text
    /// This attribute returns the text content of this node and its descendants.
    /// (..snip..)
    /// On getting, no serialization is performed, the returned string does not contain any
    /// markup.
    /// ```
    fn text_content(&self) -> Option<String> {
        let mut res = String::new();
        for child in self.child_nodes().to_vec() {
            match child {
                NodeRef::Comment(_) | NodeRef::ProcessingInstruction(_) => {}
                child => {
                    if let Some(value) = child.text_content() {
                        res.push_str(&value);
                    }
                }
            }
        }
        Some(res)
    }

    /// Implementation of [`textContent`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Node3-textContent) attribute.
    ///
    /// # Specification
    /// ```text
    /// On setting, any possible children this node may have are removed and,
    /// if it the new string is not empty or null, replaced by a single Text node
    /// containing the string this attribute is set to.
    ///
    /// Exceptions on setting
    ///     DOMException
    ///     NO_MODIFICATION_ALLOWED_ERR: Raised when the node is readonly.
    /// ```
    fn set_text_content(&mut self, text: &str) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;
        for child in self.child_nodes().to_vec() {
            self.remove_child(child)?;
        }
        if !text.is_empty() {
            if let Some(doc) = self.owner_document() {
                self.append_child(doc.create_text_node(text).into())?;
            }
        }
        Ok(())
    }

    /// Implementation of [`isSameNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Node3-isSameNode) method.
    ///
    /// # Specification
    /// ```text
    /// Returns whether this node is the same node as the given one.
    /// ```
    fn is_same_node(&self, other: &NodeRef) -> bool;

    /// Implementation of [`lookupPrefix`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Node3-lookupNamespacePrefix) method.
    ///
    /// The implementation was based on
    /// [Appendix B.2 Namespace Prefix Lookup](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#namespaces-algorithms-lookupNamespacePrefixAlgo).
    fn lookup_prefix(&self, ns_uri: &str) -> Option<Rc<str>> {
        let mut ancestor = self.parent_node();
        while let Some(par) = ancestor {
            ancestor = par.parent_node();
            if let NodeRef::Element(elem) = par {
                return elem.lookup_prefix(ns_uri);
            }
        }
        None
    }

    /// Implementation of [`isDefaultNamespace`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Node3-isDefaultNamespace) method.
    ///
    /// The implementation was based on
    /// [Appendix B.3 Default Namespace Lookup](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#namespaces-algorithms-isDefaultNamespaceAlgo).
    fn is_default_namespace(&self, ns_uri: &str) -> bool {
        let mut ancestor = self.parent_node();
        while let Some(par) = ancestor {
            ancestor = par.parent_node();
            if let NodeRef::Element(elem) = par {
                return elem.is_default_namespace(ns_uri);
            }
        }
        false
    }

    /// Implementation of [`lookupNamespaceURI`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Node3-lookupNamespaceURI) method.
    ///
    /// The implementation was based on
    /// [Appendix B.4 Namespace URI Lookup](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#namespaces-algorithms-lookupNamespaceURIAlgo).
    ///
    /// # Specification
    /// ```text
    /// Look up the namespace URI associated to the given prefix, starting from this node.
    ///
    /// Parameters
    ///     prefix of type DOMString
    ///         The prefix to look for. If this parameter is null, the method will return
    ///         the default namespace URI if any.
    /// ```
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<Rc<str>> {
        let mut ancestor = self.parent_node();
        while let Some(par) = ancestor {
            ancestor = par.parent_node();
            if let NodeRef::Element(elem) = par {
                return elem.lookup_namespace_uri(prefix);
            }
        }
        None
    }

    /// Implementation of [`isEqualNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Node3-isEqualNode) method.
    ///
    /// # Note
    /// Normalization can affect equality, but this method does not normalize nodes.\
    /// If need, the caller should normalize nodes before calling this method.
    ///
    /// # Specification
    /// ```text
    /// Tests whether two nodes are equal.
    /// (..snip..)
    /// Two nodes are equal if and only if the following conditions are satisfied:
    ///
    /// - The two nodes are of the same type.
    /// - The following string attributes are equal: nodeName, localName, namespaceURI,
    ///   prefix, nodeValue.
    /// - The attributes NamedNodeMaps are equal.
    /// - The childNodes NodeLists are equal.
    /// ```
    fn is_equal_node(&self, arg: &NodeRef) -> bool {
        if self.is_same_node(arg) {
            return true;
        }
        if self.node_type() != arg.node_type()
            || self.node_name() != arg.node_name()
            || self.local_name() != arg.local_name()
            || self.namespace_uri() != arg.namespace_uri()
            || self.prefix() != arg.prefix()
            || self.node_value() != arg.node_value()
        {
            return false;
        }

        match (self.attributes(), arg.attributes()) {
            (Some(lattrs), Some(rattrs)) => {
                if lattrs.length() != rattrs.length() {
                    return false;
                }

                // Simply scanning and deleting.
                // Not efficient, but probably sufficient.
                let mut r = rattrs.to_vec();
                for attr in lattrs.to_vec() {
                    let attr = NodeRef::Attribute(attr);
                    let Some(pos) = r.iter().position(|r| r.is_equal_node(&attr)) else {
                        return false;
                    };
                    r.swap_remove(pos);
                }
            }
            (None, None) => {}
            _ => return false,
        }

        let lch = self.child_nodes().to_vec();
        let rch = arg.child_nodes().to_vec();
        lch.len() == rch.len() && lch.into_iter().zip(rch).all(|(l, r)| l.is_equal_node(&r))
    }

    /// Check if this node is read-only.
    ///
    /// The descendants of `EntityReference` and `Entity` are read-only.\
    /// Modifications of read-only nodes are rejected only if the owner document enables
    /// the read-only check.
    fn is_read_only(&self) -> bool {
        let mut node = Some(<Self as Into<NodeRef>>::into(self.clone()));
        while let Some(cur) = node {
            if matches!(
                cur.node_type(),
                NodeType::EntityReference | NodeType::Entity
            ) {
                return true;
            }
            node = cur.parent_node();
        }
        false
    }

    /// Return the location in the source text where this node was built.
    fn source_location(&self) -> Option<SourceLocation> {
        self.location()
    }

    /// Record the location in the source text where this node was built.
    fn set_source_location(&mut self, location: SourceLocation) {
        self.set_location(Some(location));
    }
}

/// A set of operations that change the adjacency of nodes.
///
/// None of these methods are exposed to the user
/// because they may cause inconsistencies in the tree constraints.
///
/// These method does not check the tree constraints.\
/// It is the responsibility of the user to maintain tree constraints.
pub(super) trait NodeConnection: Clone + Into<NodeRef> {
    /// Set new parent node.\
    /// Return old parent node if exists.
    fn set_parent_node(&mut self, new_parent: Option<NodeRef>) -> Option<NodeRef>;
    /// Return the storage of children.\
    /// If this node cannot have children, return `None`.
    fn children(&self) -> Option<NodeList> {
        None
    }
    /// Set new owner Document node.\
    /// Return old owner Document node if exists.
    fn set_owner_document(&mut self, new_doc: DocumentRef) -> Option<DocumentRef>;
    /// Replace ownerDocument of self and all nodes of the subtree.
    ///
    /// The ownerDocument of siblings and ancestors must not be changed.
    fn adopted_to(&mut self, new_doc: DocumentRef);
    /// Return the listener registry of this node.
    fn event_listeners(&self) -> EventListenerMap;
    fn location(&self) -> Option<SourceLocation>;
    fn set_location(&mut self, location: Option<SourceLocation>);
}

/// Return the data of `node` if it is a character data leaf.
fn character_data_of(node: &NodeRef) -> Option<String> {
    match node {
        NodeRef::Text(text) => Some(text.data()),
        NodeRef::CDATASection(cdata) => Some(cdata.data()),
        NodeRef::Comment(comment) => Some(comment.data()),
        _ => None,
    }
}

fn append_character_data(node: &mut NodeRef, data: &str) -> Result<(), DOMException> {
    match node {
        NodeRef::Text(text) => text.append_data(data),
        NodeRef::CDATASection(cdata) => cdata.append_data(data),
        NodeRef::Comment(comment) => comment.append_data(data),
        _ => Ok(()),
    }
}

/// Remove `node` from its parent.
///
/// `DOMNodeRemoved` is dispatched at `node` before it is unlinked.\
/// Return the old parent if exists.
pub(super) fn detach(node: &mut NodeRef) -> Result<Option<NodeRef>, DOMException> {
    let Some(parent) = node.parent_node() else {
        return Ok(None);
    };
    dispatch_mutation_event(node, DOM_NODE_REMOVED, &parent)?;

    // A listener may have moved `node`.
    let Some(parent) = node.parent_node() else {
        return Ok(None);
    };
    if let Some(children) = parent.children() {
        if let Some(index) = children.index_of(node) {
            children.remove(index);
        }
    }
    node.set_parent_node(None);
    Ok(Some(parent))
}

/// Link `new_child` (or all children of `new_child` if it is a `DocumentFragment`)
/// to `parent` before `ref_child`.
///
/// The constraints of the tree must have been checked by the caller.
fn link_before(
    parent: &NodeRef,
    new_child: NodeRef,
    ref_child: Option<NodeRef>,
) -> Result<(), DOMException> {
    let Some(children) = parent.children() else {
        return Err(DOMException::hierarchy_request(&new_child));
    };
    let nodes = match &new_child {
        NodeRef::DocumentFragment(frag) => frag.child_nodes().to_vec(),
        other => vec![other.clone()],
    };

    for mut node in nodes {
        detach(&mut node)?;
        let index = match &ref_child {
            Some(ref_child) => children
                .index_of(ref_child)
                .ok_or(DOMException::NotFoundErr)?,
            None => children.length(),
        };
        if let (NodeRef::Document(doc), NodeRef::DocumentType(doctype)) = (parent, &mut node) {
            if doctype.owner_document().is_none() {
                doctype.adopted_to(doc.clone());
            }
        }
        children.insert(index, node.clone());
        node.set_parent_node(Some(parent.clone()));
        dispatch_mutation_event(&node, DOM_NODE_INSERTED, parent)?;
    }
    Ok(())
}

/// Implementation of [Node](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1950641247)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
#[derive(Clone)]
pub enum NodeRef {
    Element(ElementRef),
    Attribute(AttrRef),
    Text(TextRef),
    CDATASection(CDATASectionRef),
    EntityReference(EntityReferenceRef),
    Entity(EntityRef),
    ProcessingInstruction(ProcessingInstructionRef),
    Comment(CommentRef),
    Document(DocumentRef),
    DocumentType(DocumentTypeRef),
    DocumentFragment(DocumentFragmentRef),
    Notation(NotationRef),
}

impl NodeRef {
    /// Generate [`NodeWeakRef`] from `self`.
    pub fn downgrade(&self) -> NodeWeakRef {
        use NodeRef::*;
        match self {
            Element(node) => NodeWeakRef::Element(node.downgrade()),
            Attribute(node) => NodeWeakRef::Attribute(node.downgrade()),
            Text(node) => NodeWeakRef::Text(node.downgrade()),
            CDATASection(node) => NodeWeakRef::CDATASection(node.downgrade()),
            EntityReference(node) => NodeWeakRef::EntityReference(node.downgrade()),
            Entity(node) => NodeWeakRef::Entity(node.downgrade()),
            ProcessingInstruction(node) => NodeWeakRef::ProcessingInstruction(node.downgrade()),
            Comment(node) => NodeWeakRef::Comment(node.downgrade()),
            Document(node) => NodeWeakRef::Document(node.downgrade()),
            DocumentType(node) => NodeWeakRef::DocumentType(node.downgrade()),
            DocumentFragment(node) => NodeWeakRef::DocumentFragment(node.downgrade()),
            Notation(node) => NodeWeakRef::Notation(node.downgrade()),
        }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("node_type", &self.node_type())
            .field("node_name", &self.node_name())
            .finish()
    }
}

macro_rules! impl_node_trait_to_noderef {
    (
        $(
            fn $( ($mut:tt) )? $fn:ident($( $arg_name:ident : $arg_type:ty ),*) -> $ret:ty
        ),*
    ) => {
        impl Node for NodeRef {
            $(
                fn $fn(& $( $mut )? self, $( $arg_name: $arg_type),* ) -> $ret {
                    match self {
                        NodeRef::Element(elem) => elem.$fn( $( $arg_name ),* ),
                        NodeRef::Attribute(attr) => attr.$fn( $( $arg_name ),* ),
                        NodeRef::Text(text) => text.$fn( $( $arg_name ),* ),
                        NodeRef::CDATASection(cdata) => cdata.$fn( $( $arg_name ),* ),
                        NodeRef::EntityReference(entref) => entref.$fn( $( $arg_name ),* ),
                        NodeRef::Entity(ent) => ent.$fn( $( $arg_name ),* ),
                        NodeRef::ProcessingInstruction(pi) => pi.$fn( $( $arg_name ),* ),
                        NodeRef::Comment(comment) => comment.$fn( $( $arg_name ),* ),
                        NodeRef::Document(doc) => doc.$fn( $( $arg_name ),* ),
                        NodeRef::DocumentType(doctype) => doctype.$fn( $( $arg_name ),* ),
                        NodeRef::DocumentFragment(frag) => frag.$fn( $( $arg_name ),* ),
                        NodeRef::Notation(nota) => nota.$fn( $( $arg_name ),* ),
                    }
                }
            )*
        }
    };
}

impl_node_trait_to_noderef! {
    fn node_name() -> Rc<str>,
    fn node_value() -> Option<Rc<str>>,
    fn (mut) set_node_value(value: &str) -> Result<(), DOMException>,
    fn node_type() -> NodeType,
    fn parent_node() -> Option<NodeRef>,
    fn attributes() -> Option<NamedNodeMap<AttrRef>>,
    fn owner_document() -> Option<DocumentRef>,
    fn clone_node(deep: bool) -> NodeRef,
    fn (mut) normalize() -> Result<(), DOMException>,
    fn namespace_uri() -> Option<Rc<str>>,
    fn prefix() -> Option<Rc<str>>,
    fn (mut) set_prefix(prefix: Option<&str>) -> Result<(), DOMException>,
    fn local_name() -> Option<Rc<str>>,
    fn text_content() -> Option<String>,
    fn (mut) set_text_content(text: &str) -> Result<(), DOMException>,
    fn is_same_node(other: &NodeRef) -> bool,
    fn lookup_prefix(ns_uri: &str) -> Option<Rc<str>>,
    fn is_default_namespace(ns_uri: &str) -> bool,
    fn lookup_namespace_uri(prefix: Option<&str>) -> Option<Rc<str>>
}

macro_rules! impl_node_connection_to_noderef {
    (
        $(
            fn $( ($mut:tt) )? $fn:ident($( $arg_name:ident : $arg_type:ty ),*) -> $ret:ty
        ),*
    ) => {
        impl NodeConnection for NodeRef {
            $(
                fn $fn(& $( $mut )? self, $( $arg_name: $arg_type),* ) -> $ret {
                    match self {
                        NodeRef::Element(elem) => elem.$fn( $( $arg_name ),* ),
                        NodeRef::Attribute(attr) => attr.$fn( $( $arg_name ),* ),
                        NodeRef::Text(text) => text.$fn( $( $arg_name ),* ),
                        NodeRef::CDATASection(cdata) => cdata.$fn( $( $arg_name ),* ),
                        NodeRef::EntityReference(entref) => entref.$fn( $( $arg_name ),* ),
                        NodeRef::Entity(ent) => ent.$fn( $( $arg_name ),* ),
                        NodeRef::ProcessingInstruction(pi) => pi.$fn( $( $arg_name ),* ),
                        NodeRef::Comment(comment) => comment.$fn( $( $arg_name ),* ),
                        NodeRef::Document(doc) => doc.$fn( $( $arg_name ),* ),
                        NodeRef::DocumentType(doctype) => doctype.$fn( $( $arg_name ),* ),
                        NodeRef::DocumentFragment(frag) => frag.$fn( $( $arg_name ),* ),
                        NodeRef::Notation(nota) => nota.$fn( $( $arg_name ),* ),
                    }
                }
            )*
        }
    };
}

impl_node_connection_to_noderef! {
    fn (mut) set_parent_node(new_parent: Option<NodeRef>) -> Option<NodeRef>,
    fn children() -> Option<NodeList>,
    fn (mut) set_owner_document(new_doc: DocumentRef) -> Option<DocumentRef>,
    fn (mut) adopted_to(new_doc: DocumentRef) -> (),
    fn event_listeners() -> EventListenerMap,
    fn location() -> Option<SourceLocation>,
    fn (mut) set_location(location: Option<SourceLocation>) -> ()
}

macro_rules! impl_node_conversion {
    ( $( ( $fn:ident, $var:ident, $t:ty ) ),* ) => {
        impl NodeRef {
            $(
                pub fn $fn (&self) -> Option<$t> {
                    match self {
                        NodeRef:: $var (node) => Some(node.clone()),
                        _ => None
                    }
                }
            )*
        }
    };
}

impl_node_conversion! {
    ( as_element, Element, ElementRef ),
    ( as_attribute, Attribute, AttrRef ),
    ( as_text_node, Text, TextRef ),
    ( as_cdata_section, CDATASection, CDATASectionRef ),
    ( as_entity_reference, EntityReference, EntityReferenceRef ),
    ( as_entity, Entity, EntityRef ),
    ( as_processing_instruction, ProcessingInstruction, ProcessingInstructionRef ),
    ( as_comment, Comment, CommentRef ),
    ( as_document, Document, DocumentRef ),
    ( as_document_type, DocumentType, DocumentTypeRef ),
    ( as_document_fragment, DocumentFragment, DocumentFragmentRef ),
    ( as_notation, Notation, NotationRef )
}

/// Implementation of [Node](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1950641247)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
#[derive(Clone)]
pub enum NodeWeakRef {
    Element(ElementWeakRef),
    Attribute(AttrWeakRef),
    Text(TextWeakRef),
    CDATASection(CDATASectionWeakRef),
    EntityReference(EntityReferenceWeakRef),
    Entity(EntityWeakRef),
    ProcessingInstruction(ProcessingInstructionWeakRef),
    Comment(CommentWeakRef),
    Document(DocumentWeakRef),
    DocumentType(DocumentTypeWeakRef),
    DocumentFragment(DocumentFragmentWeakRef),
    Notation(NotationWeakRef),
}

impl NodeWeakRef {
    /// Generate [`NodeRef`] from `self`.\
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<NodeRef> {
        match self {
            NodeWeakRef::Element(node) => node.upgrade().map(NodeRef::Element),
            NodeWeakRef::Attribute(node) => node.upgrade().map(NodeRef::Attribute),
            NodeWeakRef::Text(node) => node.upgrade().map(NodeRef::Text),
            NodeWeakRef::CDATASection(node) => node.upgrade().map(NodeRef::CDATASection),
            NodeWeakRef::EntityReference(node) => node.upgrade().map(NodeRef::EntityReference),
            NodeWeakRef::Entity(node) => node.upgrade().map(NodeRef::Entity),
            NodeWeakRef::ProcessingInstruction(node) => {
                node.upgrade().map(NodeRef::ProcessingInstruction)
            }
            NodeWeakRef::Comment(node) => node.upgrade().map(NodeRef::Comment),
            NodeWeakRef::Document(node) => node.upgrade().map(NodeRef::Document),
            NodeWeakRef::DocumentType(node) => node.upgrade().map(NodeRef::DocumentType),
            NodeWeakRef::DocumentFragment(node) => node.upgrade().map(NodeRef::DocumentFragment),
            NodeWeakRef::Notation(node) => node.upgrade().map(NodeRef::Notation),
        }
    }
}
