//! Implement [Document Object Model (DOM) Level 3 Core](https://www.w3.org/TR/DOM-Level-3-Core/)
//! and the event flow of [DOM Level 2 Events](https://www.w3.org/TR/DOM-Level-2-Events/).
//!
//! Currently, full implementation of the specification is not a goal.\
//! For example, there is no feature selection mechanism, and the operations that need
//! a `DOMConfiguration` or renaming support return [`DOMException::NotSupportedErr`].
//!
//! # Note
//! - Each node is a shared handle (`XxxRef`) over reference-counted storage.
//!   Children are owned by their parent, and parents and owner documents are referenced
//!   weakly. Dropping the last handle of a [`Document`](document::Document) releases the
//!   whole tree.
//! - The iterators that walk through the nodes of the DOM are not implemented.\
//!   Nodes are not restricted to only one source, and each node can modify the whole DOM tree.
//!   Therefore, it is impossible to implement iterators that is not invalidated.

use std::rc::Rc;

use events::EventException;
use node::{Node, NodeRef};

use crate::qname::{split_qname2, validate_name, validate_ncname, validate_qname};

pub mod attr;
pub mod character_data;
pub mod document;
pub mod document_fragment;
pub mod document_type;
pub mod element;
pub mod entity;
pub mod entity_reference;
pub mod events;
pub mod named_node_map;
pub mod node;
pub mod node_list;
pub mod notation;
pub mod pi;

/// This is the namespace for the special xml: prefix predefined in the
/// XML Namespace specification.
pub const XML_XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// This is the namespace bound to the `xmlns` prefix and the `xmlns` attribute.
pub const XML_NS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Implementation of [DOMException](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-17189187)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
///
/// Although named “Exception”, it is an ordinary error value.\
/// Only the codes this implementation can raise are provided.
/// [`DOMException::code`] returns the numeric code defined by the specification.
#[derive(Debug, thiserror::Error)]
pub enum DOMException {
    /// If index or size is negative, or greater than the allowed value.
    #[error("index or size is negative, or greater than the allowed value")]
    IndexSizeErr,
    /// If any Node is inserted somewhere it doesn't belong.
    #[error("the node '{name}' cannot be inserted at this position")]
    HierarchyRequestErr { name: String },
    /// If a Node is used in a different document than the one that created it
    /// (that doesn't support it).
    #[error("the node is used in a different document than the one that created it")]
    WrongDocumentErr,
    /// If an invalid or illegal character is specified, such as in an XML name.
    #[error("an invalid or illegal character is specified")]
    InvalidCharacterErr,
    /// If an attempt is made to modify an object where modifications are not allowed.
    #[error("the node is read-only")]
    NoModificationAllowedErr,
    /// If an attempt is made to reference a Node in a context where it does not exist.
    #[error("the node does not exist in this context")]
    NotFoundErr,
    /// If the implementation does not support the requested type of object or operation.
    #[error("the operation is not supported")]
    NotSupportedErr,
    /// If an attempt is made to add an attribute that is already in use elsewhere.
    #[error("the attribute is already in use by another element")]
    InuseAttributeErr,
    /// If an attempt is made to create or change an object in a way which is incorrect with
    /// regard to namespaces.
    #[error("the operation is incorrect with regard to namespaces")]
    NamespaceErr,
    /// A structural event dispatched by a mutation failed.
    #[error(transparent)]
    EventErr(#[from] EventException),
}

impl DOMException {
    /// Return the `ExceptionCode` of this error.
    ///
    /// For [`DOMException::EventErr`], return the code of `EventException`.
    pub fn code(&self) -> u16 {
        match self {
            Self::IndexSizeErr => 1,
            Self::HierarchyRequestErr { .. } => 3,
            Self::WrongDocumentErr => 4,
            Self::InvalidCharacterErr => 5,
            Self::NoModificationAllowedErr => 7,
            Self::NotFoundErr => 8,
            Self::NotSupportedErr => 9,
            Self::InuseAttributeErr => 10,
            Self::NamespaceErr => 14,
            Self::EventErr(err) => err.code(),
        }
    }

    pub(crate) fn hierarchy_request(node: &impl Node) -> Self {
        Self::HierarchyRequestErr {
            name: node.node_name().to_string(),
        }
    }
}

/// Constants `NodeType` in [Interface Node](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1950641247).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CDATASection = 4,
    EntityReference = 5,
    Entity = 6,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
    Notation = 12,
}

/// Return `true` if `parent` and `child` are allowed to be parent and child.\
/// Otherwise, return `false`.
///
/// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
///
/// | NodeType              | Description                                                                               |
/// | :-------------------- | :---------------------------------------------------------------------------------------- |
/// | Document              | Element (maximum of one), ProcessingInstruction, Comment, DocumentType (maximum of one)   |
/// | DocumentFragment      | Element, ProcessingInstruction, Comment, Text, CDATASection, EntityReference              |
/// | DocumentType          | no children                                                                               |
/// | EntityReference       | Element, ProcessingInstruction, Comment, Text, CDATASection, EntityReference              |
/// | Element               | Element, ProcessingInstruction, Comment, Text, CDATASection, EntityReference              |
/// | Attr                  | Text, EntityReference                                                                     |
/// | ProcessingInstruction | no children                                                                               |
/// | Comment               | no children                                                                               |
/// | Text                  | no children                                                                               |
/// | CDATASection          | no children                                                                               |
/// | Entity                | Element, ProcessingInstruction, Comment, Text, CDATASection, EntityReference              |
/// | Notation              | no children                                                                               |
pub fn check_vertical_hierarchy(parent: NodeType, child: NodeType) -> bool {
    use NodeType::*;
    match parent {
        Element | DocumentFragment | EntityReference | Entity => matches!(
            child,
            Element | Text | Comment | ProcessingInstruction | CDATASection | EntityReference
        ),
        Attribute => matches!(child, Text | EntityReference),
        Document => matches!(
            child,
            Element | ProcessingInstruction | Comment | DocumentType
        ),
        _ => false,
    }
}

/// Check if the nodes belong to the same document or not.
///
/// A `DocumentType` that does not belong to any document yet is accepted by every document.
fn check_owner_document_sameness(l: &impl Node, r: &impl Node) -> bool {
    match (l.node_type(), r.node_type()) {
        (NodeType::DocumentType, NodeType::DocumentType) => {
            let ldoc = l.owner_document();
            let rdoc = r.owner_document();
            ldoc.is_some() == rdoc.is_some()
                && ldoc
                    .zip(rdoc)
                    .is_none_or(|(l, r)| l.is_same_node(&r.into()))
        }
        (NodeType::DocumentType, _) if l.owner_document().is_none() => true,
        (_, NodeType::DocumentType) if r.owner_document().is_none() => true,
        (NodeType::Document, NodeType::Document) => l.is_same_node(&r.clone().into()),
        (NodeType::Document, _) => r
            .owner_document()
            .is_some_and(|doc| l.is_same_node(&NodeRef::Document(doc))),
        (_, NodeType::Document) => l
            .owner_document()
            .is_some_and(|doc| r.is_same_node(&NodeRef::Document(doc))),
        _ => l
            .owner_document()
            .zip(r.owner_document())
            .is_some_and(|(l, r)| l.is_same_node(&NodeRef::Document(r))),
    }
}

fn check_no_modification_allowed_err(node: &impl Node) -> Result<(), DOMException> {
    if node.is_read_only()
        && node
            .owner_document()
            .is_some_and(|doc| doc.is_enabled_read_only_check())
    {
        Err(DOMException::NoModificationAllowedErr)
    } else {
        Ok(())
    }
}

/// Check whether `new_child` may be inserted into `parent`.
///
/// If `replaced` is `Some`, it is the child which will be removed by the same operation
/// and is not counted by the uniqueness check of `Document`.
fn check_insertion(
    parent: &NodeRef,
    new_child: &NodeRef,
    replaced: Option<&NodeRef>,
) -> Result<(), DOMException> {
    // HIERARCHY_REQUEST_ERR: Raised if this node is of a type that does not allow children
    // of the type of the newChild node (..snip)
    let inserted = match new_child {
        NodeRef::DocumentFragment(frag) => frag.child_nodes().to_vec(),
        other => vec![other.clone()],
    };
    if let Some(rejected) = inserted
        .iter()
        .find(|node| !check_vertical_hierarchy(parent.node_type(), node.node_type()))
    {
        tracing::debug!(
            parent = %parent.node_name(),
            child = %rejected.node_name(),
            "rejected by the hierarchy table"
        );
        return Err(DOMException::hierarchy_request(rejected));
    }

    // WRONG_DOCUMENT_ERR: Raised if newChild was created from a different document
    // than the one that created this node.
    if !check_owner_document_sameness(parent, new_child) {
        return Err(DOMException::WrongDocumentErr);
    }

    // HIERARCHY_REQUEST_ERR: Raised if (..snip..) the node to insert is
    // one of this node's ancestors or this node itself, (..snip..)
    let mut ancestor = Some(parent.clone());
    while let Some(cur) = ancestor {
        if new_child.is_same_node(&cur) {
            return Err(DOMException::hierarchy_request(new_child));
        }
        ancestor = cur.parent_node();
    }

    // The document element may be moved within its document or replaced by another
    // element, but never taken out of the document.
    if new_child.node_type() == NodeType::Element {
        if let Some(old_parent) = new_child.parent_node() {
            if old_parent.node_type() == NodeType::Document && !old_parent.is_same_node(parent) {
                tracing::debug!(child = %new_child.node_name(), "move of the document element");
                return Err(DOMException::hierarchy_request(new_child));
            }
        }
    }
    if let Some(old) = replaced.filter(|old| {
        parent.node_type() == NodeType::Document
            && old.node_type() == NodeType::Element
            && old.parent_node().is_some_and(|par| par.is_same_node(parent))
    }) {
        if !inserted
            .iter()
            .any(|node| node.node_type() == NodeType::Element)
        {
            tracing::debug!(child = %old.node_name(), "replacement of the document element");
            return Err(DOMException::hierarchy_request(old));
        }
    }

    // HIERARCHY_REQUEST_ERR: Raised if (..snip..) this node is of type Document
    // and the DOM application attempts to insert a second DocumentType or Element node.
    if parent.node_type() == NodeType::Document {
        for ty in [NodeType::Element, NodeType::DocumentType] {
            let incoming = inserted.iter().filter(|node| node.node_type() == ty).count();
            if incoming == 0 {
                continue;
            }
            let existing = parent
                .child_nodes()
                .to_vec()
                .into_iter()
                .filter(|child| child.node_type() == ty)
                .filter(|child| !new_child.is_same_node(child))
                .filter(|child| replaced.is_none_or(|old| !old.is_same_node(child)))
                .count();
            if existing + incoming > 1 {
                tracing::debug!(child = %new_child.node_name(), "second {ty:?} of a document");
                return Err(DOMException::hierarchy_request(new_child));
            }
        }
    }

    Ok(())
}

/// Validate `qname` as a qualified name bound to `ns_uri`,
/// and return its prefix and local part.
///
/// # Errors
/// - `qname` is not an XML name: `InvalidCharacterErr`
/// - `qname` is a malformed QName, or violates the reserved `xml`/`xmlns` bindings:
///   `NamespaceErr`
pub(crate) fn resolve_qname(
    ns_uri: Option<&str>,
    qname: &str,
) -> Result<(Option<Rc<str>>, Rc<str>), DOMException> {
    if validate_name(qname).is_err() {
        return Err(DOMException::InvalidCharacterErr);
    }
    if validate_qname(qname).is_err() {
        return Err(DOMException::NamespaceErr);
    }
    let (prefix, local_name) = match split_qname2(qname) {
        Some((prefix, local_name)) => (Some(prefix), local_name),
        None => (None, qname),
    };
    check_prefix_binding(ns_uri, prefix, local_name)?;
    Ok((prefix.map(Rc::from), local_name.into()))
}

/// Validate a new `prefix` for a node whose namespace URI is `ns_uri`
/// and whose local name is `local_name`.
pub(crate) fn check_new_prefix(
    ns_uri: Option<&str>,
    prefix: Option<&str>,
    local_name: &str,
) -> Result<(), DOMException> {
    if prefix.is_some_and(|prefix| validate_ncname(prefix).is_err()) {
        return Err(DOMException::InvalidCharacterErr);
    }
    check_prefix_binding(ns_uri, prefix, local_name)
}

/// Check the reserved bindings of [Namespaces in XML 1.0](https://www.w3.org/TR/xml-names/).
///
/// - a prefix needs a namespace URI
/// - the prefix `xml` is bound to [`XML_XML_NAMESPACE`]
/// - the prefix `xmlns` and the name `xmlns` are bound to [`XML_NS_NAMESPACE`]
/// - [`XML_NS_NAMESPACE`] is bound only to the prefix or name `xmlns`
fn check_prefix_binding(
    ns_uri: Option<&str>,
    prefix: Option<&str>,
    local_name: &str,
) -> Result<(), DOMException> {
    let xmlns = match prefix {
        Some(prefix) => {
            let Some(ns_uri) = ns_uri else {
                return Err(DOMException::NamespaceErr);
            };
            if prefix == "xml" && ns_uri != XML_XML_NAMESPACE {
                return Err(DOMException::NamespaceErr);
            }
            prefix == "xmlns"
        }
        None => local_name == "xmlns",
    };
    if xmlns != (ns_uri == Some(XML_NS_NAMESPACE)) {
        return Err(DOMException::NamespaceErr);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_hierarchy_table() {
        use NodeType::*;
        assert!(check_vertical_hierarchy(Document, Element));
        assert!(check_vertical_hierarchy(Document, DocumentType));
        assert!(!check_vertical_hierarchy(Document, Text));
        assert!(check_vertical_hierarchy(Element, CDATASection));
        assert!(!check_vertical_hierarchy(Element, Attribute));
        assert!(!check_vertical_hierarchy(Element, Document));
        assert!(check_vertical_hierarchy(Attribute, Text));
        assert!(!check_vertical_hierarchy(Attribute, Element));
        for leaf in [Text, Comment, CDATASection, ProcessingInstruction, Notation] {
            assert!(!check_vertical_hierarchy(leaf, Text));
        }
    }

    #[test]
    fn qname_resolution() {
        let (prefix, local) = resolve_qname(Some("urn:a"), "a:b").unwrap();
        assert_eq!(prefix.as_deref(), Some("a"));
        assert_eq!(local.as_ref(), "b");

        let (prefix, local) = resolve_qname(None, "b").unwrap();
        assert!(prefix.is_none());
        assert_eq!(local.as_ref(), "b");

        assert!(matches!(
            resolve_qname(None, "1b"),
            Err(DOMException::InvalidCharacterErr)
        ));
        assert!(matches!(
            resolve_qname(Some("urn:a"), "a:b:c"),
            Err(DOMException::NamespaceErr)
        ));
        assert!(matches!(
            resolve_qname(None, "a:b"),
            Err(DOMException::NamespaceErr)
        ));
    }

    #[test]
    fn reserved_bindings() {
        assert!(resolve_qname(Some(XML_XML_NAMESPACE), "xml:lang").is_ok());
        assert!(resolve_qname(Some(XML_NS_NAMESPACE), "xmlns:a").is_ok());
        assert!(resolve_qname(Some(XML_NS_NAMESPACE), "xmlns").is_ok());
        for (ns, qname) in [
            (Some("urn:a"), "xml:lang"),
            (Some("urn:a"), "xmlns:a"),
            (Some("urn:a"), "xmlns"),
            (None, "xmlns"),
            (Some(XML_NS_NAMESPACE), "a:b"),
            (Some(XML_NS_NAMESPACE), "b"),
        ] {
            assert!(
                matches!(resolve_qname(ns, qname), Err(DOMException::NamespaceErr)),
                "{ns:?} {qname}"
            );
        }
    }

    #[test]
    fn new_prefix() {
        assert!(check_new_prefix(Some("urn:a"), Some("p"), "b").is_ok());
        assert!(check_new_prefix(None, None, "b").is_ok());
        assert!(matches!(
            check_new_prefix(Some("urn:a"), Some("1p"), "b"),
            Err(DOMException::InvalidCharacterErr)
        ));
        assert!(matches!(
            check_new_prefix(None, Some("p"), "b"),
            Err(DOMException::NamespaceErr)
        ));
        assert!(matches!(
            check_new_prefix(Some("urn:a"), Some("xml"), "b"),
            Err(DOMException::NamespaceErr)
        ));
    }

    #[test]
    fn exception_codes() {
        assert_eq!(DOMException::IndexSizeErr.code(), 1);
        assert_eq!(
            DOMException::HierarchyRequestErr {
                name: "a".to_owned()
            }
            .code(),
            3
        );
        assert_eq!(DOMException::NamespaceErr.code(), 14);
        assert_eq!(
            DOMException::from(EventException::UnspecifiedEventTypeErr).code(),
            0
        );
    }
}
