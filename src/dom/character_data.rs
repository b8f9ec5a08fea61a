use std::{
    cell::RefCell,
    mem::replace,
    rc::{Rc, Weak},
};

use super::{
    DOMException, NodeType, check_no_modification_allowed_err,
    document::{DocumentRef, DocumentWeakRef},
    events::EventListenerMap,
    node::{Node, NodeConnection, NodeRef, NodeWeakRef, SourceLocation},
};

/// Implementation of [CharacterData](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-FF21A306)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
///
/// Strings are encoded in UTF-8, not UTF-16.\
/// Therefore, errors related to string boundaries are subject to the constraints of UTF-8.
pub trait CharacterData: Node {
    /// Implementation of [`data`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-72AB8359) attribute.
    fn data(&self) -> String;

    /// Implementation of [`data`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-72AB8359) attribute.
    ///
    /// # Specification
    /// ```text
    /// Exceptions on setting
    ///     DOMException
    ///     NO_MODIFICATION_ALLOWED_ERR: Raised when the node is readonly.
    /// ```
    fn set_data(&mut self, data: &str) -> Result<(), DOMException>;

    /// Implementation of [`length`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-7D61178C) attribute.
    ///
    /// # Note
    /// Unlike the specification,
    /// this implementation returns **the number of bytes in a UTF-8 string**.
    fn length(&self) -> usize {
        self.data().len()
    }

    /// Implementation of [`substringData`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-6531BCCF).
    ///
    /// # Note
    /// Unlike the specification, `offset` and `count` is **the number of bytes in a UTF-8 string**.
    ///
    /// # Specification
    /// ```text
    /// Extracts a range of data from the node.
    ///
    /// Return Value
    ///     DOMString The specified substring. If the sum of offset and count exceeds the
    ///               length, then all 16-bit units to the end of the data are returned.
    ///
    /// Exceptions
    ///     DOMException
    ///     INDEX_SIZE_ERR:     Raised if the specified offset is negative or greater than
    ///                         the number of 16-bit units in data, or if the specified
    ///                         count is negative.
    /// ```
    fn substring_data(&self, offset: usize, count: usize) -> Result<String, DOMException> {
        let data = self.data();
        let end = data.len().min(offset.saturating_add(count));
        if !data.is_char_boundary(offset) || !data.is_char_boundary(end) {
            return Err(DOMException::IndexSizeErr);
        }
        Ok(data[offset..end].to_owned())
    }

    /// Implementation of [`appendData`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-32791A2F) method.
    fn append_data(&mut self, arg: &str) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;
        let mut data = self.data();
        data.push_str(arg);
        self.set_data(&data)
    }

    /// Implementation of [`insertData`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-3EDB695F) method.
    ///
    /// # Specification
    /// ```text
    /// Insert a string at the specified 16-bit unit offset.
    ///
    /// Exceptions
    ///     DOMException
    ///     INDEX_SIZE_ERR:              Raised if the specified offset is negative or greater
    ///                                  than the number of 16-bit units in data.
    ///     NO_MODIFICATION_ALLOWED_ERR: Raised if this node is readonly.
    /// ```
    fn insert_data(&mut self, offset: usize, arg: &str) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;
        let mut data = self.data();
        if !data.is_char_boundary(offset) {
            return Err(DOMException::IndexSizeErr);
        }
        data.insert_str(offset, arg);
        self.set_data(&data)
    }

    /// Implementation of [`deleteData`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-7C603781) method.
    ///
    /// If the sum of `offset` and `count` exceeds the length,
    /// all bytes from `offset` to the end of the data are deleted.
    fn delete_data(&mut self, offset: usize, count: usize) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;
        let mut data = self.data();
        let end = data.len().min(offset.saturating_add(count));
        if !data.is_char_boundary(offset) || !data.is_char_boundary(end) {
            return Err(DOMException::IndexSizeErr);
        }
        data.drain(offset..end);
        self.set_data(&data)
    }

    /// Implementation of [`replaceData`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-E5CBA7FB) method.
    ///
    /// # Specification
    /// ```text
    /// Replace the characters starting at the specified 16-bit unit offset with the
    /// specified string.
    ///
    /// Parameters
    ///     offset of type unsigned long
    ///         The offset from which to start replacing.
    ///     count of type unsigned long
    ///         The number of 16-bit units to replace. If the sum of offset and count exceeds
    ///         length, then all 16-bit units to the end of the data are replaced; (i.e., the
    ///         effect is the same as a remove method call with the same range, followed by
    ///         an append method invocation).
    ///     arg of type DOMString
    ///         The DOMString with which the range must be replaced.
    /// ```
    fn replace_data(&mut self, offset: usize, count: usize, arg: &str) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;
        let mut data = self.data();
        let end = data.len().min(offset.saturating_add(count));
        if !data.is_char_boundary(offset) || !data.is_char_boundary(end) {
            return Err(DOMException::IndexSizeErr);
        }
        data.replace_range(offset..end, arg);
        self.set_data(&data)
    }
}

/// The storage shared by `Text`, `Comment` and `CDATASection`.
struct CharacterDataNode {
    /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    /// - `Document` (`Comment` only)
    /// - `DocumentFragment`
    /// - `EntityReference`
    /// - `Element`
    /// - `Attr` (`Text` only)
    /// - `Entity`
    parent_node: Option<NodeWeakRef>,
    owner_document: DocumentWeakRef,
    data: String,
    listeners: EventListenerMap,
    location: Option<SourceLocation>,
}

macro_rules! impl_character_data_node {
    ( $( #[$meta:meta] )* $ref:ident, $weak:ident, $ty:ident, $name:literal ) => {
        $( #[$meta] )*
        #[derive(Clone)]
        pub struct $ref(Rc<RefCell<CharacterDataNode>>);

        impl $ref {
            pub(super) fn new(doc: DocumentWeakRef, data: &str) -> Self {
                Self(Rc::new(RefCell::new(CharacterDataNode {
                    parent_node: None,
                    owner_document: doc,
                    data: data.to_owned(),
                    listeners: EventListenerMap::default(),
                    location: None,
                })))
            }

            #[doc = concat!("Generate [`", stringify!($weak), "`] from `self`.")]
            pub fn downgrade(&self) -> $weak {
                $weak(Rc::downgrade(&self.0))
            }
        }

        impl Node for $ref {
            fn node_name(&self) -> Rc<str> {
                $name.into()
            }

            fn node_value(&self) -> Option<Rc<str>> {
                Some(self.0.borrow().data.as_str().into())
            }

            fn set_node_value(&mut self, value: &str) -> Result<(), DOMException> {
                self.set_data(value)
            }

            fn node_type(&self) -> NodeType {
                NodeType::$ty
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

            fn clone_node(&self, _deep: bool) -> NodeRef {
                let node = self.0.borrow();
                let mut new = Self::new(node.owner_document.clone(), &node.data);
                new.set_location(node.location);
                new.into()
            }

            fn text_content(&self) -> Option<String> {
                Some(self.data())
            }

            fn set_text_content(&mut self, text: &str) -> Result<(), DOMException> {
                self.set_data(text)
            }

            fn is_same_node(&self, other: &NodeRef) -> bool {
                let NodeRef::$ty(other) = other else {
                    return false;
                };
                Rc::ptr_eq(&self.0, &other.0)
            }
        }

        impl CharacterData for $ref {
            fn data(&self) -> String {
                self.0.borrow().data.clone()
            }

            fn set_data(&mut self, data: &str) -> Result<(), DOMException> {
                check_no_modification_allowed_err(self)?;
                self.0.borrow_mut().data = data.to_owned();
                Ok(())
            }
        }

        impl NodeConnection for $ref {
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

        impl From<$ref> for NodeRef {
            fn from(value: $ref) -> Self {
                NodeRef::$ty(value)
            }
        }

        #[doc = concat!("Weak reference of [`", stringify!($ref), "`].")]
        #[derive(Clone)]
        pub struct $weak(Weak<RefCell<CharacterDataNode>>);

        impl $weak {
            #[doc = concat!("Generate [`", stringify!($ref), "`] from `self`.")]
            /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
            pub fn upgrade(&self) -> Option<$ref> {
                self.0.upgrade().map($ref)
            }
        }
    };
}

macro_rules! impl_split_text {
    ( $ref:ident ) => {
        impl $ref {
            /// Implementation of [`splitText`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-38853C1D) method.
            ///
            /// `offset` is the number of bytes in a UTF-8 string.
            ///
            /// # Specification
            /// ```text
            /// Breaks this node into two nodes at the specified offset, keeping both in the tree as
            /// siblings. After being split, this node will contain all the content up to the offset
            /// point. A new node of the same type, which contains all the content at and after the
            /// offset point, is returned. If the original node had a parent node, the new node is
            /// inserted as the next sibling of the original node. When the offset is equal to the
            /// length of this node, the new node has no data.
            ///
            /// Exceptions
            /// DOMException
            /// INDEX_SIZE_ERR:              Raised if the specified offset is negative or greater
            ///                              than the number of 16-bit units in data.
            /// NO_MODIFICATION_ALLOWED_ERR: Raised if this node is readonly.
            /// ```
            pub fn split_text(&mut self, offset: usize) -> Result<$ref, DOMException> {
                check_no_modification_allowed_err(self)?;
                if !self.0.borrow().data.is_char_boundary(offset) {
                    return Err(DOMException::IndexSizeErr);
                }

                let back = self.0.borrow_mut().data.split_off(offset);
                let doc = self.0.borrow().owner_document.clone();
                let res = Self::new(doc, &back);
                if let Some(mut parent) = self.parent_node() {
                    parent.insert_before(res.clone().into(), self.next_sibling())?;
                }
                Ok(res)
            }
        }
    };
}

impl_character_data_node!(
    /// Implementation of [Text](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1312295772)
    /// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
    ///
    /// Strings are encoded in UTF-8. Unlike the specification, methods that specify string
    /// boundaries are constrained to be UTF-8 character boundaries.
    TextRef,
    TextWeakRef,
    Text,
    "#text"
);
impl_split_text!(TextRef);

impl_character_data_node!(
    /// Implementation of [Comment](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1728279322)
    /// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
    CommentRef,
    CommentWeakRef,
    Comment,
    "#comment"
);

impl_character_data_node!(
    /// Implementation of [CDATASection](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-667469212)
    /// interface on [1.5 Extended Interfaces: XML Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-E067D597)
    ///
    /// A CDATA section is a kind of `Text`, but adjacent CDATA sections are never merged
    /// by [`Node::normalize`].
    CDATASectionRef,
    CDATASectionWeakRef,
    CDATASection,
    "#cdata-section"
);
impl_split_text!(CDATASectionRef);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_data() {
        let doc = DocumentRef::new(None, Some("root"), None).unwrap();
        let mut text = doc.create_text_node("hello");
        text.append_data(" world").unwrap();
        assert_eq!(text.data(), "hello world");
        assert_eq!(text.length(), 11);
        text.insert_data(5, ",").unwrap();
        assert_eq!(text.data(), "hello, world");
        text.delete_data(5, 1).unwrap();
        text.replace_data(0, 5, "bye").unwrap();
        assert_eq!(text.data(), "bye world");
        assert_eq!(text.substring_data(4, 100).unwrap(), "world");
        text.delete_data(3, usize::MAX).unwrap();
        assert_eq!(text.node_value().as_deref(), Some("bye"));
        assert!(matches!(
            text.insert_data(4, "x"),
            Err(DOMException::IndexSizeErr)
        ));
    }

    #[test]
    fn offsets_are_utf8_bytes() {
        let doc = DocumentRef::new(None, Some("root"), None).unwrap();
        let mut text = doc.create_text_node("\u{3042}\u{3044}");
        assert_eq!(text.length(), 6);
        assert!(matches!(
            text.substring_data(1, 2),
            Err(DOMException::IndexSizeErr)
        ));
        assert!(matches!(
            text.split_text(4),
            Err(DOMException::IndexSizeErr)
        ));
        assert_eq!(text.substring_data(3, 3).unwrap(), "\u{3044}");
    }

    #[test]
    fn split_attached_text() {
        let doc = DocumentRef::new(None, Some("root"), None).unwrap();
        let mut root = doc.document_element().unwrap();
        let mut text = doc.create_text_node("foobar");
        let tail = doc.create_comment("tail");
        root.append_child(text.clone().into()).unwrap();
        root.append_child(tail.clone().into()).unwrap();

        let bar = text.split_text(3).unwrap();
        assert_eq!(text.data(), "foo");
        assert_eq!(bar.data(), "bar");
        assert!(
            text.next_sibling()
                .unwrap()
                .is_same_node(&bar.clone().into())
        );
        assert!(bar.next_sibling().unwrap().is_same_node(&tail.into()));
        assert_eq!(root.child_nodes().length(), 3);

        let mut detached = doc.create_cdata_section("abc");
        let empty = detached.split_text(3).unwrap();
        assert_eq!(empty.data(), "");
        assert!(empty.parent_node().is_none());
        assert_eq!(empty.node_type(), NodeType::CDATASection);
    }

    #[test]
    fn character_data_are_leaves() {
        let doc = DocumentRef::new(None, Some("root"), None).unwrap();
        let mut comment = doc.create_comment("c");
        assert_eq!(comment.node_name().as_ref(), "#comment");
        assert_eq!(comment.text_content().as_deref(), Some("c"));
        assert!(matches!(
            comment.append_child(doc.create_text_node("t").into()),
            Err(DOMException::HierarchyRequestErr { .. })
        ));
        comment.set_text_content("d").unwrap();
        assert_eq!(comment.data(), "d");

        let copy = comment.clone_node(true);
        assert!(copy.is_equal_node(&comment.clone().into()));
        assert!(!copy.is_same_node(&comment.into()));
    }
}
